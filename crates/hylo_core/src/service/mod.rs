//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and pipeline stages into use-case APIs.
//! - Own transaction boundaries for activity/notification writes.

pub mod activity_service;
pub mod dispatch;
pub mod outbox_relay;
