//! Pure activity pipeline stages.
//!
//! # Responsibility
//! - Turn domain events into candidate activities (`factory`).
//! - Collapse candidates per reader (`merge`).
//! - Decide delivery media for one activity (`media`).
//!
//! # Invariants
//! - No stage performs I/O; persistence lives in `service::dispatch`.

pub mod factory;
pub mod media;
pub mod merge;
