#![allow(dead_code)]

use hylo_core::{Comment, JobQueue, JobRequest, Post, QueueError};
use rusqlite::{params, Connection};
use std::cell::RefCell;

pub const COMMUNITY_A: i64 = 100;
pub const COMMUNITY_B: i64 = 200;

/// Queue fake that records every job it accepts.
#[derive(Default)]
pub struct RecordingQueue {
    pub jobs: RefCell<Vec<JobRequest>>,
}

impl RecordingQueue {
    pub fn job_count(&self) -> usize {
        self.jobs.borrow().len()
    }
}

impl JobQueue for RecordingQueue {
    fn enqueue(&self, job: &JobRequest) -> Result<(), QueueError> {
        self.jobs.borrow_mut().push(job.clone());
        Ok(())
    }
}

/// Queue fake that refuses everything.
pub struct DownQueue;

impl JobQueue for DownQueue {
    fn enqueue(&self, _job: &JobRequest) -> Result<(), QueueError> {
        Err(QueueError::Unavailable("connection refused".to_string()))
    }
}

/// Seeds users 1..=9 and two communities.
pub fn seed_base(conn: &Connection) {
    for id in 1..=9 {
        conn.execute(
            "INSERT INTO users (id, name, email) VALUES (?1, ?2, ?3);",
            params![id, format!("user {id}"), format!("user{id}@example.com")],
        )
        .unwrap();
    }
    conn.execute(
        "INSERT INTO communities (id, name, slug) VALUES (?1, 'Alpha', 'alpha'), (?2, 'Beta', 'beta');",
        params![COMMUNITY_A, COMMUNITY_B],
    )
    .unwrap();
}

pub fn add_membership(conn: &Connection, user_id: i64, community_id: i64, settings: &str) {
    conn.execute(
        "INSERT INTO memberships (user_id, community_id, active, settings) VALUES (?1, ?2, 1, ?3);",
        params![user_id, community_id, settings],
    )
    .unwrap();
}

pub fn add_post(conn: &Connection, id: i64, author: i64, communities: &[i64], created_at: i64) -> Post {
    conn.execute(
        "INSERT INTO posts (id, user_id, name, description, created_at) VALUES (?1, ?2, 'post', '', ?3);",
        params![id, author, created_at],
    )
    .unwrap();
    for community_id in communities {
        conn.execute(
            "INSERT INTO post_communities (post_id, community_id) VALUES (?1, ?2);",
            params![id, community_id],
        )
        .unwrap();
    }
    Post {
        id,
        user_id: author,
        description: String::new(),
        created_at,
    }
}

pub fn add_comment(
    conn: &Connection,
    id: i64,
    post_id: i64,
    author: i64,
    text: &str,
    created_at: i64,
) -> Comment {
    conn.execute(
        "INSERT INTO comments (id, post_id, user_id, text, created_at) VALUES (?1, ?2, ?3, ?4, ?5);",
        params![id, post_id, author, text, created_at],
    )
    .unwrap();
    Comment {
        id,
        post_id,
        user_id: author,
        text: text.to_string(),
        created_at,
    }
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
