//! Per-session query quotas with an admin bypass.
//!
//! The caller owns the [`Session`] and consults the [`RateLimiter`] before
//! asking; the RAG pipeline itself enforces nothing.

use chrono::{DateTime, Local};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Default number of queries per session.
pub const DEFAULT_MAX_QUERIES: u32 = 5;

/// Default maximum query length in characters.
pub const DEFAULT_MAX_INPUT_LENGTH: usize = 500;

/// State of one interactive session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub query_count: u32,
    pub is_admin: bool,
    pub started_at: DateTime<Local>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            query_count: 0,
            is_admin: false,
            started_at: Local::now(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a limiter check with a message fit for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub reason: String,
}

impl Admission {
    fn allow(reason: String) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny(reason: String) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    pub max_queries: u32,
    pub max_input_length: usize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUERIES, DEFAULT_MAX_INPUT_LENGTH)
    }
}

impl RateLimiter {
    pub fn new(max_queries: u32, max_input_length: usize) -> Self {
        Self {
            max_queries,
            max_input_length,
        }
    }

    /// Whether the session may ask another question.
    pub fn can_query(&self, session: &Session) -> Admission {
        if session.is_admin {
            return Admission::allow("Admin access - unlimited queries".to_string());
        }

        if session.query_count >= self.max_queries {
            return Admission::deny(format!(
                "Query limit reached ({} queries per session)",
                self.max_queries
            ));
        }

        Admission::allow(format!(
            "Queries remaining: {}",
            self.max_queries - session.query_count
        ))
    }

    /// Whether the query fits the length limit, counted in characters.
    pub fn check_input_length(&self, query: &str) -> Admission {
        let len = query.chars().count();
        if len > self.max_input_length {
            return Admission::deny(format!(
                "Query too long ({} characters, max {})",
                len, self.max_input_length
            ));
        }

        Admission::allow(format!(
            "Query length: {}/{} characters",
            len, self.max_input_length
        ))
    }

    /// Count one query against the session. Admins are not counted.
    pub fn increment_count(&self, session: &mut Session) {
        if !session.is_admin {
            session.query_count += 1;
        }
    }

    /// Queries left, `None` when unlimited.
    pub fn remaining(&self, session: &Session) -> Option<u32> {
        if session.is_admin {
            return None;
        }
        Some(self.max_queries.saturating_sub(session.query_count))
    }

    pub fn grant_admin(&self, session: &mut Session) {
        session.is_admin = true;
        session.query_count = 0;
    }

    pub fn reset_session(&self, session: &mut Session) {
        session.query_count = 0;
        session.started_at = Local::now();
    }

    /// Compare `password` against a SHA-256 hex digest. No hash configured means no admin.
    pub fn check_admin_password(&self, password: &str, expected_hash: Option<&str>) -> bool {
        match expected_hash {
            Some(expected) if !expected.trim().is_empty() => {
                hash_password(password).eq_ignore_ascii_case(expected.trim())
            }
            _ => false,
        }
    }
}

/// Lowercase hex SHA-256 of `password`.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
