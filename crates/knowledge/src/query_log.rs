//! SQLite-backed log of answered queries and their token costs.

use crate::rag::{QuerySink, SourceRef};
use chrono::Local;
use explainer_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// USD per million input tokens.
pub const INPUT_COST_PER_MILLION: f64 = 3.0;

/// USD per million output tokens.
pub const OUTPUT_COST_PER_MILLION: f64 = 15.0;

const SELECT_COLUMNS: &str = "SELECT id, timestamp, query, answer, sources, chunks_retrieved, \
     input_tokens, output_tokens, total_tokens, model, cost_estimate_usd FROM queries";

/// One row of the query log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedQuery {
    pub id: i64,
    pub timestamp: String,
    pub query: String,
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub chunks_retrieved: u32,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    pub model: String,
    pub cost_estimate_usd: f64,
}

/// Aggregates over the whole log. All zero for an empty log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStats {
    pub total_queries: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub avg_input_tokens: f64,
    pub avg_output_tokens: f64,
    pub avg_chunks: f64,
}

/// Estimated cost in USD of one generation.
pub fn estimate_cost(input_tokens: u32, output_tokens: u32) -> f64 {
    input_tokens as f64 / 1_000_000.0 * INPUT_COST_PER_MILLION
        + output_tokens as f64 / 1_000_000.0 * OUTPUT_COST_PER_MILLION
}

/// Query log over a single SQLite connection.
pub struct QueryLogger {
    conn: Mutex<Connection>,
}

impl QueryLogger {
    /// Open (and create if needed) the log database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Database(format!("Failed to open query log: {}", e)))?;

        tracing::debug!("Opened query log at {:?}", db_path);
        Self::init(conn)
    }

    /// In-memory log, discarded on drop.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Database(format!("Failed to open query log: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS queries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                query TEXT NOT NULL,
                answer TEXT NOT NULL,
                sources TEXT NOT NULL,
                chunks_retrieved INTEGER,
                input_tokens INTEGER,
                output_tokens INTEGER,
                total_tokens INTEGER,
                model TEXT,
                cost_estimate_usd REAL
            );
            "#,
        )
        .map_err(|e| AppError::Database(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append one answered query; returns its row id.
    pub fn log_query(
        &self,
        query: &str,
        answer: &str,
        sources: &[SourceRef],
        input_tokens: u32,
        output_tokens: u32,
        model: &str,
    ) -> AppResult<i64> {
        let sources_json = serde_json::to_string(sources)?;
        let total_tokens = input_tokens + output_tokens;
        let cost = estimate_cost(input_tokens, output_tokens);
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();

        let conn = self.conn();
        conn.execute(
            "INSERT INTO queries (
                timestamp, query, answer, sources, chunks_retrieved,
                input_tokens, output_tokens, total_tokens, model, cost_estimate_usd
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                timestamp,
                query,
                answer,
                sources_json,
                sources.len() as i64,
                input_tokens,
                output_tokens,
                total_tokens,
                model,
                cost,
            ],
        )
        .map_err(|e| AppError::Database(format!("Failed to insert query: {}", e)))?;

        let id = conn.last_insert_rowid();
        tracing::info!(
            "Query logged: {} in, {} out, ${:.4}",
            input_tokens,
            output_tokens,
            cost
        );
        Ok(id)
    }

    /// Every logged query, newest first.
    pub fn all_queries(&self) -> AppResult<Vec<LoggedQuery>> {
        self.select(&format!("{} ORDER BY timestamp DESC, id DESC", SELECT_COLUMNS), None)
    }

    /// The `n` newest queries.
    pub fn recent(&self, n: usize) -> AppResult<Vec<LoggedQuery>> {
        self.select(
            &format!("{} ORDER BY timestamp DESC, id DESC LIMIT ?1", SELECT_COLUMNS),
            Some(n as i64),
        )
    }

    fn select(&self, sql: &str, limit: Option<i64>) -> AppResult<Vec<LoggedQuery>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| AppError::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = match limit {
            Some(limit) => stmt.query_map(params![limit], read_row),
            None => stmt.query_map([], read_row),
        }
        .map_err(|e| AppError::Database(format!("Failed to read query log: {}", e)))?;

        let queries = rows
            .map(|row| row.map_err(|e| AppError::Database(format!("Failed to read row: {}", e)))?)
            .collect::<AppResult<Vec<_>>>();
        queries
    }

    /// A single query by id.
    pub fn get(&self, id: i64) -> AppResult<Option<LoggedQuery>> {
        let conn = self.conn();
        let row = conn
            .query_row(&format!("{} WHERE id = ?1", SELECT_COLUMNS), params![id], read_row)
            .optional()
            .map_err(|e| AppError::Database(format!("Failed to read query {}: {}", id, e)))?;

        row.transpose()
    }

    /// Aggregate token and cost statistics.
    pub fn stats(&self) -> AppResult<QueryStats> {
        let conn = self.conn();
        conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(input_tokens), 0),
                COALESCE(SUM(output_tokens), 0),
                COALESCE(SUM(total_tokens), 0),
                COALESCE(SUM(cost_estimate_usd), 0.0),
                COALESCE(AVG(input_tokens), 0.0),
                COALESCE(AVG(output_tokens), 0.0),
                COALESCE(AVG(chunks_retrieved), 0.0)
             FROM queries",
            [],
            |row| {
                Ok(QueryStats {
                    total_queries: row.get::<_, i64>(0)? as u64,
                    total_input_tokens: row.get::<_, i64>(1)? as u64,
                    total_output_tokens: row.get::<_, i64>(2)? as u64,
                    total_tokens: row.get::<_, i64>(3)? as u64,
                    total_cost: row.get(4)?,
                    avg_input_tokens: row.get(5)?,
                    avg_output_tokens: row.get(6)?,
                    avg_chunks: row.get(7)?,
                })
            },
        )
        .map_err(|e| AppError::Database(format!("Failed to compute stats: {}", e)))
    }

    /// Write every query as pretty JSON to `path`; returns how many were written.
    pub fn export_json(&self, path: &Path) -> AppResult<usize> {
        let queries = self.all_queries()?;
        let json = serde_json::to_string_pretty(&queries)?;
        std::fs::write(path, json)?;

        tracing::info!("Exported {} queries to {:?}", queries.len(), path);
        Ok(queries.len())
    }
}

impl QuerySink for QueryLogger {
    fn log_query(
        &self,
        query: &str,
        answer: &str,
        sources: &[SourceRef],
        input_tokens: u32,
        output_tokens: u32,
        model: &str,
    ) -> AppResult<i64> {
        QueryLogger::log_query(self, query, answer, sources, input_tokens, output_tokens, model)
    }
}

/// Map a row; a malformed sources column surfaces as the inner error.
fn read_row(row: &Row<'_>) -> rusqlite::Result<AppResult<LoggedQuery>> {
    let sources_json: String = row.get(4)?;
    let sources = match serde_json::from_str::<Vec<SourceRef>>(&sources_json) {
        Ok(sources) => sources,
        Err(e) => return Ok(Err(e.into())),
    };

    Ok(Ok(LoggedQuery {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        query: row.get(2)?,
        answer: row.get(3)?,
        sources,
        chunks_retrieved: row.get::<_, Option<u32>>(5)?.unwrap_or(0),
        input_tokens: row.get::<_, Option<u32>>(6)?.unwrap_or(0),
        output_tokens: row.get::<_, Option<u32>>(7)?.unwrap_or(0),
        total_tokens: row.get::<_, Option<u32>>(8)?.unwrap_or(0),
        model: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        cost_estimate_usd: row.get::<_, Option<f64>>(10)?.unwrap_or(0.0),
    }))
}
