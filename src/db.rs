// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Drill history, kept in a SQLite file inside the collection.

use std::path::Path;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use flashdeck_core::ErrorReport;
use flashdeck_core::Fallible;
use rusqlite::Connection;
use rusqlite::params;

/// One answered entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Review {
    pub front: String,
    pub back: String,
    pub source: String,
    pub known: bool,
    pub reaction: Duration,
}

/// A finished drill session, ready to be stored.
pub struct Session {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<String>,
    pub reviews: Vec<Review>,
}

/// A stored session, without its reviews.
#[derive(Debug, PartialEq)]
pub struct SessionSummary {
    pub id: i64,
    pub started_at: String,
    pub finished_at: String,
    pub sources: String,
    pub reviewed: usize,
    pub known: usize,
    /// Mean reaction time in milliseconds. `None` for empty sessions.
    pub mean_reaction_ms: Option<f64>,
}

pub struct Database {
    conn: Connection,
}

fn db_error(err: rusqlite::Error) -> ErrorReport {
    ErrorReport::new(format!("Database error: {err}"))
}

impl Database {
    pub fn new(path: &Path) -> Fallible<Self> {
        let conn = Connection::open(path).map_err(db_error)?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn in_memory() -> Fallible<Self> {
        Self::init(Connection::open_in_memory().map_err(db_error)?)
    }

    fn init(conn: Connection) -> Fallible<Self> {
        conn.execute_batch(
            r#"
            create table if not exists sessions (
                session_id integer primary key,
                started_at text not null,
                finished_at text not null,
                sources text not null
            ) strict;

            create table if not exists reviews (
                review_id integer primary key,
                session_id integer not null references sessions (session_id),
                front text not null,
                back text not null,
                source text not null,
                known integer not null,
                reaction_ms integer not null
            ) strict;
            "#,
        )
        .map_err(db_error)?;
        Ok(Self { conn })
    }

    /// Store a session and its reviews atomically. Returns the session id.
    pub fn record_session(&mut self, session: &Session) -> Fallible<i64> {
        let tx = self.conn.transaction().map_err(db_error)?;
        tx.execute(
            "insert into sessions (started_at, finished_at, sources) values (?1, ?2, ?3)",
            params![
                session.started_at.to_rfc3339(),
                session.finished_at.to_rfc3339(),
                session.sources.join(","),
            ],
        )
        .map_err(db_error)?;
        let session_id = tx.last_insert_rowid();
        {
            let mut stmt = tx
                .prepare(
                    "insert into reviews (session_id, front, back, source, known, reaction_ms)
                     values (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(db_error)?;
            for review in &session.reviews {
                let reaction_ms = i64::try_from(review.reaction.as_millis()).unwrap_or(i64::MAX);
                stmt.execute(params![
                    session_id,
                    review.front,
                    review.back,
                    review.source,
                    review.known,
                    reaction_ms,
                ])
                .map_err(db_error)?;
            }
        }
        tx.commit().map_err(db_error)?;
        Ok(session_id)
    }

    /// The most recent sessions, newest first.
    pub fn sessions(&self, limit: usize) -> Fallible<Vec<SessionSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "select s.session_id, s.started_at, s.finished_at, s.sources,
                        count(r.review_id), coalesce(sum(r.known), 0), avg(r.reaction_ms)
                 from sessions s
                 left join reviews r on r.session_id = s.session_id
                 group by s.session_id
                 order by s.session_id desc
                 limit ?1",
            )
            .map_err(db_error)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], |row| {
                let reviewed: i64 = row.get(4)?;
                let known: i64 = row.get(5)?;
                Ok(SessionSummary {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    sources: row.get(3)?,
                    reviewed: reviewed as usize,
                    known: known as usize,
                    mean_reaction_ms: row.get(6)?,
                })
            })
            .map_err(db_error)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row.map_err(db_error)?);
        }
        Ok(sessions)
    }
}
