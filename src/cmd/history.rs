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

use chrono::DateTime;
use flashdeck_core::Fallible;

use crate::collection::Collection;
use crate::db::SessionSummary;

pub fn print_history(directory: Option<String>, limit: usize) -> Fallible<()> {
    let collection = Collection::new(directory)?;
    let sessions = collection.db.sessions(limit)?;
    if sessions.is_empty() {
        println!("No sessions yet.");
    }
    for session in &sessions {
        println!("{}", format_session(session));
    }
    Ok(())
}

fn format_session(session: &SessionSummary) -> String {
    let reaction = match session.mean_reaction_ms {
        Some(ms) => format!(", mean reaction {:.1}s", ms / 1000.0),
        None => String::new(),
    };
    let length = match (
        DateTime::parse_from_rfc3339(&session.started_at),
        DateTime::parse_from_rfc3339(&session.finished_at),
    ) {
        (Ok(start), Ok(end)) => format!(" ({} min)", (end - start).num_minutes()),
        _ => String::new(),
    };
    format!(
        "#{} {}{length} [{}]: {}/{} known{reaction}",
        session.id, session.started_at, session.sources, session.known, session.reviewed
    )
}
