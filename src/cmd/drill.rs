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

use std::io::BufRead;
use std::io::Write;
use std::io::stdin;
use std::io::stdout;
use std::time::Duration;
use std::time::Instant;

use chrono::Utc;
use flashdeck_core::CorpusManager;
use flashdeck_core::ErrorReport;
use flashdeck_core::Fallible;
use flashdeck_core::choose;
use rand::Rng;
use tokio::task::spawn_blocking;

use crate::collection::Collection;
use crate::db::Review;
use crate::db::Session;

const QUIT: &str = ":q";

pub struct DrillConfig {
    pub directory: Option<String>,
    pub sources: Vec<String>,
    pub card_limit: Option<usize>,
}

pub async fn start_drill(config: DrillConfig) -> Fallible<()> {
    let collection = Collection::new(config.directory)?;
    let sources = collection.selection(config.sources);
    let Collection {
        mut db, manager, ..
    } = collection;
    manager.activate(&sources);

    let started_at = Utc::now();
    let card_limit = config.card_limit;
    // The terminal blocks; background loading keeps running on the runtime.
    let (manager, reviews) = spawn_blocking(move || -> Fallible<_> {
        let mut rng = rand::rng();
        let reviews = run_session(
            &manager,
            stdin().lock(),
            stdout().lock(),
            &mut rng,
            card_limit,
        )?;
        Ok((manager, reviews))
    })
    .await
    .map_err(|e| ErrorReport::new(format!("Drill session failed: {e}")))??;
    manager.shutdown();

    if reviews.is_empty() {
        return Ok(());
    }
    println!("{}", summary(&reviews));
    let session = Session {
        started_at,
        finished_at: Utc::now(),
        sources,
        reviews,
    };
    db.record_session(&session)?;
    Ok(())
}

enum Step {
    Answer(String),
    Quit,
}

fn read_step<R: BufRead>(input: &mut R) -> Fallible<Step> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(Step::Quit);
    }
    let line = line.trim();
    if line == QUIT {
        return Ok(Step::Quit);
    }
    Ok(Step::Answer(line.to_lowercase()))
}

/// Show entries until the limit, end of input, or `:q`.
///
/// Each entry is shown front first. Enter reveals the back, then the entry
/// is marked known or unknown. The reaction time runs from showing the
/// front to the reveal. The entry pool is re-read before every entry, so
/// batches loaded in the background show up during the session.
pub fn run_session<R, W, G>(
    manager: &CorpusManager,
    mut input: R,
    mut output: W,
    rng: &mut G,
    card_limit: Option<usize>,
) -> Fallible<Vec<Review>>
where
    R: BufRead,
    W: Write,
    G: Rng + ?Sized,
{
    let mut reviews = Vec::new();
    writeln!(output, "Press Enter to reveal, then answer y or n. Type {QUIT} to stop.")?;
    'session: while card_limit.is_none_or(|limit| reviews.len() < limit) {
        let entries = manager.active_entries();
        let entry = match choose(&entries, rng) {
            Ok(entry) => entry.clone(),
            Err(err) => {
                writeln!(output, "{err}")?;
                break;
            }
        };
        writeln!(output)?;
        writeln!(output, "{} ({})", entry.front(), entry.front_note())?;
        output.flush()?;

        let shown = Instant::now();
        if let Step::Quit = read_step(&mut input)? {
            break;
        }
        let reaction = shown.elapsed();
        writeln!(output, "{} ({})", entry.back(), entry.back_note())?;

        let known = loop {
            write!(output, "Known? [y/n] ")?;
            output.flush()?;
            match read_step(&mut input)? {
                Step::Quit => break 'session,
                Step::Answer(answer) => match answer.as_str() {
                    "y" | "yes" => break true,
                    "n" | "no" => break false,
                    _ => continue,
                },
            }
        };
        reviews.push(Review {
            front: entry.front().to_string(),
            back: entry.back().to_string(),
            source: entry.source().to_string(),
            known,
            reaction,
        });
    }
    Ok(reviews)
}

fn summary(reviews: &[Review]) -> String {
    let known = reviews.iter().filter(|review| review.known).count();
    let unknown = reviews.len() - known;
    let total: Duration = reviews.iter().map(|review| review.reaction).sum();
    let mean = total.as_secs_f64() / reviews.len().max(1) as f64;
    format!(
        "Reviewed {} entries: {known} known, {unknown} unknown. Mean reaction time: {mean:.1}s.",
        reviews.len()
    )
}

#[cfg(test)]
mod tests {
    use std::fs::write;
    use std::io::Cursor;
    use std::path::Path;

    use flashdeck_core::Config;
    use flashdeck_core::SourceDescriptor;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::tempdir;

    use super::*;

    fn manager(root: &Path) -> Fallible<CorpusManager> {
        write(
            root.join("nouns.tsv"),
            "Word_1\tWord_2\tPart_1\nHaus\tдом, здание\tNomen\n",
        )?;
        let config = Config {
            sources: vec![SourceDescriptor::new("nouns", "nouns.tsv")],
            ..Default::default()
        };
        CorpusManager::with_runtime(config, root, None)
    }

    fn drill(
        manager: &CorpusManager,
        input: &str,
        limit: Option<usize>,
    ) -> Fallible<(Vec<Review>, String)> {
        let mut output = Vec::new();
        let mut rng = StdRng::seed_from_u64(1);
        let reviews = run_session(manager, Cursor::new(input), &mut output, &mut rng, limit)?;
        Ok((reviews, String::from_utf8(output)?))
    }

    #[test]
    fn test_session() -> Fallible<()> {
        let dir = tempdir()?;
        let manager = manager(dir.path())?;
        manager.activate(["nouns"]);
        let (reviews, output) = drill(&manager, "\ny\n\nmaybe\nN\n", None)?;
        assert_eq!(reviews.len(), 2);
        assert!(reviews[0].known);
        assert!(!reviews[1].known);
        assert_eq!(reviews[0].source, "nouns");
        assert!(output.contains("Haus (Nomen)"));
        assert!(output.contains("дом, здание (Неизвестно)"));
        assert_eq!(output.matches("Known? [y/n]").count(), 3);
        Ok(())
    }

    #[test]
    fn test_quit_and_limit() -> Fallible<()> {
        let dir = tempdir()?;
        let manager = manager(dir.path())?;
        manager.activate(["nouns"]);
        let (reviews, _) = drill(&manager, "\ny\n:q\n", None)?;
        assert_eq!(reviews.len(), 1);
        let (reviews, _) = drill(&manager, "\ny\n\n:q\n", None)?;
        assert_eq!(reviews.len(), 1);
        let (reviews, _) = drill(&manager, "\ny\n\nn\n\ny\n", Some(2))?;
        assert_eq!(reviews.len(), 2);
        Ok(())
    }

    #[test]
    fn test_no_active_sources() -> Fallible<()> {
        let dir = tempdir()?;
        let manager = manager(dir.path())?;
        let (reviews, output) = drill(&manager, "\ny\n", None)?;
        assert!(reviews.is_empty());
        assert!(output.contains("Select at least one source."));
        Ok(())
    }

    #[test]
    fn test_summary() {
        let review = |known, ms| Review {
            front: String::new(),
            back: String::new(),
            source: String::new(),
            known,
            reaction: Duration::from_millis(ms),
        };
        assert_eq!(
            summary(&[review(true, 1000), review(false, 2000)]),
            "Reviewed 2 entries: 1 known, 1 unknown. Mean reaction time: 1.5s."
        );
    }
}
