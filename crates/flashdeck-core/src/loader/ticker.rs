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

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::select;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::task::spawn_blocking;
use tokio::time::sleep;

use crate::loader::Shared;
use crate::loader::TickOutcome;
use crate::loader::WindowedCorpusLoader;

/// The background task that runs a loading cycle every interval. Dropping
/// the ticker cancels it; a cycle that has already started still finishes.
pub(crate) struct Ticker {
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn start(runtime: &Handle, shared: Weak<Shared>, interval: Duration) -> Self {
        let (cancel, mut cancelled) = oneshot::channel::<()>();
        let handle = runtime.spawn(async move {
            loop {
                select! {
                    _ = sleep(interval) => {},
                    _ = &mut cancelled => {
                        log::debug!("Background loading cancelled");
                        break;
                    },
                }
                // The loader is gone: nothing left to load into.
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let loader = WindowedCorpusLoader::from_shared(shared);
                match spawn_blocking(move || loader.tick()).await {
                    Ok(TickOutcome::Skipped) => {
                        log::debug!("Previous loading cycle still running, skipped");
                    }
                    Ok(TickOutcome::Ran { batches, entries }) => {
                        log::debug!("Loading cycle done: {batches} batches, {entries} entries");
                    }
                    Err(err) => {
                        log::warn!("Loading cycle failed: {err}");
                    }
                }
            }
        });
        Self {
            cancel: Some(cancel),
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}
