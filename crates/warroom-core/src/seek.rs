//! Background seeking
//!
//! A [`SeekWorker`] owns a [`ReplaySession`] on a tokio task. Each `seek`
//! supersedes the previous one: the in-flight replay stops between actions
//! and the next one resumes from the last cached snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ReplayError;
use crate::session::ReplaySession;
use crate::state::GameState;

/// Latest published seek result.
#[derive(Clone, Debug)]
pub enum SeekStatus {
    Idle,
    Ready { turn: u32, state: Arc<GameState> },
    Failed { turn: u32, error: Arc<ReplayError> },
}

#[derive(Clone, Copy, Debug)]
struct SeekRequest {
    turn: u32,
    generation: u64,
}

pub struct SeekWorker {
    requests: mpsc::UnboundedSender<SeekRequest>,
    generation: Arc<AtomicU64>,
    status: watch::Receiver<SeekStatus>,
    task: JoinHandle<Option<ReplaySession>>,
}

impl SeekWorker {
    /// Move `session` onto a background task. Must be called inside a tokio
    /// runtime.
    pub fn spawn(session: ReplaySession) -> Self {
        let (requests, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SeekStatus::Idle);
        let generation = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(run(session, rx, status_tx, Arc::clone(&generation)));
        Self {
            requests,
            generation,
            status,
            task,
        }
    }

    /// Request the snapshot at the start of `turn`, cancelling any seek still
    /// in progress.
    pub fn seek(&self, turn: u32) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self.requests.send(SeekRequest { turn, generation }).is_err() {
            warn!(turn, "Seek worker has stopped");
        }
    }

    pub fn status(&self) -> SeekStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SeekStatus> {
        self.status.clone()
    }

    /// Stop the worker and take the session back. `None` if the replay task
    /// panicked.
    pub async fn shutdown(self) -> Option<ReplaySession> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        drop(self.requests);
        match self.task.await {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "Seek worker task failed");
                None
            }
        }
    }
}

async fn run(
    session: ReplaySession,
    mut rx: mpsc::UnboundedReceiver<SeekRequest>,
    status: watch::Sender<SeekStatus>,
    generation: Arc<AtomicU64>,
) -> Option<ReplaySession> {
    let mut session = Some(session);

    while let Some(mut request) = rx.recv().await {
        while let Ok(newer) = rx.try_recv() {
            request = newer;
        }
        if generation.load(Ordering::SeqCst) != request.generation {
            continue;
        }
        let mut current = session.take()?;

        let counter = Arc::clone(&generation);
        let joined = tokio::task::spawn_blocking(move || {
            let result = current.snapshot_at_with(request.turn, || {
                counter.load(Ordering::SeqCst) != request.generation
            });
            (current, result)
        })
        .await;

        let (current, result) = match joined {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "Replay task failed");
                return None;
            }
        };
        session = Some(current);

        match result {
            Ok(state) => {
                debug!(turn = request.turn, "Seek complete");
                status.send_replace(SeekStatus::Ready {
                    turn: request.turn,
                    state,
                });
            }
            Err(ReplayError::Cancelled) => {
                debug!(turn = request.turn, "Seek superseded");
            }
            Err(error) => {
                status.send_replace(SeekStatus::Failed {
                    turn: request.turn,
                    error: Arc::new(error),
                });
            }
        }
    }

    session
}
