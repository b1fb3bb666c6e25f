//! Question manager: prefetch buffers, shortfall generation, and the
//! background refill scheduler.
//!
//! The manager owns all mutable engine state behind a single mutex
//! boundary. It is a cheap clonable handle; construct one per process and
//! inject it wherever questions are consumed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::join_all;
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;

use crate::buffer::BufferStore;
use crate::history::HistoryWindow;
use crate::model::{Difficulty, Level, Question};
use crate::traits::{GenerateRequest, QuestionSource};

/// Tuning knobs for the manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Per-level buffer capacity target.
    pub buffer_size: usize,
    /// Questions requested per background refill batch.
    pub batch_size: usize,
    /// Prompt history window capacity.
    pub max_history: usize,
    /// How many recent prompts are sent to the source as an avoid-list.
    pub avoid_limit: usize,
    /// Pause between refill dispatches so the outbound requests don't all
    /// leave in the same instant.
    pub refill_stagger: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 40,
            batch_size: 5,
            max_history: 200,
            avoid_limit: 50,
            refill_stagger: Duration::from_millis(100),
        }
    }
}

/// Result of one refill trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillOutcome {
    /// A scheduling pass ran and dispatched this many batch requests.
    Dispatched(usize),
    /// Another pass was already scheduling; this call was a no-op.
    AlreadyRunning,
}

struct ManagerState {
    buffers: BufferStore,
    history: HistoryWindow,
}

struct Inner {
    source: Arc<dyn QuestionSource>,
    state: Mutex<ManagerState>,
    refilling: AtomicBool,
    config: ManagerConfig,
}

/// Clonable handle to the engine state.
#[derive(Clone)]
pub struct QuestionManager {
    inner: Arc<Inner>,
}

impl QuestionManager {
    pub fn new(source: Arc<dyn QuestionSource>, config: ManagerConfig) -> Self {
        let state = ManagerState {
            buffers: BufferStore::new(),
            history: HistoryWindow::new(config.max_history),
        };
        Self {
            inner: Arc::new(Inner {
                source,
                state: Mutex::new(state),
                refilling: AtomicBool::new(false),
                config,
            }),
        }
    }

    /// Fetch `count` questions for the requested difficulty.
    ///
    /// Buffered questions are served first; any shortfall is generated on
    /// demand. The result is uniformly shuffled, and a background refill is
    /// triggered before returning. Generation failures degrade to a result
    /// shorter than `count` — callers must tolerate that.
    pub async fn get_questions(&self, difficulty: Difficulty, count: usize) -> Vec<Question> {
        let mut result = match difficulty.level() {
            Some(level) => self.fetch_portion(level, count).await,
            None => {
                let (easy, medium, hard) = mixed_split(count);
                let portions = [
                    (Level::Easy, easy),
                    (Level::Medium, medium),
                    (Level::Hard, hard),
                ];
                join_all(
                    portions
                        .into_iter()
                        .map(|(level, portion)| self.fetch_portion(level, portion)),
                )
                .await
                .into_iter()
                .flatten()
                .collect()
            }
        };

        result.shuffle(&mut rand::thread_rng());
        let _ = self.spawn_refill();
        result
    }

    /// Run one refill scheduling pass.
    ///
    /// Single-flight: when a pass is already scheduling, the call is a
    /// no-op. For every level below its capacity target, a batch request is
    /// dispatched without being awaited; the guard releases when the loop
    /// completes, not when the dispatched batches land.
    pub async fn refill_buffers(&self) -> RefillOutcome {
        if self
            .inner
            .refilling
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return RefillOutcome::AlreadyRunning;
        }

        let mut dispatched = 0;
        for level in Level::ALL {
            let (below_target, avoid_prompts) = {
                let state = self.state();
                (
                    state.buffers.len(level) < self.inner.config.buffer_size,
                    state.history.snapshot(self.inner.config.avoid_limit),
                )
            };
            if !below_target {
                continue;
            }

            let manager = self.clone();
            let request = GenerateRequest {
                level,
                count: self.inner.config.batch_size,
                avoid_prompts,
                focus_hint: None,
            };
            tokio::spawn(async move {
                match manager.inner.source.generate(&request).await {
                    Ok(batch) => {
                        let mut state = manager.state();
                        state.history.record(batch.iter().map(|q| q.prompt.clone()));
                        state.buffers.push(level, batch);
                        tracing::debug!(%level, len = state.buffers.len(level), "buffer refilled");
                    }
                    Err(error) => {
                        tracing::warn!(%level, "background refill failed: {error:#}");
                    }
                }
            });
            dispatched += 1;

            tokio::time::sleep(self.inner.config.refill_stagger).await;
        }

        self.inner.refilling.store(false, Ordering::Release);
        RefillOutcome::Dispatched(dispatched)
    }

    /// Trigger a refill pass without waiting for it.
    pub fn spawn_refill(&self) -> JoinHandle<RefillOutcome> {
        let manager = self.clone();
        tokio::spawn(async move { manager.refill_buffers().await })
    }

    /// Drop all buffered questions and the prompt history, then kick a
    /// fresh background refill.
    ///
    /// Requests already in flight are not cancelled; a batch dispatched
    /// before the clear may still land afterwards.
    pub fn clear_memory(&self) {
        {
            let mut state = self.state();
            state.buffers.clear();
            state.history.clear();
        }
        let _ = self.spawn_refill();
    }

    /// Questions currently buffered for a level.
    pub fn buffered(&self, level: Level) -> usize {
        self.state().buffers.len(level)
    }

    /// Prompts currently in the history window.
    pub fn history_len(&self) -> usize {
        self.state().history.len()
    }

    /// Pop up to `count` from one buffer and generate the remainder on
    /// demand. Never fails: a source error is logged and the shortfall
    /// stays unfilled.
    async fn fetch_portion(&self, level: Level, count: usize) -> Vec<Question> {
        if count == 0 {
            return Vec::new();
        }

        let mut items = self.state().buffers.pop(level, count);
        if items.len() < count {
            let needed = count - items.len();
            let avoid_prompts = self.state().history.snapshot(self.inner.config.avoid_limit);
            tracing::debug!(%level, needed, "buffer short, generating on demand");

            let request = GenerateRequest {
                level,
                count: needed,
                avoid_prompts,
                focus_hint: None,
            };
            match self.inner.source.generate(&request).await {
                Ok(fresh) => {
                    let mut state = self.state();
                    state.history.record(fresh.iter().map(|q| q.prompt.clone()));
                    drop(state);
                    items.extend(fresh);
                }
                Err(error) => {
                    tracing::warn!(%level, needed, "on-demand generation failed: {error:#}");
                }
            }
        }
        items
    }

    fn state(&self) -> MutexGuard<'_, ManagerState> {
        self.inner.state.lock().unwrap()
    }
}

/// Split a mixed request into per-level sub-counts.
///
/// Easy and medium each take `ceil(count / 3)`; hard absorbs the remainder
/// (30 → 10/10/10, 31 → 11/11/9). The asymmetry is a locked contract.
fn mixed_split(count: usize) -> (usize, usize, usize) {
    let sub = count.div_ceil(3);
    (sub, sub, count.saturating_sub(2 * sub))
}
