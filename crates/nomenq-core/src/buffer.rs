//! Per-level FIFO queues of ready-to-serve questions.

use std::collections::VecDeque;

use crate::model::{Level, Question};

/// Three FIFO queues of prefetched questions, one per concrete level.
///
/// `pop` and `push` never block and never fail; the caller owning the
/// surrounding lock is the concurrency boundary.
#[derive(Debug, Default)]
pub struct BufferStore {
    easy: VecDeque<Question>,
    medium: VecDeque<Question>,
    hard: VecDeque<Question>,
}

impl BufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return up to `count` questions from the front of the
    /// queue, oldest first. Returns fewer when the queue runs out.
    pub fn pop(&mut self, level: Level, count: usize) -> Vec<Question> {
        let queue = self.queue_mut(level);
        let take = count.min(queue.len());
        queue.drain(..take).collect()
    }

    /// Append questions at the back, preserving arrival order.
    pub fn push(&mut self, level: Level, items: Vec<Question>) {
        self.queue_mut(level).extend(items);
    }

    pub fn len(&self, level: Level) -> usize {
        self.queue(level).len()
    }

    pub fn is_empty(&self) -> bool {
        Level::ALL.iter().all(|level| self.queue(*level).is_empty())
    }

    /// Empty all three queues.
    pub fn clear(&mut self) {
        self.easy.clear();
        self.medium.clear();
        self.hard.clear();
    }

    fn queue(&self, level: Level) -> &VecDeque<Question> {
        match level {
            Level::Easy => &self.easy,
            Level::Medium => &self.medium,
            Level::Hard => &self.hard,
        }
    }

    fn queue_mut(&mut self, level: Level) -> &mut VecDeque<Question> {
        match level {
            Level::Easy => &mut self.easy,
            Level::Medium => &mut self.medium,
            Level::Hard => &mut self.hard,
        }
    }
}
