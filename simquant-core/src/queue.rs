//! The single FIFO event queue shared by every component of a run.

use crate::domain::Event;
use std::collections::VecDeque;

/// FIFO queue of [`Event`]s.
///
/// Owned by the engine and lent mutably to whichever component is being
/// dispatched. Pop order always equals push order.
#[derive(Debug, Default)]
pub struct EventQueue {
    inner: VecDeque<Event>,
    pushed: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: impl Into<Event>) {
        self.inner.push_back(event.into());
        self.pushed += 1;
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.inner.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Total number of events ever pushed.
    pub fn pushed_total(&self) -> u64 {
        self.pushed
    }

    /// Pending events, front first. Does not consume.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.inner.iter()
    }
}
