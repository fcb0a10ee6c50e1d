// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory queue for messages that could not be sent yet.
//!
//! Entries are kept ordered by priority (high first), and by insertion
//! order within a priority. When the queue is over capacity, the oldest
//! entry of the lowest priority present is evicted, so a full queue of
//! high-priority messages still drops the oldest one to make room.

use std::collections::VecDeque;

use serde_json::{Map, Value};
use ul_core::Priority;

/// Default bound on queued messages.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// An application message waiting for a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// The message `type`.
    pub kind: String,
    /// Payload fields; envelope fields are added at transmission time.
    pub payload: Map<String, Value>,
    pub priority: Priority,
    /// Wall-clock milliseconds when the message was created.
    pub enqueued_at: u64,
    seq: u64,
}

impl OutboundMessage {
    pub fn new(
        kind: impl Into<String>,
        payload: Map<String, Value>,
        priority: Priority,
        enqueued_at: u64,
    ) -> Self {
        OutboundMessage { kind: kind.into(), payload, priority, enqueued_at, seq: 0 }
    }

    /// Insertion sequence assigned by the queue.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Bounded priority queue of outbound messages.
#[derive(Debug)]
pub struct PendingQueue {
    entries: VecDeque<OutboundMessage>,
    capacity: usize,
    next_seq: u64,
}

impl PendingQueue {
    pub fn new(capacity: usize) -> Self {
        PendingQueue { entries: VecDeque::new(), capacity, next_seq: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of queued entries with the given priority.
    pub fn count(&self, priority: Priority) -> usize {
        self.entries.iter().filter(|e| e.priority == priority).count()
    }

    /// Inserts `message` behind every entry of equal or higher priority.
    ///
    /// Returns the evicted entry if the queue overflowed. That may be
    /// `message` itself when it is the oldest of the lowest tier.
    pub fn push(&mut self, message: OutboundMessage) -> Option<OutboundMessage> {
        let pos = self.entries.iter().position(|e| e.priority < message.priority);
        self.insert(pos, message)
    }

    /// Puts back a message that was handed to the transport but never
    /// written. It goes ahead of everything else of its priority, since it
    /// was sent before any of them.
    ///
    /// Returns the evicted entry if the queue overflowed.
    pub fn requeue(&mut self, message: OutboundMessage) -> Option<OutboundMessage> {
        let pos = self.entries.iter().position(|e| e.priority <= message.priority);
        self.insert(pos, message)
    }

    fn insert(&mut self, pos: Option<usize>, mut message: OutboundMessage) -> Option<OutboundMessage> {
        message.seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(pos.unwrap_or(self.entries.len()), message);

        if self.entries.len() > self.capacity {
            self.evict()
        } else {
            None
        }
    }

    /// Removes the oldest entry of the lowest priority present.
    fn evict(&mut self) -> Option<OutboundMessage> {
        let lowest = self.entries.back()?.priority;
        let idx = self.entries.iter().position(|e| e.priority == lowest)?;
        self.entries.remove(idx)
    }

    /// The next entry to transmit.
    pub fn front(&self) -> Option<&OutboundMessage> {
        self.entries.front()
    }

    pub fn pop_front(&mut self) -> Option<OutboundMessage> {
        self.entries.pop_front()
    }

    /// Iterates in transmission order.
    pub fn iter(&self) -> impl Iterator<Item = &OutboundMessage> {
        self.entries.iter()
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        PendingQueue::new(DEFAULT_QUEUE_CAPACITY)
    }
}
