use std::collections::{HashMap, VecDeque};

use imgbridge_schema::{Message, MessageType};
use tracing::trace;

/// Per-type FIFO queues for decoded inbound messages.
///
/// Each queue holds at most [`MessageType::queue_capacity`] entries. A newly
/// inserted message first evicts any queued message with equal content, is
/// appended at the tail, and then the oldest entries are dropped until the
/// queue is back within capacity.
#[derive(Debug, Default)]
pub struct InboundQueues {
    queues: HashMap<MessageType, VecDeque<Message>>,
}

impl InboundQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a decoded message under its own type.
    pub fn insert(&mut self, message: Message) {
        let ty = message.message_type();
        let capacity = ty.queue_capacity();
        let queue = self.queues.entry(ty).or_default();

        let before = queue.len();
        queue.retain(|queued| queued != &message);
        if queue.len() != before {
            trace!(%ty, "coalesced duplicate message");
        }

        queue.push_back(message);
        while queue.len() > capacity {
            queue.pop_front();
            trace!(%ty, capacity, "evicted oldest queued message");
        }
    }

    /// Remove and return the oldest queued message of `ty`.
    pub fn pop(&mut self, ty: MessageType) -> Option<Message> {
        self.queues.get_mut(&ty).and_then(VecDeque::pop_front)
    }

    /// Oldest queued message of `ty`, left in place.
    pub fn peek(&self, ty: MessageType) -> Option<&Message> {
        self.queues.get(&ty).and_then(VecDeque::front)
    }

    /// Number of queued messages of `ty`.
    pub fn len(&self, ty: MessageType) -> usize {
        self.queues.get(&ty).map_or(0, VecDeque::len)
    }

    /// Number of queued messages across all types.
    pub fn total_len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Drop every queued message of `ty`, returning how many were dropped.
    pub fn discard(&mut self, ty: MessageType) -> usize {
        self.queues.get_mut(&ty).map_or(0, |queue| {
            let dropped = queue.len();
            queue.clear();
            dropped
        })
    }

    pub fn clear(&mut self) {
        self.queues.clear();
    }
}
