//! Bounded handoff queue between producer threads and the worker pool.
//!
//! Push never blocks: a full queue refuses the event and the caller counts
//! it as dropped. Pop blocks until an event arrives or shutdown is
//! signalled, and keeps draining whatever is left after shutdown.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::event::Event;

struct Inner {
    items: VecDeque<Event>,
    shutdown: bool,
}

/// MPSC queue with a hard capacity.
pub struct EventQueue {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    capacity: usize,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity.min(1024)),
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Try to enqueue. Returns `false` when the queue is full or shut down.
    pub fn push(&self, event: Event) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.shutdown || inner.items.len() >= self.capacity {
            return false;
        }
        inner.items.push_back(event);
        drop(inner);
        self.not_empty.notify_one();
        true
    }

    /// Block until an event is available. Returns `None` once shutdown has
    /// been signalled and the queue is drained.
    pub fn pop(&self) -> Option<Event> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(event) = inner.items.pop_front() {
                return Some(event);
            }
            if inner.shutdown {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Refuse further pushes and wake all blocked consumers.
    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.shutdown = true;
        }
        self.not_empty.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn push_refuses_beyond_capacity() {
        let queue = EventQueue::new(4);
        let mut accepted = 0;
        for i in 0..10 {
            if queue.push(Event::new(format!("burst.{i}"))) {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 4);
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn fifo_order_from_single_producer() {
        let queue = EventQueue::new(8);
        for i in 0..5 {
            assert!(queue.push(Event::new(format!("seq.{i}"))));
        }
        for i in 0..5 {
            let event = queue.pop().unwrap();
            assert_eq!(event.event_type, format!("seq.{i}"));
        }
    }

    #[test]
    fn pop_drains_after_shutdown() {
        let queue = EventQueue::new(8);
        assert!(queue.push(Event::new("a")));
        assert!(queue.push(Event::new("b")));
        queue.shutdown();

        // Remaining items still come out, then None.
        assert!(queue.pop().is_some());
        assert!(queue.pop().is_some());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn push_refused_after_shutdown() {
        let queue = EventQueue::new(8);
        queue.shutdown();
        assert!(!queue.push(Event::new("late")));
    }

    #[test]
    fn shutdown_wakes_blocked_consumer() {
        let queue = Arc::new(EventQueue::new(8));
        let consumer = {
            let queue = queue.clone();
            std::thread::spawn(move || queue.pop())
        };
        // Give the consumer a moment to block, then release it.
        std::thread::sleep(std::time::Duration::from_millis(50));
        queue.shutdown();
        assert!(consumer.join().unwrap().is_none());
    }
}
