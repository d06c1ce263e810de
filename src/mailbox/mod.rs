//! Per-agent asynchronous inbox for cross-agent messages.
//!
//! The mailbox is the only structure in the core designed for concurrent
//! multi-writer access: any number of agents may send to the same
//! recipient at once. Delivery is FIFO per (sender, recipient) pair; there
//! is no ordering guarantee across different senders. Messages live only as
//! long as the owning session — teardown closes the mailbox and drops
//! whatever is still queued.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use uuid::Uuid;

/// One queued cross-agent message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailboxMessage {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub body: String,
    /// Optional correlation id threading a conversation across messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl MailboxMessage {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        body: impl Into<String>,
        thread_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from: from.into(),
            to: to.into(),
            body: body.into(),
            thread_id,
            sent_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<MailboxMessage>,
    closed: bool,
}

/// FIFO inbox with non-blocking send and blocking-with-timeout receive.
#[derive(Debug, Default)]
pub struct Mailbox {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a message. Non-blocking; returns `false` if the mailbox has
    /// been closed (the message is dropped).
    pub fn send(&self, message: MailboxMessage) -> bool {
        let mut inner = self.inner.lock().expect("mailbox lock poisoned");
        if inner.closed {
            return false;
        }
        inner.queue.push_back(message);
        drop(inner);
        self.notify.notify_one();
        true
    }

    /// Dequeue the next message without waiting.
    pub fn try_receive(&self) -> Option<MailboxMessage> {
        self.inner
            .lock()
            .expect("mailbox lock poisoned")
            .queue
            .pop_front()
    }

    /// Dequeue the next message, waiting up to `timeout` for one to arrive.
    ///
    /// `None` means the mailbox was empty for the full wait, or is closed.
    /// With no timeout the call waits until a message arrives or the
    /// mailbox closes.
    pub async fn receive(&self, timeout: Option<Duration>) -> Option<MailboxMessage> {
        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);

        loop {
            // Arm the waiter before checking the queue so a send racing
            // with the check cannot be missed.
            let notified = self.notify.notified();

            {
                let mut inner = self.inner.lock().expect("mailbox lock poisoned");
                if let Some(message) = inner.queue.pop_front() {
                    return Some(message);
                }
                if inner.closed {
                    return None;
                }
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        // Final check: a send may have landed as the timer fired.
                        return self.try_receive();
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Non-destructive check of queue depth.
    pub fn peek(&self) -> usize {
        self.inner.lock().expect("mailbox lock poisoned").queue.len()
    }

    /// Close the mailbox: wake all blocked receivers and drop queued
    /// messages. Called on session teardown.
    pub fn close(&self) {
        let mut inner = self.inner.lock().expect("mailbox lock poisoned");
        inner.closed = true;
        inner.queue.clear();
        drop(inner);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().expect("mailbox lock poisoned").closed
    }
}
