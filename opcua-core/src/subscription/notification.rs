use crate::codec::DataValue;
use crate::status::StatusCode;

/// One queued sample or event awaiting inclusion in a `NotificationMessage`.
#[derive(Debug, Clone)]
pub enum Notification {
    DataChange { monitored_item_id: u32, value: DataValue },
    Event { monitored_item_id: u32, fields: Vec<DataValue> },
    /// Reports an engine-level condition (e.g. lifetime expiry) rather than
    /// a sampled value; delivered on the next available `PublishRequest`.
    StatusChange { status: StatusCode },
}

/// How a monitored item's queue behaves once full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardPolicy {
    DiscardOldest,
    DiscardNewest,
}

/// Bounded FIFO of pending notifications for one monitored item.
pub struct NotificationQueue {
    pub capacity: usize,
    pub policy: DiscardPolicy,
    items: std::collections::VecDeque<Notification>,
}

impl NotificationQueue {
    pub fn new(capacity: usize, policy: DiscardPolicy) -> NotificationQueue {
        NotificationQueue { capacity: capacity.max(1), policy, items: std::collections::VecDeque::new() }
    }

    pub fn push(&mut self, item: Notification) {
        if self.items.len() >= self.capacity {
            match self.policy {
                DiscardPolicy::DiscardOldest => {
                    self.items.pop_front();
                    self.items.push_back(item);
                }
                DiscardPolicy::DiscardNewest => {
                    // The incoming sample is dropped; the queue is untouched.
                }
            }
        } else {
            self.items.push_back(item);
        }
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        self.items.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// A published batch of notifications, assigned a strictly monotonic
/// `sequence_number` within its subscription.
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub sequence_number: u32,
    pub notifications: Vec<Notification>,
}

impl NotificationMessage {
    pub fn is_keepalive(&self) -> bool {
        self.notifications.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: u32) -> Notification {
        Notification::DataChange { monitored_item_id: id, value: DataValue::default() }
    }

    #[test]
    fn discard_oldest_keeps_suffix_of_samples() {
        let mut queue = NotificationQueue::new(3, DiscardPolicy::DiscardOldest);
        for i in 0..5 {
            queue.push(sample(i));
        }
        let drained = queue.drain();
        let ids: Vec<u32> = drained
            .iter()
            .map(|n| match n {
                Notification::DataChange { monitored_item_id, .. } => *monitored_item_id,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn discard_newest_drops_incoming_when_full() {
        let mut queue = NotificationQueue::new(2, DiscardPolicy::DiscardNewest);
        queue.push(sample(0));
        queue.push(sample(1));
        queue.push(sample(2));
        assert_eq!(queue.len(), 2);
    }
}
