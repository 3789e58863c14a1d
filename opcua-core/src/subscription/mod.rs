//! The subscription engine: monitored items, sampling, notification
//! queueing, publish-request matching, and keepalive/lifetime accounting.
//! The most intricate component in the core — see the publish cycle
//! documented on `Subscription::publish_cycle`.

mod filter;
mod notification;

pub use self::filter::{
    ContentFilterElement, ContentFilterOperator, DataChangeFilter, EventFields, FilterOperand, SimpleAttributeOperand,
};
pub use self::notification::{DiscardPolicy, Notification, NotificationMessage, NotificationQueue};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;

use crate::capability::{LogLevel, Logger};
use crate::codec::{DataValue, NodeId};
use crate::status::StatusCode;

/// A standing request from a session for the next `NotificationMessage`.
/// The engine binds these to outgoing messages in arrival order.
pub struct PublishRequest {
    pub request_id: u32,
    pub acknowledgements: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Creating,
    Normal,
    Late,
    KeepAlive,
    Closed,
}

/// One item being sampled on behalf of a subscription.
pub struct MonitoredItem {
    pub id: u32,
    pub target_node: NodeId,
    pub attribute_id: u32,
    pub sampling_interval: Duration,
    pub filter: DataChangeFilter,
    pub last_value: Option<DataValue>,
    pub queue: NotificationQueue,
}

impl MonitoredItem {
    pub fn new(
        id: u32,
        target_node: NodeId,
        attribute_id: u32,
        sampling_interval: Duration,
        queue_size: usize,
        discard_policy: DiscardPolicy,
    ) -> MonitoredItem {
        MonitoredItem {
            id,
            target_node,
            attribute_id,
            sampling_interval,
            filter: DataChangeFilter { deadband: 0.0 },
            last_value: None,
            queue: NotificationQueue::new(queue_size, discard_policy),
        }
    }

    /// Sample `value`; if it passes the filter it is enqueued and becomes
    /// the new `last_value`.
    pub fn sample(&mut self, value: DataValue) {
        if self.filter.passes(self.last_value.as_ref(), &value) {
            self.queue.push(Notification::DataChange { monitored_item_id: self.id, value: value.clone() });
            self.last_value = Some(value);
        }
    }
}

/// One subscription: publishing cadence, the monitored items it owns, and
/// the accounting needed to implement keepalive/lifetime/Republish.
pub struct Subscription {
    pub id: u32,
    pub state: SubscriptionState,
    pub publishing_interval: Duration,
    pub max_keep_alive_count: u32,
    pub lifetime_count: u32,
    pub monitored_items: HashMap<u32, MonitoredItem>,
    pub pending_requests: VecDeque<PublishRequest>,
    pub retransmission_queue: VecDeque<NotificationMessage>,
    pub retransmission_cap: usize,
    sequence_number: u32,
    keep_alive_counter: u32,
    lifetime_counter: u32,
    /// A StatusChange awaiting the next available `PublishRequest`, e.g.
    /// `BadTimeout` queued when the subscription's lifetime expires.
    pending_status: Option<StatusCode>,
    logger: Arc<dyn Logger>,
}

impl Subscription {
    pub fn new(
        id: u32,
        publishing_interval: Duration,
        max_keep_alive_count: u32,
        lifetime_count: u32,
        logger: Arc<dyn Logger>,
    ) -> Subscription {
        Subscription {
            id,
            state: SubscriptionState::Creating,
            publishing_interval,
            max_keep_alive_count,
            lifetime_count,
            monitored_items: HashMap::new(),
            pending_requests: VecDeque::new(),
            retransmission_queue: VecDeque::new(),
            retransmission_cap: 100,
            sequence_number: 0,
            keep_alive_counter: 0,
            lifetime_counter: 0,
            pending_status: None,
            logger,
        }
    }

    pub fn add_monitored_item(&mut self, item: MonitoredItem) {
        self.monitored_items.insert(item.id, item);
        self.state = SubscriptionState::Normal;
    }

    fn next_sequence_number(&mut self) -> u32 {
        self.sequence_number += 1;
        self.sequence_number
    }

    fn push_retransmission(&mut self, message: NotificationMessage) {
        if self.retransmission_queue.len() >= self.retransmission_cap {
            self.retransmission_queue.pop_front();
        }
        self.retransmission_queue.push_back(message);
    }

    /// If a StatusChange is pending and a `PublishRequest` is queued,
    /// deliver it now regardless of subscription state — this is how a
    /// `Closed` subscription still tells the client why, per the next
    /// available `PublishRequest` contract.
    fn take_status_change(&mut self) -> Option<NotificationMessage> {
        if self.pending_status.is_none() || self.pending_requests.is_empty() {
            return None;
        }
        let status = self.pending_status.take().unwrap();
        let request = self.pending_requests.pop_front().unwrap();
        let message = NotificationMessage {
            sequence_number: self.next_sequence_number(),
            notifications: vec![Notification::StatusChange { status }],
        };
        self.push_retransmission(message.clone());
        let _ = request;
        Some(message)
    }

    /// Run one publishing-interval tick. Per subscription, on each tick:
    ///
    /// 1. drain every monitored item's queue into one `NotificationMessage`;
    /// 2. if nothing is pending, advance the keepalive counter and emit an
    ///    empty message once it reaches `max_keep_alive_count`;
    /// 3. if a message is due (data or keepalive) and a `PublishRequest` is
    ///    queued, pop it, assign the next sequence number, move the message
    ///    to the retransmission queue, and return it to be sent;
    /// 4. if no `PublishRequest` is available, mark the subscription
    ///    `Late` instead of silently dropping the cycle.
    ///
    /// Every cycle that fails to publish while data is pending advances
    /// `lifetime_counter`; a successful publish resets it. Returns `None`
    /// when there is nothing to do this tick (no data, no keepalive due).
    pub fn publish_cycle(&mut self) -> Option<NotificationMessage> {
        if let Some(message) = self.take_status_change() {
            return Some(message);
        }
        if self.state == SubscriptionState::Closed {
            return None;
        }

        let notifications: Vec<Notification> =
            self.monitored_items.values_mut().flat_map(|item| item.queue.drain()).collect();

        let has_data = !notifications.is_empty();

        if !has_data {
            self.keep_alive_counter += 1;
            if self.keep_alive_counter < self.max_keep_alive_count {
                return None;
            }
        }

        if self.pending_requests.is_empty() {
            self.state = SubscriptionState::Late;
            self.lifetime_counter += 1;
            self.logger.log(
                LogLevel::Debug,
                "Subscription",
                &format!("subscription {} late, no publish request queued (lifetime {}/{})", self.id, self.lifetime_counter, self.lifetime_count),
            );
            if self.lifetime_counter >= self.lifetime_count {
                self.state = SubscriptionState::Closed;
                self.pending_status = Some(StatusCode::BadTimeout);
                self.logger.log(LogLevel::Warning, "Subscription", &format!("subscription {} closed: lifetime exceeded", self.id));
            }
            return None;
        }

        let request = self.pending_requests.pop_front().unwrap();
        let message = NotificationMessage { sequence_number: self.next_sequence_number(), notifications };
        self.push_retransmission(message.clone());

        self.keep_alive_counter = 0;
        self.lifetime_counter = 0;
        self.state = if message.is_keepalive() { SubscriptionState::KeepAlive } else { SubscriptionState::Normal };
        let _ = request;
        Some(message)
    }

    /// A `PublishRequest` arrived. If the subscription was `Late`, this
    /// immediately drains a cycle instead of waiting for the next timer
    /// tick.
    pub fn enqueue_publish_request(&mut self, request: PublishRequest) -> Option<NotificationMessage> {
        self.pending_requests.push_back(request);
        if let Some(message) = self.take_status_change() {
            Some(message)
        } else if self.state == SubscriptionState::Late {
            self.publish_cycle()
        } else {
            None
        }
    }

    /// Remove acknowledged entries from the retransmission queue so they
    /// become unrequestable via Republish.
    pub fn acknowledge(&mut self, sequence_numbers: &[u32]) {
        self.retransmission_queue.retain(|m| !sequence_numbers.contains(&m.sequence_number));
    }

    /// Republish a message still held in the retransmission queue.
    /// Evicted or never-sent sequence numbers both surface the same
    /// status; the two cases are not distinguished.
    pub fn republish(&self, sequence_number: u32) -> Result<NotificationMessage, StatusCode> {
        self.retransmission_queue
            .iter()
            .find(|m| m.sequence_number == sequence_number)
            .cloned()
            .ok_or(StatusCode::MessageNotAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::NullLogger;

    fn subscription() -> Subscription {
        Subscription::new(1, Duration::from_millis(100), 3, 15, Arc::new(NullLogger))
    }

    #[test]
    fn keepalive_emitted_after_max_keep_alive_count_empty_cycles() {
        let mut sub = subscription();
        sub.add_monitored_item(MonitoredItem::new(
            1,
            NodeId::numeric(0, 1),
            13,
            Duration::from_millis(100),
            10,
            DiscardPolicy::DiscardOldest,
        ));
        sub.enqueue_publish_request(PublishRequest { request_id: 1, acknowledgements: vec![] });

        assert!(sub.publish_cycle().is_none());
        assert!(sub.publish_cycle().is_none());
        let message = sub.publish_cycle().expect("keepalive due on third empty cycle");

        assert!(message.is_keepalive());
        assert_eq!(message.sequence_number, 1);
        assert_eq!(sub.retransmission_queue.len(), 1);
    }

    #[test]
    fn republish_returns_queued_message_then_fails_for_unsent_sequence() {
        let mut sub = subscription();
        sub.add_monitored_item(MonitoredItem::new(
            1,
            NodeId::numeric(0, 1),
            13,
            Duration::from_millis(100),
            10,
            DiscardPolicy::DiscardOldest,
        ));
        sub.enqueue_publish_request(PublishRequest { request_id: 1, acknowledgements: vec![] });
        sub.publish_cycle();
        sub.publish_cycle();
        let message = sub.publish_cycle().unwrap();

        assert_eq!(sub.republish(message.sequence_number).unwrap().sequence_number, message.sequence_number);
        assert_eq!(sub.republish(2), Err(StatusCode::MessageNotAvailable));
    }

    #[test]
    fn no_publish_request_marks_subscription_late() {
        let mut sub = subscription();
        sub.add_monitored_item(MonitoredItem::new(
            1,
            NodeId::numeric(0, 1),
            13,
            Duration::from_millis(100),
            10,
            DiscardPolicy::DiscardOldest,
        ));
        sub.publish_cycle();
        sub.publish_cycle();
        sub.publish_cycle();
        assert_eq!(sub.state, SubscriptionState::Late);
    }

    #[test]
    fn late_subscription_drains_immediately_on_request_arrival() {
        let mut sub = subscription();
        sub.add_monitored_item(MonitoredItem::new(
            1,
            NodeId::numeric(0, 1),
            13,
            Duration::from_millis(100),
            10,
            DiscardPolicy::DiscardOldest,
        ));
        sub.publish_cycle();
        sub.publish_cycle();
        sub.publish_cycle();
        assert_eq!(sub.state, SubscriptionState::Late);

        let message = sub.enqueue_publish_request(PublishRequest { request_id: 9, acknowledgements: vec![] });
        assert!(message.is_some());
    }

    #[test]
    fn sequence_numbers_are_strictly_monotonic() {
        let mut sub = subscription();
        sub.add_monitored_item(MonitoredItem::new(
            1,
            NodeId::numeric(0, 1),
            13,
            Duration::from_millis(100),
            10,
            DiscardPolicy::DiscardOldest,
        ));
        let mut seqs = Vec::new();
        for i in 0..6 {
            sub.enqueue_publish_request(PublishRequest { request_id: i, acknowledgements: vec![] });
            if let Some(m) = sub.publish_cycle() {
                seqs.push(m.sequence_number);
            }
        }
        for pair in seqs.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}
