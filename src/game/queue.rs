//! Delayed envelopes and the inbound delay queue

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use super::world::PlayerId;

/// A payload that must not be looked at before `ready_at`
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub payload: T,
    pub ready_at: Instant,
}

impl<T> Envelope<T> {
    pub fn is_ready(&self, now: Instant) -> bool {
        self.ready_at <= now
    }
}

/// Raw client payload as it came off the socket
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMsg {
    pub player_id: PlayerId,
    pub raw: String,
}

/// FIFO of envelopes that each become visible a fixed delay after arrival.
/// Ready envelopes leave in arrival order, not deadline order.
#[derive(Debug)]
pub struct DelayQueue<T> {
    delay: Duration,
    pending: VecDeque<Envelope<T>>,
}

pub type InboundQueue = DelayQueue<InboundMsg>;

impl<T> DelayQueue<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: VecDeque::new(),
        }
    }

    /// Stamp the payload with `arrived_at + delay` and append it
    pub fn enqueue(&mut self, payload: T, arrived_at: Instant) {
        self.pending.push_back(Envelope {
            payload,
            ready_at: arrived_at + self.delay,
        });
    }

    /// Remove every envelope whose stamp has passed, keeping the rest queued
    pub fn drain_ready(&mut self, now: Instant) -> Vec<T> {
        if self.is_empty() || !self.pending.iter().any(|e| e.is_ready(now)) {
            return Vec::new();
        }

        let mut ready = Vec::new();
        let mut waiting = VecDeque::with_capacity(self.pending.len());
        for envelope in self.pending.drain(..) {
            if envelope.is_ready(now) {
                ready.push(envelope.payload);
            } else {
                waiting.push_back(envelope);
            }
        }
        self.pending = waiting;
        ready
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn nothing_is_delivered_early() {
        let t0 = Instant::now();
        let mut queue = DelayQueue::new(ms(100));
        queue.enqueue("a", t0);

        assert!(queue.drain_ready(t0).is_empty());
        assert!(queue.drain_ready(t0 + ms(99)).is_empty());
        assert_eq!(queue.drain_ready(t0 + ms(100)), vec!["a"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn unready_envelopes_stay_queued() {
        let t0 = Instant::now();
        let mut queue = DelayQueue::new(ms(50));
        queue.enqueue(1, t0);
        queue.enqueue(2, t0 + ms(30));

        assert_eq!(queue.drain_ready(t0 + ms(60)), vec![1]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_ready(t0 + ms(80)), vec![2]);
    }

    #[test]
    fn ready_envelopes_leave_in_arrival_order() {
        let t0 = Instant::now();
        let mut queue = DelayQueue::new(ms(10));
        // Arrival instants out of order: the later-stamped one was enqueued first
        queue.enqueue("late", t0 + ms(5));
        queue.enqueue("early", t0);
        queue.enqueue("not yet", t0 + ms(100));

        assert_eq!(queue.drain_ready(t0 + ms(20)), vec!["late", "early"]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn zero_delay_is_ready_immediately() {
        let t0 = Instant::now();
        let mut queue = DelayQueue::new(Duration::ZERO);
        queue.enqueue(InboundMsg { player_id: 1, raw: "{}".into() }, t0);
        let drained = queue.drain_ready(t0);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].player_id, 1);
    }
}
