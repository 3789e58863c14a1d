//! Cancellable timer wheel: a `BinaryHeap` ordered by deadline, paired with
//! a tombstone set so cancellation does not require rebuilding the heap.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use hashbrown::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

struct Entry {
    deadline: Instant,
    id: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.deadline, self.id).cmp(&(other.deadline, other.id))
    }
}

/// Sorted-by-deadline queue of pending callbacks. `cancel` marks a handle's
/// id as tombstoned; tombstones are skipped (and reaped) as they surface at
/// the top of the heap, rather than walked out of the middle.
pub struct TimerWheel {
    heap: BinaryHeap<Reverse<Entry>>,
    callbacks: HashMap<u64, Box<dyn FnOnce()>>,
    tombstones: HashSet<u64>,
    next_id: u64,
}

impl TimerWheel {
    pub fn new() -> TimerWheel {
        TimerWheel {
            heap: BinaryHeap::new(),
            callbacks: HashMap::new(),
            tombstones: HashSet::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, deadline: Instant, callback: Box<dyn FnOnce()>) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse(Entry { deadline, id }));
        self.callbacks.insert(id, callback);
        TimerHandle(id)
    }

    /// O(log n): marks the handle tombstoned. The heap entry is discarded
    /// lazily the next time it would otherwise fire.
    pub fn cancel(&mut self, handle: TimerHandle) {
        if self.callbacks.remove(&handle.0).is_some() {
            self.tombstones.insert(handle.0);
        }
    }

    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.reap_tombstones();
        self.heap.peek().map(|Reverse(e)| e.deadline)
    }

    /// Fire every callback whose deadline has passed as of `now`. A
    /// callback may itself call `cancel` on another pending timer; that is
    /// safe because cancellation only touches the tombstone set and map,
    /// not the heap being drained here.
    pub fn fire_due(&mut self, now: Instant) {
        loop {
            self.reap_tombstones();
            match self.heap.peek() {
                Some(Reverse(entry)) if entry.deadline <= now => {
                    let Reverse(entry) = self.heap.pop().unwrap();
                    if let Some(callback) = self.callbacks.remove(&entry.id) {
                        callback();
                    }
                }
                _ => break,
            }
        }
    }

    fn reap_tombstones(&mut self) {
        while let Some(Reverse(entry)) = self.heap.peek() {
            if self.tombstones.contains(&entry.id) {
                let id = entry.id;
                self.heap.pop();
                self.tombstones.remove(&id);
            } else {
                break;
            }
        }
    }
}

impl Default for TimerWheel {
    fn default() -> TimerWheel {
        TimerWheel::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fires_only_due_timers() {
        let mut wheel = TimerWheel::new();
        let fired = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let now = Instant::now();

        let a = fired.clone();
        wheel.schedule(now, Box::new(move || a.borrow_mut().push(1)));
        let b = fired.clone();
        wheel.schedule(now + Duration::from_secs(10), Box::new(move || b.borrow_mut().push(2)));

        wheel.fire_due(now);
        assert_eq!(*fired.borrow(), vec![1]);
    }

    #[test]
    fn cancelled_timer_does_not_fire() {
        let mut wheel = TimerWheel::new();
        let fired = std::rc::Rc::new(std::cell::RefCell::new(false));
        let now = Instant::now();

        let f = fired.clone();
        let handle = wheel.schedule(now, Box::new(move || *f.borrow_mut() = true));
        wheel.cancel(handle);
        wheel.fire_due(now);
        assert!(!*fired.borrow());
    }

    #[test]
    fn next_deadline_skips_tombstoned_entries() {
        let mut wheel = TimerWheel::new();
        let now = Instant::now();
        let earlier = wheel.schedule(now, Box::new(|| {}));
        wheel.schedule(now + Duration::from_secs(5), Box::new(|| {}));
        wheel.cancel(earlier);
        assert_eq!(wheel.next_deadline(), Some(now + Duration::from_secs(5)));
    }
}
