//! Bounded recency window of dedup keys.
//!
//! Insertion order lives in a fixed-size `HeapRb`, membership in a `HashSet`.
//! When the ring is full the oldest key is evicted from both, so memory is
//! constant and a key older than `capacity` admissions is treated as new.

use std::collections::HashSet;
use std::fmt;

use contracts::DedupKey;
use ringbuf::{traits::*, HeapRb};

pub struct RecencyWindow {
    order: HeapRb<DedupKey>,
    members: HashSet<DedupKey>,
    capacity: usize,
    evicted: u64,
}

impl fmt::Debug for RecencyWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecencyWindow")
            .field("len", &self.members.len())
            .field("capacity", &self.capacity)
            .field("evicted", &self.evicted)
            .finish()
    }
}

impl RecencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: HeapRb::new(capacity),
            members: HashSet::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Record `key`; returns `false` if it is already in the window
    #[inline]
    pub fn insert(&mut self, key: DedupKey) -> bool {
        if self.members.contains(&key) {
            return false;
        }

        if self.order.is_full() {
            if let Some(oldest) = self.order.try_pop() {
                self.members.remove(&oldest);
                self.evicted += 1;
            }
        }

        let _ = self.order.try_push(key);
        self.members.insert(key);
        true
    }

    #[inline]
    pub fn contains(&self, key: &DedupKey) -> bool {
        self.members.contains(key)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys pushed out by newer admissions
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use contracts::{IcaoAddress, TransmissionType};

    fn key(icao: &str, second: u32) -> DedupKey {
        DedupKey {
            icao24: IcaoAddress::parse(icao).unwrap(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, second)
                .unwrap(),
            transmission_type: Some(TransmissionType::AirbornePosition),
        }
    }

    #[test]
    fn test_rejects_repeat() {
        let mut window = RecencyWindow::new(10);
        assert!(window.insert(key("4CA123", 0)));
        assert!(!window.insert(key("4CA123", 0)));
        assert!(window.insert(key("4CA123", 1)));
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_kind_is_part_of_key() {
        let mut window = RecencyWindow::new(10);
        let mut velocity = key("4CA123", 0);
        velocity.transmission_type = Some(TransmissionType::AirborneVelocity);
        assert!(window.insert(key("4CA123", 0)));
        assert!(window.insert(velocity));
    }

    #[test]
    fn test_eviction_keeps_memory_bounded() {
        let mut window = RecencyWindow::new(3);
        for second in 0..10 {
            assert!(window.insert(key("A00001", second)));
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.evicted(), 7);

        // oldest keys fell out of the window and count as new again
        assert!(!window.contains(&key("A00001", 0)));
        assert!(window.contains(&key("A00001", 9)));
        assert!(window.insert(key("A00001", 0)));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut window = RecencyWindow::new(0);
        assert_eq!(window.capacity(), 1);
        assert!(window.insert(key("ABCDEF", 0)));
        assert!(!window.insert(key("ABCDEF", 0)));
    }
}
