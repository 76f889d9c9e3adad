use std::collections::VecDeque;

use log::info;

use crate::EntityId;

/// Entity ids reserved from the store ahead of local entity creation
pub struct EntityIdPool {
    available: VecDeque<EntityId>,
    reservation_in_flight: bool,
    low_watermark: usize,
    batch_size: u32,
}

impl EntityIdPool {
    pub fn new(low_watermark: usize, batch_size: u32) -> Self {
        Self {
            available: VecDeque::new(),
            reservation_in_flight: false,
            low_watermark,
            batch_size,
        }
    }

    pub fn take(&mut self) -> Option<EntityId> {
        self.available.pop_front()
    }

    /// Whether a reservation request should be sent now
    pub fn needs_refill(&self) -> bool {
        !self.reservation_in_flight && self.available.len() < self.low_watermark.max(1)
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    pub fn mark_requested(&mut self) {
        self.reservation_in_flight = true;
    }

    pub fn on_reserved(&mut self, first: EntityId, count: u32) {
        self.reservation_in_flight = false;
        info!("reserved {} entity ids starting at {}", count, first);
        let first = first.to_u64();
        for offset in 0..u64::from(count) {
            self.available.push_back(EntityId::new(first + offset));
        }
    }

    pub fn on_reservation_failed(&mut self) {
        self.reservation_in_flight = false;
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}
