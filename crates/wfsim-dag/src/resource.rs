//! Resource model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Represents a computing resource that can execute workflow tasks.
///
/// Described by the number of slots (how many tasks can run at once), the speed by which task weights
/// are divided and the dispatch delay paid once per task start.
#[derive(Clone, Debug)]
pub struct Resource {
    pub id: usize,
    pub slots: usize,
    pub used_slots: usize,
    pub speed: f64,
    pub delay: f64,
    pub is_up: bool,
    available_slots: BTreeSet<usize>,
}

impl Resource {
    pub fn new(slots: usize, speed: f64, delay: f64) -> Self {
        Self {
            id: 0,
            slots,
            used_slots: 0,
            speed,
            delay,
            is_up: true,
            available_slots: (0..slots).collect(),
        }
    }

    pub fn from_config(id: usize, config: &ResourceConfig) -> Self {
        let mut resource = Self::new(config.slots, config.speed, config.delay);
        resource.id = id;
        resource
    }

    /// Takes the smallest available slot.
    pub fn take_slot(&mut self) -> Option<usize> {
        let slot = self.available_slots.pop_first()?;
        self.used_slots += 1;
        Some(slot)
    }

    /// Takes the specified slot if it is available.
    pub fn take_exact_slot(&mut self, slot: usize) -> bool {
        if self.available_slots.remove(&slot) {
            self.used_slots += 1;
            true
        } else {
            false
        }
    }

    pub fn release_slot(&mut self, slot: usize) {
        if slot < self.slots && self.available_slots.insert(slot) {
            self.used_slots -= 1;
        }
    }

    /// Makes all slots available again, used after the resource recovers from downtime.
    pub fn refill(&mut self) {
        self.available_slots = (0..self.slots).collect();
        self.used_slots = 0;
    }

    pub fn is_slot_free(&self, slot: usize) -> bool {
        self.available_slots.contains(&slot)
    }

    pub fn has_free_slot(&self) -> bool {
        self.used_slots < self.slots
    }

    pub fn free_slots(&self) -> usize {
        self.slots - self.used_slots
    }
}

/// Resource description as it appears in simulation config.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub slots: usize,
    pub speed: f64,
    pub delay: f64,
}

impl ResourceConfig {
    pub fn from_resource(resource: &Resource) -> Self {
        Self {
            slots: resource.slots,
            speed: resource.speed,
            delay: resource.delay,
        }
    }
}
