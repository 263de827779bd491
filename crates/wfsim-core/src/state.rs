use std::collections::{BinaryHeap, HashSet};

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::event::{Event, EventData, EventId};
use crate::log::log_incorrect_event;

/// Epsilon to compare floating point values for equality.
pub const EPSILON: f64 = 1e-12;

/// Clock, random generator and pending events of a single simulation.
///
/// Event identifiers are generated by the state itself, so independent simulations never share a counter.
#[derive(Clone)]
pub struct SimulationState<T: EventData> {
    clock: f64,
    rand: Pcg64,
    events: BinaryHeap<Event<T>>,
    canceled_events: HashSet<EventId>,
    event_count: u64,
    discarded_count: u64,
}

impl<T: EventData> SimulationState<T> {
    pub fn new(seed: u64) -> Self {
        Self {
            clock: 0.0,
            rand: Pcg64::seed_from_u64(seed),
            events: BinaryHeap::new(),
            canceled_events: HashSet::new(),
            event_count: 0,
            discarded_count: 0,
        }
    }

    pub fn time(&self) -> f64 {
        self.clock
    }

    pub fn rand(&mut self) -> f64 {
        self.rand.gen_range(0.0..1.0)
    }

    pub fn gen_range<R, S>(&mut self, range: S) -> R
    where
        R: SampleUniform,
        S: SampleRange<R>,
    {
        self.rand.gen_range(range)
    }

    pub fn sample_from_distribution<R, Dist: Distribution<R>>(&mut self, dist: &Dist) -> R {
        dist.sample(&mut self.rand)
    }

    /// Returns `true` with the given probability.
    pub fn with_prob(&mut self, prob: f64) -> bool {
        self.rand() < prob
    }

    /// Adds an event occurring `delay` time units after the current time.
    pub fn add_event(&mut self, data: T, delay: f64) -> EventId {
        let event_id = self.event_count;
        let event = Event {
            id: event_id,
            time: self.clock + delay.max(0.),
            data,
        };
        if delay >= -EPSILON {
            self.events.push(event);
            self.event_count += 1;
            event_id
        } else {
            log_incorrect_event(&event, &format!("negative delay {}", delay));
            panic!("Event delay is negative! It is not allowed to add events from the past.");
        }
    }

    /// Adds an event occurring at the specified absolute time.
    pub fn add_event_at(&mut self, data: T, time: f64) -> EventId {
        let delay = time - self.clock;
        self.add_event(data, delay)
    }

    /// Pops the next pending event and advances the clock to its time.
    ///
    /// Canceled events are dropped on the way and counted as discarded.
    pub fn next_event(&mut self) -> Option<Event<T>> {
        while let Some(event) = self.events.pop() {
            if self.canceled_events.contains(&event.id) {
                self.discarded_count += 1;
                continue;
            }
            self.clock = event.time;
            return Some(event);
        }
        None
    }

    /// Marks the event as canceled. The mark is permanent.
    pub fn cancel_event(&mut self, id: EventId) {
        self.canceled_events.insert(id);
    }

    pub fn is_canceled(&self, id: EventId) -> bool {
        self.canceled_events.contains(&id)
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Returns the number of canceled events dropped from the queue so far.
    pub fn discarded_count(&self) -> u64 {
        self.discarded_count
    }
}
