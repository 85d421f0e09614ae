use crate::models::Sample;
use std::collections::VecDeque;

pub const WINDOW_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq)]
struct Point {
    tick: String,
    label: String,
    value: f64,
}

/// Bounded FIFO of recent points for one subject. Ticks, labels and
/// values live in the same `Point`, so they can never drift out of alignment.
#[derive(Debug, Clone)]
pub struct Window {
    capacity: usize,
    points: VecDeque<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    Appended,
    /// Appended, and the oldest point was evicted to stay within capacity.
    Evicted,
    Duplicate,
}

impl Window {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn push(&mut self, sample: &Sample) -> Push {
        if self.most_recent_tick() == Some(sample.tick()) {
            return Push::Duplicate;
        }

        self.points.push_back(Point {
            tick: sample.tick().to_string(),
            label: sample.label().to_string(),
            value: sample.value(),
        });

        if self.points.len() > self.capacity {
            self.points.pop_front();
            Push::Evicted
        } else {
            Push::Appended
        }
    }

    pub fn most_recent_tick(&self) -> Option<&str> {
        self.points.back().map(|point| point.tick.as_str())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.points.iter().map(|point| point.label.clone()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.value).collect()
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new(WINDOW_CAPACITY)
    }
}
