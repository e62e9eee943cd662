//! Rolling history of recent feature vectors
//!
//! Keeps the last N frames in chronological order for temporal smoothing.

use std::collections::VecDeque;

use crate::FeatureVector;

/// Default number of frames retained
pub const HISTORY_CAPACITY: usize = 30;

/// Fixed-capacity frame buffer; the oldest frame is dropped when full
#[derive(Debug, Clone)]
pub struct RollingHistory {
    frames: VecDeque<FeatureVector>,
    capacity: usize,
}

impl RollingHistory {
    /// Capacity is clamped to at least one frame
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest when full
    pub fn push(&mut self, features: FeatureVector) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(features);
    }

    /// Maximum frames retained
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames currently held
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frame is held
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether the buffer holds `capacity` frames
    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    /// Most recent frame
    pub fn latest(&self) -> Option<&FeatureVector> {
        self.frames.back()
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &FeatureVector> {
        self.frames.iter()
    }

    /// Owned copy, oldest to newest
    pub fn to_vec(&self) -> Vec<FeatureVector> {
        self.frames.iter().cloned().collect()
    }

    /// Drop every frame
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(v: f32) -> FeatureVector {
        FeatureVector::from_values(vec![v])
    }

    #[test]
    fn test_overwrites_oldest() {
        let mut history = RollingHistory::default();
        for i in 0..35 {
            history.push(frame(i as f32));
        }

        assert!(history.is_full());
        assert_eq!(history.len(), HISTORY_CAPACITY);
        let first = history.iter().next().unwrap();
        assert_eq!(first.values(), &[5.0]);
        assert_eq!(history.latest().unwrap().values(), &[34.0]);
    }

    #[test]
    fn test_clear() {
        let mut history = RollingHistory::new(3);
        history.push(frame(1.0));
        history.push(frame(2.0));
        assert!(!history.is_full());

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 3);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut history = RollingHistory::new(0);
        history.push(frame(1.0));
        history.push(frame(2.0));
        assert_eq!(history.to_vec(), vec![frame(2.0)]);
    }
}
