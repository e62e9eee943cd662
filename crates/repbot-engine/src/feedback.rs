//! Coaching tip selection
//!
//! The default selector is deterministic so that a given exercise and rep
//! count always produce the same message. Variety is opt-in through a seeded
//! generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Picks one tip out of an exercise's tip list
pub trait FeedbackSelector: Send + Sync {
    fn select<'a>(&mut self, exercise: &str, rep_count: u32, tips: &'a [String]) -> Option<&'a str>;
}

/// Cycles through tips keyed by rep count
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicFeedback;

impl FeedbackSelector for DeterministicFeedback {
    fn select<'a>(&mut self, _exercise: &str, rep_count: u32, tips: &'a [String]) -> Option<&'a str> {
        if tips.is_empty() {
            return None;
        }
        Some(tips[rep_count as usize % tips.len()].as_str())
    }
}

/// Random tip from a seeded generator; same seed, same sequence
#[derive(Debug, Clone)]
pub struct SeededFeedback {
    rng: StdRng,
}

impl SeededFeedback {
    /// Selector seeded for a reproducible tip sequence
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl FeedbackSelector for SeededFeedback {
    fn select<'a>(&mut self, _exercise: &str, _rep_count: u32, tips: &'a [String]) -> Option<&'a str> {
        if tips.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..tips.len());
        Some(tips[idx].as_str())
    }
}
