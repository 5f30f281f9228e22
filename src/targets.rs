use crate::models::{City, SearchTarget};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Hands out search targets, each at most once.
///
/// A target leaves the pool the moment it is returned, whatever happens to
/// the search afterwards. `None` means the pool is exhausted.
pub trait TargetEnumerator {
    fn next_target(&mut self) -> Option<SearchTarget>;

    fn remaining(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Enumeration {
    /// Every city in reference order; resumable.
    Ordered,
    /// Cities sampled without replacement.
    Random,
}

pub struct OrderedTargets {
    pool: VecDeque<SearchTarget>,
}

impl OrderedTargets {
    pub fn new(category: &str, cities: &[City]) -> Self {
        Self {
            pool: cities.iter().map(|city| SearchTarget::new(category, city)).collect(),
        }
    }
}

impl TargetEnumerator for OrderedTargets {
    fn next_target(&mut self) -> Option<SearchTarget> {
        self.pool.pop_front()
    }

    fn remaining(&self) -> usize {
        self.pool.len()
    }
}

pub struct RandomTargets {
    pool: Vec<SearchTarget>,
    rng: StdRng,
}

impl RandomTargets {
    pub fn new(category: &str, cities: &[City], seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            pool: cities.iter().map(|city| SearchTarget::new(category, city)).collect(),
            rng,
        }
    }
}

impl TargetEnumerator for RandomTargets {
    fn next_target(&mut self) -> Option<SearchTarget> {
        if self.pool.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.pool.len());
        Some(self.pool.swap_remove(index))
    }

    fn remaining(&self) -> usize {
        self.pool.len()
    }
}

pub fn enumerator_for(
    strategy: Enumeration,
    category: &str,
    cities: &[City],
    seed: Option<u64>,
) -> Box<dyn TargetEnumerator> {
    match strategy {
        Enumeration::Ordered => Box::new(OrderedTargets::new(category, cities)),
        Enumeration::Random => Box::new(RandomTargets::new(category, cities, seed)),
    }
}
