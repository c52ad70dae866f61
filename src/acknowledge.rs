//! Immediate acknowledgments
//!
//! A short "working on it" message sent before the (possibly slow)
//! substantive answer. Purely advisory: no acknowledgment is a valid result.

use crate::config::AcknowledgmentConfig;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

pub struct ImmediateResponseDispatcher {
    pools: BTreeMap<String, Vec<String>>,
    combined: String,
}

impl ImmediateResponseDispatcher {
    pub fn new(config: &AcknowledgmentConfig) -> Self {
        Self {
            // A tag with an empty pool is not recognized
            pools: config
                .pools
                .iter()
                .filter(|(_, pool)| !pool.is_empty())
                .map(|(tag, pool)| (tag.clone(), pool.clone()))
                .collect(),
            combined: config.combined.clone(),
        }
    }

    pub fn acknowledge(&self, topics: &BTreeSet<String>) -> Option<String> {
        self.acknowledge_with(topics, &mut rand::thread_rng())
    }

    pub fn acknowledge_with<R: Rng + ?Sized>(
        &self,
        topics: &BTreeSet<String>,
        rng: &mut R,
    ) -> Option<String> {
        let mut recognized = topics.iter().filter_map(|t| self.pools.get(t));
        let first = recognized.next()?;
        if recognized.next().is_some() {
            return Some(self.combined.clone());
        }
        first.choose(rng).cloned()
    }
}
