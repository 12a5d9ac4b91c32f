// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Deterministic stand-in encoder
//!
//! Produces pseudo-random vectors seeded from a hash of the text, so equal
//! texts map to equal vectors and different texts almost never collide.
//! Selected with `EMBEDDING_BACKEND=mock` for development without model
//! weights, and used throughout the test suite.

use crate::embeddings::TextEncoder;
use anyhow::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct MockEmbeddingModel {
    dimension: usize,
}

impl MockEmbeddingModel {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            anyhow::bail!("Embedding dimension must be greater than 0");
        }
        Ok(Self { dimension })
    }

    fn generate(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut current_seed = hasher.finish();

        (0..self.dimension)
            .map(|i| {
                // Linear congruential step mixed with the component index
                current_seed =
                    (current_seed.wrapping_mul(1664525).wrapping_add(1013904223)) ^ (i as u64);
                ((current_seed as f64 / u64::MAX as f64) * 2.0 - 1.0) as f32
            })
            .collect()
    }
}

impl TextEncoder for MockEmbeddingModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.generate(text)).collect())
    }
}
