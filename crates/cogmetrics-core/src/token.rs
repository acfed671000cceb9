//! Heavy-tailed token stream.
//!
//! [`ProbabilityTable`] assigns each vocabulary token a mass proportional to
//! `rank^(-α)` and normalizes the masses to sum to one. [`TokenSource`]
//! owns a table and an explicitly seeded [`ChaCha8Rng`], and yields an
//! endless, reproducible sequence of [`TokenId`] draws.
//!
//! The source is an [`Iterator`] that never ends. It cannot be rewound or
//! cloned; building a new source with the same seed replays the same
//! sequence. `ChaCha8Rng` is a named algorithm with a stable stream, so a
//! seed reproduces its run across builds and `rand` upgrades.

use std::sync::Arc;

use cogmetrics_types::TokenId;
use rand::SeedableRng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::{ConfigurationError, validate_source};

/// Probability mass per token, generated once from a power-law exponent.
///
/// Invariants: every mass is strictly positive and the masses sum to 1
/// within floating-point tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityTable {
    masses: Vec<f64>,
    exponent: f64,
}

impl ProbabilityTable {
    /// Build the rank power-law table `mass(r) ∝ r^(-exponent)` for
    /// ranks `1..=vocabulary_size`.
    pub fn power_law(vocabulary_size: u32, exponent: f64) -> Result<Self, ConfigurationError> {
        validate_source(vocabulary_size, exponent)?;

        let weights: Vec<f64> = (1..=vocabulary_size)
            .map(|rank| f64::from(rank).powf(-exponent))
            .collect();
        let total: f64 = weights.iter().sum();
        let masses: Vec<f64> = weights.into_iter().map(|w| w / total).collect();

        // Normalization can push a tail mass below the normal range even
        // when the raw weight passed validation.
        if !masses.iter().all(|m| m.is_normal()) {
            return Err(ConfigurationError::ExponentUnderflow {
                vocabulary_size,
                exponent,
            });
        }

        Ok(Self { masses, exponent })
    }

    /// Number of tokens in the vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.masses.len()
    }

    /// Exponent the table was generated from.
    pub const fn exponent(&self) -> f64 {
        self.exponent
    }

    /// Mass of a single token, or `None` if the token is outside the
    /// vocabulary.
    pub fn mass(&self, token: TokenId) -> Option<f64> {
        self.masses.get(token.index()).copied()
    }

    /// All masses, indexed by token.
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// Mass of the rank-1 token, the largest in the table.
    pub fn peak_mass(&self) -> f64 {
        self.masses.first().copied().unwrap_or(0.0)
    }

    /// Mean mass `1 / V`.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_mass(&self) -> f64 {
        if self.masses.is_empty() {
            0.0
        } else {
            1.0 / self.masses.len() as f64
        }
    }

    /// Copy of the masses for embedding in a record.
    pub fn snapshot(&self) -> Vec<f64> {
        self.masses.clone()
    }
}

/// Seeded, endless producer of power-law token draws.
///
/// Not `Clone`: a copy would fork the generator and replay the stream
/// without re-initialization.
#[derive(Debug)]
pub struct TokenSource {
    table: Arc<ProbabilityTable>,
    sampler: WeightedIndex<f64>,
    rng: ChaCha8Rng,
    seed: u64,
    drawn: u64,
}

impl TokenSource {
    /// Build the probability table and seed the generator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::VocabularyTooSmall`] when
    /// `vocabulary_size < 2`, [`ConfigurationError::NonPositiveExponent`]
    /// when `exponent <= 0`, and [`ConfigurationError::ExponentUnderflow`]
    /// when a tail mass would underflow to zero.
    pub fn new(vocabulary_size: u32, exponent: f64, seed: u64) -> Result<Self, ConfigurationError> {
        let table = ProbabilityTable::power_law(vocabulary_size, exponent)?;
        let sampler = WeightedIndex::new(table.masses())
            .map_err(|_err| ConfigurationError::NonPositiveExponent { value: exponent })?;

        debug!(
            vocabulary_size,
            exponent,
            seed,
            peak_mass = table.peak_mass(),
            "Token source initialized"
        );

        Ok(Self {
            table: Arc::new(table),
            sampler,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            drawn: 0,
        })
    }

    /// Draw the next token.
    pub fn next_token(&mut self) -> TokenId {
        let index = self.sampler.sample(&mut self.rng);
        self.drawn = self.drawn.saturating_add(1);
        // The sampler only yields indices below the vocabulary size, which
        // fits in u32 by construction.
        TokenId(u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// The probability table this source samples from.
    pub fn table(&self) -> &ProbabilityTable {
        &self.table
    }

    /// Shared handle to the probability table.
    pub fn shared_table(&self) -> Arc<ProbabilityTable> {
        Arc::clone(&self.table)
    }

    /// The seed this source was created with.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of tokens drawn so far.
    pub const fn drawn(&self) -> u64 {
        self.drawn
    }
}

impl Iterator for TokenSource {
    type Item = TokenId;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_token())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}
