//! Authoritative draw sequence for one session.
//!
//! The caller owns the pool of not-yet-drawn numbers. Each draw removes one
//! uniformly at random, so within a caller instance a number can never come
//! out twice and the sequence is bounded at 90.

use rand::Rng;

use crate::{
    error::GameError,
    ticket::{MAX_NUMBER, MIN_NUMBER},
};

/// The undrawn-number pool for a single session.
#[derive(Debug, Clone)]
pub struct NumberCaller {
    remaining: Vec<u8>,
}

impl NumberCaller {
    /// Fresh pool holding every number from 1 to 90.
    pub fn new() -> Self {
        Self { remaining: (MIN_NUMBER..=MAX_NUMBER).collect() }
    }

    /// Remove and return one uniformly random remaining number.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Exhausted`] once all 90 numbers have been drawn.
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Result<u8, GameError> {
        if self.remaining.is_empty() {
            return Err(GameError::Exhausted);
        }
        let idx = rng.gen_range(0..self.remaining.len());
        Ok(self.remaining.swap_remove(idx))
    }

    /// Numbers still in the pool.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Numbers drawn so far.
    pub fn drawn(&self) -> usize {
        (MAX_NUMBER - MIN_NUMBER + 1) as usize - self.remaining.len()
    }
}

impl Default for NumberCaller {
    fn default() -> Self {
        Self::new()
    }
}
