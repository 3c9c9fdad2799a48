use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

pub const DEFAULT_RETENTION: usize = 7;

/// How many iterations of a series are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetentionConfig {
    pub keep: NonZeroUsize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            keep: NonZeroUsize::new(DEFAULT_RETENTION).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl From<NonZeroUsize> for RetentionConfig {
    fn from(keep: NonZeroUsize) -> Self {
        Self { keep }
    }
}

impl RetentionConfig {
    /// Oldest iterations beyond the retention count, in ascending order.
    ///
    /// `iterations` must be sorted ascending, as returned by a driver.
    pub fn get_delete<'a>(&self, iterations: &'a [u64]) -> &'a [u64] {
        let excess = iterations.len().saturating_sub(self.keep.get());
        &iterations[..excess]
    }
}
