//! Scene configuration
//!
//! Limits that keep a misbehaving scene bounded. Every field has a default,
//! so a RON file only needs to name what it changes.

use crate::actors::DEFAULT_TIE_BREAK_HEADROOM;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Configuration for a [`Scene`](crate::Scene)
///
/// # Example
///
/// ```
/// use tableau_core::SceneConfig;
///
/// let config = SceneConfig::from_ron("(max_fire_depth: 8)").unwrap();
/// assert_eq!(config.max_fire_depth, 8);
/// assert_eq!(config.max_commands_per_flush, SceneConfig::default().max_commands_per_flush);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Tie-break counter level at which draw orders are compacted and the
    /// counter reset
    pub tie_break_headroom: i32,

    /// Maximum nesting of rule firings (a response firing further triggers)
    ///
    /// Firings beyond this depth are dropped with a warning.
    pub max_fire_depth: u32,

    /// Maximum deferred commands applied in one flush
    ///
    /// Commands beyond this are left queued for the next flush.
    pub max_commands_per_flush: usize,

    /// Warn about operations that name unknown actors or behaviors
    pub debug_checks: bool,

    /// Seed of the scene's random source, reapplied on every load
    pub rng_seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            tie_break_headroom: DEFAULT_TIE_BREAK_HEADROOM,
            max_fire_depth: 32,
            max_commands_per_flush: 10_000,
            debug_checks: true,
            rng_seed: 12345,
        }
    }
}

impl SceneConfig {
    /// Parse a configuration from RON
    ///
    /// Limits are normalized to the same minimums the `with_*` setters
    /// enforce.
    pub fn from_ron(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source)?;
        Ok(config.normalized())
    }

    /// Raise every limit to its minimum
    pub fn normalized(self) -> Self {
        let headroom = self.tie_break_headroom;
        let depth = self.max_fire_depth;
        let limit = self.max_commands_per_flush;
        self.with_tie_break_headroom(headroom)
            .with_max_fire_depth(depth)
            .with_max_commands_per_flush(limit)
    }

    pub fn with_tie_break_headroom(mut self, headroom: i32) -> Self {
        self.tie_break_headroom = headroom.max(1);
        self
    }

    /// Set the fire depth limit (at least 1)
    pub fn with_max_fire_depth(mut self, depth: u32) -> Self {
        self.max_fire_depth = depth.max(1);
        self
    }

    /// Set the per-flush command limit (at least 1)
    pub fn with_max_commands_per_flush(mut self, limit: usize) -> Self {
        self.max_commands_per_flush = limit.max(1);
        self
    }

    pub fn with_debug_checks(mut self, enabled: bool) -> Self {
        self.debug_checks = enabled;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }
}
