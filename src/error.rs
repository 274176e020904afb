//! Error kinds for level generation.
//!
//! Candidate failures (a blueprint, location, or tile choice failing a
//! predicate) are handled by looping and never surface here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchitectError {
    /// Every eligible blueprint exhausted its fail-safe budget. Benign: the
    /// driver treats it as "no machine this slot".
    #[error("no qualifying blueprint could be built at depth {depth}")]
    BlueprintExhausted { depth: i32 },

    /// A recursive machine build failed after all retries while the parent
    /// was past its point of no return.
    #[error("sub-machine construction failed for blueprint {blueprint}")]
    SubMachineFailure { blueprint: &'static str },

    /// No valid stair location survived the pipeline; the caller should
    /// regenerate the level from scratch.
    #[error("no valid stair location on the finished level")]
    StairPlacementFailed,

    /// A post-pipeline invariant does not hold. Indicates a bug, not bad
    /// runtime input.
    #[error("level invariant violated: {0}")]
    LevelInvariantViolation(String),
}
