//! Orchestration services composing repository reads, pure engine
//! computation and atomic batch writes.

pub mod backfill;
pub mod determination;

pub use backfill::{BackfillCheck, BackfillError, BackfillOutcome, BackfillService, RoundBackfillPlan};
pub use determination::{
    DeterminationError, DeterminationOutcome, SeasonSweep, SeasonSweepError, WinnerDetermination,
};
