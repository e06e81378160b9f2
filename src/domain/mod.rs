//! Domain types for the season scoring core.
//!
//! This module provides:
//! - Typed identifiers for users, competitions, seasons, rounds and fixtures
//! - Competition kind and round status enums with canonical string forms
//! - Value types for standings entries and persisted winner records

pub mod competition;
pub mod ids;
pub mod round;
pub mod standings;
pub mod winner;

pub use competition::{CompetitionContext, CompetitionKind};
pub use ids::{CompetitionId, FixtureId, RoundId, SeasonId, UserId};
pub use round::RoundStatus;
pub use standings::{StandingsEntry, UserPointTotal};
pub use winner::WinnerRecord;
