pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    CompetitionContext, CompetitionId, CompetitionKind, FixtureId, RoundId, RoundStatus, SeasonId,
    StandingsEntry, UserId, UserPointTotal, WinnerRecord,
};
pub use error::AppError;
pub use orchestration::{BackfillService, WinnerDetermination};
