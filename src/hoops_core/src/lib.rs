//! Hoops Core - possession-by-possession basketball simulation for
//! historical teams.
//!
//! The engine turns season rating profiles into play-by-play events, live
//! game state and box scores, and runs round-robin seasons on top of that.
//! Python bindings for the UI and data loader are available behind the
//! `python` feature.

pub mod boxscore;
pub mod config;
pub mod constants;
pub mod era;
pub mod error;
pub mod events;
pub mod fouls;
pub mod game;
pub mod possession;
pub mod profile;
pub mod rotation;
pub mod sampling;
pub mod season;
pub mod state;

#[cfg(feature = "python")]
mod python;

pub use boxscore::{BoxScore, BoxScoreLine, TeamTotals};
pub use config::{FoulConfig, PossessionConfig, RotationConfig, RuleConfig, SimConfig};
pub use era::{Era, EraTable, MatchupAdjustment};
pub use error::{Result, SimError};
pub use events::{FoulKind, PossessionEvent, ShotKind, SubReason, TurnoverKind};
pub use fouls::FoulClock;
pub use game::{Game, GameResult};
pub use possession::{
    Decision, DecisionContext, PossessionController, PossessionEngine, PossessionOutcome, PossessionPhase,
    ScriptedController,
};
pub use profile::{PlayerProfile, PlayerRecord, Position, TeamProfile, TeamRecord, Tier};
pub use rotation::RotationManager;
pub use season::{round_robin_schedule, Fixture, PlayerSeasonLine, Season, SeasonReport, StandingsEntry, StatCategory};
pub use state::{GameState, Lineup, TeamSide};
