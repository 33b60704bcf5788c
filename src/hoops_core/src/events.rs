//! Play-by-play events emitted by the possession engine.
//!
//! Player references are indices into the team's roster
//! (`TeamProfile::players`).

use serde::Serialize;

use crate::state::TeamSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShotKind {
    Two,
    Three,
}

impl ShotKind {
    pub fn points(self) -> u32 {
        match self {
            ShotKind::Two => 2,
            ShotKind::Three => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FoulKind {
    /// Foul on a shot attempt; `made` means the basket counted
    Shooting { shot: ShotKind, made: bool },
    NonShooting,
    /// End-of-game foul by a trailing defense
    Intentional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TurnoverKind {
    BadPass,
    LostBall,
    Traveling,
    /// Forced by a defender, see `stolen_by`
    Steal,
    ShotClockViolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubReason {
    FouledOut,
    FoulTrouble,
    Rotation,
    ClosingLineup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PossessionEvent {
    ShotAttempt {
        team: TeamSide,
        shooter: usize,
        kind: ShotKind,
        made: bool,
        /// Shooting foul on the attempt; a fouled miss is not a field-goal attempt
        fouled: bool,
        blocked_by: Option<usize>,
        assist: Option<usize>,
    },
    Rebound {
        team: TeamSide,
        player: usize,
        offensive: bool,
    },
    Turnover {
        team: TeamSide,
        /// `None` for team turnovers such as shot-clock violations
        player: Option<usize>,
        kind: TurnoverKind,
        stolen_by: Option<usize>,
    },
    Foul {
        /// Fouling team
        team: TeamSide,
        fouler: usize,
        victim: usize,
        kind: FoulKind,
        personal_fouls: u8,
        team_fouls: u8,
        fouled_out: bool,
        free_throws: u8,
    },
    FreeThrow {
        team: TeamSide,
        shooter: usize,
        made: bool,
        /// 1-based attempt number within the trip
        attempt: u8,
        of: u8,
    },
    Substitution {
        team: TeamSide,
        player_out: usize,
        player_in: usize,
        reason: SubReason,
    },
}

impl PossessionEvent {
    /// Points this event puts on the board, and for whom.
    pub fn points(&self) -> Option<(TeamSide, u32)> {
        match *self {
            PossessionEvent::ShotAttempt { team, kind, made: true, .. } => Some((team, kind.points())),
            PossessionEvent::FreeThrow { team, made: true, .. } => Some((team, 1)),
            _ => None,
        }
    }

    pub fn team(&self) -> TeamSide {
        match *self {
            PossessionEvent::ShotAttempt { team, .. }
            | PossessionEvent::Rebound { team, .. }
            | PossessionEvent::Turnover { team, .. }
            | PossessionEvent::Foul { team, .. }
            | PossessionEvent::FreeThrow { team, .. }
            | PossessionEvent::Substitution { team, .. } => team,
        }
    }
}
