//! Box-score aggregation.
//!
//! `BoxScore` is a fold over the event stream: every event is applied exactly
//! once and counts only ever grow.

use serde::Serialize;

use crate::events::{PossessionEvent, ShotKind};
use crate::state::{Lineup, TeamSide};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoxScoreLine {
    pub points: u32,
    pub rebounds: u32,
    pub offensive_rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
    pub turnovers: u32,
    pub fouls: u32,
    pub fgm: u32,
    pub fga: u32,
    pub tpm: u32,
    pub tpa: u32,
    pub ftm: u32,
    pub fta: u32,
    pub seconds: f64,
}

fn pct(made: u32, attempts: u32) -> f64 {
    if attempts == 0 {
        0.0
    } else {
        made as f64 / attempts as f64
    }
}

impl BoxScoreLine {
    pub fn minutes(&self) -> f64 {
        self.seconds / 60.0
    }

    pub fn fg_pct(&self) -> f64 {
        pct(self.fgm, self.fga)
    }

    pub fn three_pct(&self) -> f64 {
        pct(self.tpm, self.tpa)
    }

    pub fn ft_pct(&self) -> f64 {
        pct(self.ftm, self.fta)
    }

    pub fn two_pt_makes(&self) -> u32 {
        self.fgm - self.tpm
    }

    pub fn played(&self) -> bool {
        self.seconds > 0.0
    }

    pub fn add(&mut self, other: &BoxScoreLine) {
        self.points += other.points;
        self.rebounds += other.rebounds;
        self.offensive_rebounds += other.offensive_rebounds;
        self.assists += other.assists;
        self.steals += other.steals;
        self.blocks += other.blocks;
        self.turnovers += other.turnovers;
        self.fouls += other.fouls;
        self.fgm += other.fgm;
        self.fga += other.fga;
        self.tpm += other.tpm;
        self.tpa += other.tpa;
        self.ftm += other.ftm;
        self.fta += other.fta;
        self.seconds += other.seconds;
    }
}

/// Sum of a team's lines plus turnovers not charged to a player.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamTotals {
    pub totals: BoxScoreLine,
    pub team_turnovers: u32,
    pub fg_pct: f64,
    pub three_pct: f64,
    pub ft_pct: f64,
}

impl TeamTotals {
    pub fn points(&self) -> u32 {
        self.totals.points
    }

    pub fn turnovers(&self) -> u32 {
        self.totals.turnovers + self.team_turnovers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxScore {
    lines: [Vec<BoxScoreLine>; 2],
    team_turnovers: [u32; 2],
}

impl BoxScore {
    pub fn new(roster_sizes: [usize; 2]) -> Self {
        BoxScore {
            lines: [
                vec![BoxScoreLine::default(); roster_sizes[0]],
                vec![BoxScoreLine::default(); roster_sizes[1]],
            ],
            team_turnovers: [0, 0],
        }
    }

    pub fn lines(&self, side: TeamSide) -> &[BoxScoreLine] {
        &self.lines[side.index()]
    }

    pub fn line(&self, side: TeamSide, player: usize) -> &BoxScoreLine {
        &self.lines[side.index()][player]
    }

    fn line_mut(&mut self, side: TeamSide, player: usize) -> &mut BoxScoreLine {
        &mut self.lines[side.index()][player]
    }

    /// Credit court time to both fives.
    pub fn credit_time(&mut self, lineups: &[Lineup; 2], seconds: f64) {
        for side in TeamSide::BOTH {
            for &p in &lineups[side.index()] {
                self.line_mut(side, p).seconds += seconds;
            }
        }
    }

    pub fn apply(&mut self, event: &PossessionEvent) {
        match *event {
            PossessionEvent::ShotAttempt {
                team,
                shooter,
                kind,
                made,
                fouled,
                blocked_by,
                assist,
            } => {
                let line = self.line_mut(team, shooter);
                // A fouled miss goes to the line instead of the FGA column
                if made || !fouled {
                    line.fga += 1;
                    if kind == ShotKind::Three {
                        line.tpa += 1;
                    }
                }
                if made {
                    line.fgm += 1;
                    line.points += kind.points();
                    if kind == ShotKind::Three {
                        line.tpm += 1;
                    }
                    if let Some(passer) = assist {
                        self.line_mut(team, passer).assists += 1;
                    }
                }
                if let Some(blocker) = blocked_by {
                    self.line_mut(team.other(), blocker).blocks += 1;
                }
            }
            PossessionEvent::Rebound { team, player, offensive } => {
                let line = self.line_mut(team, player);
                line.rebounds += 1;
                if offensive {
                    line.offensive_rebounds += 1;
                }
            }
            PossessionEvent::Turnover {
                team,
                player,
                stolen_by,
                ..
            } => {
                match player {
                    Some(p) => self.line_mut(team, p).turnovers += 1,
                    None => self.team_turnovers[team.index()] += 1,
                }
                if let Some(thief) = stolen_by {
                    self.line_mut(team.other(), thief).steals += 1;
                }
            }
            PossessionEvent::Foul { team, fouler, .. } => {
                self.line_mut(team, fouler).fouls += 1;
            }
            PossessionEvent::FreeThrow {
                team, shooter, made, ..
            } => {
                let line = self.line_mut(team, shooter);
                line.fta += 1;
                if made {
                    line.ftm += 1;
                    line.points += 1;
                }
            }
            PossessionEvent::Substitution { .. } => {}
        }
    }

    pub fn totals(&self, side: TeamSide) -> TeamTotals {
        let mut totals = BoxScoreLine::default();
        for line in self.lines(side) {
            totals.add(line);
        }
        TeamTotals {
            fg_pct: totals.fg_pct(),
            three_pct: totals.three_pct(),
            ft_pct: totals.ft_pct(),
            team_turnovers: self.team_turnovers[side.index()],
            totals,
        }
    }
}
