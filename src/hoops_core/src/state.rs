//! Authoritative game state: clock, score, possession, lineups and fouls.

use serde::Serialize;

use crate::config::RuleConfig;
use crate::constants::ON_COURT;
use crate::fouls::FoulClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    pub const BOTH: [TeamSide; 2] = [TeamSide::Home, TeamSide::Away];

    pub fn index(self) -> usize {
        match self {
            TeamSide::Home => 0,
            TeamSide::Away => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            TeamSide::Home => TeamSide::Away,
            TeamSide::Away => TeamSide::Home,
        }
    }
}

pub type Lineup = [usize; ON_COURT];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameState {
    /// 1-based period; values above the regulation count are overtimes
    pub period: u8,
    /// Seconds left in the period
    pub clock: f64,
    pub shot_clock: f64,
    pub scores: [u32; 2],
    pub possession: TeamSide,
    pub lineups: [Lineup; 2],
    pub fouls: FoulClock,
    /// Possessions started so far this game
    pub possession_index: u32,
    /// Cumulative score at the end of each completed period
    pub period_scores: Vec<[u32; 2]>,
}

impl GameState {
    pub fn new(starters: [Lineup; 2], roster_sizes: [usize; 2], rules: &RuleConfig) -> Self {
        GameState {
            period: 1,
            clock: rules.quarter_seconds,
            shot_clock: rules.shot_clock,
            scores: [0, 0],
            possession: TeamSide::Home,
            lineups: starters,
            fouls: FoulClock::new(roster_sizes, rules),
            possession_index: 0,
            period_scores: Vec::new(),
        }
    }

    pub fn score(&self, side: TeamSide) -> u32 {
        self.scores[side.index()]
    }

    pub fn lineup(&self, side: TeamSide) -> &Lineup {
        &self.lineups[side.index()]
    }

    pub fn is_on_court(&self, side: TeamSide, player: usize) -> bool {
        self.lineup(side).contains(&player)
    }

    /// Points `side` trails by (negative when leading).
    pub fn deficit(&self, side: TeamSide) -> i64 {
        self.score(side.other()) as i64 - self.score(side) as i64
    }

    pub fn margin(&self) -> u32 {
        self.scores[0].abs_diff(self.scores[1])
    }

    pub fn is_overtime(&self, rules: &RuleConfig) -> bool {
        self.period > rules.quarters
    }

    /// Swap `out` for `incoming` in `side`'s five.
    pub fn substitute(&mut self, side: TeamSide, out: usize, incoming: usize) {
        if let Some(slot) = self.lineups[side.index()].iter_mut().find(|p| **p == out) {
            *slot = incoming;
        }
    }

    /// Start `period` with a full clock and reset team fouls.
    pub fn start_period(&mut self, period: u8, rules: &RuleConfig) {
        self.period = period;
        self.clock = if period > rules.quarters {
            rules.overtime_seconds
        } else {
            rules.quarter_seconds
        };
        self.shot_clock = rules.shot_clock;
        self.fouls.start_period();
    }

    /// Regulation or overtime is over and the score is not tied.
    pub fn is_final(&self, rules: &RuleConfig) -> bool {
        self.period >= rules.quarters
            && self.clock <= 0.0
            && self.scores[0] != self.scores[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        GameState::new([[0, 1, 2, 3, 4], [0, 1, 2, 3, 4]], [10, 10], &RuleConfig::default())
    }

    #[test]
    fn test_substitute_replaces_in_place() {
        let mut s = state();
        s.substitute(TeamSide::Away, 2, 7);
        assert_eq!(s.lineup(TeamSide::Away), &[0, 1, 7, 3, 4]);
        assert_eq!(s.lineup(TeamSide::Home), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_overtime_period_length() {
        let rules = RuleConfig::default();
        let mut s = state();
        s.start_period(5, &rules);
        assert_eq!(s.clock, 300.0);
        assert!(s.is_overtime(&rules));
    }

    #[test]
    fn test_final_requires_untied_score() {
        let rules = RuleConfig::default();
        let mut s = state();
        s.start_period(4, &rules);
        s.clock = 0.0;
        s.scores = [99, 99];
        assert!(!s.is_final(&rules));
        s.scores = [100, 99];
        assert!(s.is_final(&rules));
        assert_eq!(s.deficit(TeamSide::Away), 1);
    }
}
