//! Team and player rating profiles.
//!
//! Profiles are built once per game from loader records and never mutated
//! during a game. Matchup adjustments produce adjusted copies through
//! [`TeamProfile::adjusted`].

use serde::{Deserialize, Serialize};

use crate::constants::{GAME_MINUTES, ON_COURT};
use crate::era::Era;
use crate::error::{Result, SimError};

/// Team row as produced by the data loader.
#[cfg_attr(feature = "python", pyo3::pyclass(get_all, set_all))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team_id: String,
    pub team_name: String,
    pub year: u16,
    pub display_name: String,
    pub pace_rating: f64,
    pub three_pt_rate: f64,
    pub def_rating: f64,
}

/// Player row as produced by the data loader. Percentages are 0-100.
#[cfg_attr(feature = "python", pyo3::pyclass(get_all, set_all))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub team_id: String,
    pub player_name: String,
    pub fg_pct: f64,
    pub ft_pct: f64,
    pub rpg: f64,
    pub apg: f64,
    pub position: String,
    pub two_pt_pct: f64,
    pub three_pt_pct: f64,
    pub minutes_pg: f64,
    pub ppg: f64,
    pub fta_pg: f64,
    pub usage_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    PG,
    SG,
    SF,
    PF,
    C,
}

impl Position {
    /// Parse a roster position. Combo listings such as "SG-SF" use the first.
    pub fn parse(raw: &str) -> Option<Self> {
        let first = raw.trim().split(['-', '/']).next()?.trim().to_ascii_uppercase();
        match first.as_str() {
            "PG" => Some(Position::PG),
            "SG" | "G" => Some(Position::SG),
            "SF" | "F" => Some(Position::SF),
            "PF" => Some(Position::PF),
            "C" => Some(Position::C),
            _ => None,
        }
    }

    /// Positions that can replace this one, in order of preference.
    pub fn compatible(self) -> &'static [Position] {
        match self {
            Position::PG => &[Position::PG, Position::SG],
            Position::SG => &[Position::SG, Position::PG, Position::SF],
            Position::SF => &[Position::SF, Position::SG, Position::PF],
            Position::PF => &[Position::PF, Position::SF, Position::C],
            Position::C => &[Position::C, Position::PF],
        }
    }

    fn steal_factor(self) -> f64 {
        match self {
            Position::PG => 1.5,
            Position::SG => 1.3,
            Position::SF => 1.1,
            Position::PF => 0.8,
            Position::C => 0.7,
        }
    }

    fn block_factor(self) -> f64 {
        match self {
            Position::PG => 0.4,
            Position::SG => 0.6,
            Position::SF => 1.0,
            Position::PF => 1.5,
            Position::C => 2.0,
        }
    }
}

/// Rotation class derived from minutes per game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    Superstar,
    Starter,
    Role,
    Bench,
}

impl Tier {
    pub fn from_minutes(minutes_pg: f64) -> Self {
        if minutes_pg >= 35.0 {
            Tier::Superstar
        } else if minutes_pg >= 20.0 {
            Tier::Starter
        } else if minutes_pg >= 12.0 {
            Tier::Role
        } else {
            Tier::Bench
        }
    }

    /// Largest per-quarter deviation from the minutes target (minutes).
    pub fn minutes_band(self) -> f64 {
        match self {
            Tier::Superstar => 1.5,
            Tier::Starter => 2.5,
            Tier::Role => 4.0,
            Tier::Bench => 5.0,
        }
    }
}

/// Make probabilities (0-1) used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShootingSplits {
    pub two: f64,
    pub three: f64,
    pub free_throw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProfile {
    pub name: String,
    pub position: Position,
    pub fg_pct: f64,
    pub ft_pct: f64,
    pub two_pt_pct: f64,
    pub three_pt_pct: f64,
    pub rpg: f64,
    pub apg: f64,
    pub minutes_pg: f64,
    pub ppg: f64,
    pub fta_pg: f64,
    pub usage_rate: f64,

    pub tier: Tier,
    /// Never attempts a three
    pub no_three: bool,
    /// Matchup-adjusted make probabilities
    pub splits: ShootingSplits,
    /// Multiplier on the team three-point rate for this shooter
    pub three_point_tendency: f64,
    pub steal_weight: f64,
    pub block_weight: f64,
}

impl PlayerProfile {
    fn from_record(team: &str, r: &PlayerRecord) -> Result<Self> {
        let who = |what: &str| SimError::config(team, format!("player {:?}: {what}", r.player_name));

        if r.player_name.trim().is_empty() {
            return Err(SimError::config(team, "player with empty name"));
        }
        for (name, v) in [
            ("fg_pct", r.fg_pct),
            ("ft_pct", r.ft_pct),
            ("two_pt_pct", r.two_pt_pct),
            ("three_pt_pct", r.three_pt_pct),
            ("usage_rate", r.usage_rate),
        ] {
            if !(v.is_finite() && (0.0..=100.0).contains(&v)) {
                return Err(who(&format!("{name} {v} outside 0-100")));
            }
        }
        for (name, v) in [("rpg", r.rpg), ("apg", r.apg), ("ppg", r.ppg), ("fta_pg", r.fta_pg)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(who(&format!("{name} {v} must be non-negative")));
            }
        }
        if !(r.minutes_pg.is_finite() && (0.0..=GAME_MINUTES).contains(&r.minutes_pg)) {
            return Err(who(&format!("minutes_pg {} outside 0-48", r.minutes_pg)));
        }
        let position =
            Position::parse(&r.position).ok_or_else(|| who(&format!("unknown position {:?}", r.position)))?;

        let two_pt_pct = if r.two_pt_pct > 0.0 { r.two_pt_pct } else { r.fg_pct };
        let no_three = r.three_pt_pct == 0.0;

        Ok(PlayerProfile {
            name: r.player_name.clone(),
            position,
            fg_pct: r.fg_pct,
            ft_pct: r.ft_pct,
            two_pt_pct,
            three_pt_pct: r.three_pt_pct,
            rpg: r.rpg,
            apg: r.apg,
            minutes_pg: r.minutes_pg,
            ppg: r.ppg,
            fta_pg: r.fta_pg,
            usage_rate: r.usage_rate,
            tier: Tier::from_minutes(r.minutes_pg),
            no_three,
            splits: ShootingSplits {
                two: two_pt_pct / 100.0,
                three: r.three_pt_pct / 100.0,
                free_throw: r.ft_pct / 100.0,
            },
            three_point_tendency: if no_three { 0.0 } else { 1.0 },
            steal_weight: position.steal_factor() * r.minutes_pg.max(1.0),
            block_weight: position.block_factor() * (r.rpg + 1.0),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamProfile {
    pub team_id: String,
    pub team_name: String,
    pub display_name: String,
    pub year: u16,
    pub era: Era,
    pub pace_rating: f64,
    pub three_pt_rate: f64,
    pub def_rating: f64,
    pub players: Vec<PlayerProfile>,
    /// Top five by points per game
    pub starters: [usize; ON_COURT],
}

impl TeamProfile {
    /// Build a validated profile from loader records.
    ///
    /// Players whose `team_id` differs from the team's are ignored.
    pub fn from_records(team: &TeamRecord, players: &[PlayerRecord]) -> Result<Self> {
        let label = team.team_id.as_str();
        if team.team_id.trim().is_empty() {
            return Err(SimError::config("<unnamed>", "empty team_id"));
        }
        if !(1946..=2100).contains(&team.year) {
            return Err(SimError::config(label, format!("year {} out of range", team.year)));
        }
        if !(team.pace_rating.is_finite() && team.pace_rating > 0.0) {
            return Err(SimError::config(label, format!("pace_rating {} must be positive", team.pace_rating)));
        }
        if !(team.three_pt_rate.is_finite() && (0.0..=1.0).contains(&team.three_pt_rate)) {
            return Err(SimError::config(label, format!("three_pt_rate {} outside 0-1", team.three_pt_rate)));
        }
        if !(team.def_rating.is_finite() && team.def_rating > 0.0) {
            return Err(SimError::config(label, format!("def_rating {} must be positive", team.def_rating)));
        }

        let mut roster = players
            .iter()
            .filter(|p| p.team_id == team.team_id)
            .map(|p| PlayerProfile::from_record(label, p))
            .collect::<Result<Vec<_>>>()?;

        if roster.len() < ON_COURT {
            return Err(SimError::config(
                label,
                format!("roster has {} players, need at least {}", roster.len(), ON_COURT),
            ));
        }
        if roster.iter().map(|p| p.usage_rate).sum::<f64>() <= 0.0 {
            return Err(SimError::config(label, "no player has a positive usage rate"));
        }

        assign_three_point_tendency(&mut roster);
        let starters = top_by_ppg(&roster);

        Ok(TeamProfile {
            team_id: team.team_id.clone(),
            team_name: team.team_name.clone(),
            display_name: team.display_name.clone(),
            year: team.year,
            era: Era::from_year(team.year),
            pace_rating: team.pace_rating,
            three_pt_rate: team.three_pt_rate,
            def_rating: team.def_rating,
            players: roster,
            starters,
        })
    }

    /// Copy with make probabilities scaled for a matchup.
    ///
    /// `opponent_defense` is the era-adjusted defensive rating this team's
    /// offense faces; only `defense_impact` of its distance from 1.0 reaches
    /// the field-goal percentages. Free throws are unaffected.
    pub fn adjusted(&self, shooting_multiplier: f64, opponent_defense: f64, defense_impact: f64) -> Self {
        let def_multiplier = 1.0 + (opponent_defense - 1.0) * defense_impact;
        let factor = shooting_multiplier * def_multiplier;
        let mut copy = self.clone();
        for p in &mut copy.players {
            p.splits.two = (p.two_pt_pct / 100.0 * factor).clamp(0.0, 0.99);
            p.splits.three = (p.three_pt_pct / 100.0 * factor).clamp(0.0, 0.99);
        }
        copy
    }

    /// Apply a caller-chosen starting five.
    pub fn with_starters(mut self, starters: [usize; ON_COURT]) -> Result<Self> {
        let team = self.team_id.clone();
        for (i, &idx) in starters.iter().enumerate() {
            if idx >= self.players.len() {
                return Err(SimError::InvalidLineup {
                    team,
                    reason: format!("player index {idx} outside roster of {}", self.players.len()),
                });
            }
            if starters[..i].contains(&idx) {
                return Err(SimError::InvalidLineup {
                    team,
                    reason: format!("player index {idx} listed twice"),
                });
            }
        }
        self.starters = starters;
        Ok(self)
    }

    /// Roster indices ordered by points per game, best first.
    pub fn by_ppg(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.players.len()).collect();
        order.sort_by(|&a, &b| self.players[b].ppg.total_cmp(&self.players[a].ppg));
        order
    }
}

/// Better-than-team-average three-point shooters take a larger share of
/// their attempts from three.
fn assign_three_point_tendency(roster: &mut [PlayerProfile]) {
    let (weighted, usage) = roster
        .iter()
        .filter(|p| !p.no_three)
        .fold((0.0, 0.0), |(w, u), p| (w + p.three_pt_pct * p.usage_rate, u + p.usage_rate));
    if usage <= 0.0 || weighted <= 0.0 {
        return;
    }
    let team_mean = weighted / usage;
    for p in roster.iter_mut().filter(|p| !p.no_three) {
        p.three_point_tendency = (p.three_pt_pct / team_mean).clamp(0.3, 1.8);
    }
}

fn top_by_ppg(roster: &[PlayerProfile]) -> [usize; ON_COURT] {
    let mut order: Vec<usize> = (0..roster.len()).collect();
    order.sort_by(|&a, &b| roster[b].ppg.total_cmp(&roster[a].ppg));
    let mut starters = [0; ON_COURT];
    starters.copy_from_slice(&order[..ON_COURT]);
    starters
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_starters_are_top_five_by_ppg() {
        let mut players = roster("BOS");
        players.reverse();
        let team = TeamProfile::from_records(&team_record("BOS", 1986), &players).unwrap();
        let mut names: Vec<&str> = team.starters.iter().map(|&i| team.players[i].name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["BOS P0", "BOS P1", "BOS P2", "BOS P3", "BOS P4"]);
    }

    #[test]
    fn test_tiers_from_minutes() {
        assert_eq!(Tier::from_minutes(38.0), Tier::Superstar);
        assert_eq!(Tier::from_minutes(35.0), Tier::Superstar);
        assert_eq!(Tier::from_minutes(26.0), Tier::Starter);
        assert_eq!(Tier::from_minutes(12.0), Tier::Role);
        assert_eq!(Tier::from_minutes(6.0), Tier::Bench);
        assert_eq!(Tier::Bench.minutes_band(), 5.0);
    }

    #[test]
    fn test_no_three_flag_only_at_exact_zero() {
        let mut players = roster("LAL");
        players[4].three_pt_pct = 0.0;
        players[3].three_pt_pct = 0.1;
        let team = TeamProfile::from_records(&team_record("LAL", 1972), &players).unwrap();
        let center = team.players.iter().find(|p| p.name == "LAL P4").unwrap();
        let forward = team.players.iter().find(|p| p.name == "LAL P3").unwrap();
        assert!(center.no_three);
        assert_eq!(center.three_point_tendency, 0.0);
        assert!(!forward.no_three);
    }

    #[test]
    fn test_out_of_range_percentage_is_fatal() {
        let mut players = roster("NYK");
        players[0].ft_pct = 104.0;
        let err = TeamProfile::from_records(&team_record("NYK", 1970), &players).unwrap_err();
        assert!(matches!(err, SimError::Configuration { .. }));
        assert!(err.to_string().contains("ft_pct"));
    }

    #[test]
    fn test_short_roster_is_fatal() {
        let players: Vec<_> = roster("CHI").into_iter().take(4).collect();
        assert!(TeamProfile::from_records(&team_record("CHI", 1996), &players).is_err());
    }

    #[test]
    fn test_players_of_other_teams_ignored() {
        let mut players = roster("DET");
        players.extend(roster("MIA"));
        let team = TeamProfile::from_records(&team_record("DET", 1989), &players).unwrap();
        assert_eq!(team.players.len(), 10);
    }

    #[test]
    fn test_adjusted_copy_leaves_original() {
        let team = team("GSW", 2017);
        let adjusted = team.adjusted(0.965, 1.0, 0.25);
        assert!((adjusted.players[0].splits.two - team.players[0].splits.two * 0.965).abs() < 1e-12);
        assert_eq!(adjusted.players[0].splits.free_throw, team.players[0].splits.free_throw);
        assert!((team.players[0].splits.two - 0.50).abs() < 1e-12);
    }

    #[test]
    fn test_position_parsing() {
        assert_eq!(Position::parse("pg"), Some(Position::PG));
        assert_eq!(Position::parse("SF-PF"), Some(Position::SF));
        assert_eq!(Position::parse("G"), Some(Position::SG));
        assert_eq!(Position::parse("XX"), None);
    }

    #[test]
    fn test_custom_starters_validated() {
        let team = team("SAS", 2014);
        assert!(team.clone().with_starters([5, 6, 7, 8, 9]).is_ok());
        assert!(team.clone().with_starters([0, 0, 1, 2, 3]).is_err());
        assert!(team.with_starters([0, 1, 2, 3, 40]).is_err());
    }
}
