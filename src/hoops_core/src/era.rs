//! Cross-era matchup adjustments.
//!
//! Teams are tagged with one of four historical eras. A matchup derives two
//! things from the pair of eras and years:
//! - a defensive-rating modifier per team (older schemes defend worse, the
//!   hand-checking years defend best), and
//! - a shooting penalty applied only to the older team, 0.5% per calendar
//!   decade spanned, capped at 3.5%.
//!
//! Everything here is a pure function of its inputs.

use serde::{Deserialize, Serialize};

use crate::constants::{ERA_DEFENSE_MODIFIERS, SHOOTING_PENALTY_CAP, SHOOTING_PENALTY_PER_DECADE};
use crate::state::TeamSide;

/// Historical period used to scale defense and shooting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Era {
    /// 1965-1979
    PreThreePoint,
    /// 1980-1999
    EarlyThreePoint,
    /// 2000-2016
    SlowPace,
    /// 2017-2024
    Modern,
}

impl Era {
    pub const ALL: [Era; 4] = [
        Era::PreThreePoint,
        Era::EarlyThreePoint,
        Era::SlowPace,
        Era::Modern,
    ];

    pub fn from_year(year: u16) -> Self {
        match year {
            y if y < 1980 => Era::PreThreePoint,
            y if y < 2000 => Era::EarlyThreePoint,
            y if y < 2017 => Era::SlowPace,
            _ => Era::Modern,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Era::PreThreePoint => 0,
            Era::EarlyThreePoint => 1,
            Era::SlowPace => 2,
            Era::Modern => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Era::PreThreePoint => "Pre-3PT",
            Era::EarlyThreePoint => "Early-3PT",
            Era::SlowPace => "Slow-Pace",
            Era::Modern => "Modern",
        }
    }
}

/// Era policy data. One row per era; pair lookups go through [`EraTable::pair`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EraTable {
    /// Added to a team's own defensive rating, indexed by `Era::index()`
    pub defense_modifiers: [f64; 4],
    /// Shooting penalty per decade spanned (fraction)
    pub penalty_per_decade: f64,
    /// Maximum shooting penalty (fraction)
    pub penalty_cap: f64,
}

impl Default for EraTable {
    fn default() -> Self {
        EraTable {
            defense_modifiers: ERA_DEFENSE_MODIFIERS,
            penalty_per_decade: SHOOTING_PENALTY_PER_DECADE,
            penalty_cap: SHOOTING_PENALTY_CAP,
        }
    }
}

impl EraTable {
    pub fn defense_modifier(&self, era: Era) -> f64 {
        self.defense_modifiers[era.index()]
    }

    /// Defensive modifiers for an era pair, in argument order.
    pub fn pair(&self, a: Era, b: Era) -> (f64, f64) {
        (self.defense_modifier(a), self.defense_modifier(b))
    }

    /// Shooting penalty suffered by the older of two teams.
    pub fn shooting_penalty(&self, decades: u32) -> f64 {
        (decades as f64 * self.penalty_per_decade)
            .min(self.penalty_cap)
            .max(0.0)
    }
}

/// Number of calendar decades spanned by two seasons, counting both ends.
///
/// Same season is 0; 1991 vs 1996 is 1; 1965 vs 2024 is 7 (1960s..2020s).
/// Seasons that straddle a decade boundary count both decades, so 1979 vs
/// 1980 is 2 and the older team is penalised for two decades.
pub fn decade_gap(year_a: u16, year_b: u16) -> u32 {
    if year_a == year_b {
        return 0;
    }
    let (older, newer) = if year_a < year_b {
        (year_a, year_b)
    } else {
        (year_b, year_a)
    };
    (newer / 10 - older / 10) as u32 + 1
}

/// Matchup-scoped adjustments, indexed by `TeamSide::index()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupAdjustment {
    pub eras: [Era; 2],
    pub years: [u16; 2],
    pub decade_gap: u32,
    /// Era modifier added to each team's own defensive rating
    pub defense_modifiers: [f64; 2],
    /// Fraction removed from each team's shooting percentages
    pub shooting_penalties: [f64; 2],
}

impl MatchupAdjustment {
    /// Derive the adjustments for a home/away pair of seasons.
    pub fn between(table: &EraTable, home_year: u16, away_year: u16) -> Self {
        let eras = [Era::from_year(home_year), Era::from_year(away_year)];
        let (home_def, away_def) = table.pair(eras[0], eras[1]);
        let gap = decade_gap(home_year, away_year);
        let penalty = table.shooting_penalty(gap);

        let shooting_penalties = if home_year < away_year {
            [penalty, 0.0]
        } else if away_year < home_year {
            [0.0, penalty]
        } else {
            [0.0, 0.0]
        };

        MatchupAdjustment {
            eras,
            years: [home_year, away_year],
            decade_gap: gap,
            defense_modifiers: [home_def, away_def],
            shooting_penalties,
        }
    }

    /// Home defensive modifier minus away defensive modifier.
    pub fn defensive_delta(&self) -> f64 {
        self.defense_modifiers[0] - self.defense_modifiers[1]
    }

    /// Multiplier applied to `side`'s shooting percentages.
    pub fn shooting_multiplier(&self, side: TeamSide) -> f64 {
        1.0 - self.shooting_penalties[side.index()]
    }

    /// Defensive rating faced by `side`'s offense, era modifier included.
    pub fn opponent_defense(&self, side: TeamSide, opponent_def_rating: f64) -> f64 {
        opponent_def_rating + self.defense_modifiers[side.other().index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_era_boundaries() {
        assert_eq!(Era::from_year(1965), Era::PreThreePoint);
        assert_eq!(Era::from_year(1979), Era::PreThreePoint);
        assert_eq!(Era::from_year(1980), Era::EarlyThreePoint);
        assert_eq!(Era::from_year(1999), Era::EarlyThreePoint);
        assert_eq!(Era::from_year(2000), Era::SlowPace);
        assert_eq!(Era::from_year(2016), Era::SlowPace);
        assert_eq!(Era::from_year(2017), Era::Modern);
        assert_eq!(Era::from_year(2024), Era::Modern);
    }

    #[test]
    fn test_1965_vs_2024_hits_cap() {
        let adj = MatchupAdjustment::between(&EraTable::default(), 1965, 2024);
        assert_eq!(adj.decade_gap, 7);
        assert!((adj.shooting_penalties[0] - 0.035).abs() < 1e-12);
        assert_eq!(adj.shooting_penalties[1], 0.0);
        assert!((adj.shooting_multiplier(TeamSide::Home) - 0.965).abs() < 1e-12);
        assert!((adj.defense_modifiers[0] - 0.08).abs() < 1e-12);
        assert!((adj.defense_modifiers[1] - 0.05).abs() < 1e-12);
        assert!((adj.defensive_delta() - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_pre_three_vs_early_three_delta() {
        let adj = MatchupAdjustment::between(&EraTable::default(), 1967, 1986);
        assert!((adj.defensive_delta() - 0.13).abs() < 1e-12);
        // 1960s, 70s, 80s
        assert_eq!(adj.decade_gap, 3);
        assert!((adj.shooting_penalties[0] - 0.015).abs() < 1e-12);
    }

    #[test]
    fn test_penalty_only_on_older_team() {
        let adj = MatchupAdjustment::between(&EraTable::default(), 2016, 1996);
        assert_eq!(adj.shooting_penalties[0], 0.0);
        assert!(adj.shooting_penalties[1] > 0.0);
    }

    #[test]
    fn test_same_year_no_penalty() {
        let adj = MatchupAdjustment::between(&EraTable::default(), 1996, 1996);
        assert_eq!(adj.decade_gap, 0);
        assert_eq!(adj.shooting_penalties, [0.0, 0.0]);
        assert_eq!(adj.defensive_delta(), 0.0);
    }

    #[test]
    fn test_decade_boundary_counts_both_decades() {
        assert_eq!(decade_gap(1979, 1980), 2);
        assert_eq!(decade_gap(1971, 1978), 1);
        let adj = MatchupAdjustment::between(&EraTable::default(), 1980, 1979);
        assert_eq!(adj.shooting_penalties[0], 0.0);
        assert!((adj.shooting_penalties[1] - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_opponent_defense_uses_opponent_era() {
        let adj = MatchupAdjustment::between(&EraTable::default(), 1965, 2024);
        // Home offense faces the 2024 defense
        assert!((adj.opponent_defense(TeamSide::Home, 1.0) - 1.05).abs() < 1e-12);
        assert!((adj.opponent_defense(TeamSide::Away, 1.0) - 1.08).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_adjustment_is_pure(a in 1946u16..2030, b in 1946u16..2030) {
            let table = EraTable::default();
            prop_assert_eq!(
                MatchupAdjustment::between(&table, a, b),
                MatchupAdjustment::between(&table, a, b)
            );
        }

        #[test]
        fn prop_penalty_bounded_and_one_sided(a in 1946u16..2030, b in 1946u16..2030) {
            let adj = MatchupAdjustment::between(&EraTable::default(), a, b);
            for p in adj.shooting_penalties {
                prop_assert!((0.0..=0.035 + 1e-12).contains(&p));
            }
            prop_assert!(adj.shooting_penalties[0] == 0.0 || adj.shooting_penalties[1] == 0.0);
        }
    }
}
