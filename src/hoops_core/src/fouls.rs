//! Personal fouls, team fouls and the bonus.

use serde::Serialize;

use crate::config::{FoulConfig, RuleConfig};
use crate::events::{FoulKind, ShotKind};
use crate::state::TeamSide;

/// Result of charging one foul.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FoulRecord {
    /// Fouler's personal fouls after this one
    pub personal_fouls: u8,
    /// Fouling team's fouls this period after this one
    pub team_fouls: u8,
    pub fouled_out: bool,
    /// Free throws awarded to the victim
    pub free_throws: u8,
}

/// Foul bookkeeping for both teams.
///
/// Team fouls and the bonus reset every period; personal fouls persist for
/// the whole game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoulClock {
    team_fouls: [u8; 2],
    bonus: [bool; 2],
    personal: [Vec<u8>; 2],
    bonus_threshold: u8,
    foul_out_limit: u8,
}

impl FoulClock {
    pub fn new(roster_sizes: [usize; 2], rules: &RuleConfig) -> Self {
        FoulClock {
            team_fouls: [0, 0],
            bonus: [false, false],
            personal: [vec![0; roster_sizes[0]], vec![0; roster_sizes[1]]],
            bonus_threshold: rules.bonus_threshold,
            foul_out_limit: rules.foul_out_limit,
        }
    }

    pub fn start_period(&mut self) {
        self.team_fouls = [0, 0];
        self.bonus = [false, false];
    }

    pub fn team_fouls(&self, side: TeamSide) -> u8 {
        self.team_fouls[side.index()]
    }

    /// True once `side` has reached the bonus threshold this period.
    pub fn in_bonus(&self, side: TeamSide) -> bool {
        self.bonus[side.index()]
    }

    pub fn personal_fouls(&self, side: TeamSide, player: usize) -> u8 {
        self.personal[side.index()][player]
    }

    pub fn is_fouled_out(&self, side: TeamSide, player: usize) -> bool {
        self.personal_fouls(side, player) >= self.foul_out_limit
    }

    pub fn foul_out_limit(&self) -> u8 {
        self.foul_out_limit
    }

    /// Free throws a foul of `kind` committed by `fouling` would award now.
    ///
    /// The foul being charged counts toward the bonus, so the foul that
    /// reaches the threshold already goes to the line.
    pub fn free_throws_for(&self, fouling: TeamSide, kind: FoulKind) -> u8 {
        match kind {
            FoulKind::Shooting { made: true, .. } => 1,
            FoulKind::Shooting { shot: ShotKind::Two, .. } => 2,
            FoulKind::Shooting { shot: ShotKind::Three, .. } => 3,
            FoulKind::NonShooting | FoulKind::Intentional => {
                if self.team_fouls(fouling).saturating_add(1) >= self.bonus_threshold {
                    2
                } else {
                    0
                }
            }
        }
    }

    /// Charge a foul to `player` of the `fouling` team.
    pub fn record(&mut self, fouling: TeamSide, player: usize, kind: FoulKind) -> FoulRecord {
        let free_throws = self.free_throws_for(fouling, kind);
        let idx = fouling.index();

        let personal = &mut self.personal[idx][player];
        *personal = personal.saturating_add(1);
        let personal_fouls = *personal;

        self.team_fouls[idx] = self.team_fouls[idx].saturating_add(1);
        if self.team_fouls[idx] >= self.bonus_threshold {
            self.bonus[idx] = true;
        }

        FoulRecord {
            personal_fouls,
            team_fouls: self.team_fouls[idx],
            fouled_out: personal_fouls >= self.foul_out_limit,
            free_throws,
        }
    }

    /// Whether a player should sit to protect against fouling out.
    pub fn in_foul_trouble(
        &self,
        side: TeamSide,
        player: usize,
        situation: &FoulSituation,
        cfg: &FoulConfig,
    ) -> bool {
        let fouls = self.personal_fouls(side, player);
        let late = situation.period >= 4;
        if late && situation.is_star && situation.clock <= cfg.star_crunch_seconds {
            return false;
        }
        let slot = (situation.period.clamp(1, 4) - 1) as usize;
        let mut threshold = cfg.trouble_thresholds[slot];
        if late && situation.margin > cfg.blowout_margin {
            threshold = threshold.saturating_sub(1);
        }
        fouls >= threshold
    }
}

/// Game context for the foul-trouble rule.
#[derive(Debug, Clone, Copy)]
pub struct FoulSituation {
    /// 1-based period, overtime periods continue past 4
    pub period: u8,
    /// Seconds left in the period
    pub clock: f64,
    /// Absolute score difference
    pub margin: u32,
    pub is_star: bool,
}

/// Whether a defense trailing by `deficit` fouls on purpose.
///
/// Applies only in the last `crunch_seconds` of the final regulation quarter
/// or any overtime, and only while the deficit is within the configured
/// margin.
pub fn fouls_intentionally(
    period: u8,
    regulation_quarters: u8,
    clock: f64,
    deficit: i64,
    cfg: &FoulConfig,
) -> bool {
    period >= regulation_quarters
        && clock <= cfg.crunch_seconds
        && deficit >= 1
        && deficit <= cfg.intentional_foul_margin as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> FoulClock {
        FoulClock::new([12, 12], &RuleConfig::default())
    }

    #[test]
    fn test_bonus_starts_on_threshold_foul() {
        let mut fc = clock();
        let awards: Vec<u8> = (0..4)
            .map(|i| fc.record(TeamSide::Away, i, FoulKind::NonShooting).free_throws)
            .collect();
        assert_eq!(awards, vec![0, 0, 0, 0]);
        assert!(!fc.in_bonus(TeamSide::Away));

        // The foul that reaches the threshold goes to the line
        let fifth = fc.record(TeamSide::Away, 4, FoulKind::NonShooting);
        assert_eq!(fifth.free_throws, 2);
        assert_eq!(fifth.team_fouls, 5);
        assert!(fc.in_bonus(TeamSide::Away));
        assert!(!fc.in_bonus(TeamSide::Home));
        assert_eq!(fc.free_throws_for(TeamSide::Home, FoulKind::Intentional), 0);

        let sixth = fc.record(TeamSide::Away, 5, FoulKind::NonShooting);
        assert_eq!(sixth.free_throws, 2);
        assert_eq!(sixth.team_fouls, 6);
    }

    #[test]
    fn test_shooting_foul_awards() {
        let fc = clock();
        let two = FoulKind::Shooting { shot: ShotKind::Two, made: false };
        let three = FoulKind::Shooting { shot: ShotKind::Three, made: false };
        let and_one = FoulKind::Shooting { shot: ShotKind::Three, made: true };
        assert_eq!(fc.free_throws_for(TeamSide::Home, two), 2);
        assert_eq!(fc.free_throws_for(TeamSide::Home, three), 3);
        assert_eq!(fc.free_throws_for(TeamSide::Home, and_one), 1);
    }

    #[test]
    fn test_period_reset_keeps_personal_fouls() {
        let mut fc = clock();
        for _ in 0..5 {
            fc.record(TeamSide::Home, 0, FoulKind::NonShooting);
        }
        assert!(fc.in_bonus(TeamSide::Home));
        fc.start_period();
        assert_eq!(fc.team_fouls(TeamSide::Home), 0);
        assert!(!fc.in_bonus(TeamSide::Home));
        assert_eq!(fc.personal_fouls(TeamSide::Home, 0), 5);
    }

    #[test]
    fn test_sixth_personal_fouls_out() {
        let mut fc = clock();
        let mut last = None;
        for _ in 0..6 {
            last = Some(fc.record(TeamSide::Home, 3, FoulKind::NonShooting));
        }
        let rec = last.unwrap();
        assert!(rec.fouled_out);
        assert!(fc.is_fouled_out(TeamSide::Home, 3));
        assert!(!fc.is_fouled_out(TeamSide::Home, 2));
    }

    #[test]
    fn test_foul_trouble_thresholds() {
        let mut fc = clock();
        fc.record(TeamSide::Home, 0, FoulKind::NonShooting);
        fc.record(TeamSide::Home, 0, FoulKind::NonShooting);
        let cfg = FoulConfig::default();
        let q1 = FoulSituation { period: 1, clock: 400.0, margin: 0, is_star: false };
        let q2 = FoulSituation { period: 2, ..q1 };
        assert!(fc.in_foul_trouble(TeamSide::Home, 0, &q1, &cfg));
        assert!(!fc.in_foul_trouble(TeamSide::Home, 0, &q2, &cfg));

        for _ in 0..3 {
            fc.record(TeamSide::Home, 0, FoulKind::NonShooting);
        }
        let crunch_star = FoulSituation { period: 4, clock: 200.0, margin: 3, is_star: true };
        assert!(!fc.in_foul_trouble(TeamSide::Home, 0, &crunch_star, &cfg));
        let crunch_role = FoulSituation { is_star: false, ..crunch_star };
        assert!(fc.in_foul_trouble(TeamSide::Home, 0, &crunch_role, &cfg));
    }

    #[test]
    fn test_intentional_foul_window() {
        let cfg = FoulConfig::default();
        assert!(fouls_intentionally(4, 4, 90.0, 3, &cfg));
        assert!(fouls_intentionally(5, 4, 30.0, 1, &cfg));
        assert!(!fouls_intentionally(3, 4, 90.0, 3, &cfg));
        assert!(!fouls_intentionally(4, 4, 130.0, 3, &cfg));
        assert!(!fouls_intentionally(4, 4, 90.0, 0, &cfg));
        assert!(!fouls_intentionally(4, 4, 90.0, 12, &cfg));
    }
}
