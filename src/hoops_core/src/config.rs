//! Simulation tuning.
//!
//! All probabilities and rule constants the engine reads live here so they
//! can be tuned from a JSON file without recompiling. Every group defaults to
//! the values the engine was calibrated with.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{
    BONUS_THRESHOLD, FOUL_OUT_LIMIT, OFFENSIVE_REBOUND_SHOT_CLOCK, OVERTIME_SECONDS, QUARTERS,
    QUARTER_SECONDS, SHOT_CLOCK,
};
use crate::era::EraTable;
use crate::error::{Result, SimError};

/// Game rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub quarters: u8,
    pub quarter_seconds: f64,
    pub overtime_seconds: f64,
    pub shot_clock: f64,
    pub offensive_rebound_shot_clock: f64,
    pub foul_out_limit: u8,
    pub bonus_threshold: u8,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            quarters: QUARTERS,
            quarter_seconds: QUARTER_SECONDS,
            overtime_seconds: OVERTIME_SECONDS,
            shot_clock: SHOT_CLOCK,
            offensive_rebound_shot_clock: OFFENSIVE_REBOUND_SHOT_CLOCK,
            foul_out_limit: FOUL_OUT_LIMIT,
            bonus_threshold: BONUS_THRESHOLD,
        }
    }
}

/// Per-possession outcome rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PossessionConfig {
    /// Turnover chance before a shot, scaled by the offense's pace rating
    pub turnover_rate: f64,
    /// Share of turnovers forced by a steal
    pub steal_share: f64,
    /// Non-shooting foul chance before a shot
    pub non_shooting_foul_rate: f64,
    /// Shooting-foul chance per free-throw attempt per game of the shooter
    pub shooting_foul_per_fta: f64,
    /// Upper bound on the shooting-foul chance
    pub shooting_foul_cap: f64,
    pub block_rate_two: f64,
    pub block_rate_three: f64,
    /// League-average offensive rebound rate between equal rebounding fives
    pub offensive_rebound_base: f64,
    /// Share of the opposing defensive rating that reaches make probability
    pub defense_impact: f64,
    pub assist_rate_two: f64,
    pub assist_rate_three: f64,
    /// Standard deviation of the time to an action (seconds)
    pub possession_time_sd: f64,
    /// Time factor for the action after an offensive rebound
    pub putback_tempo: f64,
    /// Time factor for the action after a non-shooting side-out
    pub side_out_tempo: f64,
    /// Seconds used by a pass in a controlled possession
    pub pass_seconds: (f64, f64),
    /// Interception chance per pass in a controlled possession
    pub pass_steal_rate: f64,
    /// Seconds used to get a shot off in a controlled possession
    pub shot_seconds: (f64, f64),
}

impl Default for PossessionConfig {
    fn default() -> Self {
        Self {
            turnover_rate: 0.12,
            steal_share: 0.60,
            non_shooting_foul_rate: 0.08,
            shooting_foul_per_fta: 0.02,
            shooting_foul_cap: 0.30,
            block_rate_two: 0.05,
            block_rate_three: 0.02,
            offensive_rebound_base: 0.27,
            defense_impact: 0.25,
            assist_rate_two: 0.55,
            assist_rate_three: 0.80,
            possession_time_sd: 3.5,
            putback_tempo: 0.45,
            side_out_tempo: 0.6,
            pass_seconds: (3.0, 6.0),
            pass_steal_rate: 0.05,
            shot_seconds: (1.0, 3.0),
        }
    }
}

/// Foul trouble and end-of-game fouling policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoulConfig {
    /// Final seconds of Q4/OT in which a trailing defense fouls on purpose
    pub crunch_seconds: f64,
    /// Largest deficit at which the defense still fouls on purpose
    pub intentional_foul_margin: u32,
    /// Foul chance per possession while fouling on purpose
    pub intentional_foul_rate: f64,
    /// Longest the defense waits before fouling on purpose (seconds)
    pub intentional_foul_seconds: f64,
    /// Foul-trouble thresholds for Q1, Q2, Q3 and Q4/OT
    pub trouble_thresholds: [u8; 4],
    /// Point margin above which Q4 foul trouble starts one foul earlier
    pub blowout_margin: u32,
    /// Season minutes per game that mark a star
    pub star_minutes: f64,
    /// Final seconds of Q4/OT in which stars are never benched for fouls
    pub star_crunch_seconds: f64,
}

impl Default for FoulConfig {
    fn default() -> Self {
        Self {
            crunch_seconds: 120.0,
            intentional_foul_margin: 6,
            intentional_foul_rate: 0.55,
            intentional_foul_seconds: 4.0,
            trouble_thresholds: [2, 3, 4, 5],
            blowout_margin: 15,
            star_minutes: 32.0,
            star_crunch_seconds: 300.0,
        }
    }
}

/// Rotation policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Clock marks (seconds remaining) at which substitution waves run
    pub sub_windows: Vec<f64>,
    pub max_subs_per_window: usize,
    /// Seconds remaining in Q4/OT at which the closing five is locked in
    pub closing_seconds: f64,
    /// Largest margin for which a closing lineup is used
    pub closing_margin: u32,
    /// Bench a player who reaches foul trouble at the next dead ball
    pub bench_foul_trouble: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            sub_windows: vec![360.0, 180.0],
            max_subs_per_window: 3,
            closing_seconds: 180.0,
            closing_margin: 10,
            bench_foul_trouble: true,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub rules: RuleConfig,
    pub possession: PossessionConfig,
    pub fouls: FoulConfig,
    pub rotation: RotationConfig,
    pub era: EraTable,
    /// Events kept for display
    pub recent_events: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rules: RuleConfig::default(),
            possession: PossessionConfig::default(),
            fouls: FoulConfig::default(),
            rotation: RotationConfig::default(),
            era: EraTable::default(),
            recent_events: 3,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: SimConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let r = &self.rules;
        if r.quarters == 0 {
            return Err(SimError::InvalidConfig("quarters must be positive".into()));
        }
        for (name, v) in [
            ("quarter_seconds", r.quarter_seconds),
            ("overtime_seconds", r.overtime_seconds),
            ("shot_clock", r.shot_clock),
            ("offensive_rebound_shot_clock", r.offensive_rebound_shot_clock),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(SimError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        if r.foul_out_limit == 0 {
            return Err(SimError::InvalidConfig("foul_out_limit must be positive".into()));
        }

        let p = &self.possession;
        for (name, v) in [
            ("turnover_rate", p.turnover_rate),
            ("steal_share", p.steal_share),
            ("non_shooting_foul_rate", p.non_shooting_foul_rate),
            ("shooting_foul_cap", p.shooting_foul_cap),
            ("block_rate_two", p.block_rate_two),
            ("block_rate_three", p.block_rate_three),
            ("offensive_rebound_base", p.offensive_rebound_base),
            ("assist_rate_two", p.assist_rate_two),
            ("assist_rate_three", p.assist_rate_three),
            ("pass_steal_rate", p.pass_steal_rate),
            ("intentional_foul_rate", self.fouls.intentional_foul_rate),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(SimError::InvalidConfig(format!("{name} must be in [0, 1]")));
            }
        }
        for (name, (lo, hi)) in [("pass_seconds", p.pass_seconds), ("shot_seconds", p.shot_seconds)] {
            if !(lo > 0.0 && hi >= lo) {
                return Err(SimError::InvalidConfig(format!("{name} must be a positive range")));
            }
        }
        if !(p.possession_time_sd.is_finite() && p.possession_time_sd > 0.0) {
            return Err(SimError::InvalidConfig("possession_time_sd must be positive".into()));
        }
        if !(self.fouls.intentional_foul_seconds > 0.0) {
            return Err(SimError::InvalidConfig("intentional_foul_seconds must be positive".into()));
        }
        if self.recent_events == 0 {
            return Err(SimError::InvalidConfig("recent_events must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = SimConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.rules.foul_out_limit, 6);
        assert_eq!(cfg.rules.bonus_threshold, 5);
        assert_eq!(cfg.recent_events, 3);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg = SimConfig::from_json_str(r#"{"fouls": {"intentional_foul_margin": 9}}"#).unwrap();
        assert_eq!(cfg.fouls.intentional_foul_margin, 9);
        assert_eq!(cfg.fouls.crunch_seconds, 120.0);
        assert_eq!(cfg.rules, RuleConfig::default());
    }

    #[test]
    fn test_out_of_range_rate_rejected() {
        let err = SimConfig::from_json_str(r#"{"possession": {"turnover_rate": 1.5}}"#);
        assert!(matches!(err, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_serialization() {
        let cfg = SimConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let parsed = SimConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, cfg);
    }
}
