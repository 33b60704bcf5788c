//! Minute targets and lineup selection for one team.
//!
//! Each period every player gets a target drawn around their share of
//! season minutes per game, perturbed within their tier band. Lineups are
//! filled by largest remaining target, so players who are behind their
//! minutes come on and players who are ahead sit.

use rand::distributions::Distribution;
use rand::Rng;
use serde::Serialize;
use statrs::distribution::Normal;
use std::cmp::Ordering;

use crate::config::SimConfig;
use crate::constants::{GAME_MINUTES, ON_COURT};
use crate::error::{Result, SimError};
use crate::fouls::FoulSituation;
use crate::profile::TeamProfile;
use crate::state::{GameState, Lineup, TeamSide};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationManager {
    side: TeamSide,
    /// Sum of period targets handed out so far (minutes)
    targets: Vec<f64>,
    /// Target for the current period (minutes)
    period_targets: Vec<f64>,
    played: Vec<f64>,
}

impl RotationManager {
    pub fn new(side: TeamSide, roster_len: usize) -> Self {
        RotationManager {
            side,
            targets: vec![0.0; roster_len],
            period_targets: vec![0.0; roster_len],
            played: vec![0.0; roster_len],
        }
    }

    pub fn side(&self) -> TeamSide {
        self.side
    }

    /// Draw this period's minute targets.
    pub fn begin_period<R: Rng + ?Sized>(&mut self, team: &TeamProfile, period_minutes: f64, rng: &mut R) {
        for (i, p) in team.players.iter().enumerate() {
            let base = p.minutes_pg * period_minutes / GAME_MINUTES;
            let band = p.tier.minutes_band();
            let perturbation = match Normal::new(0.0, band / 2.0) {
                Ok(dist) => dist.sample(rng).clamp(-band, band),
                Err(_) => 0.0,
            };
            let target = (base + perturbation).clamp(0.0, period_minutes);
            self.period_targets[i] = target;
            self.targets[i] += target;
        }
    }

    pub fn period_target(&self, player: usize) -> f64 {
        self.period_targets[player]
    }

    /// Target minutes not yet played this game.
    pub fn remaining(&self, player: usize) -> f64 {
        self.targets[player] - self.played[player]
    }

    pub fn minutes_played(&self, player: usize) -> f64 {
        self.played[player]
    }

    pub fn credit(&mut self, lineup: &Lineup, seconds: f64) {
        for &p in lineup {
            self.played[p] += seconds / 60.0;
        }
    }

    /// Whether `player` should sit to protect against fouling out.
    pub fn in_trouble(&self, team: &TeamProfile, state: &GameState, cfg: &SimConfig, player: usize) -> bool {
        if !cfg.rotation.bench_foul_trouble {
            return false;
        }
        let situation = FoulSituation {
            period: state.period,
            clock: state.clock,
            margin: state.margin(),
            is_star: team.players[player].minutes_pg >= cfg.fouls.star_minutes,
        };
        state.fouls.in_foul_trouble(self.side, player, &situation, &cfg.fouls)
    }

    fn eligible(&self, team: &TeamProfile, state: &GameState) -> Vec<usize> {
        (0..team.players.len())
            .filter(|&p| !state.fouls.is_fouled_out(self.side, p))
            .collect()
    }

    fn exhausted(&self, team: &TeamProfile, state: &GameState, available: usize) -> SimError {
        SimError::EligibilityExhaustion {
            team: team.display_name.clone(),
            available,
            quarter: state.period,
            possession: state.possession_index,
        }
    }

    /// Compare two players for a lineup spot, better first.
    fn rank(&self, team: &TeamProfile, a: usize, b: usize) -> Ordering {
        self.remaining(b)
            .total_cmp(&self.remaining(a))
            .then_with(|| team.players[b].ppg.total_cmp(&team.players[a].ppg))
    }

    /// Five players with the most target minutes left, players in foul
    /// trouble last and fouled-out players never.
    pub fn select_five(&self, team: &TeamProfile, state: &GameState, cfg: &SimConfig) -> Result<Lineup> {
        let mut pool = self.eligible(team, state);
        if pool.len() < ON_COURT {
            return Err(self.exhausted(team, state, pool.len()));
        }
        pool.sort_by(|&a, &b| {
            self.in_trouble(team, state, cfg, a)
                .cmp(&self.in_trouble(team, state, cfg, b))
                .then_with(|| self.rank(team, a, b))
        });
        Ok(to_lineup(&pool))
    }

    /// Best five by scoring for the end of a close game, avoiding anyone
    /// one foul from disqualification when possible.
    pub fn closing_five(&self, team: &TeamProfile, state: &GameState) -> Result<Lineup> {
        let mut pool = self.eligible(team, state);
        if pool.len() < ON_COURT {
            return Err(self.exhausted(team, state, pool.len()));
        }
        let last_foul = state.fouls.foul_out_limit().saturating_sub(1);
        pool.sort_by(|&a, &b| {
            let fa = state.fouls.personal_fouls(self.side, a) >= last_foul;
            let fb = state.fouls.personal_fouls(self.side, b) >= last_foul;
            fa.cmp(&fb)
                .then_with(|| team.players[b].ppg.total_cmp(&team.players[a].ppg))
        });
        Ok(to_lineup(&pool))
    }

    /// Pair players leaving `current` with players joining from `desired`,
    /// at most `max_subs` swaps. Players furthest over their target leave
    /// first.
    pub fn wave(&self, current: &Lineup, desired: &Lineup, max_subs: usize) -> Vec<(usize, usize)> {
        let mut outgoing: Vec<usize> = current.iter().copied().filter(|p| !desired.contains(p)).collect();
        let mut incoming: Vec<usize> = desired.iter().copied().filter(|p| !current.contains(p)).collect();
        outgoing.sort_by(|&a, &b| self.remaining(a).total_cmp(&self.remaining(b)));
        incoming.sort_by(|&a, &b| self.remaining(b).total_cmp(&self.remaining(a)));
        outgoing.into_iter().zip(incoming).take(max_subs).collect()
    }

    /// Bench player to replace `out`, preferring compatible positions.
    ///
    /// With `allow_trouble` false, players in foul trouble are not
    /// considered; this is used for optional foul-trouble benching.
    pub fn replacement(
        &self,
        team: &TeamProfile,
        state: &GameState,
        cfg: &SimConfig,
        out: usize,
        allow_trouble: bool,
    ) -> Option<usize> {
        let lineup = state.lineup(self.side);
        let bench: Vec<usize> = (0..team.players.len())
            .filter(|&p| p != out && !lineup.contains(&p))
            .filter(|&p| !state.fouls.is_fouled_out(self.side, p))
            .collect();

        let (clean, troubled): (Vec<usize>, Vec<usize>) =
            bench.into_iter().partition(|&p| !self.in_trouble(team, state, cfg, p));
        let mut bench = if !clean.is_empty() || !allow_trouble { clean } else { troubled };
        if bench.is_empty() {
            return None;
        }
        bench.sort_by(|&a, &b| self.rank(team, a, b));

        let position = team.players[out].position;
        position
            .compatible()
            .iter()
            .find_map(|pos| bench.iter().copied().find(|&p| team.players[p].position == *pos))
            .or_else(|| bench.first().copied())
    }
}

fn to_lineup(pool: &[usize]) -> Lineup {
    let mut lineup = [0; ON_COURT];
    lineup.copy_from_slice(&pool[..ON_COURT]);
    lineup
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FoulKind;
    use crate::profile::fixtures;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (TeamProfile, GameState, SimConfig) {
        let team = fixtures::team("BOS", 1986);
        let cfg = SimConfig::default();
        let state = GameState::new([team.starters, team.starters], [10, 10], &cfg.rules);
        (team, state, cfg)
    }

    #[test]
    fn test_period_targets_within_band() {
        let (team, _, _) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..50 {
            let mut rot = RotationManager::new(TeamSide::Home, 10);
            rot.begin_period(&team, 12.0, &mut rng);
            for (i, p) in team.players.iter().enumerate() {
                let base = p.minutes_pg / 4.0;
                let t = rot.period_target(i);
                assert!((0.0..=12.0).contains(&t));
                assert!(t >= (base - p.tier.minutes_band()).max(0.0) - 1e-9);
                assert!(t <= base + p.tier.minutes_band() + 1e-9);
            }
        }
    }

    #[test]
    fn test_select_five_prefers_remaining_minutes() {
        let (team, state, cfg) = setup();
        let mut rot = RotationManager::new(TeamSide::Home, 10);
        rot.targets = vec![9.0, 8.0, 8.0, 7.0, 7.0, 5.0, 4.0, 4.0, 3.0, 2.0];
        // Starters have played most of their quarter
        rot.credit(&[0, 1, 2, 3, 4], 420.0);
        let five = rot.select_five(&team, &state, &cfg).unwrap();
        assert!(five.contains(&5));
        assert!(five.contains(&6));
        assert!(five.contains(&7));
    }

    #[test]
    fn test_fouled_out_never_selected() {
        let (team, mut state, cfg) = setup();
        for _ in 0..6 {
            state.fouls.record(TeamSide::Home, 0, FoulKind::NonShooting);
        }
        let mut rot = RotationManager::new(TeamSide::Home, 10);
        rot.targets = vec![40.0; 10];
        let five = rot.select_five(&team, &state, &cfg).unwrap();
        assert!(!five.contains(&0));
        let closing = rot.closing_five(&team, &state).unwrap();
        assert!(!closing.contains(&0));
    }

    #[test]
    fn test_exhaustion_when_fewer_than_five_eligible() {
        let (team, mut state, cfg) = setup();
        for p in 0..6 {
            for _ in 0..6 {
                state.fouls.record(TeamSide::Home, p, FoulKind::NonShooting);
            }
        }
        let rot = RotationManager::new(TeamSide::Home, 10);
        let err = rot.select_five(&team, &state, &cfg).unwrap_err();
        assert!(matches!(err, SimError::EligibilityExhaustion { available: 4, .. }));
    }

    #[test]
    fn test_replacement_prefers_compatible_position() {
        let (team, state, cfg) = setup();
        let rot = RotationManager::new(TeamSide::Home, 10);
        // Player 4 is the starting center; 8 is the backup center
        let sub = rot.replacement(&team, &state, &cfg, 4, true).unwrap();
        assert_eq!(team.players[sub].position, crate::profile::Position::C);
    }

    #[test]
    fn test_wave_limits_swaps() {
        let rot = RotationManager::new(TeamSide::Home, 10);
        let swaps = rot.wave(&[0, 1, 2, 3, 4], &[5, 6, 7, 8, 9], 3);
        assert_eq!(swaps.len(), 3);
        let none = rot.wave(&[0, 1, 2, 3, 4], &[4, 3, 2, 1, 0], 3);
        assert!(none.is_empty());
    }

    #[test]
    fn test_closing_five_is_best_scorers() {
        let (team, state, _) = setup();
        let rot = RotationManager::new(TeamSide::Home, 10);
        let mut closing = rot.closing_five(&team, &state).unwrap();
        closing.sort();
        assert_eq!(closing, [0, 1, 2, 3, 4]);
    }
}
