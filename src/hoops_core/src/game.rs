//! Game loop.
//!
//! A [`Game`] owns everything one matchup mutates: the state, both rotation
//! managers, the box score and the random stream. Possessions are played one
//! at a time and committed only once fully resolved.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::VecDeque;

use crate::boxscore::{BoxScore, TeamTotals};
use crate::config::SimConfig;
use crate::constants::ON_COURT;
use crate::era::MatchupAdjustment;
use crate::error::{Result, SimError};
use crate::events::{PossessionEvent, SubReason};
use crate::possession::{PossessionController, PossessionEngine};
use crate::profile::TeamProfile;
use crate::rotation::RotationManager;
use crate::state::{GameState, Lineup, TeamSide};

/// Final result of a completed game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameResult {
    pub home_id: String,
    pub away_id: String,
    pub home: String,
    pub away: String,
    pub scores: [u32; 2],
    /// Cumulative score at the end of each period
    pub period_scores: Vec<[u32; 2]>,
    pub overtimes: u8,
    pub possessions: u32,
    pub adjustment: MatchupAdjustment,
    pub box_score: BoxScore,
    pub totals: [TeamTotals; 2],
}

impl GameResult {
    pub fn winner(&self) -> TeamSide {
        if self.scores[0] > self.scores[1] {
            TeamSide::Home
        } else {
            TeamSide::Away
        }
    }

    /// Home score minus away score.
    pub fn margin(&self) -> i64 {
        self.scores[0] as i64 - self.scores[1] as i64
    }
}

#[derive(Debug, Clone)]
pub struct Game {
    /// Matchup-adjusted profiles
    teams: [TeamProfile; 2],
    adjustment: MatchupAdjustment,
    config: SimConfig,
    state: GameState,
    rotations: [RotationManager; 2],
    box_score: BoxScore,
    recent: VecDeque<PossessionEvent>,
    rng: ChaCha8Rng,
    tip_winner: TeamSide,
    /// Closing lineup locked in for the rest of the period
    closing: bool,
    /// Substitution windows already used this period
    windows_used: usize,
}

impl Game {
    /// Set up a game between two validated profiles.
    ///
    /// Matchup adjustments are applied here, the opening tip is drawn and
    /// both teams start with their top five by points per game.
    pub fn new(home: &TeamProfile, away: &TeamProfile, config: SimConfig, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let mut rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };

        let adjustment = MatchupAdjustment::between(&config.era, home.year, away.year);
        let impact = config.possession.defense_impact;
        let teams = [
            home.adjusted(
                adjustment.shooting_multiplier(TeamSide::Home),
                adjustment.opponent_defense(TeamSide::Home, away.def_rating),
                impact,
            ),
            away.adjusted(
                adjustment.shooting_multiplier(TeamSide::Away),
                adjustment.opponent_defense(TeamSide::Away, home.def_rating),
                impact,
            ),
        ];

        let sizes = [teams[0].players.len(), teams[1].players.len()];
        let mut state = GameState::new([teams[0].starters, teams[1].starters], sizes, &config.rules);
        let tip_winner = if rng.gen::<bool>() { TeamSide::Home } else { TeamSide::Away };
        state.possession = tip_winner;

        let period_minutes = config.rules.quarter_seconds / 60.0;
        let mut rotations = [
            RotationManager::new(TeamSide::Home, sizes[0]),
            RotationManager::new(TeamSide::Away, sizes[1]),
        ];
        for side in TeamSide::BOTH {
            rotations[side.index()].begin_period(&teams[side.index()], period_minutes, &mut rng);
        }

        tracing::debug!(
            home = %teams[0].display_name,
            away = %teams[1].display_name,
            decade_gap = adjustment.decade_gap,
            penalties = ?adjustment.shooting_penalties,
            "game set up"
        );

        Ok(Game {
            box_score: BoxScore::new(sizes),
            recent: VecDeque::with_capacity(config.recent_events),
            teams,
            adjustment,
            config,
            state,
            rotations,
            rng,
            tip_winner,
            closing: false,
            windows_used: 0,
        })
    }

    /// Replace a team's starting five before tip-off.
    pub fn with_starting_lineup(mut self, side: TeamSide, lineup: Lineup) -> Result<Self> {
        let team = &self.teams[side.index()];
        if self.state.possession_index > 0 {
            return Err(SimError::InvalidLineup {
                team: team.team_id.clone(),
                reason: "game already started".into(),
            });
        }
        self.teams[side.index()] = team.clone().with_starters(lineup)?;
        self.state.lineups[side.index()] = lineup;
        Ok(self)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn teams(&self) -> &[TeamProfile; 2] {
        &self.teams
    }

    pub fn adjustment(&self) -> &MatchupAdjustment {
        &self.adjustment
    }

    pub fn box_score(&self) -> &BoxScore {
        &self.box_score
    }

    pub fn rotation(&self, side: TeamSide) -> &RotationManager {
        &self.rotations[side.index()]
    }

    /// Most recent events, oldest first.
    pub fn recent_events(&self) -> impl Iterator<Item = &PossessionEvent> {
        self.recent.iter()
    }

    pub fn tip_winner(&self) -> TeamSide {
        self.tip_winner
    }

    pub fn is_final(&self) -> bool {
        self.state.is_final(&self.config.rules)
    }

    /// Play one computer-controlled possession.
    pub fn play_possession(&mut self) -> Result<Vec<PossessionEvent>> {
        self.play_possession_with(None::<&mut dyn PossessionController>)
    }

    /// Play one possession, handing the offense's decisions to `controller`
    /// when given. Returns the substitutions made before it and every event
    /// of the possession.
    pub fn play_possession_with<C>(&mut self, controller: Option<&mut C>) -> Result<Vec<PossessionEvent>>
    where
        C: PossessionController + ?Sized,
    {
        if self.is_final() {
            return Ok(Vec::new());
        }
        let mut events = self.rotate().map_err(|e| self.abort(e))?;

        let engine = PossessionEngine::new(&self.teams, &self.rotations, &self.config);
        let outcome = match engine.resolve_with(&self.state, controller, &mut self.rng) {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.abort(e)),
        };

        self.state = outcome.state;
        for slice in &outcome.time {
            self.box_score.credit_time(&slice.lineups, slice.seconds);
            for side in TeamSide::BOTH {
                self.rotations[side.index()].credit(&slice.lineups[side.index()], slice.seconds);
            }
        }
        for event in &outcome.events {
            self.box_score.apply(event);
        }
        events.extend(outcome.events);

        for event in &events {
            if self.recent.len() == self.config.recent_events {
                self.recent.pop_front();
            }
            self.recent.push_back(event.clone());
        }

        if self.state.clock <= 0.0 {
            self.end_period().map_err(|e| self.abort(e))?;
        }
        Ok(events)
    }

    /// Play out the current period with every possession simulated.
    pub fn play_period(&mut self) -> Result<Vec<PossessionEvent>> {
        self.play_period_with(None, None::<&mut dyn PossessionController>)
    }

    /// Play out the current period. Possessions of the `controlled` team go
    /// through `controller`; the rest are simulated.
    pub fn play_period_with<C>(
        &mut self,
        controlled: Option<TeamSide>,
        mut controller: Option<&mut C>,
    ) -> Result<Vec<PossessionEvent>>
    where
        C: PossessionController + ?Sized,
    {
        let period = self.state.period;
        let mut events = Vec::new();
        while !self.is_final() && self.state.period == period {
            let ctl = if controlled == Some(self.state.possession) {
                controller.as_deref_mut()
            } else {
                None
            };
            events.extend(self.play_possession_with(ctl)?);
        }
        Ok(events)
    }

    /// Simulate to the final buzzer.
    pub fn simulate(mut self) -> Result<GameResult> {
        while !self.is_final() {
            self.play_possession()?;
        }
        Ok(self.into_result())
    }

    /// Summarize a finished (or abandoned) game.
    pub fn into_result(self) -> GameResult {
        let totals = [self.box_score.totals(TeamSide::Home), self.box_score.totals(TeamSide::Away)];
        let overtimes = self.state.period.saturating_sub(self.config.rules.quarters);
        let [home, away] = self.teams;

        tracing::info!(
            home = %home.display_name,
            away = %away.display_name,
            score = ?self.state.scores,
            overtimes,
            possessions = self.state.possession_index,
            "game final"
        );

        GameResult {
            home_id: home.team_id,
            away_id: away.team_id,
            home: home.display_name,
            away: away.display_name,
            scores: self.state.scores,
            period_scores: self.state.period_scores,
            overtimes,
            possessions: self.state.possession_index,
            adjustment: self.adjustment,
            box_score: self.box_score,
            totals,
        }
    }

    fn abort(&self, err: SimError) -> SimError {
        tracing::error!(
            quarter = self.state.period,
            possession = self.state.possession_index,
            error = %err,
            "game aborted"
        );
        err
    }

    fn swap(&mut self, side: TeamSide, out: usize, incoming: usize, reason: SubReason) -> PossessionEvent {
        self.state.substitute(side, out, incoming);
        PossessionEvent::Substitution {
            team: side,
            player_out: out,
            player_in: incoming,
            reason,
        }
    }

    /// Dead-ball substitutions before the next possession.
    fn rotate(&mut self) -> Result<Vec<PossessionEvent>> {
        let rc = &self.config.rotation;
        let crunch = self.state.period >= self.config.rules.quarters
            && self.state.clock <= rc.closing_seconds
            && self.state.margin() <= rc.closing_margin;
        let max_subs = rc.max_subs_per_window;
        let mut subs = Vec::new();

        if crunch && !self.closing {
            self.closing = true;
            for side in TeamSide::BOTH {
                let i = side.index();
                let desired = self.rotations[i].closing_five(&self.teams[i], &self.state)?;
                let swaps = self.rotations[i].wave(self.state.lineup(side), &desired, ON_COURT);
                for (out, incoming) in swaps {
                    subs.push(self.swap(side, out, incoming, SubReason::ClosingLineup));
                }
            }
            tracing::debug!(period = self.state.period, clock = self.state.clock, subs = subs.len(), "closing lineups");
            return Ok(subs);
        }
        if self.closing {
            return Ok(subs);
        }

        let mut window = false;
        let windows = &self.config.rotation.sub_windows;
        while self.windows_used < windows.len() && self.state.clock <= windows[self.windows_used] {
            self.windows_used += 1;
            window = true;
        }
        if !window {
            return Ok(subs);
        }

        for side in TeamSide::BOTH {
            let i = side.index();
            let desired = self.rotations[i].select_five(&self.teams[i], &self.state, &self.config)?;
            let swaps = self.rotations[i].wave(self.state.lineup(side), &desired, max_subs);
            for (out, incoming) in swaps {
                subs.push(self.swap(side, out, incoming, SubReason::Rotation));
            }
        }
        tracing::debug!(period = self.state.period, clock = self.state.clock, subs = subs.len(), "substitution wave");
        Ok(subs)
    }

    /// Close the current period and set up the next one unless the game is
    /// decided.
    fn end_period(&mut self) -> Result<()> {
        self.state.clock = 0.0;
        self.state.period_scores.push(self.state.scores);
        if self.is_final() {
            return Ok(());
        }

        let quarters = self.config.rules.quarters;
        let next = self.state.period + 1;
        self.state.start_period(next, &self.config.rules);
        self.closing = false;
        self.windows_used = 0;

        self.state.possession = if next > quarters {
            if self.rng.gen::<bool>() {
                TeamSide::Home
            } else {
                TeamSide::Away
            }
        } else if next == quarters {
            self.tip_winner
        } else {
            self.tip_winner.other()
        };

        let period_minutes = self.state.clock / 60.0;
        for side in TeamSide::BOTH {
            let i = side.index();
            self.rotations[i].begin_period(&self.teams[i], period_minutes, &mut self.rng);
            self.state.lineups[i] = self.rotations[i].select_five(&self.teams[i], &self.state, &self.config)?;
        }

        tracing::debug!(period = next, score = ?self.state.scores, possession = ?self.state.possession, "period start");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::possession::{Decision, ScriptedController};
    use crate::profile::fixtures;
    use proptest::prelude::*;

    fn play(seed: u64) -> GameResult {
        let home = fixtures::team("BOS", 1986);
        let away = fixtures::team("LAL", 1987);
        Game::new(&home, &away, SimConfig::default(), Some(seed))
            .unwrap()
            .simulate()
            .unwrap()
    }

    #[test]
    fn test_game_completes_with_untied_score() {
        let result = play(12);
        assert_ne!(result.scores[0], result.scores[1]);
        assert!(result.period_scores.len() >= 4);
        assert_eq!(result.period_scores.last(), Some(&result.scores));
        assert_eq!(result.overtimes as usize, result.period_scores.len() - 4);
        assert!(result.scores.iter().all(|&s| (60..180).contains(&s)), "{:?}", result.scores);
    }

    #[test]
    fn test_scores_match_box_totals() {
        for seed in 0..5 {
            let result = play(seed);
            for side in TeamSide::BOTH {
                let t = &result.totals[side.index()];
                assert_eq!(t.points(), result.scores[side.index()]);
                let line = &t.totals;
                assert_eq!(line.points, 2 * line.two_pt_makes() + 3 * line.tpm + line.ftm);
                assert!((t.fg_pct - line.fgm as f64 / line.fga as f64).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_minutes_sum_to_five_players_of_game_time() {
        let result = play(3);
        let game_seconds = 4.0 * 720.0 + result.overtimes as f64 * 300.0;
        for side in TeamSide::BOTH {
            let total: f64 = result.box_score.lines(side).iter().map(|l| l.seconds).sum();
            assert!((total - 5.0 * game_seconds).abs() < 1e-6, "{total}");
        }
    }

    #[test]
    fn test_fouled_out_players_stay_off_court() {
        let home = fixtures::team("DET", 1989);
        let away = fixtures::team("CHI", 1991);
        let mut cfg = SimConfig::default();
        cfg.possession.non_shooting_foul_rate = 0.15;

        for seed in 0..5 {
            let mut game = Game::new(&home, &away, cfg.clone(), Some(seed)).unwrap();
            while !game.is_final() {
                match game.play_possession() {
                    Ok(_) => {}
                    Err(SimError::EligibilityExhaustion { .. }) => break,
                    Err(e) => panic!("unexpected error {e}"),
                }
                let state = game.state();
                for side in TeamSide::BOTH {
                    for &p in state.lineup(side) {
                        assert!(!state.fouls.is_fouled_out(side, p));
                    }
                    let mut five = *state.lineup(side);
                    five.sort();
                    assert!(five.windows(2).all(|w| w[0] != w[1]));
                }
            }
        }
    }

    #[test]
    fn test_team_fouls_reset_each_period() {
        let home = fixtures::team("PHO", 1993);
        let away = fixtures::team("SEA", 1996);
        let mut game = Game::new(&home, &away, SimConfig::default(), Some(21)).unwrap();
        let mut period = game.state().period;
        let mut last = [0u8; 2];
        while !game.is_final() {
            game.play_possession().unwrap();
            let state = game.state();
            let now = [state.fouls.team_fouls(TeamSide::Home), state.fouls.team_fouls(TeamSide::Away)];
            if state.period != period {
                if !game.is_final() {
                    assert_eq!(now, [0, 0]);
                }
                period = state.period;
            } else {
                assert!(now[0] >= last[0] && now[1] >= last[1]);
            }
            last = now;
        }
    }

    #[test]
    fn test_identical_teams_are_balanced() {
        let team = fixtures::team("SAS", 2005);
        let games = 100;
        let total: i64 = (0..games)
            .map(|seed| {
                Game::new(&team, &team, SimConfig::default(), Some(seed))
                    .unwrap()
                    .simulate()
                    .unwrap()
                    .margin()
            })
            .sum();
        let mean = total as f64 / games as f64;
        assert!(mean.abs() < 5.0, "mean margin {mean}");
    }

    #[test]
    fn test_interactive_round_trip_is_deterministic() {
        let home = fixtures::team("BOS", 2008);
        let away = fixtures::team("LAL", 2009);
        let run = || {
            let mut game = Game::new(&home, &away, SimConfig::default(), Some(99)).unwrap();
            let mut controller =
                ScriptedController::new(vec![Decision::Pass, Decision::ShootThree, Decision::Pass, Decision::ShootTwo]);
            let mut events = Vec::new();
            while !game.is_final() {
                let controlled = if game.state().period % 2 == 1 { Some(TeamSide::Home) } else { None };
                events.extend(game.play_period_with(controlled, Some(&mut controller)).unwrap());
            }
            (events, game.into_result())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_era_gap_adjusts_older_team() {
        let old = fixtures::team("BOS", 1965);
        let new = fixtures::team("GSW", 2024);
        let game = Game::new(&old, &new, SimConfig::default(), Some(1)).unwrap();
        let adj = game.adjustment();
        assert_eq!(adj.shooting_penalties, [0.035, 0.0]);
        assert!((adj.defensive_delta() - 0.03).abs() < 1e-12);

        // Home faces a modern defense (+0.05), away faces a pre-three defense (+0.08)
        let home_two = game.teams()[0].players[0].splits.two;
        let away_two = game.teams()[1].players[0].splits.two;
        assert!((home_two - 0.50 * 0.965 * (1.0 + 0.05 * 0.25)).abs() < 1e-12);
        assert!((away_two - 0.50 * (1.0 + 0.08 * 0.25)).abs() < 1e-12);
    }

    #[test]
    fn test_custom_starting_lineup() {
        let home = fixtures::team("NYK", 1970);
        let away = fixtures::team("BAL", 1971);
        let game = Game::new(&home, &away, SimConfig::default(), Some(5)).unwrap();
        let game = game.with_starting_lineup(TeamSide::Away, [5, 6, 7, 8, 9]).unwrap();
        assert_eq!(game.state().lineup(TeamSide::Away), &[5, 6, 7, 8, 9]);
        assert!(game.clone().with_starting_lineup(TeamSide::Home, [0, 1, 2, 3, 3]).is_err());

        let mut started = game;
        started.play_possession().unwrap();
        assert!(started.with_starting_lineup(TeamSide::Home, [0, 1, 2, 3, 4]).is_err());
    }

    #[test]
    fn test_tied_regulation_goes_to_overtime() {
        let home = fixtures::team("MIA", 2013);
        let away = fixtures::team("SAS", 2014);
        let mut game = Game::new(&home, &away, SimConfig::default(), Some(8)).unwrap();
        game.state.start_period(4, &game.config.rules);
        game.state.scores = [100, 100];
        game.end_period().unwrap();
        assert_eq!(game.state.period, 5);
        assert_eq!(game.state.clock, 300.0);
        assert!(!game.is_final());

        game.state.clock = 0.0;
        game.state.scores = [108, 104];
        game.end_period().unwrap();
        assert!(game.is_final());
        assert_eq!(game.into_result().overtimes, 1);
    }

    #[test]
    fn test_possession_arrow_alternates() {
        let home = fixtures::team("UTA", 1997);
        let away = fixtures::team("CHI", 1997);
        let mut game = Game::new(&home, &away, SimConfig::default(), Some(14)).unwrap();
        let tip = game.tip_winner();
        assert_eq!(game.state().possession, tip);
        let mut openers = Vec::new();
        for _ in 0..3 {
            game.end_period().unwrap();
            openers.push(game.state().possession);
        }
        assert_eq!(openers, vec![tip.other(), tip.other(), tip]);
    }

    #[test]
    fn test_recent_events_window() {
        let home = fixtures::team("HOU", 1994);
        let away = fixtures::team("ORL", 1995);
        let mut game = Game::new(&home, &away, SimConfig::default(), Some(2)).unwrap();
        for _ in 0..30 {
            game.play_possession().unwrap();
            assert!(game.recent_events().count() <= 3);
        }
        assert_eq!(game.recent_events().count(), 3);
    }

    #[test]
    fn test_no_three_shooter_never_attempts_three() {
        let mut roster = fixtures::roster("MIL");
        roster[4].three_pt_pct = 0.0;
        let home = TeamProfile::from_records(&fixtures::team_record("MIL", 1971), &roster).unwrap();
        let center = home.players.iter().position(|p| p.no_three).unwrap();
        let away = fixtures::team("BOS", 1972);
        for seed in 0..5 {
            let result = Game::new(&home, &away, SimConfig::default(), Some(seed))
                .unwrap()
                .simulate()
                .unwrap();
            assert_eq!(result.box_score.line(TeamSide::Home, center).tpa, 0);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_box_score_consistent(seed in any::<u64>()) {
            let home = fixtures::team("POR", 1977);
            let away = fixtures::team("PHI", 2001);
            let result = Game::new(&home, &away, SimConfig::default(), Some(seed))
                .unwrap()
                .simulate()
                .unwrap();
            for side in TeamSide::BOTH {
                for line in result.box_score.lines(side) {
                    prop_assert!(line.fgm <= line.fga);
                    prop_assert!(line.tpm <= line.tpa);
                    prop_assert!(line.tpa <= line.fga);
                    prop_assert!(line.ftm <= line.fta);
                    prop_assert!(line.offensive_rebounds <= line.rebounds);
                    prop_assert!(line.fouls <= 6);
                }
            }
            let shots = result.totals[0].totals.fga + result.totals[1].totals.fga;
            prop_assert!(shots > 0);
        }
    }
}
