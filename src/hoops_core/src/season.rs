//! Season mode: round-robin schedule, standings and player season lines.
//!
//! Games are independent, so the remaining schedule can be simulated in
//! parallel. Results are folded into the standings one at a time in
//! schedule order.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::boxscore::BoxScoreLine;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::game::{Game, GameResult};
use crate::profile::{Position, TeamProfile};
use crate::state::TeamSide;

/// One scheduled game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fixture {
    /// 1-based week; a team plays at most once per week
    pub week: u32,
    pub home: String,
    pub away: String,
}

/// Every pairing once, shuffled and packed into weeks.
pub fn round_robin_schedule<R: Rng + ?Sized>(team_ids: &[String], rng: &mut R) -> Vec<Fixture> {
    let mut remaining: Vec<(usize, usize)> = (0..team_ids.len())
        .flat_map(|a| (a + 1..team_ids.len()).map(move |b| (a, b)))
        .collect();
    remaining.shuffle(rng);

    let mut schedule = Vec::with_capacity(remaining.len());
    let mut week = 0;
    while !remaining.is_empty() {
        week += 1;
        let mut busy = HashSet::new();
        remaining.retain(|&(a, b)| {
            if busy.contains(&a) || busy.contains(&b) {
                return true;
            }
            busy.insert(a);
            busy.insert(b);
            schedule.push(Fixture {
                week,
                home: team_ids[a].clone(),
                away: team_ids[b].clone(),
            });
            false
        });
    }
    schedule
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StandingsEntry {
    pub team_id: String,
    pub display_name: String,
    pub wins: u32,
    pub losses: u32,
    pub points_for: u32,
    pub points_against: u32,
}

impl StandingsEntry {
    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    pub fn win_pct(&self) -> f64 {
        match self.games() {
            0 => 0.0,
            g => self.wins as f64 / g as f64,
        }
    }

    pub fn ppg(&self) -> f64 {
        match self.games() {
            0 => 0.0,
            g => self.points_for as f64 / g as f64,
        }
    }

    pub fn opp_ppg(&self) -> f64 {
        match self.games() {
            0 => 0.0,
            g => self.points_against as f64 / g as f64,
        }
    }

    /// Average scoring margin per game.
    pub fn point_diff(&self) -> f64 {
        self.ppg() - self.opp_ppg()
    }

    fn record(&mut self, points_for: u32, points_against: u32) {
        self.points_for += points_for;
        self.points_against += points_against;
        if points_for > points_against {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
    }
}

/// A player's accumulated season statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSeasonLine {
    pub team_id: String,
    pub player_name: String,
    pub position: Position,
    /// Games in which the player logged minutes
    pub games: u32,
    pub totals: BoxScoreLine,
}

impl PlayerSeasonLine {
    fn per_game(&self, total: f64) -> f64 {
        total / self.games.max(1) as f64
    }

    pub fn ppg(&self) -> f64 {
        self.per_game(self.totals.points as f64)
    }

    pub fn rpg(&self) -> f64 {
        self.per_game(self.totals.rebounds as f64)
    }

    pub fn apg(&self) -> f64 {
        self.per_game(self.totals.assists as f64)
    }

    pub fn spg(&self) -> f64 {
        self.per_game(self.totals.steals as f64)
    }

    pub fn bpg(&self) -> f64 {
        self.per_game(self.totals.blocks as f64)
    }

    pub fn mpg(&self) -> f64 {
        self.per_game(self.totals.minutes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatCategory {
    Points,
    Rebounds,
    Assists,
    Steals,
    Blocks,
    Minutes,
}

impl StatCategory {
    pub fn per_game(self, line: &PlayerSeasonLine) -> f64 {
        match self {
            StatCategory::Points => line.ppg(),
            StatCategory::Rebounds => line.rpg(),
            StatCategory::Assists => line.apg(),
            StatCategory::Steals => line.spg(),
            StatCategory::Blocks => line.bpg(),
            StatCategory::Minutes => line.mpg(),
        }
    }
}

/// Outcome of a bulk simulation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeasonReport {
    /// Games folded into the standings by this call
    pub games_played: usize,
    pub cancelled: bool,
    /// Scheduled games still unplayed
    pub remaining: usize,
}

pub struct Season {
    teams: Vec<TeamProfile>,
    index: HashMap<String, usize>,
    schedule: Vec<Fixture>,
    /// One game seed per fixture, fixed up front
    seeds: Vec<u64>,
    next: usize,
    standings: Vec<StandingsEntry>,
    players: Vec<Vec<PlayerSeasonLine>>,
    config: SimConfig,
}

impl Season {
    /// Season over an explicit schedule.
    pub fn new(teams: Vec<TeamProfile>, schedule: Vec<Fixture>, config: SimConfig, seed: Option<u64>) -> Result<Self> {
        let mut rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::build(teams, schedule, config, &mut rng)
    }

    /// Season in which every team meets every other team once.
    pub fn round_robin(teams: Vec<TeamProfile>, config: SimConfig, seed: Option<u64>) -> Result<Self> {
        let mut rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        let ids: Vec<String> = teams.iter().map(|t| t.team_id.clone()).collect();
        let schedule = round_robin_schedule(&ids, &mut rng);
        Self::build(teams, schedule, config, &mut rng)
    }

    fn build(teams: Vec<TeamProfile>, schedule: Vec<Fixture>, config: SimConfig, rng: &mut ChaCha8Rng) -> Result<Self> {
        config.validate()?;
        let mut index = HashMap::with_capacity(teams.len());
        for (i, team) in teams.iter().enumerate() {
            if index.insert(team.team_id.clone(), i).is_some() {
                return Err(SimError::config(&team.team_id, "team listed twice in season"));
            }
        }
        for fixture in &schedule {
            for id in [&fixture.home, &fixture.away] {
                if !index.contains_key(id) {
                    return Err(SimError::UnknownTeam(id.clone()));
                }
            }
            if fixture.home == fixture.away {
                return Err(SimError::config(&fixture.home, "scheduled against itself"));
            }
        }

        let standings = teams
            .iter()
            .map(|t| StandingsEntry {
                team_id: t.team_id.clone(),
                display_name: t.display_name.clone(),
                ..Default::default()
            })
            .collect();
        let players = teams
            .iter()
            .map(|t| {
                t.players
                    .iter()
                    .map(|p| PlayerSeasonLine {
                        team_id: t.team_id.clone(),
                        player_name: p.name.clone(),
                        position: p.position,
                        games: 0,
                        totals: BoxScoreLine::default(),
                    })
                    .collect()
            })
            .collect();
        let seeds = schedule.iter().map(|_| rng.gen::<u64>()).collect();

        Ok(Season {
            teams,
            index,
            schedule,
            seeds,
            next: 0,
            standings,
            players,
            config,
        })
    }

    pub fn schedule(&self) -> &[Fixture] {
        &self.schedule
    }

    pub fn next_fixture(&self) -> Option<&Fixture> {
        self.schedule.get(self.next)
    }

    pub fn games_played(&self) -> usize {
        self.next
    }

    pub fn is_complete(&self) -> bool {
        self.next >= self.schedule.len()
    }

    pub fn team(&self, team_id: &str) -> Option<&TeamProfile> {
        self.index.get(team_id).map(|&i| &self.teams[i])
    }

    /// Index of the next fixture involving `team_id`.
    pub fn next_game_for(&self, team_id: &str) -> Option<usize> {
        self.schedule[self.next..]
            .iter()
            .position(|f| f.home == team_id || f.away == team_id)
            .map(|k| self.next + k)
    }

    fn game_for(&self, fixture: usize) -> Result<Game> {
        let f = &self.schedule[fixture];
        let home = &self.teams[self.index[&f.home]];
        let away = &self.teams[self.index[&f.away]];
        Game::new(home, away, self.config.clone(), Some(self.seeds[fixture]))
    }

    /// Set up the next scheduled game for the caller to play, for example
    /// interactively. Hand the finished result back through [`Season::record`].
    pub fn next_game(&self) -> Result<Option<Game>> {
        if self.is_complete() {
            return Ok(None);
        }
        self.game_for(self.next).map(Some)
    }

    /// Fold the result of the next scheduled game into the standings.
    pub fn record(&mut self, result: &GameResult) -> Result<()> {
        let fixture = self
            .next_fixture()
            .ok_or_else(|| SimError::InvalidConfig("season already complete".into()))?;
        if fixture.home != result.home_id || fixture.away != result.away_id {
            return Err(SimError::InvalidConfig(format!(
                "result {} vs {} does not match next fixture {} vs {}",
                result.home_id, result.away_id, fixture.home, fixture.away
            )));
        }
        self.apply(result);
        self.next += 1;
        Ok(())
    }

    /// Simulate and record the next scheduled game.
    pub fn play_next(&mut self) -> Result<Option<GameResult>> {
        let Some(game) = self.next_game()? else {
            return Ok(None);
        };
        let result = game.simulate()?;
        self.record(&result)?;
        Ok(Some(result))
    }

    /// Simulate every game before the next one involving `team_id`, so a
    /// followed team can play its own game next.
    pub fn simulate_until(&mut self, team_id: &str) -> Result<usize> {
        let stop = self.next_game_for(team_id).unwrap_or(self.schedule.len());
        let mut played = 0;
        while self.next < stop {
            self.play_next()?;
            played += 1;
        }
        Ok(played)
    }

    /// Simulate the rest of the schedule in parallel.
    ///
    /// Setting `cancel` stops the run between games: games are folded in
    /// schedule order up to the first one that did not run, and the season
    /// can be resumed from there.
    pub fn simulate_remaining(&mut self, cancel: Option<&AtomicBool>) -> Result<SeasonReport> {
        let start = self.next;
        tracing::info!(games = self.schedule.len() - start, "simulating season");

        let results: Vec<Option<Result<GameResult>>> = (start..self.schedule.len())
            .into_par_iter()
            .map(|fixture| {
                if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                    return None;
                }
                Some(self.game_for(fixture).and_then(Game::simulate))
            })
            .collect();

        let mut cancelled = false;
        for result in results {
            match result {
                Some(Ok(result)) => {
                    self.apply(&result);
                    self.next += 1;
                }
                Some(Err(e)) => return Err(e),
                None => {
                    cancelled = true;
                    break;
                }
            }
        }

        let report = SeasonReport {
            games_played: self.next - start,
            cancelled,
            remaining: self.schedule.len() - self.next,
        };
        if cancelled {
            tracing::warn!(played = report.games_played, remaining = report.remaining, "season run cancelled");
        } else {
            tracing::info!(played = report.games_played, "season run complete");
        }
        Ok(report)
    }

    fn apply(&mut self, result: &GameResult) {
        let sides = [(TeamSide::Home, &result.home_id), (TeamSide::Away, &result.away_id)];
        for (side, id) in sides {
            let Some(&t) = self.index.get(id) else {
                continue;
            };
            let i = side.index();
            self.standings[t].record(result.scores[i], result.scores[1 - i]);
            for (line, game_line) in self.players[t].iter_mut().zip(result.box_score.lines(side)) {
                if game_line.played() {
                    line.games += 1;
                }
                line.totals.add(game_line);
            }
        }
    }

    /// Standings, best first: win percentage, then point differential.
    pub fn standings(&self) -> Vec<&StandingsEntry> {
        let mut rows: Vec<&StandingsEntry> = self.standings.iter().collect();
        rows.sort_by(|a, b| {
            b.win_pct()
                .total_cmp(&a.win_pct())
                .then_with(|| b.point_diff().total_cmp(&a.point_diff()))
        });
        rows
    }

    pub fn player_lines(&self) -> impl Iterator<Item = &PlayerSeasonLine> {
        self.players.iter().flatten()
    }

    /// Top `limit` players by per-game `category` among those with at least
    /// `min_games` games.
    pub fn leaders(&self, category: StatCategory, min_games: u32, limit: usize) -> Vec<&PlayerSeasonLine> {
        let mut lines: Vec<&PlayerSeasonLine> = self.player_lines().filter(|l| l.games >= min_games).collect();
        lines.sort_by(|a, b| category.per_game(b).total_cmp(&category.per_game(a)));
        lines.truncate(limit);
        lines
    }
}
