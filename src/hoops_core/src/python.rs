//! Python bindings for the terminal UI and the CSV loader.

use pyo3::prelude::*;

use crate::config::SimConfig;
use crate::constants::{FOUL_OUT_LIMIT, OVERTIME_SECONDS, QUARTER_SECONDS, SHOT_CLOCK};
use crate::error::SimError;
use crate::game::{Game, GameResult};
use crate::profile::{PlayerRecord, TeamProfile, TeamRecord};
use crate::season::{Season, StatCategory};

#[pymethods]
impl TeamRecord {
    #[new]
    #[pyo3(signature = (team_id, team_name, year, display_name, pace_rating = 1.0, three_pt_rate = 0.3, def_rating = 1.0))]
    fn py_new(
        team_id: String,
        team_name: String,
        year: u16,
        display_name: String,
        pace_rating: f64,
        three_pt_rate: f64,
        def_rating: f64,
    ) -> Self {
        TeamRecord {
            team_id,
            team_name,
            year,
            display_name,
            pace_rating,
            three_pt_rate,
            def_rating,
        }
    }

    fn __repr__(&self) -> String {
        format!("TeamRecord({:?}, {})", self.team_id, self.year)
    }
}

#[pymethods]
impl PlayerRecord {
    #[new]
    #[allow(clippy::too_many_arguments)]
    fn py_new(
        team_id: String,
        player_name: String,
        fg_pct: f64,
        ft_pct: f64,
        rpg: f64,
        apg: f64,
        position: String,
        two_pt_pct: f64,
        three_pt_pct: f64,
        minutes_pg: f64,
        ppg: f64,
        fta_pg: f64,
        usage_rate: f64,
    ) -> Self {
        PlayerRecord {
            team_id,
            player_name,
            fg_pct,
            ft_pct,
            rpg,
            apg,
            position,
            two_pt_pct,
            three_pt_pct,
            minutes_pg,
            ppg,
            fta_pg,
            usage_rate,
        }
    }

    fn __repr__(&self) -> String {
        format!("PlayerRecord({:?}, {:?})", self.team_id, self.player_name)
    }
}

/// Final score and box score of one game.
#[pyclass(get_all)]
#[derive(Clone, Debug)]
pub struct GameSummary {
    pub home: String,
    pub away: String,
    pub home_score: u32,
    pub away_score: u32,
    pub overtimes: u8,
    pub possessions: u32,
    pub period_scores: Vec<(u32, u32)>,
    /// Full result as JSON, box score included
    pub result_json: String,
}

#[pymethods]
impl GameSummary {
    fn winner(&self) -> String {
        if self.home_score > self.away_score {
            self.home.clone()
        } else {
            self.away.clone()
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "GameSummary({} {} - {} {})",
            self.home, self.home_score, self.away_score, self.away
        )
    }
}

impl GameSummary {
    fn from_result(result: &GameResult) -> PyResult<Self> {
        Ok(GameSummary {
            home: result.home.clone(),
            away: result.away.clone(),
            home_score: result.scores[0],
            away_score: result.scores[1],
            overtimes: result.overtimes,
            possessions: result.possessions,
            period_scores: result.period_scores.iter().map(|s| (s[0], s[1])).collect(),
            result_json: serde_json::to_string(result).map_err(SimError::from)?,
        })
    }
}

#[pyclass(get_all)]
#[derive(Clone, Debug)]
pub struct StandingRow {
    pub team_id: String,
    pub display_name: String,
    pub wins: u32,
    pub losses: u32,
    pub win_pct: f64,
    pub ppg: f64,
    pub opp_ppg: f64,
}

#[pyclass(get_all)]
#[derive(Clone, Debug)]
pub struct SeasonSummary {
    /// Best first
    pub standings: Vec<StandingRow>,
    pub games_played: usize,
    /// Top scorers as JSON player season lines
    pub scoring_leaders_json: String,
}

fn load_config(config_json: Option<&str>) -> PyResult<SimConfig> {
    Ok(match config_json {
        Some(json) => SimConfig::from_json_str(json)?,
        None => SimConfig::default(),
    })
}

fn load_team(team: &TeamRecord, players: &[PlayerRecord]) -> PyResult<TeamProfile> {
    Ok(TeamProfile::from_records(team, players)?)
}

/// Simulate one game between two loaded teams.
#[pyfunction]
#[pyo3(signature = (home, away, players, seed = None, config_json = None))]
fn simulate_game(
    home: TeamRecord,
    away: TeamRecord,
    players: Vec<PlayerRecord>,
    seed: Option<u64>,
    config_json: Option<&str>,
) -> PyResult<GameSummary> {
    let config = load_config(config_json)?;
    let home = load_team(&home, &players)?;
    let away = load_team(&away, &players)?;
    let result = Game::new(&home, &away, config, seed)?.simulate()?;
    GameSummary::from_result(&result)
}

/// Simulate a full round-robin season.
#[pyfunction]
#[pyo3(signature = (teams, players, seed = None, config_json = None))]
fn simulate_season(
    teams: Vec<TeamRecord>,
    players: Vec<PlayerRecord>,
    seed: Option<u64>,
    config_json: Option<&str>,
) -> PyResult<SeasonSummary> {
    let config = load_config(config_json)?;
    let profiles = teams
        .iter()
        .map(|t| load_team(t, &players))
        .collect::<PyResult<Vec<_>>>()?;
    let mut season = Season::round_robin(profiles, config, seed)?;
    let report = season.simulate_remaining(None)?;

    let standings = season
        .standings()
        .into_iter()
        .map(|s| StandingRow {
            team_id: s.team_id.clone(),
            display_name: s.display_name.clone(),
            wins: s.wins,
            losses: s.losses,
            win_pct: s.win_pct(),
            ppg: s.ppg(),
            opp_ppg: s.opp_ppg(),
        })
        .collect();
    let leaders = season.leaders(StatCategory::Points, 1, 10);

    Ok(SeasonSummary {
        standings,
        games_played: report.games_played,
        scoring_leaders_json: serde_json::to_string(&leaders).map_err(SimError::from)?,
    })
}

/// Python module definition
#[pymodule]
fn hoops_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Classes
    m.add_class::<TeamRecord>()?;
    m.add_class::<PlayerRecord>()?;
    m.add_class::<GameSummary>()?;
    m.add_class::<StandingRow>()?;
    m.add_class::<SeasonSummary>()?;

    // Functions
    m.add_function(wrap_pyfunction!(simulate_game, m)?)?;
    m.add_function(wrap_pyfunction!(simulate_season, m)?)?;

    // Constants
    m.add("QUARTER_SECONDS", QUARTER_SECONDS)?;
    m.add("OVERTIME_SECONDS", OVERTIME_SECONDS)?;
    m.add("SHOT_CLOCK", SHOT_CLOCK)?;
    m.add("FOUL_OUT_LIMIT", FOUL_OUT_LIMIT)?;

    Ok(())
}
