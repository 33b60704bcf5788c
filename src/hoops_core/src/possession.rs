//! Possession engine.
//!
//! One call to [`PossessionEngine::resolve`] plays a single possession to
//! completion: from the moment a team gains the ball until it scores, turns
//! it over, loses a defensive rebound or the period runs out. Offensive
//! rebounds and side-out fouls stay inside the same possession.
//!
//! The possession runs as an explicit [`PossessionPhase`] machine over a
//! working copy of the game state. The caller only sees the result once the
//! possession has fully resolved, so an aborted possession leaves the
//! authoritative state untouched.

use rand::distributions::Distribution;
use rand::Rng;
use serde::Serialize;
use statrs::distribution::Normal;

use crate::config::SimConfig;
use crate::constants::era_possession_seconds;
use crate::error::{Result, SimError};
use crate::events::{FoulKind, PossessionEvent, ShotKind, SubReason, TurnoverKind};
use crate::fouls::fouls_intentionally;
use crate::profile::TeamProfile;
use crate::rotation::RotationManager;
use crate::sampling::{chance, uniform_pick, weighted_pick};
use crate::state::{GameState, Lineup, TeamSide};

/// Shortest time any action can take (seconds)
const MIN_ACTION_SECONDS: f64 = 1.0;

/// How much a scorer's own playmaking lowers the chance a make was assisted
const SELF_CREATION_DISCOUNT: f64 = 0.25;

/// A user's choice for the ball handler of a controlled possession.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    Pass,
    ShootTwo,
    ShootThree,
}

/// What a controller sees when asked for a decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionContext {
    pub offense: TeamSide,
    pub ball_handler: usize,
    /// Last player to pass, credited with the assist on a make
    pub passer: Option<usize>,
    pub lineup: Lineup,
    pub shot_clock: f64,
    pub clock: f64,
    pub period: u8,
    pub scores: [u32; 2],
    pub can_shoot_three: bool,
}

/// Source of decisions for a user-controlled possession.
///
/// The engine blocks on `decide` until it returns.
pub trait PossessionController {
    fn decide(&mut self, ctx: &DecisionContext) -> Decision;
}

/// Replays a fixed decision sequence, cycling when it runs out.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedController {
    script: Vec<Decision>,
    next: usize,
}

impl ScriptedController {
    pub fn new(script: Vec<Decision>) -> Self {
        ScriptedController { script, next: 0 }
    }
}

impl PossessionController for ScriptedController {
    fn decide(&mut self, _ctx: &DecisionContext) -> Decision {
        if self.script.is_empty() {
            return Decision::ShootTwo;
        }
        let decision = self.script[self.next % self.script.len()];
        self.next += 1;
        decision
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PossessionPhase {
    Start,
    /// Offense is running clock; `tempo` scales the time to the next action
    ShotClockRunning { tempo: f64 },
    ShotAttempted {
        shooter: usize,
        kind: ShotKind,
        passer: Option<usize>,
        controlled: bool,
    },
    TurnoverForced { ball_handler: Option<usize>, stolen: bool },
    FoulCommitted { victim: usize, kind: FoulKind },
    FreeThrows { shooter: usize, count: u8 },
    /// Live ball after a missed shot or final free throw
    Rebound,
    Resolved { next: TeamSide },
}

/// Clock time that ran with a given pair of fives on the floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeSlice {
    pub seconds: f64,
    pub lineups: [Lineup; 2],
}

/// A fully resolved possession, ready to commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PossessionOutcome {
    pub offense: TeamSide,
    pub state: GameState,
    pub events: Vec<PossessionEvent>,
    pub time: Vec<TimeSlice>,
    pub phases: Vec<PossessionPhase>,
}

impl PossessionOutcome {
    pub fn seconds(&self) -> f64 {
        self.time.iter().map(|t| t.seconds).sum()
    }
}

/// Resolves possessions for one matchup.
///
/// `teams` are the matchup-adjusted profiles indexed by `TeamSide::index()`.
pub struct PossessionEngine<'a> {
    teams: &'a [TeamProfile; 2],
    rotations: &'a [RotationManager; 2],
    config: &'a SimConfig,
}

impl<'a> PossessionEngine<'a> {
    pub fn new(teams: &'a [TeamProfile; 2], rotations: &'a [RotationManager; 2], config: &'a SimConfig) -> Self {
        PossessionEngine { teams, rotations, config }
    }

    /// Play the next possession with every decision sampled.
    pub fn resolve<R: Rng + ?Sized>(&self, state: &GameState, rng: &mut R) -> Result<PossessionOutcome> {
        self.resolve_with(state, None::<&mut dyn PossessionController>, rng)
    }

    /// Play the next possession, asking `controller` for the offense's
    /// pass and shot decisions when one is given.
    pub fn resolve_with<R, C>(
        &self,
        state: &GameState,
        controller: Option<&mut C>,
        rng: &mut R,
    ) -> Result<PossessionOutcome>
    where
        R: Rng + ?Sized,
        C: PossessionController + ?Sized,
    {
        let mut run = Run {
            teams: self.teams,
            rotations: self.rotations,
            cfg: self.config,
            offense: state.possession,
            state: state.clone(),
            events: Vec::new(),
            time: Vec::new(),
            controller,
            rng,
        };

        let mut phases = Vec::new();
        let mut phase = PossessionPhase::Start;
        loop {
            phases.push(phase);
            if let PossessionPhase::Resolved { next } = phase {
                run.state.possession = next;
                run.state.shot_clock = self.config.rules.shot_clock;
                break;
            }
            phase = run.step(phase)?;
        }

        tracing::debug!(
            possession = run.state.possession_index,
            offense = ?run.offense,
            events = run.events.len(),
            score = ?run.state.scores,
            "possession resolved"
        );

        Ok(PossessionOutcome {
            offense: run.offense,
            state: run.state,
            events: run.events,
            time: run.time,
            phases,
        })
    }
}

enum Elapsed {
    Running,
    /// Period clock hit zero
    Buzzer,
    /// Shot clock expired; the turnover has been recorded
    Violation,
}

struct Run<'a, 'c, R: ?Sized, C: ?Sized> {
    teams: &'a [TeamProfile; 2],
    rotations: &'a [RotationManager; 2],
    cfg: &'a SimConfig,
    offense: TeamSide,
    state: GameState,
    events: Vec<PossessionEvent>,
    time: Vec<TimeSlice>,
    controller: Option<&'c mut C>,
    rng: &'c mut R,
}

impl<'a, 'c, R, C> Run<'a, 'c, R, C>
where
    R: Rng + ?Sized,
    C: PossessionController + ?Sized,
{
    fn defense(&self) -> TeamSide {
        self.offense.other()
    }

    fn team(&self, side: TeamSide) -> &'a TeamProfile {
        &self.teams[side.index()]
    }

    fn step(&mut self, phase: PossessionPhase) -> Result<PossessionPhase> {
        match phase {
            PossessionPhase::Start => {
                self.state.possession_index += 1;
                Ok(PossessionPhase::ShotClockRunning { tempo: 1.0 })
            }
            PossessionPhase::ShotClockRunning { tempo } => self.run_clock(tempo),
            PossessionPhase::ShotAttempted {
                shooter,
                kind,
                passer,
                controlled,
            } => self.shoot(shooter, kind, passer, controlled),
            PossessionPhase::TurnoverForced { ball_handler, stolen } => self.turnover(ball_handler, stolen),
            PossessionPhase::FoulCommitted { victim, kind } => self.foul(victim, kind),
            PossessionPhase::FreeThrows { shooter, count } => Ok(self.free_throws(shooter, count)),
            PossessionPhase::Rebound => self.rebound(),
            PossessionPhase::Resolved { next } => Ok(PossessionPhase::Resolved { next }),
        }
    }

    fn consume(&mut self, seconds: f64) {
        let seconds = seconds.clamp(0.0, self.state.clock.max(0.0));
        if seconds > 0.0 {
            self.time.push(TimeSlice {
                seconds,
                lineups: self.state.lineups,
            });
        }
        self.state.clock -= seconds;
        self.state.shot_clock = (self.state.shot_clock - seconds).max(0.0);
    }

    fn elapse(&mut self, seconds: f64) -> Elapsed {
        let shot_clock = self.state.shot_clock;
        if seconds > shot_clock && shot_clock < self.state.clock {
            self.consume(shot_clock);
            self.events.push(PossessionEvent::Turnover {
                team: self.offense,
                player: None,
                kind: TurnoverKind::ShotClockViolation,
                stolen_by: None,
            });
            return Elapsed::Violation;
        }
        if seconds >= self.state.clock {
            self.consume(self.state.clock);
            return Elapsed::Buzzer;
        }
        self.consume(seconds);
        Elapsed::Running
    }

    /// Time until the offense's next action.
    fn action_seconds(&mut self, tempo: f64) -> f64 {
        let team = self.team(self.offense);
        let (lo, hi) = era_possession_seconds(team.year);
        let mean = (lo + hi) / 2.0 / team.pace_rating * tempo;
        let sd = self.cfg.possession.possession_time_sd * tempo;
        let draw = match Normal::new(mean, sd) {
            Ok(dist) => dist.sample(&mut *self.rng),
            Err(_) => mean,
        };
        draw.max(MIN_ACTION_SECONDS)
    }

    fn pick_by_usage(&mut self) -> Result<usize> {
        let team = self.team(self.offense);
        let lineup = *self.state.lineup(self.offense);
        weighted_pick(&mut *self.rng, &lineup, |i| team.players[i].usage_rate, |_| false)
            .ok_or_else(|| SimError::config(&team.team_id, "no eligible shooter on court"))
    }

    fn shot_kind(&mut self, shooter: usize) -> ShotKind {
        let team = self.team(self.offense);
        let player = &team.players[shooter];
        if player.no_three {
            return ShotKind::Two;
        }
        let three_rate = (team.three_pt_rate * player.three_point_tendency).clamp(0.0, 0.95);
        if chance(&mut *self.rng, three_rate) {
            ShotKind::Three
        } else {
            ShotKind::Two
        }
    }

    fn run_clock(&mut self, tempo: f64) -> Result<PossessionPhase> {
        if self.state.clock <= 0.0 {
            return Ok(PossessionPhase::Resolved { next: self.offense });
        }
        if self.controller.is_some() {
            return self.controlled();
        }

        let defense = self.defense();
        let cfg = self.cfg;
        let fouls = &cfg.fouls;
        let intentional = fouls_intentionally(
            self.state.period,
            self.cfg.rules.quarters,
            self.state.clock,
            self.state.deficit(defense),
            fouls,
        ) && chance(&mut *self.rng, fouls.intentional_foul_rate);

        let mut seconds = self.action_seconds(tempo);
        if intentional {
            seconds = seconds.min(fouls.intentional_foul_seconds);
        }
        match self.elapse(seconds) {
            Elapsed::Violation => return Ok(PossessionPhase::Resolved { next: defense }),
            Elapsed::Buzzer if intentional => return Ok(PossessionPhase::Resolved { next: self.offense }),
            _ => {}
        }

        if intentional {
            // Defense sends the worst free-throw shooter on the floor to the line
            let team = self.team(self.offense);
            let lineup = *self.state.lineup(self.offense);
            let victim = lineup
                .iter()
                .copied()
                .min_by(|&a, &b| {
                    team.players[a]
                        .splits
                        .free_throw
                        .total_cmp(&team.players[b].splits.free_throw)
                })
                .unwrap_or(lineup[0]);
            return Ok(PossessionPhase::FoulCommitted {
                victim,
                kind: FoulKind::Intentional,
            });
        }

        let p = &cfg.possession;
        let pace = self.team(self.offense).pace_rating;
        if chance(&mut *self.rng, (p.turnover_rate * pace).min(1.0)) {
            return Ok(PossessionPhase::TurnoverForced {
                ball_handler: None,
                stolen: false,
            });
        }
        if chance(&mut *self.rng, p.non_shooting_foul_rate) {
            let victim = self.pick_by_usage()?;
            return Ok(PossessionPhase::FoulCommitted {
                victim,
                kind: FoulKind::NonShooting,
            });
        }

        let shooter = self.pick_by_usage()?;
        let kind = self.shot_kind(shooter);
        Ok(PossessionPhase::ShotAttempted {
            shooter,
            kind,
            passer: None,
            controlled: false,
        })
    }

    /// Pass/shoot loop for a user-controlled offense.
    fn controlled(&mut self) -> Result<PossessionPhase> {
        let offense = self.offense;
        let team = self.team(offense);
        let lineup = *self.state.lineup(offense);
        let mut handler = lineup
            .iter()
            .copied()
            .max_by(|&a, &b| team.players[a].apg.total_cmp(&team.players[b].apg))
            .unwrap_or(lineup[0]);
        let mut passer = None;

        loop {
            let ctx = DecisionContext {
                offense,
                ball_handler: handler,
                passer,
                lineup,
                shot_clock: self.state.shot_clock,
                clock: self.state.clock,
                period: self.state.period,
                scores: self.state.scores,
                can_shoot_three: !team.players[handler].no_three,
            };
            let decision = match self.controller.as_mut() {
                Some(c) => c.decide(&ctx),
                None => Decision::ShootTwo,
            };

            match decision {
                Decision::Pass => {
                    let (lo, hi) = self.cfg.possession.pass_seconds;
                    let seconds = self.rng.gen_range(lo..=hi);
                    match self.elapse(seconds) {
                        Elapsed::Violation => return Ok(PossessionPhase::Resolved { next: offense.other() }),
                        Elapsed::Buzzer => return Ok(PossessionPhase::Resolved { next: offense }),
                        Elapsed::Running => {}
                    }
                    if chance(&mut *self.rng, self.cfg.possession.pass_steal_rate) {
                        return Ok(PossessionPhase::TurnoverForced {
                            ball_handler: Some(handler),
                            stolen: true,
                        });
                    }
                    let receiver = weighted_pick(
                        &mut *self.rng,
                        &lineup,
                        |i| team.players[i].apg + 1.0,
                        |i| i == handler,
                    )
                    .unwrap_or(handler);
                    passer = Some(handler);
                    handler = receiver;
                }
                Decision::ShootTwo | Decision::ShootThree => {
                    let (lo, hi) = self.cfg.possession.shot_seconds;
                    let seconds = self.rng.gen_range(lo..=hi);
                    if let Elapsed::Violation = self.elapse(seconds) {
                        return Ok(PossessionPhase::Resolved { next: offense.other() });
                    }
                    let kind = if decision == Decision::ShootThree && !team.players[handler].no_three {
                        ShotKind::Three
                    } else {
                        ShotKind::Two
                    };
                    return Ok(PossessionPhase::ShotAttempted {
                        shooter: handler,
                        kind,
                        passer,
                        controlled: true,
                    });
                }
            }
        }
    }

    fn shoot(
        &mut self,
        shooter: usize,
        kind: ShotKind,
        passer: Option<usize>,
        controlled: bool,
    ) -> Result<PossessionPhase> {
        let offense = self.offense;
        let defense = self.defense();
        let cfg = self.cfg;
        let p = &cfg.possession;
        let player = &self.team(offense).players[shooter];

        let block_rate = match kind {
            ShotKind::Two => p.block_rate_two,
            ShotKind::Three => p.block_rate_three,
        };
        if chance(&mut *self.rng, block_rate) {
            let defenders = *self.state.lineup(defense);
            let def_team = self.team(defense);
            let blocker = weighted_pick(&mut *self.rng, &defenders, |i| def_team.players[i].block_weight, |_| false);
            self.events.push(PossessionEvent::ShotAttempt {
                team: offense,
                shooter,
                kind,
                made: false,
                fouled: false,
                blocked_by: blocker,
                assist: None,
            });
            return Ok(PossessionPhase::Rebound);
        }

        let make_p = match kind {
            ShotKind::Two => player.splits.two,
            ShotKind::Three => player.splits.three,
        };
        let made = chance(&mut *self.rng, make_p);
        let foul_p = (player.fta_pg * p.shooting_foul_per_fta).min(p.shooting_foul_cap);
        let fouled = chance(&mut *self.rng, foul_p);

        let assist = match (made, controlled) {
            (false, _) => None,
            (true, true) => passer,
            (true, false) => self.assist(shooter, kind),
        };

        self.events.push(PossessionEvent::ShotAttempt {
            team: offense,
            shooter,
            kind,
            made,
            fouled,
            blocked_by: None,
            assist,
        });
        if made {
            self.state.scores[offense.index()] += kind.points();
        }

        if fouled {
            return Ok(PossessionPhase::FoulCommitted {
                victim: shooter,
                kind: FoulKind::Shooting { shot: kind, made },
            });
        }
        Ok(if made {
            PossessionPhase::Resolved { next: defense }
        } else {
            PossessionPhase::Rebound
        })
    }

    /// Assist on a sampled make.
    ///
    /// The base rate for the shot type is lowered by the scorer's share of
    /// the five's assists per game; the passer is drawn by (apg + 1)^2.
    fn assist(&mut self, shooter: usize, kind: ShotKind) -> Option<usize> {
        let team = self.team(self.offense);
        let lineup = *self.state.lineup(self.offense);
        let total_apg: f64 = lineup.iter().map(|&i| team.players[i].apg).sum();
        let share = if total_apg > 0.0 {
            team.players[shooter].apg / total_apg
        } else {
            0.0
        };
        let base = match kind {
            ShotKind::Two => self.cfg.possession.assist_rate_two,
            ShotKind::Three => self.cfg.possession.assist_rate_three,
        };
        if !chance(&mut *self.rng, base * (1.0 - SELF_CREATION_DISCOUNT * share)) {
            return None;
        }
        weighted_pick(
            &mut *self.rng,
            &lineup,
            |i| (team.players[i].apg + 1.0).powi(2),
            |i| i == shooter,
        )
    }

    fn turnover(&mut self, ball_handler: Option<usize>, stolen: bool) -> Result<PossessionPhase> {
        let offense = self.offense;
        let defense = self.defense();
        let player = match ball_handler {
            Some(p) => p,
            None => self.pick_by_usage()?,
        };
        let stolen = stolen || chance(&mut *self.rng, self.cfg.possession.steal_share);

        let (kind, stolen_by) = if stolen {
            let def_team = self.team(defense);
            let defenders = *self.state.lineup(defense);
            let thief = weighted_pick(&mut *self.rng, &defenders, |i| def_team.players[i].steal_weight, |_| false);
            (TurnoverKind::Steal, thief)
        } else {
            const UNFORCED: [TurnoverKind; 3] = [TurnoverKind::BadPass, TurnoverKind::LostBall, TurnoverKind::Traveling];
            let kind = uniform_pick(&mut *self.rng, &UNFORCED, |_| false).unwrap_or(TurnoverKind::LostBall);
            (kind, None)
        };

        self.events.push(PossessionEvent::Turnover {
            team: offense,
            player: Some(player),
            kind,
            stolen_by,
        });
        Ok(PossessionPhase::Resolved { next: defense })
    }

    fn foul(&mut self, victim: usize, kind: FoulKind) -> Result<PossessionPhase> {
        let defense = self.defense();
        let def_team = self.team(defense);
        let defenders = *self.state.lineup(defense);

        // Players closer to fouling out are less likely to pick up another
        let fouls = &self.state.fouls;
        let limit = fouls.foul_out_limit();
        let fouler = weighted_pick(
            &mut *self.rng,
            &defenders,
            |i| limit.saturating_sub(fouls.personal_fouls(defense, i)) as f64,
            |i| fouls.is_fouled_out(defense, i),
        )
        .ok_or_else(|| SimError::config(&def_team.team_id, "no eligible defender on court"))?;

        let record = self.state.fouls.record(defense, fouler, kind);
        self.events.push(PossessionEvent::Foul {
            team: defense,
            fouler,
            victim,
            kind,
            personal_fouls: record.personal_fouls,
            team_fouls: record.team_fouls,
            fouled_out: record.fouled_out,
            free_throws: record.free_throws,
        });

        if record.fouled_out {
            self.replace_fouled_out(defense, fouler)?;
        } else if self.rotations[defense.index()].in_trouble(def_team, &self.state, self.cfg, fouler) {
            self.bench_for_trouble(defense, fouler);
        }

        if record.free_throws == 0 {
            let reset = self.cfg.rules.offensive_rebound_shot_clock;
            self.state.shot_clock = self.state.shot_clock.max(reset);
            return Ok(PossessionPhase::ShotClockRunning {
                tempo: self.cfg.possession.side_out_tempo,
            });
        }
        Ok(PossessionPhase::FreeThrows {
            shooter: victim,
            count: record.free_throws,
        })
    }

    fn substitute(&mut self, side: TeamSide, out: usize, incoming: usize, reason: SubReason) {
        self.state.substitute(side, out, incoming);
        self.events.push(PossessionEvent::Substitution {
            team: side,
            player_out: out,
            player_in: incoming,
            reason,
        });
    }

    fn replace_fouled_out(&mut self, side: TeamSide, out: usize) -> Result<()> {
        let team = self.team(side);
        let rotation = &self.rotations[side.index()];
        match rotation.replacement(team, &self.state, self.cfg, out, true) {
            Some(incoming) => {
                self.substitute(side, out, incoming, SubReason::FouledOut);
                Ok(())
            }
            None => {
                let available = (0..team.players.len())
                    .filter(|&p| !self.state.fouls.is_fouled_out(side, p))
                    .count();
                Err(SimError::EligibilityExhaustion {
                    team: team.display_name.clone(),
                    available,
                    quarter: self.state.period,
                    possession: self.state.possession_index,
                })
            }
        }
    }

    fn bench_for_trouble(&mut self, side: TeamSide, out: usize) {
        let team = self.team(side);
        if let Some(incoming) = self.rotations[side.index()].replacement(team, &self.state, self.cfg, out, false) {
            self.substitute(side, out, incoming, SubReason::FoulTrouble);
        }
    }

    fn free_throws(&mut self, shooter: usize, count: u8) -> PossessionPhase {
        let offense = self.offense;
        let pct = self.team(offense).players[shooter].splits.free_throw;
        let mut last_made = true;
        for attempt in 1..=count {
            let made = chance(&mut *self.rng, pct);
            self.events.push(PossessionEvent::FreeThrow {
                team: offense,
                shooter,
                made,
                attempt,
                of: count,
            });
            if made {
                self.state.scores[offense.index()] += 1;
            }
            last_made = made;
        }
        if last_made {
            PossessionPhase::Resolved { next: offense.other() }
        } else {
            PossessionPhase::Rebound
        }
    }

    /// Offensive rebound chance is the base rate scaled by the offense's
    /// share of the ten players' rebounds per game.
    fn rebound(&mut self) -> Result<PossessionPhase> {
        let offense = self.offense;
        let defense = self.defense();
        let rpg = |side: TeamSide| -> f64 {
            let team = self.team(side);
            self.state.lineup(side).iter().map(|&i| team.players[i].rpg).sum()
        };
        let (off_rpg, def_rpg) = (rpg(offense), rpg(defense));
        let base = self.cfg.possession.offensive_rebound_base;
        let p_offensive = if off_rpg + def_rpg > 0.0 {
            (base * 2.0 * off_rpg / (off_rpg + def_rpg)).clamp(0.05, 0.6)
        } else {
            base
        };
        let offensive = chance(&mut *self.rng, p_offensive);

        let side = if offensive { offense } else { defense };
        let team = self.team(side);
        let lineup = *self.state.lineup(side);
        let player = weighted_pick(&mut *self.rng, &lineup, |i| team.players[i].rpg + 1.0, |_| false)
            .ok_or_else(|| SimError::config(&team.team_id, "no rebounder on court"))?;
        self.events.push(PossessionEvent::Rebound {
            team: side,
            player,
            offensive,
        });

        if offensive {
            self.state.shot_clock = self.cfg.rules.offensive_rebound_shot_clock;
            Ok(PossessionPhase::ShotClockRunning {
                tempo: self.cfg.possession.putback_tempo,
            })
        } else {
            Ok(PossessionPhase::Resolved { next: defense })
        }
    }
}
