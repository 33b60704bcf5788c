/// Regulation quarters per game
pub const QUARTERS: u8 = 4;

/// Length of a regulation quarter (seconds)
pub const QUARTER_SECONDS: f64 = 720.0;

/// Length of an overtime period (seconds)
pub const OVERTIME_SECONDS: f64 = 300.0;

/// Full shot clock (seconds)
pub const SHOT_CLOCK: f64 = 24.0;

/// Shot clock after an offensive rebound (seconds)
pub const OFFENSIVE_REBOUND_SHOT_CLOCK: f64 = 14.0;

/// Personal fouls that disqualify a player
pub const FOUL_OUT_LIMIT: u8 = 6;

/// Team fouls in a period after which non-shooting fouls award free throws
pub const BONUS_THRESHOLD: u8 = 5;

/// Players on court per team
pub const ON_COURT: usize = 5;

/// Minutes in a regulation game
pub const GAME_MINUTES: f64 = 48.0;

/// Defensive-rating modifier per era, indexed by `Era::index()`.
/// Positive values mean a weaker defense.
pub const ERA_DEFENSE_MODIFIERS: [f64; 4] = [0.08, -0.05, 0.00, 0.05];

/// Shooting penalty per calendar decade of separation (fraction)
pub const SHOOTING_PENALTY_PER_DECADE: f64 = 0.005;

/// Maximum cross-era shooting penalty (fraction)
pub const SHOOTING_PENALTY_CAP: f64 = 0.035;

/// Base possession length (min, max seconds) for a team's year
pub fn era_possession_seconds(year: u16) -> (f64, f64) {
    match year {
        y if y < 1980 => (10.0, 15.0),
        y if y < 1990 => (12.0, 16.0),
        y if y < 2010 => (14.0, 18.0),
        _ => (13.0, 17.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_possession_seconds_by_decade() {
        assert_eq!(era_possession_seconds(1972), (10.0, 15.0));
        assert_eq!(era_possession_seconds(1986), (12.0, 16.0));
        assert_eq!(era_possession_seconds(1996), (14.0, 18.0));
        assert_eq!(era_possession_seconds(2016), (13.0, 17.0));
    }

    #[test]
    fn test_penalty_cap_is_seven_decades() {
        let decades = SHOOTING_PENALTY_CAP / SHOOTING_PENALTY_PER_DECADE;
        assert!((decades - 7.0).abs() < 1e-9);
    }
}
