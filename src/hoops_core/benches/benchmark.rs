use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hoops_core::config::SimConfig;
use hoops_core::game::Game;
use hoops_core::profile::{PlayerRecord, TeamProfile, TeamRecord};
use hoops_core::season::Season;

fn create_team(team_id: &str, year: u16, strength: f64) -> TeamProfile {
    let team = TeamRecord {
        team_id: team_id.to_string(),
        team_name: format!("{year} {team_id}"),
        year,
        display_name: team_id.to_string(),
        pace_rating: 0.95 + strength / 10.0,
        three_pt_rate: 0.25 + strength / 10.0,
        def_rating: 1.0 - strength / 20.0,
    };

    let rotation = [
        ("PG", 24.0, 36.0),
        ("SG", 18.0, 33.0),
        ("SF", 15.0, 32.0),
        ("PF", 12.0, 30.0),
        ("C", 10.0, 28.0),
        ("SG", 8.0, 20.0),
        ("PF", 6.0, 18.0),
        ("PG", 5.0, 15.0),
        ("C", 4.0, 14.0),
        ("SF", 2.0, 8.0),
    ];
    let players: Vec<PlayerRecord> = rotation
        .iter()
        .enumerate()
        .map(|(i, (pos, ppg, min))| PlayerRecord {
            team_id: team_id.to_string(),
            player_name: format!("{team_id} P{i}"),
            fg_pct: 44.0 + strength * 5.0,
            ft_pct: 76.0,
            rpg: 5.0,
            apg: 3.0,
            position: pos.to_string(),
            two_pt_pct: 48.0 + strength * 5.0,
            three_pt_pct: 34.0,
            minutes_pg: *min,
            ppg: *ppg,
            fta_pg: 3.0,
            usage_rate: 20.0,
        })
        .collect();

    TeamProfile::from_records(&team, &players).unwrap()
}

fn create_league(size: usize) -> Vec<TeamProfile> {
    (0..size)
        .map(|i| {
            let year = 1965 + (i as u16 * 7) % 55;
            create_team(&format!("T{i}"), year, i as f64 / size as f64)
        })
        .collect()
}

fn bench_single_game(c: &mut Criterion) {
    let home = create_team("BOS", 1986, 0.8);
    let away = create_team("GSW", 2017, 0.9);
    let config = SimConfig::default();

    c.bench_function("single_game", |b| {
        b.iter(|| {
            Game::new(black_box(&home), black_box(&away), config.clone(), Some(42))
                .and_then(Game::simulate)
                .unwrap()
        })
    });
}

fn bench_possession(c: &mut Criterion) {
    let home = create_team("BOS", 1986, 0.8);
    let away = create_team("GSW", 2017, 0.9);

    c.bench_function("first_quarter", |b| {
        b.iter(|| {
            let mut game = Game::new(&home, &away, SimConfig::default(), Some(7)).unwrap();
            black_box(game.play_period().unwrap())
        })
    });
}

fn bench_season(c: &mut Criterion) {
    // Smaller league keeps the round robin to 28 games per iteration
    let teams = create_league(8);
    let mut group = c.benchmark_group("season");
    group.sample_size(10);

    group.bench_function("round_robin_8_teams", |b| {
        b.iter(|| {
            let mut season = Season::round_robin(teams.clone(), SimConfig::default(), Some(42)).unwrap();
            black_box(season.simulate_remaining(None).unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_single_game, bench_possession, bench_season,);
criterion_main!(benches);
