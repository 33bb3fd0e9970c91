use anyhow::{Context, Result, anyhow};
use chrono::Local;
use serde::Serialize;

use fixture_forecast::fixture_rank::{UpcomingFixture, group_by_league};
use fixture_forecast::form::form_string;
use fixture_forecast::logging::init_tracing;
use fixture_forecast::{DataPaths, EngineConfig, Prediction, PredictionEngine};

const USAGE: &str = "usage: fixture_forecast [upcoming] [--json]
       fixture_forecast predict <HOME> <AWAY> [--json]
       fixture_forecast config";

#[derive(Serialize)]
struct ConfigDump<'a> {
    paths: &'a DataPaths,
    engine: &'a EngineConfig,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing()?;

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let json = args.iter().any(|a| a == "--json");
    let positional = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .collect::<Vec<_>>();

    let paths = DataPaths::from_env();
    let config = EngineConfig::from_env();

    match positional.as_slice() {
        ["config"] => {
            let dump = ConfigDump {
                paths: &paths,
                engine: &config,
            };
            println!("{}", serde_json::to_string_pretty(&dump)?);
            Ok(())
        }
        ["predict", home, away] => {
            let engine = PredictionEngine::from_paths(&paths, config)?;
            let prediction = engine
                .predict(home, away)
                .with_context(|| format!("predict {home} vs {away}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            } else {
                print_prediction(&prediction);
            }
            Ok(())
        }
        [] | ["upcoming"] => {
            let engine = PredictionEngine::from_paths(&paths, config)?;
            let fixtures = engine
                .load_upcoming(&paths.upcoming_csv)
                .with_context(|| format!("load fixtures from {}", paths.upcoming_csv.display()))?;
            let now = Local::now().naive_local();
            let predicted = engine.rank_and_predict(&fixtures, now);
            if json {
                println!("{}", serde_json::to_string_pretty(&predicted)?);
            } else {
                print_upcoming(predicted);
            }
            Ok(())
        }
        _ => Err(anyhow!("unrecognized arguments\n{USAGE}")),
    }
}

fn print_upcoming(predicted: Vec<(UpcomingFixture, Prediction)>) {
    if predicted.is_empty() {
        println!("No upcoming fixtures.");
        return;
    }
    for (league, rows) in group_by_league(predicted, |(f, _)| f.league.as_str()) {
        println!("== {league} ==");
        for (fixture, p) in rows {
            println!(
                "{}  {} vs {}  H {:.1}% D {:.1}% A {:.1}%  {}",
                fixture.kickoff.format("%a %d %b %H:%M"),
                fixture.home,
                fixture.away,
                p.home_win_pct,
                p.draw_pct,
                p.away_win_pct,
                p.predicted_score
            );
        }
        println!();
    }
}

fn print_prediction(p: &Prediction) {
    println!("{} vs {}", p.home, p.away);
    println!(
        "Expected goals: {:.2} - {:.2}",
        p.expected_goals.home, p.expected_goals.away
    );
    println!("Home: {:.1}%", p.home_win_pct);
    println!("Draw: {:.1}%", p.draw_pct);
    println!("Away: {:.1}%", p.away_win_pct);
    println!("Predicted score: {}", p.predicted_score);
    println!("BTTS: {} ({:.1}%)", p.btts_label(), p.btts_pct);
    println!(
        "Goals: {} ({:.1}% over, {:.1}% under)",
        p.over_2_5_label(),
        p.over_2_5_pct,
        p.under_2_5_pct
    );
    println!("Form {}: {}", p.home, form_string(&p.home_form));
    println!("Form {}: {}", p.away, form_string(&p.away_form));
    for m in &p.head_to_head {
        println!(
            "  {}  {} {} {}",
            m.kickoff.format("%Y-%m-%d"),
            m.home,
            m.score_label(),
            m.away
        );
    }
}
