//! Headless autopilot: plays a game with a simple policy and prints each
//! turn report as JSON.

use std::env;

use anyhow::{Context, Result};
use creature::Creature;
use frog_adventure::{ActionKind, EngineConfig, GameEngine, Priority};
use save::FileSaveSystem;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const DIRECTIONS: [&str; 4] = ["north", "east", "south", "west"];

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "frog_adventure=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let save_dir = env::var("FROG_SAVE_DIR").unwrap_or_else(|_| "saves".to_string());
    let turns: u32 = match env::var("FROG_DEMO_TURNS") {
        Ok(raw) => raw.trim().parse().context("FROG_DEMO_TURNS must be a number")?,
        Err(_) => 30,
    };

    let game_id = format!("demo_{}", Uuid::new_v4().simple());
    let saves = FileSaveSystem::new(&save_dir)
        .with_context(|| format!("cannot use save directory {}", save_dir))?;
    let mut engine = GameEngine::new(game_id.as_str(), config).with_persistence(saves);

    let creature = engine.start_new_game(None)?;
    tracing::info!(
        game_id = %game_id,
        creature = %creature.name,
        kind = %creature.display_type(),
        "demo started"
    );

    for turn in 0..turns {
        if let Some(creature) = engine.current_creature() {
            let (kind, priority) = choose_action(creature, turn);
            engine.queue_action(kind, priority);
        }

        let report = match engine.process_turn() {
            Ok(report) => report,
            Err(rejected) => {
                tracing::info!(status = %rejected.status, "demo stopped");
                break;
            }
        };
        println!("{}", serde_json::to_string(&report)?);

        if let Some(result) = report.game_result {
            tracing::info!(outcome = ?result.outcome, reason = %result.reason, "demo finished");
            break;
        }
    }

    println!("{}", serde_json::to_string(&engine.stats())?);
    Ok(())
}

/// Rest when low, feed when glum, otherwise mostly go adventuring.
fn choose_action(creature: &Creature, turn: u32) -> (ActionKind, Priority) {
    if creature.energy() < 35 {
        return (ActionKind::Rest {}, Priority::High);
    }
    if creature.happiness() < 40 {
        let food = creature
            .items()
            .iter()
            .next()
            .cloned()
            .unwrap_or_else(|| "Fly".to_string());
        return (ActionKind::Feed { food }, Priority::Normal);
    }
    if creature.can_use_ability() && turn % 4 == 3 {
        return (
            ActionKind::UseAbility {
                ability: creature.ability.clone(),
            },
            Priority::Normal,
        );
    }
    match turn % 3 {
        0 | 1 => (
            ActionKind::Adventure {
                scenario_id: format!("scenario_{}", turn),
            },
            Priority::Normal,
        ),
        _ => (
            ActionKind::Move {
                direction: DIRECTIONS[turn as usize % DIRECTIONS.len()].to_string(),
            },
            Priority::Low,
        ),
    }
}
