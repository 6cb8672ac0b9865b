mod helpers;

use frog_adventure::{ActionKind, GameState, GameStatus, Priority};
use helpers::TestEngineBuilder;
use pretty_assertions::assert_eq;
use save::{FileSaveSystem, MemoryPersistence, Persistence};
use tempfile::tempdir;

/// Persistence that always fails
struct BrokenDisk;

impl Persistence<GameState> for BrokenDisk {
    fn save(&mut self, _game_id: &str, _state: &GameState) -> bool {
        false
    }

    fn load(&mut self, _game_id: &str) -> Option<GameState> {
        None
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

#[test]
fn start_and_every_fifth_turn_hit_disk() {
    let dir = tempdir().unwrap();
    let saves = FileSaveSystem::new(dir.path()).unwrap();
    let mut engine = TestEngineBuilder::new(21)
        .game_id("disk_game")
        .start_with(saves.clone());

    let listed = saves.list_saves().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].game_id, "disk_game");
    assert_eq!(listed[0].turn_number, 0);
    assert_eq!(listed[0].creature_name.as_deref(), Some("Hopper"));

    for _ in 0..5 {
        engine.queue_action(ActionKind::Rest {}, Priority::Normal);
        engine.process_turn().unwrap();
    }

    let data = saves.load_game::<GameState>("disk_game").unwrap();
    assert_eq!(data.metadata.turn_number, 5);
    assert_eq!(data.state.turn_number, 5);
    assert_eq!(data.state.progress.rests_taken, 5);
    assert_eq!(engine.bus().events_by_type("save_game").len(), 2);
}

#[test]
fn load_restores_a_saved_game() {
    let dir = tempdir().unwrap();
    let saves = FileSaveSystem::new(dir.path()).unwrap();

    let mut original = TestEngineBuilder::new(22)
        .game_id("pond")
        .items(&["Stardust"])
        .start_with(saves.clone());
    original.process_turn().unwrap();
    original.pause().unwrap();
    assert!(original.save());

    let mut restored = TestEngineBuilder::new(99)
        .game_id("pond")
        .build()
        .with_persistence(saves);
    assert!(restored.load().unwrap());

    assert_eq!(restored.state(), original.state());
    assert_eq!(restored.state().status, GameStatus::Paused);
    assert!(restored.current_creature().unwrap().has_item("Stardust"));
    assert_eq!(restored.bus().events_by_type("game_loaded").len(), 1);

    restored.resume().unwrap();
    assert_eq!(restored.process_turn().unwrap().turn_number, 2);
}

#[test]
fn missing_save_loads_nothing() {
    let mut engine = TestEngineBuilder::new(23)
        .build()
        .with_persistence(MemoryPersistence::new());
    assert!(!engine.load().unwrap());
    assert_eq!(engine.state().status, GameStatus::New);
}

#[test]
fn failed_saves_do_not_interrupt_play() {
    let mut engine = TestEngineBuilder::new(24)
        .configure(|c| c.autosave_interval = 1)
        .start_with(BrokenDisk);

    for turn in 1..=3 {
        let report = engine.process_turn().unwrap();
        assert_eq!(report.turn_number, turn);
    }
    assert!(!engine.save());
    assert_eq!(engine.bus().events_by_type("save_game").len(), 5);
}

#[test]
fn memory_saves_are_isolated_from_later_changes() {
    let mut engine = TestEngineBuilder::new(25)
        .game_id("mem")
        .start_with(MemoryPersistence::new());
    let snapshot = engine.state().clone();

    engine.process_turn().unwrap();
    assert!(engine.load().unwrap());
    assert_eq!(engine.state(), &snapshot);
}

#[test]
fn tampered_creature_in_save_file_is_rejected() {
    let dir = tempdir().unwrap();
    let mut saves = FileSaveSystem::new(dir.path()).unwrap();
    let engine = TestEngineBuilder::new(26)
        .game_id("tampered")
        .vitals(77, 66)
        .start_with(saves.clone());
    assert_eq!(engine.current_creature().unwrap().energy(), 77);

    // energy, happiness, then a zero cooldown
    let path = saves.save_path("tampered").unwrap();
    let mut bytes = std::fs::read(&path).unwrap();
    let hits: Vec<usize> = bytes
        .windows(3)
        .enumerate()
        .filter(|(_, w)| *w == [77u8, 66, 0])
        .map(|(i, _)| i)
        .collect();
    assert_eq!(hits.len(), 1);
    bytes[hits[0]] = 250;
    std::fs::write(&path, &bytes).unwrap();

    assert!(saves.load_game::<GameState>("tampered").is_err());
    assert!(Persistence::<GameState>::load(&mut saves, "tampered").is_none());

    let mut restored = TestEngineBuilder::new(27)
        .game_id("tampered")
        .build()
        .with_persistence(saves);
    assert!(!restored.load().unwrap());
    assert_eq!(restored.state().status, GameStatus::New);
    assert!(restored.current_creature().is_none());
}
