//! Per-game state owned by exactly one engine.

use std::collections::BTreeSet;
use std::fmt;

use achievements::{AchievementId, AchievementProgress};
use anyhow::{Context, anyhow, ensure};
use chrono::{DateTime, Utc};
use creature::Creature;
use save::{SaveSummary, Saveable};
use serde::{Deserialize, Serialize};

pub const STARTING_AREA: &str = "starting_forest";

/// Areas unlocked by reaching an adventure count.
pub const AREA_UNLOCKS: [(u32, &str); 3] = [
    (3, "misty_marsh"),
    (6, "crystal_caves"),
    (9, "ancient_temple"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    New,
    Playing,
    Paused,
    Won,
    Lost,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::New => "new",
            GameStatus::Playing => "playing",
            GameStatus::Paused => "paused",
            GameStatus::Won => "won",
            GameStatus::Lost => "lost",
        }
    }

    /// Won and lost games never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::Won | GameStatus::Lost)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: String,
    pub status: GameStatus,
    pub turn_number: u32,
    pub adventures_completed: u32,
    pub achievements: BTreeSet<AchievementId>,
    pub progress: AchievementProgress,
    pub unlocked_areas: BTreeSet<String>,
    pub creature: Option<Creature>,
    pub created_at: DateTime<Utc>,
}

impl GameState {
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            status: GameStatus::New,
            turn_number: 0,
            adventures_completed: 0,
            achievements: BTreeSet::new(),
            progress: AchievementProgress::default(),
            unlocked_areas: BTreeSet::from([STARTING_AREA.to_string()]),
            creature: None,
            created_at: Utc::now(),
        }
    }

    /// Unlocks every area whose threshold has been reached, returning the new ones.
    pub fn unlock_areas(&mut self) -> Vec<String> {
        AREA_UNLOCKS
            .iter()
            .filter(|(needed, _)| self.adventures_completed >= *needed)
            .filter_map(|(_, area)| {
                self.unlocked_areas
                    .insert(area.to_string())
                    .then(|| area.to_string())
            })
            .collect()
    }
}

impl Saveable for GameState {
    fn summary(&self) -> SaveSummary {
        SaveSummary {
            turn_number: self.turn_number,
            status: self.status.to_string(),
            creature_name: self.creature.as_ref().map(|c| c.name.clone()),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.game_id.trim().is_empty(), "game id is empty");
        ensure!(
            self.unlocked_areas.contains(STARTING_AREA),
            "starting area missing from unlocked areas"
        );
        if self.status != GameStatus::New && self.creature.is_none() {
            return Err(anyhow!("{} game has no creature", self.status));
        }
        if let Some(creature) = &self.creature {
            creature.validate().context("creature failed validation")?;
        }
        Ok(())
    }
}
