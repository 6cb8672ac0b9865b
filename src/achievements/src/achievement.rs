//! Achievement definitions and types

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// Unique identifier for an achievement
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    // Adventure achievements
    FirstAdventure,   // Complete one adventure
    SeasonedExplorer, // Complete 5 adventures
    LegendaryFrog,    // Complete 10 adventures

    // Collection
    Collector, // Find 5 distinct items

    // Habits
    AbilityAdept, // Use the special ability 5 times
    WellRested,   // Rest 10 times
}

impl AchievementId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementId::FirstAdventure => "first_adventure",
            AchievementId::SeasonedExplorer => "seasoned_explorer",
            AchievementId::LegendaryFrog => "legendary_frog",
            AchievementId::Collector => "collector",
            AchievementId::AbilityAdept => "ability_adept",
            AchievementId::WellRested => "well_rested",
        }
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Criteria required to unlock an achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AchievementCriteria {
    /// Complete a certain number of adventures
    AdventuresCompleted(u32),
    /// Find a certain number of distinct items
    ItemsFound(u32),
    /// Use the creature's ability a certain number of times
    AbilitiesUsed(u32),
    /// Rest a certain number of times
    RestsTaken(u32),
}

/// An achievement definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub name: String,
    pub description: String,
    pub criteria: AchievementCriteria,
}

impl Achievement {
    pub fn new(
        id: AchievementId,
        name: impl Into<String>,
        description: impl Into<String>,
        criteria: AchievementCriteria,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            criteria,
        }
    }

    /// Whether the given progress satisfies this achievement's criteria
    pub fn is_met(&self, progress: &crate::criteria::AchievementProgress) -> bool {
        match self.criteria {
            AchievementCriteria::AdventuresCompleted(required) => {
                progress.adventures_completed >= required
            }
            AchievementCriteria::ItemsFound(required) => progress.items_found >= required,
            AchievementCriteria::AbilitiesUsed(required) => progress.abilities_used >= required,
            AchievementCriteria::RestsTaken(required) => progress.rests_taken >= required,
        }
    }
}

/// Get all achievement definitions
pub fn all_achievements() -> Vec<Achievement> {
    vec![
        Achievement::new(
            AchievementId::FirstAdventure,
            "First Adventure",
            "Complete your first adventure",
            AchievementCriteria::AdventuresCompleted(1),
        ),
        Achievement::new(
            AchievementId::SeasonedExplorer,
            "Seasoned Explorer",
            "Complete 5 adventures",
            AchievementCriteria::AdventuresCompleted(5),
        ),
        Achievement::new(
            AchievementId::LegendaryFrog,
            "Legendary Frog",
            "Complete 10 adventures",
            AchievementCriteria::AdventuresCompleted(10),
        ),
        Achievement::new(
            AchievementId::Collector,
            "Collector",
            "Find 5 different treasures",
            AchievementCriteria::ItemsFound(5),
        ),
        Achievement::new(
            AchievementId::AbilityAdept,
            "Ability Adept",
            "Use your special ability 5 times",
            AchievementCriteria::AbilitiesUsed(5),
        ),
        Achievement::new(
            AchievementId::WellRested,
            "Well Rested",
            "Rest 10 times",
            AchievementCriteria::RestsTaken(10),
        ),
    ]
}
