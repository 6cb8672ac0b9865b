//! Achievements tracking system
//!
//! Definitions are static; which achievements a game has unlocked lives in
//! that game's state, so the manager only answers "what is newly earned".

pub mod achievement;
pub mod criteria;


pub use achievement::{Achievement, AchievementCriteria, AchievementId, all_achievements};
pub use criteria::AchievementProgress;

use std::collections::{BTreeMap, BTreeSet};

/// Evaluates achievement definitions against a game's progress
#[derive(Debug, Clone)]
pub struct AchievementsManager {
    achievements: BTreeMap<AchievementId, Achievement>,
}

impl AchievementsManager {
    /// Create a manager with all default achievements
    pub fn new() -> Self {
        Self::with_achievements(all_achievements())
    }

    pub fn with_achievements(definitions: Vec<Achievement>) -> Self {
        Self {
            achievements: definitions.into_iter().map(|a| (a.id, a)).collect(),
        }
    }

    /// Get a specific achievement
    pub fn get_achievement(&self, id: AchievementId) -> Option<&Achievement> {
        self.achievements.get(&id)
    }

    pub fn achievements(&self) -> impl Iterator<Item = &Achievement> {
        self.achievements.values()
    }

    pub fn len(&self) -> usize {
        self.achievements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty()
    }

    /// Achievements whose criteria are met but which are not yet in `unlocked`,
    /// in definition-id order
    pub fn newly_earned(
        &self,
        progress: &AchievementProgress,
        unlocked: &BTreeSet<AchievementId>,
    ) -> Vec<AchievementId> {
        self.achievements
            .values()
            .filter(|a| !unlocked.contains(&a.id) && a.is_met(progress))
            .map(|a| a.id)
            .collect()
    }

    /// Check all achievements and record any newly met ones in `unlocked`.
    /// Returns the list of newly unlocked achievement IDs
    pub fn check_and_unlock(
        &self,
        progress: &AchievementProgress,
        unlocked: &mut BTreeSet<AchievementId>,
    ) -> Vec<AchievementId> {
        let earned = self.newly_earned(progress, unlocked);
        unlocked.extend(earned.iter().copied());
        earned
    }

    /// Get unlock percentage (0.0 to 1.0)
    pub fn unlock_percentage(&self, unlocked: &BTreeSet<AchievementId>) -> f32 {
        let total = self.achievements.len();
        if total == 0 {
            return 0.0;
        }
        let count = unlocked
            .iter()
            .filter(|id| self.achievements.contains_key(id))
            .count();
        count as f32 / total as f32
    }
}

impl Default for AchievementsManager {
    fn default() -> Self {
        Self::new()
    }
}
