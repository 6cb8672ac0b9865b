//! Achievement progress tracking

use serde::{Deserialize, Serialize};

/// Counters the achievement criteria are evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AchievementProgress {
    /// Successful adventures
    pub adventures_completed: u32,
    /// Distinct items ever found
    pub items_found: u32,
    /// Successful ability uses
    pub abilities_used: u32,
    /// Rests, including automatic ones
    pub rests_taken: u32,
}

impl AchievementProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_adventure(&mut self) {
        self.adventures_completed = self.adventures_completed.saturating_add(1);
    }

    pub fn add_item(&mut self) {
        self.items_found = self.items_found.saturating_add(1);
    }

    pub fn add_ability_use(&mut self) {
        self.abilities_used = self.abilities_used.saturating_add(1);
    }

    pub fn add_rest(&mut self) {
        self.rests_taken = self.rests_taken.saturating_add(1);
    }

    /// Reset all progress
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
