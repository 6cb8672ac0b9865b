//! Five-stat block shared by every creature.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::kind::CreatureType;
use crate::rng::GameRng;
use crate::CreatureError;

/// Lowest value any single stat may take.
pub const MIN_STAT: u8 = 5;
/// Highest value any single stat may take.
pub const MAX_STAT: u8 = 20;
/// Upper bound on the sum of all five stats.
pub const MAX_TOTAL_STATS: u32 = 85;
/// Random variation applied on top of the species profile.
pub const STAT_VARIATION: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Strength,
    Agility,
    Intelligence,
    Magic,
    Luck,
}

impl StatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Strength => "strength",
            StatKind::Agility => "agility",
            StatKind::Intelligence => "intelligence",
            StatKind::Magic => "magic",
            StatKind::Luck => "luck",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub strength: u8,
    pub agility: u8,
    pub intelligence: u8,
    pub magic: u8,
    pub luck: u8,
}

impl Stats {
    pub const fn new(strength: u8, agility: u8, intelligence: u8, magic: u8, luck: u8) -> Self {
        Self {
            strength,
            agility,
            intelligence,
            magic,
            luck,
        }
    }

    /// Rolls a stat block from the species profile plus bounded variation.
    ///
    /// Every value is clamped to `[MIN_STAT, MAX_STAT]`. Species profiles
    /// leave enough headroom that the total stays within `MAX_TOTAL_STATS`.
    pub fn roll(kind: CreatureType, rng: &mut GameRng) -> Self {
        let base = kind.base_stats();
        let mut stats = base;
        for stat in StatKind::iter() {
            let delta = rng.random_range(-STAT_VARIATION..=STAT_VARIATION);
            let value = (base.get(stat) as i32 + delta).clamp(MIN_STAT as i32, MAX_STAT as i32);
            stats.set(stat, value as u8);
        }

        stats
    }

    /// Builds stats from a loosely-typed map (e.g. generator output).
    ///
    /// The map must name exactly the five stats.
    pub fn from_map(map: &BTreeMap<String, i64>) -> Result<Self, CreatureError> {
        for key in map.keys() {
            if !StatKind::iter().any(|s| s.as_str() == key) {
                return Err(CreatureError::UnknownStat(key.clone()));
            }
        }

        let mut stats = Stats::new(MIN_STAT, MIN_STAT, MIN_STAT, MIN_STAT, MIN_STAT);
        for stat in StatKind::iter() {
            let value = *map
                .get(stat.as_str())
                .ok_or(CreatureError::MissingStat(stat))?;
            if value < MIN_STAT as i64 || value > MAX_STAT as i64 {
                return Err(CreatureError::StatOutOfRange { stat, value });
            }
            stats.set(stat, value as u8);
        }

        stats.validate()?;
        Ok(stats)
    }

    pub fn validate(&self) -> Result<(), CreatureError> {
        for stat in StatKind::iter() {
            let value = self.get(stat);
            if !(MIN_STAT..=MAX_STAT).contains(&value) {
                return Err(CreatureError::StatOutOfRange {
                    stat,
                    value: value as i64,
                });
            }
        }
        let total = self.total();
        if total > MAX_TOTAL_STATS {
            return Err(CreatureError::StatTotalTooHigh(total));
        }
        Ok(())
    }

    pub fn get(&self, stat: StatKind) -> u8 {
        match stat {
            StatKind::Strength => self.strength,
            StatKind::Agility => self.agility,
            StatKind::Intelligence => self.intelligence,
            StatKind::Magic => self.magic,
            StatKind::Luck => self.luck,
        }
    }

    fn set(&mut self, stat: StatKind, value: u8) {
        match stat {
            StatKind::Strength => self.strength = value,
            StatKind::Agility => self.agility = value,
            StatKind::Intelligence => self.intelligence = value,
            StatKind::Magic => self.magic = value,
            StatKind::Luck => self.luck = value,
        }
    }

    pub fn total(&self) -> u32 {
        StatKind::iter().map(|s| self.get(s) as u32).sum()
    }

    pub fn to_map(&self) -> BTreeMap<String, i64> {
        StatKind::iter()
            .map(|s| (s.as_str().to_string(), self.get(s) as i64))
            .collect()
    }
}
