// src/creature/src/lib.rs
pub mod core;
pub mod generator;
pub mod kind;
pub mod personality;
pub mod rng;
pub mod stats;

pub use crate::core::{ABILITY_COOLDOWN, Creature, CreatureError, CreatureSpec, MAX_VITAL};
pub use crate::generator::{
    CreatureGenerator, GeneratorStrategy, NAME_POOL, PresetGenerator, RandomGenerator,
};
pub use crate::kind::CreatureType;
pub use crate::personality::{CONTRADICTORY_TRAITS, PersonalityTrait};
pub use crate::rng::GameRng;
pub use crate::stats::{MAX_STAT, MAX_TOTAL_STATS, MIN_STAT, StatKind, Stats};
