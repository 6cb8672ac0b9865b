//! Creature generation collaborators.
//!
//! The engine only trusts the structural validity of what a generator hands
//! back; every [`CreatureSpec`] still goes through [`Creature::from_spec`].
//!
//! [`Creature::from_spec`]: crate::Creature::from_spec

use anyhow::Context;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{CreatureSpec, CreatureType, GameRng};

pub const NAME_POOL: [&str; 12] = [
    "Ribbit", "Hopscotch", "Lily", "Splash", "Croak", "Puddle", "Bubbles", "Swampy", "Leaper",
    "Moss", "Dew", "Spring",
];

const HOMES: [&str; 5] = [
    "a quiet lily pond",
    "the roots of an old willow",
    "a rain-soaked garden",
    "the edge of a misty marsh",
    "a mossy forest stream",
];

pub trait CreatureGenerator: Send {
    /// Produces raw creature data, optionally for a requested species.
    fn generate(
        &mut self,
        kind: Option<CreatureType>,
        rng: &mut GameRng,
    ) -> anyhow::Result<CreatureSpec>;

    fn name(&self) -> &'static str;
}

/// Picks a species, name and home at random.
#[derive(Debug, Default, Clone)]
pub struct RandomGenerator;

impl CreatureGenerator for RandomGenerator {
    fn generate(
        &mut self,
        kind: Option<CreatureType>,
        rng: &mut GameRng,
    ) -> anyhow::Result<CreatureSpec> {
        let kind = match kind {
            Some(kind) => kind,
            None => {
                let species: Vec<CreatureType> =
                    CreatureType::iter().filter(|k| !k.is_custom()).collect();
                *rng.choose(&species).context("no species to pick from")?
            }
        };
        let name = rng.choose(&NAME_POOL).context("empty name pool")?;
        let home = rng.choose(&HOMES).context("empty home list")?;

        Ok(CreatureSpec::new(*name, kind).with_story(
            format!("A {} with a mind of its own", kind.as_str().to_lowercase()),
            format!("{} hatched in {} and has been hopping toward adventure ever since.", name, home),
        ))
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Always returns the same creature data.
#[derive(Debug, Clone)]
pub struct PresetGenerator {
    spec: CreatureSpec,
}

impl PresetGenerator {
    pub fn new(spec: CreatureSpec) -> Self {
        Self { spec }
    }
}

impl CreatureGenerator for PresetGenerator {
    fn generate(
        &mut self,
        _kind: Option<CreatureType>,
        _rng: &mut GameRng,
    ) -> anyhow::Result<CreatureSpec> {
        Ok(self.spec.clone())
    }

    fn name(&self) -> &'static str {
        "preset"
    }
}

/// Generator selection, passed explicitly through configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorStrategy {
    #[default]
    Random,
    Preset(CreatureSpec),
}

impl GeneratorStrategy {
    pub fn build(&self) -> Box<dyn CreatureGenerator> {
        match self {
            GeneratorStrategy::Random => Box::new(RandomGenerator),
            GeneratorStrategy::Preset(spec) => Box::new(PresetGenerator::new(spec.clone())),
        }
    }
}
