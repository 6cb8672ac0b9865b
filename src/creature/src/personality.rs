//! Personality traits and the pairs that cannot coexist.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::rng::GameRng;
use crate::CreatureError;

pub const MIN_TRAITS: usize = 2;
pub const MAX_TRAITS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityTrait {
    Brave,
    Cautious,
    Friendly,
    Grumpy,
    Energetic,
    Lazy,
    Optimistic,
    Pessimistic,
    Patient,
    Impulsive,
    Curious,
    Wise,
    Playful,
    Mysterious,
    Adventurous,
    Cheerful,
}

/// Trait pairs a single creature may never hold together.
pub const CONTRADICTORY_TRAITS: [(PersonalityTrait, PersonalityTrait); 5] = [
    (PersonalityTrait::Brave, PersonalityTrait::Cautious),
    (PersonalityTrait::Friendly, PersonalityTrait::Grumpy),
    (PersonalityTrait::Energetic, PersonalityTrait::Lazy),
    (PersonalityTrait::Optimistic, PersonalityTrait::Pessimistic),
    (PersonalityTrait::Patient, PersonalityTrait::Impulsive),
];

impl PersonalityTrait {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonalityTrait::Brave => "brave",
            PersonalityTrait::Cautious => "cautious",
            PersonalityTrait::Friendly => "friendly",
            PersonalityTrait::Grumpy => "grumpy",
            PersonalityTrait::Energetic => "energetic",
            PersonalityTrait::Lazy => "lazy",
            PersonalityTrait::Optimistic => "optimistic",
            PersonalityTrait::Pessimistic => "pessimistic",
            PersonalityTrait::Patient => "patient",
            PersonalityTrait::Impulsive => "impulsive",
            PersonalityTrait::Curious => "curious",
            PersonalityTrait::Wise => "wise",
            PersonalityTrait::Playful => "playful",
            PersonalityTrait::Mysterious => "mysterious",
            PersonalityTrait::Adventurous => "adventurous",
            PersonalityTrait::Cheerful => "cheerful",
        }
    }

    pub fn contradicts(&self, other: &PersonalityTrait) -> bool {
        CONTRADICTORY_TRAITS
            .iter()
            .any(|(a, b)| (a == self && b == other) || (a == other && b == self))
    }
}

impl fmt::Display for PersonalityTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonalityTrait {
    type Err = CreatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PersonalityTrait::iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CreatureError::UnknownTrait(s.to_string()))
    }
}

/// Draws 2-3 mutually compatible traits.
pub fn roll_traits(rng: &mut GameRng) -> Vec<PersonalityTrait> {
    let wanted = rng.random_range(MIN_TRAITS..=MAX_TRAITS);
    let mut pool: Vec<PersonalityTrait> = PersonalityTrait::iter().collect();
    rng.shuffle(&mut pool);

    let mut picked: Vec<PersonalityTrait> = Vec::with_capacity(wanted);
    for candidate in pool {
        if picked.len() == wanted {
            break;
        }
        if picked.iter().any(|t| t.contradicts(&candidate)) {
            continue;
        }
        picked.push(candidate);
    }
    picked
}

/// Parses and checks an externally supplied trait list.
pub fn parse_traits(names: &[String]) -> Result<Vec<PersonalityTrait>, CreatureError> {
    let traits = names
        .iter()
        .map(|n| n.parse::<PersonalityTrait>())
        .collect::<Result<Vec<_>, _>>()?;
    validate_traits(&traits)?;
    Ok(traits)
}

pub fn validate_traits(traits: &[PersonalityTrait]) -> Result<(), CreatureError> {
    if !(MIN_TRAITS..=MAX_TRAITS).contains(&traits.len()) {
        return Err(CreatureError::TraitCount(traits.len()));
    }
    for (i, a) in traits.iter().enumerate() {
        for b in &traits[i + 1..] {
            if a == b {
                return Err(CreatureError::DuplicateTrait(*a));
            }
            if a.contradicts(b) {
                return Err(CreatureError::ContradictoryTraits(*a, *b));
            }
        }
    }
    Ok(())
}
