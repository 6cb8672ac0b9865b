//! Per-type action interpreters.
//!
//! Each interpreter mutates the creature, updates progress counters and
//! publishes one domain event. Events go through the engine's bus with the
//! queue attached, so handlers reacting to them can enqueue actions that run
//! later in the same drain.

use std::ops::RangeInclusive;

use anyhow::{Result, anyhow};
use creature::Creature;
use error::GameError;

use crate::action_queue::{Action, ActionKind, ActionOutcome};
use crate::engine::GameEngine;
use crate::event_bus::GameEvent;

/// Items an adventure can reward.
pub const ADVENTURE_ITEMS: [&str; 6] = [
    "Glowing Pearl",
    "Rare Flower",
    "Magic Mushroom",
    "Tiny Crystal",
    "Stardust",
    "Hero Medal",
];

pub const ITEM_REWARD_CHANCE: f64 = 0.3;

/// Chance that an adventure succeeds for this creature, in [0.1, 0.9].
pub fn adventure_success_chance(creature: &Creature) -> f64 {
    let stats = (creature.total_stats() as f64 - 55.0) * 0.01;
    let energy = if creature.energy() > 50 { 0.1 } else { -0.1 };
    let mood = if creature.happiness() > 50 { 0.1 } else { -0.1 };
    (0.6 + stats + energy + mood).clamp(0.1, 0.9)
}

impl GameEngine {
    pub(crate) fn interpret(&mut self, action: &Action) -> Result<ActionOutcome> {
        match &action.kind {
            ActionKind::Move { direction } => self.frog_move(direction),
            ActionKind::UseAbility { ability } => self.frog_use_ability(ability),
            ActionKind::Rest {} => self.frog_rest(false),
            ActionKind::AutoRest {} => self.frog_rest(true),
            ActionKind::Feed { food } => self.frog_feed(food),
            ActionKind::Adventure { scenario_id } => self.frog_adventure(scenario_id),
            ActionKind::Interact { target } => self.frog_interact(target),
            ActionKind::RandomEncounter { positive } => self.random_encounter(*positive),
        }
    }

    fn roll(&mut self, range: RangeInclusive<i32>) -> i32 {
        self.rng.random_range(range)
    }

    fn creature_mut(&mut self) -> Result<&mut Creature> {
        self.state
            .creature
            .as_mut()
            .ok_or_else(|| anyhow!(GameError::CreatureMissing))
    }

    fn frog_move(&mut self, direction: &str) -> Result<ActionOutcome> {
        let energy = -self.roll(3..=6);
        let happiness = self.roll(1..=3);
        let creature = self.creature_mut()?;
        creature.adjust_energy(energy);
        creature.adjust_happiness(happiness);
        let message = format!("{} hopped {}", creature.name, direction);

        self.publish(GameEvent::FrogMoved {
            direction: direction.to_string(),
        });
        Ok(ActionOutcome::success(message).with_changes(energy, happiness))
    }

    fn frog_use_ability(&mut self, ability: &str) -> Result<ActionOutcome> {
        let creature = self.creature_mut()?;
        if !creature.use_ability() {
            return Ok(ActionOutcome::failure(format!(
                "{} is on cooldown for {} more turn(s)",
                creature.ability,
                creature.ability_cooldown()
            )));
        }

        let power = creature.ability_power();
        let happiness = (power / 2.0).round() as i32;
        creature.adjust_energy(-10);
        creature.adjust_happiness(happiness);
        self.state.progress.add_ability_use();

        self.publish(GameEvent::FrogAbilityUsed {
            ability: ability.to_string(),
            power,
        });
        Ok(
            ActionOutcome::success(format!("Used {} with power {:.1}", ability, power))
                .with_changes(-10, happiness),
        )
    }

    fn frog_rest(&mut self, automatic: bool) -> Result<ActionOutcome> {
        let (energy, happiness) = if automatic {
            (self.roll(15..=25), self.roll(0..=3))
        } else {
            (self.roll(20..=30), self.roll(5..=10))
        };
        let creature = self.creature_mut()?;
        creature.adjust_energy(energy);
        creature.adjust_happiness(happiness);
        let message = if automatic {
            format!("{} was exhausted and took a nap", creature.name)
        } else {
            format!("{} rested on a lily pad", creature.name)
        };
        self.state.progress.add_rest();

        self.publish(GameEvent::FrogRested {
            energy_gained: energy,
            automatic,
        });
        Ok(ActionOutcome::success(message).with_changes(energy, happiness))
    }

    fn frog_feed(&mut self, food: &str) -> Result<ActionOutcome> {
        let creature = self.creature_mut()?;
        let from_inventory = creature.remove_item(food);
        let (energy, happiness) = if from_inventory {
            (self.roll(15..=25), self.roll(15..=20))
        } else {
            (self.roll(5..=10), self.roll(8..=12))
        };

        let creature = self.creature_mut()?;
        creature.adjust_energy(energy);
        creature.adjust_happiness(happiness);
        let message = format!("{} ate {}", creature.name, food);

        self.publish(GameEvent::FrogFed {
            food: food.to_string(),
            from_inventory,
        });
        let mut outcome = ActionOutcome::success(message).with_changes(energy, happiness);
        if from_inventory {
            outcome.items_used.push(food.to_string());
        }
        Ok(outcome)
    }

    fn frog_adventure(&mut self, scenario_id: &str) -> Result<ActionOutcome> {
        let chance = adventure_success_chance(self.creature_mut()?);
        self.publish(GameEvent::AdventureStarted {
            scenario_id: scenario_id.to_string(),
            success_chance: chance,
        });

        if !self.rng.random_bool(chance) {
            let energy = -self.roll(5..=10);
            self.creature_mut()?.adjust_energy(energy);
            self.publish(GameEvent::AdventureFailed {
                scenario_id: scenario_id.to_string(),
            });
            return Ok(ActionOutcome::failure(format!("Adventure {} went badly", scenario_id))
                .with_changes(energy, 0));
        }

        let happiness = self.roll(10..=20);
        let energy = -self.roll(10..=15);
        let reward = if self.rng.random_bool(ITEM_REWARD_CHANCE) {
            self.rng.choose(&ADVENTURE_ITEMS).copied()
        } else {
            None
        };

        let creature = self.creature_mut()?;
        creature.adjust_happiness(happiness);
        creature.adjust_energy(energy);
        let new_item = reward.filter(|item| creature.add_item(*item));

        self.state.adventures_completed += 1;
        self.state.progress.add_adventure();
        let adventures_completed = self.state.adventures_completed;

        self.publish(GameEvent::AdventureCompleted {
            scenario_id: scenario_id.to_string(),
            adventures_completed,
        });

        let mut outcome = ActionOutcome::success(format!("Adventure {} succeeded", scenario_id))
            .with_changes(energy, happiness);
        if let Some(item) = new_item {
            self.state.progress.add_item();
            self.publish(GameEvent::FrogItemFound {
                item: item.to_string(),
            });
            outcome.items_gained.push(item.to_string());
        }
        Ok(outcome)
    }

    fn frog_interact(&mut self, target: &str) -> Result<ActionOutcome> {
        let happiness = self.roll(3..=8);
        let creature = self.creature_mut()?;
        creature.adjust_happiness(happiness);
        creature.adjust_energy(-2);
        let message = format!("{} played with {}", creature.name, target);

        self.publish(GameEvent::FrogInteracted {
            target: target.to_string(),
        });
        Ok(ActionOutcome::success(message).with_changes(-2, happiness))
    }

    fn random_encounter(&mut self, positive: Option<bool>) -> Result<ActionOutcome> {
        let positive = match positive {
            Some(positive) => positive,
            None => self.rng.random_bool(0.5),
        };
        let (energy, happiness) = if positive {
            (5, self.roll(10..=15))
        } else {
            (-5, -5)
        };
        let creature = self.creature_mut()?;
        creature.adjust_energy(energy);
        creature.adjust_happiness(happiness);
        let message = if positive {
            format!("{} made a new friend", creature.name)
        } else {
            format!("{} was startled by a heron", creature.name)
        };

        self.publish(GameEvent::RandomEncounter { positive });
        Ok(ActionOutcome::success(message).with_changes(energy, happiness))
    }
}
