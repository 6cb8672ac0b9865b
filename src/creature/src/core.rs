// src/creature/src/core.rs
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    kind::CreatureType,
    personality::{self, PersonalityTrait},
    rng::GameRng,
    stats::{StatKind, Stats},
};

/// 体力与心情的取值上限
pub const MAX_VITAL: u8 = 100;
/// 使用能力后的冷却回合数
pub const ABILITY_COOLDOWN: u32 = 3;

const TIRED_BELOW: u8 = 20;
const SAD_BELOW: u8 = 30;
const HAPPY_ABOVE: u8 = 70;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreatureError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("ability must not be empty")]
    EmptyAbility,
    #[error("description must not be empty")]
    EmptyDescription,
    #[error("unknown creature type: {0}")]
    UnknownType(String),
    #[error("energy must be between 0 and 100, got {0}")]
    EnergyOutOfRange(i64),
    #[error("happiness must be between 0 and 100, got {0}")]
    HappinessOutOfRange(i64),
    #[error("unknown stat: {0}")]
    UnknownStat(String),
    #[error("missing stat: {0}")]
    MissingStat(StatKind),
    #[error("{stat} must be between 5 and 20, got {value}")]
    StatOutOfRange { stat: StatKind, value: i64 },
    #[error("total stats must not exceed 85, got {0}")]
    StatTotalTooHigh(u32),
    #[error("unknown trait: {0}")]
    UnknownTrait(String),
    #[error("a creature needs 2 or 3 traits, got {0}")]
    TraitCount(usize),
    #[error("duplicate trait: {0}")]
    DuplicateTrait(PersonalityTrait),
    #[error("traits {0} and {1} contradict each other")]
    ContradictoryTraits(PersonalityTrait, PersonalityTrait),
    #[error("ability cooldown cannot be negative, got {0}")]
    NegativeCooldown(i64),
}

fn default_energy() -> i64 {
    100
}

fn default_happiness() -> i64 {
    50
}

/// 生成器产出的原始生物数据
///
/// 字段保持宽松类型，所有约束在 [`Creature::from_spec`] 中统一校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub creature_type: String,
    pub ability: String,
    pub description: String,
    #[serde(default = "default_energy")]
    pub energy: i64,
    #[serde(default = "default_happiness")]
    pub happiness: i64,
    #[serde(default)]
    pub items: Vec<String>,
    /// 缺省时按种类模板随机生成
    #[serde(default)]
    pub stats: Option<BTreeMap<String, i64>>,
    /// 缺省时从特质池中随机抽取
    #[serde(default)]
    pub traits: Option<Vec<String>>,
    #[serde(default)]
    pub ability_cooldown: i64,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub personality: Option<String>,
    #[serde(default)]
    pub backstory: Option<String>,
}

impl CreatureSpec {
    /// 以种类默认能力与描述创建数据
    pub fn new(name: impl Into<String>, kind: CreatureType) -> Self {
        let (ability, description) = kind.default_ability();
        Self {
            name: name.into(),
            creature_type: kind.as_str().to_string(),
            ability: ability.to_string(),
            description: description.to_string(),
            energy: default_energy(),
            happiness: default_happiness(),
            items: Vec::new(),
            stats: None,
            traits: None,
            ability_cooldown: 0,
            species: None,
            personality: None,
            backstory: None,
        }
    }

    pub fn with_vitals(mut self, energy: i64, happiness: i64) -> Self {
        self.energy = energy;
        self.happiness = happiness;
        self
    }

    pub fn with_stats(mut self, stats: BTreeMap<String, i64>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_traits<I, S>(mut self, traits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.traits = Some(traits.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    pub fn with_story(mut self, personality: impl Into<String>, backstory: impl Into<String>) -> Self {
        self.personality = Some(personality.into());
        self.backstory = Some(backstory.into());
        self
    }
}

/// 玩家的伙伴生物
///
/// 体力与心情在每次修改后都被钳制到 [0, 100]，属性与特质在构造与反序列化时校验。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredCreature")]
pub struct Creature {
    // 基础信息
    pub name: String,
    pub creature_type: CreatureType,
    pub ability: String,
    pub description: String,
    pub species: Option<String>,
    pub personality: Option<String>,
    pub backstory: Option<String>,

    // 状态
    energy: u8,
    happiness: u8,
    ability_cooldown: u32,
    items: BTreeSet<String>,

    // 构造后不可变
    stats: Stats,
    traits: Vec<PersonalityTrait>,
}

/// 存档中的生物字段，校验通过后才转换为 `Creature`
#[derive(Deserialize)]
struct StoredCreature {
    name: String,
    creature_type: CreatureType,
    ability: String,
    description: String,
    species: Option<String>,
    personality: Option<String>,
    backstory: Option<String>,
    energy: u8,
    happiness: u8,
    ability_cooldown: u32,
    items: BTreeSet<String>,
    stats: Stats,
    traits: Vec<PersonalityTrait>,
}

impl TryFrom<StoredCreature> for Creature {
    type Error = CreatureError;

    fn try_from(stored: StoredCreature) -> Result<Self, Self::Error> {
        let creature = Self {
            name: stored.name,
            creature_type: stored.creature_type,
            ability: stored.ability,
            description: stored.description,
            species: stored.species,
            personality: stored.personality,
            backstory: stored.backstory,
            energy: stored.energy,
            happiness: stored.happiness,
            ability_cooldown: stored.ability_cooldown,
            items: stored.items,
            stats: stored.stats,
            traits: stored.traits,
        };
        creature.validate()?;
        Ok(creature)
    }
}

impl Creature {
    /// 校验生成器数据并构造生物，缺省的属性与特质使用 `rng` 生成
    pub fn from_spec(spec: CreatureSpec, rng: &mut GameRng) -> Result<Self, CreatureError> {
        if spec.name.trim().is_empty() {
            return Err(CreatureError::EmptyName);
        }
        if spec.ability.trim().is_empty() {
            return Err(CreatureError::EmptyAbility);
        }
        if spec.description.trim().is_empty() {
            return Err(CreatureError::EmptyDescription);
        }
        let creature_type: CreatureType = spec.creature_type.parse()?;

        if !(0..=MAX_VITAL as i64).contains(&spec.energy) {
            return Err(CreatureError::EnergyOutOfRange(spec.energy));
        }
        if !(0..=MAX_VITAL as i64).contains(&spec.happiness) {
            return Err(CreatureError::HappinessOutOfRange(spec.happiness));
        }
        if spec.ability_cooldown < 0 {
            return Err(CreatureError::NegativeCooldown(spec.ability_cooldown));
        }

        let stats = match &spec.stats {
            Some(map) => Stats::from_map(map)?,
            None => Stats::roll(creature_type, rng),
        };
        let traits = match &spec.traits {
            Some(names) => personality::parse_traits(names)?,
            None => personality::roll_traits(rng),
        };

        Ok(Self {
            name: spec.name,
            creature_type,
            ability: spec.ability,
            description: spec.description,
            species: spec.species,
            personality: spec.personality,
            backstory: spec.backstory,
            energy: spec.energy as u8,
            happiness: spec.happiness as u8,
            ability_cooldown: spec.ability_cooldown as u32,
            items: spec.items.into_iter().collect(),
            stats,
            traits,
        })
    }

    /// 检查构造时保证的不变量（用于外部来源的数据）
    pub fn validate(&self) -> Result<(), CreatureError> {
        if self.name.trim().is_empty() {
            return Err(CreatureError::EmptyName);
        }
        if self.ability.trim().is_empty() {
            return Err(CreatureError::EmptyAbility);
        }
        if self.description.trim().is_empty() {
            return Err(CreatureError::EmptyDescription);
        }
        if self.energy > MAX_VITAL {
            return Err(CreatureError::EnergyOutOfRange(self.energy as i64));
        }
        if self.happiness > MAX_VITAL {
            return Err(CreatureError::HappinessOutOfRange(self.happiness as i64));
        }
        self.stats.validate()?;
        personality::validate_traits(&self.traits)
    }

    /// 使用种类默认值快速创建
    pub fn new(
        name: impl Into<String>,
        kind: CreatureType,
        rng: &mut GameRng,
    ) -> Result<Self, CreatureError> {
        Self::from_spec(CreatureSpec::new(name, kind), rng)
    }

    pub fn energy(&self) -> u8 {
        self.energy
    }

    pub fn happiness(&self) -> u8 {
        self.happiness
    }

    pub fn ability_cooldown(&self) -> u32 {
        self.ability_cooldown
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn traits(&self) -> &[PersonalityTrait] {
        &self.traits
    }

    pub fn items(&self) -> &BTreeSet<String> {
        &self.items
    }

    pub fn has_item(&self, item: &str) -> bool {
        self.items.contains(item)
    }

    /// 添加物品，已存在时返回 false
    pub fn add_item(&mut self, item: impl Into<String>) -> bool {
        self.items.insert(item.into())
    }

    pub fn remove_item(&mut self, item: &str) -> bool {
        self.items.remove(item)
    }

    pub fn adjust_energy(&mut self, delta: i32) {
        self.energy = clamp_vital(self.energy, delta);
    }

    pub fn adjust_happiness(&mut self, delta: i32) {
        self.happiness = clamp_vital(self.happiness, delta);
    }

    pub fn can_use_ability(&self) -> bool {
        self.ability_cooldown == 0
    }

    /// 使用能力：冷却中返回 false 且不改变冷却
    pub fn use_ability(&mut self) -> bool {
        if !self.can_use_ability() {
            return false;
        }
        self.ability_cooldown = ABILITY_COOLDOWN;
        true
    }

    pub fn reduce_cooldown(&mut self) {
        self.ability_cooldown = self.ability_cooldown.saturating_sub(1);
    }

    pub fn set_ability_cooldown(&mut self, turns: i64) -> Result<(), CreatureError> {
        if turns < 0 {
            return Err(CreatureError::NegativeCooldown(turns));
        }
        self.ability_cooldown = u32::try_from(turns).unwrap_or(u32::MAX);
        Ok(())
    }

    pub fn is_tired(&self) -> bool {
        self.energy < TIRED_BELOW
    }

    pub fn is_happy(&self) -> bool {
        self.happiness > HAPPY_ABOVE
    }

    pub fn is_sad(&self) -> bool {
        self.happiness < SAD_BELOW
    }

    /// 能力强度 = 10 × (1 + 魔法 / 20)
    pub fn ability_power(&self) -> f64 {
        10.0 * (1.0 + self.stats.magic as f64 / 20.0)
    }

    pub fn total_stats(&self) -> u32 {
        self.stats.total()
    }

    /// 自定义种类显示其物种名
    pub fn display_type(&self) -> String {
        match (&self.creature_type, &self.species) {
            (CreatureType::Custom, Some(species)) if !species.trim().is_empty() => species.clone(),
            (kind, _) => kind.as_str().to_string(),
        }
    }
}

fn clamp_vital(current: u8, delta: i32) -> u8 {
    (current as i32 + delta).clamp(0, MAX_VITAL as i32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn frog() -> Creature {
        Creature::new("Ribbit", CreatureType::TreeFrog, &mut GameRng::new(1)).unwrap()
    }

    fn stat_map(values: [i64; 5]) -> BTreeMap<String, i64> {
        ["strength", "agility", "intelligence", "magic", "luck"]
            .iter()
            .zip(values)
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn defaults_from_species() {
        let f = frog();
        assert_eq!(f.energy(), 100);
        assert_eq!(f.happiness(), 50);
        assert_eq!(f.ability_cooldown(), 0);
        assert_eq!(f.ability, "Climb anywhere");
        assert!((2..=3).contains(&f.traits().len()));
    }

    #[test]
    fn rejects_structural_problems() {
        let mut rng = GameRng::new(3);
        let blank = CreatureSpec::new("  ", CreatureType::Bullfrog);
        assert_eq!(Creature::from_spec(blank, &mut rng), Err(CreatureError::EmptyName));

        let mut no_ability = CreatureSpec::new("Croak", CreatureType::Bullfrog);
        no_ability.ability.clear();
        assert_eq!(
            Creature::from_spec(no_ability, &mut rng),
            Err(CreatureError::EmptyAbility)
        );

        let mut unknown = CreatureSpec::new("Croak", CreatureType::Bullfrog);
        unknown.creature_type = "Axolotl".into();
        assert!(matches!(
            Creature::from_spec(unknown, &mut rng),
            Err(CreatureError::UnknownType(_))
        ));

        let hot = CreatureSpec::new("Croak", CreatureType::Bullfrog).with_vitals(101, 50);
        assert_eq!(
            Creature::from_spec(hot, &mut rng),
            Err(CreatureError::EnergyOutOfRange(101))
        );

        let over = CreatureSpec::new("Croak", CreatureType::Bullfrog)
            .with_stats(stat_map([20, 20, 20, 20, 10]));
        assert_eq!(
            Creature::from_spec(over, &mut rng),
            Err(CreatureError::StatTotalTooHigh(90))
        );

        let mut cooled = CreatureSpec::new("Croak", CreatureType::Bullfrog);
        cooled.ability_cooldown = -1;
        assert_eq!(
            Creature::from_spec(cooled, &mut rng),
            Err(CreatureError::NegativeCooldown(-1))
        );
    }

    #[test]
    fn accepts_supplied_stats_and_traits() {
        let spec = CreatureSpec::new("Moss", CreatureType::GlassFrog)
            .with_stats(stat_map([10, 15, 15, 20, 10]))
            .with_traits(["curious", "wise"])
            .with_items(["Rare Flower", "Rare Flower"]);
        let f = Creature::from_spec(spec, &mut GameRng::new(9)).unwrap();
        assert_eq!(f.total_stats(), 70);
        assert_eq!(f.ability_power(), 20.0);
        assert_eq!(f.items().len(), 1);
        assert_eq!(
            f.traits(),
            &[PersonalityTrait::Curious, PersonalityTrait::Wise]
        );
    }

    #[test]
    fn ability_cooldown_cycle() {
        let mut f = frog();
        assert!(f.use_ability());
        assert_eq!(f.ability_cooldown(), 3);
        assert!(!f.use_ability());
        assert_eq!(f.ability_cooldown(), 3);

        for _ in 0..5 {
            f.reduce_cooldown();
        }
        assert_eq!(f.ability_cooldown(), 0);
        assert!(f.can_use_ability());

        assert_eq!(
            f.set_ability_cooldown(-2),
            Err(CreatureError::NegativeCooldown(-2))
        );
    }

    #[test]
    fn items_behave_like_a_set() {
        let mut f = frog();
        assert!(f.add_item("Stardust"));
        assert!(!f.add_item("Stardust"));
        assert!(f.has_item("Stardust"));
        assert!(f.remove_item("Stardust"));
        assert!(!f.remove_item("Stardust"));
    }

    #[test]
    fn mood_predicates() {
        let mut f = frog();
        f.adjust_energy(-85);
        assert!(f.is_tired());
        f.adjust_happiness(-25);
        assert!(f.is_sad());
        f.adjust_happiness(50);
        assert!(f.is_happy());
    }

    #[test]
    fn custom_frogs_show_species() {
        let spec = CreatureSpec::new("Dew", CreatureType::Custom).with_species("Desert Rain Frog");
        let f = Creature::from_spec(spec, &mut GameRng::new(5)).unwrap();
        assert_eq!(f.display_type(), "Desert Rain Frog");
        assert_eq!(frog().display_type(), "Tree Frog");
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let json = r#"{"name":"Lily","type":"Rain Frog","ability":"Weather prediction","description":"Round"}"#;
        let spec: CreatureSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.energy, 100);
        assert_eq!(spec.happiness, 50);
        assert!(spec.stats.is_none());
    }

    #[test]
    fn deserialized_creatures_are_validated() {
        let valid = serde_json::to_value(frog()).unwrap();
        let restored: Creature = serde_json::from_value(valid.clone()).unwrap();
        assert_eq!(restored, frog());

        let tamper = |field: &str, value: serde_json::Value| {
            let mut json = valid.clone();
            json[field] = value;
            serde_json::from_value::<Creature>(json).unwrap_err().to_string()
        };
        assert!(tamper("energy", 250.into()).contains("energy must be between 0 and 100"));
        assert!(tamper("happiness", 255.into()).contains("happiness must be between 0 and 100"));
        assert!(tamper("name", " ".into()).contains("name must not be empty"));
        assert!(
            tamper(
                "stats",
                serde_json::json!({"strength": 20, "agility": 20, "intelligence": 20, "magic": 20, "luck": 20})
            )
            .contains("total stats must not exceed 85")
        );
        assert!(
            tamper(
                "traits",
                serde_json::json!(["curious", "wise", "brave", "playful"])
            )
            .contains("2 or 3 traits")
        );
    }

    #[test]
    fn validate_accepts_constructed_creatures() {
        assert_eq!(frog().validate(), Ok(()));
        let mut f = frog();
        f.adjust_energy(-500);
        assert_eq!(f.validate(), Ok(()));
    }

    proptest! {
        #[test]
        fn vitals_always_clamped(deltas in proptest::collection::vec(-1000i32..1000, 1..20)) {
            let mut f = frog();
            for d in deltas {
                f.adjust_energy(d);
                f.adjust_happiness(-d);
                prop_assert!(f.energy() <= 100);
                prop_assert!(f.happiness() <= 100);
            }
            f.adjust_energy(-1000);
            f.adjust_happiness(1000);
            prop_assert_eq!(f.energy(), 0);
            prop_assert_eq!(f.happiness(), 100);
        }
    }
}
