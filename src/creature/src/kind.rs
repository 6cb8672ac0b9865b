// src/creature/src/kind.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::stats::Stats;
use crate::CreatureError;

/// 生物种类枚举
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
)]
pub enum CreatureType {
    #[default]
    #[serde(rename = "Tree Frog")]
    TreeFrog, // 树蛙（敏捷，擅长攀爬）

    #[serde(rename = "Poison Dart Frog")]
    PoisonDartFrog, // 箭毒蛙（魔法高，警告色）

    #[serde(rename = "Bullfrog")]
    Bullfrog, // 牛蛙（力量型）

    #[serde(rename = "Glass Frog")]
    GlassFrog, // 玻璃蛙（隐匿，智力与敏捷）

    #[serde(rename = "Rocket Frog")]
    RocketFrog, // 火箭蛙（极速）

    #[serde(rename = "Rain Frog")]
    RainFrog, // 雨蛙（感知天气，智力与魔法）

    #[serde(rename = "Custom")]
    Custom, // 自定义种类，由外部生成器描述
}

impl CreatureType {
    /// 种类的显示名称
    pub fn as_str(&self) -> &'static str {
        match self {
            CreatureType::TreeFrog => "Tree Frog",
            CreatureType::PoisonDartFrog => "Poison Dart Frog",
            CreatureType::Bullfrog => "Bullfrog",
            CreatureType::GlassFrog => "Glass Frog",
            CreatureType::RocketFrog => "Rocket Frog",
            CreatureType::RainFrog => "Rain Frog",
            CreatureType::Custom => "Custom",
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, CreatureType::Custom)
    }

    /// 获取种类的基础属性模板（力量、敏捷、智力、魔法、幸运）
    ///
    /// 模板总和不超过 60，叠加 ±2 的随机浮动后仍远低于总和上限。
    pub fn base_stats(&self) -> Stats {
        match self {
            CreatureType::TreeFrog => Stats::new(10, 16, 12, 10, 12),
            CreatureType::PoisonDartFrog => Stats::new(8, 13, 12, 16, 11),
            CreatureType::Bullfrog => Stats::new(17, 9, 10, 9, 12),
            CreatureType::GlassFrog => Stats::new(8, 14, 14, 13, 11),
            CreatureType::RocketFrog => Stats::new(10, 18, 9, 9, 12),
            CreatureType::RainFrog => Stats::new(11, 8, 15, 14, 12),
            CreatureType::Custom => Stats::new(12, 12, 12, 12, 12),
        }
    }

    /// 默认能力名称与外观描述
    pub fn default_ability(&self) -> (&'static str, &'static str) {
        match self {
            CreatureType::TreeFrog => ("Climb anywhere", "A nimble green frog with sticky toe pads"),
            CreatureType::PoisonDartFrog => (
                "Intimidate predators",
                "A brilliantly colored frog that warns danger away",
            ),
            CreatureType::Bullfrog => ("Powerful leap", "A large, strong frog with a booming voice"),
            CreatureType::GlassFrog => (
                "Near invisibility",
                "A translucent frog that can hide in plain sight",
            ),
            CreatureType::RocketFrog => ("Super speed", "A tiny frog that moves like lightning"),
            CreatureType::RainFrog => (
                "Weather prediction",
                "A round, grumpy-looking frog that senses storms",
            ),
            CreatureType::Custom => ("Mystery power", "A frog unlike any other"),
        }
    }
}

impl fmt::Display for CreatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreatureType {
    type Err = CreatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use strum::IntoEnumIterator;

        let wanted = s.trim();
        CreatureType::iter()
            .find(|kind| {
                kind.as_str().eq_ignore_ascii_case(wanted)
                    || format!("{:?}", kind).eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| CreatureError::UnknownType(s.to_string()))
    }
}
