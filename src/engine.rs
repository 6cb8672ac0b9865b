//! 回合引擎，按固定阶段推进一局游戏。
//!
//! 每个回合依次执行：
//! - Drain: 按队列顺序解释所有待处理动作（处理器追加的动作也在本阶段执行）
//! - Progress: 检查成就与区域解锁
//! - Upkeep: 被动衰减与阈值事件（处理器追加的补偿动作留到下一回合）
//! - Environment: 低概率环境事件
//! - Evaluation: 胜负判定（先判负，再判胜）
//! - Autosave: 每隔固定回合保存一次

use std::collections::BTreeSet;

use achievements::{AchievementId, AchievementsManager};
use creature::{Creature, CreatureGenerator, CreatureType, GameRng};
use error::GameError;
use save::{NoopPersistence, Persistence};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::action_queue::{
    Action, ActionKind, ActionQueue, ActionType, Priority, QueueStats,
};
use crate::config::EngineConfig;
use crate::event_bus::{EventBus, EventRecord, EventStats, GameEvent, TracingMiddleware};
use crate::game_state::{GameState, GameStatus};

/// 胜利条件
pub const WIN_HAPPINESS: u8 = 90;
pub const WIN_ADVENTURES: u32 = 10;

const WEATHER: [&str; 5] = ["sunny", "rainy", "foggy", "stormy", "drizzly"];
const DISCOVERIES: [&str; 4] = [
    "a hidden pond",
    "glowing mushrooms",
    "an ancient lily pad",
    "a shimmering puddle",
];

/// 回合阶段，用于日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Drain,
    Progress,
    Upkeep,
    Environment,
    Evaluation,
    Autosave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Won,
    Lost,
}

/// 胜负结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameResult {
    pub outcome: Outcome,
    pub reason: String,
}

/// 非游戏中状态调用 `process_turn` 的结果，不产生任何副作用
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct TurnRejected {
    pub status: GameStatus,
    pub message: String,
}

impl From<TurnRejected> for GameError {
    fn from(rejected: TurnRejected) -> Self {
        GameError::NotPlaying(rejected.status.to_string())
    }
}

/// 一个回合的报告
#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub turn_number: u32,
    pub actions_processed: Vec<Action>,
    pub creature: Option<Creature>,
    pub status: GameStatus,
    pub game_result: Option<GameResult>,
    pub recent_events: Vec<EventRecord>,
}

/// 生物统计快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatureStats {
    pub name: String,
    pub display_type: String,
    pub energy: u8,
    pub happiness: u8,
    pub ability_cooldown: u32,
    pub ability_power: f64,
    pub total_stats: u32,
    pub items: BTreeSet<String>,
}

impl From<&Creature> for CreatureStats {
    fn from(creature: &Creature) -> Self {
        Self {
            name: creature.name.clone(),
            display_type: creature.display_type(),
            energy: creature.energy(),
            happiness: creature.happiness(),
            ability_cooldown: creature.ability_cooldown(),
            ability_power: creature.ability_power(),
            total_stats: creature.total_stats(),
            items: creature.items().clone(),
        }
    }
}

/// 引擎聚合统计
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub game_id: String,
    pub turn_number: u32,
    pub status: GameStatus,
    pub adventures_completed: u32,
    pub achievements: BTreeSet<AchievementId>,
    pub achievement_percentage: f32,
    pub unlocked_areas: BTreeSet<String>,
    pub queue: QueueStats,
    pub events: EventStats,
    pub creature: Option<CreatureStats>,
}

/// 单局游戏的引擎，独占其状态、队列与事件总线
pub struct GameEngine {
    pub(crate) config: EngineConfig,
    pub(crate) state: GameState,
    pub(crate) queue: ActionQueue,
    pub(crate) bus: EventBus,
    pub(crate) rng: GameRng,
    generator: Box<dyn CreatureGenerator>,
    persistence: Box<dyn Persistence<GameState>>,
    achievements: AchievementsManager,
}

impl GameEngine {
    pub fn new(game_id: impl Into<String>, config: EngineConfig) -> Self {
        let game_id = game_id.into();
        let rng = match config.seed {
            Some(seed) => GameRng::new(seed),
            None => GameRng::from_entropy(),
        };

        let mut bus = EventBus::with_max_depth(game_id.as_str(), config.max_dispatch_depth);
        if config.trace_events {
            bus.register_middleware(TracingMiddleware);
        }
        register_default_handlers(&mut bus);

        Self {
            state: GameState::new(game_id.as_str()),
            queue: ActionQueue::new(game_id.as_str()),
            bus,
            rng,
            generator: config.generator.build(),
            persistence: Box::new(NoopPersistence),
            achievements: AchievementsManager::new(),
            config,
        }
    }

    pub fn with_generator<G>(mut self, generator: G) -> Self
    where
        G: CreatureGenerator + 'static,
    {
        self.generator = Box::new(generator);
        self
    }

    pub fn with_persistence<P>(mut self, persistence: P) -> Self
    where
        P: Persistence<GameState> + 'static,
    {
        self.persistence = Box::new(persistence);
        self
    }

    pub fn game_id(&self) -> &str {
        &self.state.game_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========== 生命周期 ==========

    /// 生成新生物并开始游戏
    pub fn start_new_game(&mut self, kind: Option<CreatureType>) -> Result<&Creature, GameError> {
        let spec = self
            .generator
            .generate(kind, &mut self.rng)
            .map_err(|e| GameError::Generator(format!("{:#}", e)))?;
        let creature = Creature::from_spec(spec, &mut self.rng)?;

        tracing::info!(
            game_id = %self.state.game_id,
            generator = self.generator.name(),
            creature = %creature.name,
            kind = %creature.display_type(),
            "starting new game"
        );

        let event = GameEvent::GameStarted {
            creature_name: creature.name.clone(),
            creature_type: creature.display_type(),
        };
        let mut state = GameState::new(self.state.game_id.as_str());
        state.status = GameStatus::Playing;
        state.creature = Some(creature);
        self.state = state;
        self.queue.clear();

        self.publish(event);
        self.save();

        self.current_creature().ok_or(GameError::CreatureMissing)
    }

    pub fn pause(&mut self) -> Result<(), GameError> {
        if self.state.status != GameStatus::Playing {
            return Err(GameError::NotPlaying(self.state.status.to_string()));
        }
        self.state.status = GameStatus::Paused;
        self.publish(GameEvent::GamePaused {
            turn: self.state.turn_number,
        });
        Ok(())
    }

    /// 从暂停恢复；已在进行中时不做任何事
    pub fn resume(&mut self) -> Result<(), GameError> {
        match self.state.status {
            GameStatus::Playing => Ok(()),
            GameStatus::Paused => {
                self.state.status = GameStatus::Playing;
                self.publish(GameEvent::GameResumed {
                    turn: self.state.turn_number,
                });
                Ok(())
            }
            other => Err(GameError::NotPlaying(other.to_string())),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.status == GameStatus::Playing
    }

    /// 发布 `save_game` 并交给持久化；失败只记录日志
    pub fn save(&mut self) -> bool {
        self.publish(GameEvent::SaveGame {
            turn: self.state.turn_number,
        });
        let saved = self.persistence.save(&self.state.game_id, &self.state);
        if saved {
            tracing::info!(
                game_id = %self.state.game_id,
                turn = self.state.turn_number,
                backend = self.persistence.name(),
                "game saved"
            );
        } else {
            tracing::warn!(
                game_id = %self.state.game_id,
                turn = self.state.turn_number,
                backend = self.persistence.name(),
                "save failed, continuing without it"
            );
        }
        saved
    }

    /// 从持久化恢复状态，没有存档时返回 `Ok(false)`
    pub fn load(&mut self) -> Result<bool, GameError> {
        let Some(state) = self.persistence.load(&self.state.game_id) else {
            return Ok(false);
        };
        if state.game_id != self.state.game_id {
            tracing::warn!(
                expected = %self.state.game_id,
                found = %state.game_id,
                "save belongs to another game"
            );
            return Err(GameError::CorruptedSave);
        }

        tracing::info!(
            game_id = %state.game_id,
            turn = state.turn_number,
            status = %state.status,
            "game loaded"
        );
        let turn = state.turn_number;
        self.state = state;
        self.queue.clear();
        self.publish(GameEvent::GameLoaded { turn });
        Ok(true)
    }

    // ========== 动作 ==========

    /// 校验并入队动作，发布 `action_queued`
    pub fn enqueue_action(
        &mut self,
        action_type: ActionType,
        params: &Map<String, Value>,
        priority: Priority,
    ) -> Result<String, GameError> {
        let id = self.queue.enqueue(action_type, params, priority)?;
        self.announce_queued(&id, action_type, priority);
        Ok(id)
    }

    /// 入队已构造好的动作
    pub fn queue_action(&mut self, kind: ActionKind, priority: Priority) -> String {
        let action_type = kind.action_type();
        let id = self.queue.push(kind, priority);
        self.announce_queued(&id, action_type, priority);
        id
    }

    fn announce_queued(&mut self, id: &str, action_type: ActionType, priority: Priority) {
        self.publish(GameEvent::ActionQueued {
            action_id: id.to_string(),
            action_type,
            priority,
        });
    }

    /// 发布事件，处理器可以向本局的队列追加动作
    pub fn publish(&mut self, event: GameEvent) -> EventRecord {
        self.bus.trigger_with(event, &mut self.queue)
    }

    // ========== 回合 ==========

    /// 推进一个回合
    pub fn process_turn(&mut self) -> Result<TurnReport, TurnRejected> {
        if self.state.status != GameStatus::Playing || self.state.creature.is_none() {
            return Err(TurnRejected {
                status: self.state.status,
                message: format!(
                    "Game is not in playing state (current: {})",
                    self.state.status
                ),
            });
        }

        self.state.turn_number += 1;
        let turn = self.state.turn_number;
        let _span = tracing::debug_span!("turn", game_id = %self.state.game_id, turn).entered();

        tracing::debug!(phase = ?TurnPhase::Drain, queued = self.queue.len(), "turn phase");
        let actions_processed = self.drain_queue();

        tracing::debug!(phase = ?TurnPhase::Progress, "turn phase");
        self.check_progress();

        tracing::debug!(phase = ?TurnPhase::Upkeep, "turn phase");
        self.apply_decay();

        tracing::debug!(phase = ?TurnPhase::Environment, "turn phase");
        self.roll_environment();

        tracing::debug!(phase = ?TurnPhase::Evaluation, "turn phase");
        let game_result = self.evaluate_outcome();

        let interval = self.config.autosave_interval;
        if interval > 0 && turn % interval == 0 {
            tracing::debug!(phase = ?TurnPhase::Autosave, "turn phase");
            self.save();
        }

        self.publish(GameEvent::TurnCompleted {
            turn,
            actions_processed: actions_processed.len(),
        });

        Ok(TurnReport {
            turn_number: turn,
            actions_processed,
            creature: self.state.creature.clone(),
            status: self.state.status,
            game_result,
            recent_events: self.bus.recent_events(self.config.recent_event_limit).to_vec(),
        })
    }

    /// 清空队列；处理器在本阶段追加的动作也会执行
    fn drain_queue(&mut self) -> Vec<Action> {
        let limit = self.config.max_actions_per_turn;
        let mut processed = Vec::new();
        while processed.len() < limit {
            let Some(action) = self.queue.begin_next() else {
                break;
            };
            let result = self.interpret(&action);
            let action = self.queue.finish(action, result);
            tracing::debug!(
                action_id = %action.id,
                action_type = %action.action_type(),
                status = ?action.status,
                "action processed"
            );
            processed.push(action);
        }
        if !self.queue.is_empty() {
            tracing::warn!(
                limit,
                remaining = self.queue.len(),
                "action limit reached, leaving the rest for the next turn"
            );
        }
        processed
    }

    fn check_progress(&mut self) {
        for area in self.state.unlock_areas() {
            tracing::info!(area = %area, "area unlocked");
            self.publish(GameEvent::NewAreaUnlocked { area });
        }

        let earned = self
            .achievements
            .check_and_unlock(&self.state.progress, &mut self.state.achievements);
        for achievement in earned {
            tracing::info!(achievement = %achievement, "achievement unlocked");
            self.publish(GameEvent::AchievementUnlocked { achievement });
        }
    }

    /// 被动衰减，之后按当前数值触发阈值事件
    fn apply_decay(&mut self) {
        let energy_loss: i32 = self.rng.random_range(1..=3);
        let happiness_loss: i32 = self.rng.random_range(1..=2);
        let Some(creature) = self.state.creature.as_mut() else {
            return;
        };

        creature.adjust_energy(-energy_loss);
        if creature.energy() < 50 {
            creature.adjust_happiness(-happiness_loss);
        }
        creature.reduce_cooldown();

        let mut events = Vec::new();
        if creature.is_tired() {
            events.push(GameEvent::FrogTired {
                energy: creature.energy(),
            });
        }
        if creature.is_sad() {
            events.push(GameEvent::FrogSad {
                happiness: creature.happiness(),
            });
        }
        if creature.is_happy() {
            events.push(GameEvent::FrogHappy {
                happiness: creature.happiness(),
            });
        }

        for event in events {
            self.publish(event);
        }
    }

    fn roll_environment(&mut self) {
        if !self.rng.random_bool(self.config.environmental_event_chance) {
            return;
        }
        let event = if self.rng.random_bool(0.5) {
            let weather = self.rng.choose(&WEATHER).copied().unwrap_or("sunny");
            GameEvent::WeatherChange {
                weather: weather.to_string(),
            }
        } else {
            let discovery = self
                .rng
                .choose(&DISCOVERIES)
                .copied()
                .unwrap_or("a hidden pond");
            GameEvent::SpecialDiscovery {
                discovery: discovery.to_string(),
            }
        };
        self.publish(event);
    }

    fn evaluate_outcome(&mut self) -> Option<GameResult> {
        let creature = self.state.creature.as_ref()?;
        let result = if creature.energy() == 0 {
            GameResult {
                outcome: Outcome::Lost,
                reason: format!("{} collapsed: energy depleted", creature.name),
            }
        } else if creature.happiness() == 0 {
            GameResult {
                outcome: Outcome::Lost,
                reason: format!("{} lost all happiness", creature.name),
            }
        } else if creature.happiness() >= WIN_HAPPINESS
            && self.state.adventures_completed >= WIN_ADVENTURES
        {
            GameResult {
                outcome: Outcome::Won,
                reason: format!(
                    "{} is joyful after {} adventures",
                    creature.name, self.state.adventures_completed
                ),
            }
        } else {
            return None;
        };

        let turn = self.state.turn_number;
        let event = match result.outcome {
            Outcome::Won => {
                self.state.status = GameStatus::Won;
                GameEvent::GameWon {
                    reason: result.reason.clone(),
                    turn,
                }
            }
            Outcome::Lost => {
                self.state.status = GameStatus::Lost;
                GameEvent::GameLost {
                    reason: result.reason.clone(),
                    turn,
                }
            }
        };
        tracing::info!(
            game_id = %self.state.game_id,
            turn,
            outcome = ?result.outcome,
            reason = %result.reason,
            "game over"
        );
        self.publish(event);
        Some(result)
    }

    // ========== 查询 ==========

    pub fn current_creature(&self) -> Option<&Creature> {
        self.state.creature.as_ref()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// 直接修改状态，供脚本场景与测试使用
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn queue(&self) -> &ActionQueue {
        &self.queue
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// 注册额外的处理器或中间件
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            game_id: self.state.game_id.clone(),
            turn_number: self.state.turn_number,
            status: self.state.status,
            adventures_completed: self.state.adventures_completed,
            achievements: self.state.achievements.clone(),
            achievement_percentage: self
                .achievements
                .unlock_percentage(&self.state.achievements),
            unlocked_areas: self.state.unlocked_areas.clone(),
            queue: self.queue.stats(),
            events: self.bus.stats(),
            creature: self.current_creature().map(CreatureStats::from),
        }
    }

    /// 状态的 JSON 传输格式
    pub fn state_json(&self) -> Result<String, GameError> {
        Ok(serde_json::to_string(&self.state)?)
    }
}

/// 疲惫时自动休息，难过时安排一次好的偶遇
fn register_default_handlers(bus: &mut EventBus) {
    let defaults: [(&str, &str, ActionKind, Priority); 2] = [
        ("frog_tired", "auto_rest", ActionKind::AutoRest {}, Priority::High),
        (
            "frog_sad",
            "cheer_up",
            ActionKind::RandomEncounter {
                positive: Some(true),
            },
            Priority::Normal,
        ),
    ];

    for (event_type, name, kind, priority) in defaults {
        let registered = bus.register_fn(event_type, name, move |_, ctx| {
            let id = ctx.enqueue(kind.clone(), priority)?;
            Ok(Value::String(id))
        });
        if let Err(e) = registered {
            tracing::error!(event_type, handler = name, error = %e, "default handler rejected");
        }
    }
}
