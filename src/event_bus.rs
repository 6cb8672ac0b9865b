//! 事件总线系统，用于解耦引擎与反应逻辑
//!
//! 同步的发布-订阅机制：
//! - 中间件对每个事件都会执行，先于任何类型处理器
//! - 同一类型的处理器按注册顺序执行，彼此的失败互不影响
//! - 处理器可以向动作队列追加动作，或立即触发嵌套事件
//! - 正在运行的处理器不会被嵌套的同类型事件再次调用
//! - 所有事件追加到不限长度的历史记录

use std::collections::{BTreeMap, HashMap};

use achievements::AchievementId;
use chrono::{DateTime, Utc};
use error::GameError;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::action_queue::{ActionKind, ActionQueue, ActionType, Priority};

/// 事件重要程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    Normal,
    High,
    Critical,
}

/// 游戏事件定义
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GameEvent {
    // ===== 生命周期事件 =====
    GameStarted {
        creature_name: String,
        creature_type: String,
    },
    GamePaused {
        turn: u32,
    },
    GameResumed {
        turn: u32,
    },
    GameLoaded {
        turn: u32,
    },
    GameWon {
        reason: String,
        turn: u32,
    },
    GameLost {
        reason: String,
        turn: u32,
    },
    TurnCompleted {
        turn: u32,
        actions_processed: usize,
    },
    SaveGame {
        turn: u32,
    },

    // ===== 动作事件 =====
    ActionQueued {
        action_id: String,
        action_type: ActionType,
        priority: Priority,
    },
    FrogMoved {
        direction: String,
    },
    FrogRested {
        energy_gained: i32,
        automatic: bool,
    },
    FrogFed {
        food: String,
        from_inventory: bool,
    },
    FrogInteracted {
        target: String,
    },
    FrogAbilityUsed {
        ability: String,
        power: f64,
    },
    FrogItemFound {
        item: String,
    },
    AdventureStarted {
        scenario_id: String,
        success_chance: f64,
    },
    AdventureCompleted {
        scenario_id: String,
        adventures_completed: u32,
    },
    AdventureFailed {
        scenario_id: String,
    },
    RandomEncounter {
        positive: bool,
    },

    // ===== 状态阈值事件 =====
    FrogTired {
        energy: u8,
    },
    FrogSad {
        happiness: u8,
    },
    FrogHappy {
        happiness: u8,
    },

    // ===== 环境与进度事件 =====
    WeatherChange {
        weather: String,
    },
    SpecialDiscovery {
        discovery: String,
    },
    NewAreaUnlocked {
        area: String,
    },
    AchievementUnlocked {
        achievement: AchievementId,
    },

    /// 自定义事件（开放的类型标签）
    Custom {
        event_type: String,
        data: Value,
    },
}

impl GameEvent {
    /// 获取事件类型标签
    pub fn event_type(&self) -> &str {
        match self {
            GameEvent::GameStarted { .. } => "game_started",
            GameEvent::GamePaused { .. } => "game_paused",
            GameEvent::GameResumed { .. } => "game_resumed",
            GameEvent::GameLoaded { .. } => "game_loaded",
            GameEvent::GameWon { .. } => "game_won",
            GameEvent::GameLost { .. } => "game_lost",
            GameEvent::TurnCompleted { .. } => "turn_completed",
            GameEvent::SaveGame { .. } => "save_game",
            GameEvent::ActionQueued { .. } => "action_queued",
            GameEvent::FrogMoved { .. } => "frog_moved",
            GameEvent::FrogRested { .. } => "frog_rested",
            GameEvent::FrogFed { .. } => "frog_fed",
            GameEvent::FrogInteracted { .. } => "frog_interacted",
            GameEvent::FrogAbilityUsed { .. } => "frog_ability_used",
            GameEvent::FrogItemFound { .. } => "frog_item_found",
            GameEvent::AdventureStarted { .. } => "adventure_started",
            GameEvent::AdventureCompleted { .. } => "adventure_completed",
            GameEvent::AdventureFailed { .. } => "adventure_failed",
            GameEvent::RandomEncounter { .. } => "random_encounter",
            GameEvent::FrogTired { .. } => "frog_tired",
            GameEvent::FrogSad { .. } => "frog_sad",
            GameEvent::FrogHappy { .. } => "frog_happy",
            GameEvent::WeatherChange { .. } => "weather_change",
            GameEvent::SpecialDiscovery { .. } => "special_discovery",
            GameEvent::NewAreaUnlocked { .. } => "new_area_unlocked",
            GameEvent::AchievementUnlocked { .. } => "achievement_unlocked",
            GameEvent::Custom { event_type, .. } => event_type,
        }
    }

    /// 默认重要程度
    pub fn importance(&self) -> Importance {
        match self {
            GameEvent::GameWon { .. } | GameEvent::GameLost { .. } => Importance::Critical,
            GameEvent::AchievementUnlocked { .. }
            | GameEvent::NewAreaUnlocked { .. }
            | GameEvent::FrogTired { .. }
            | GameEvent::FrogSad { .. }
            | GameEvent::GameStarted { .. } => Importance::High,
            GameEvent::ActionQueued { .. }
            | GameEvent::TurnCompleted { .. }
            | GameEvent::SaveGame { .. }
            | GameEvent::WeatherChange { .. } => Importance::Low,
            _ => Importance::Normal,
        }
    }

    /// 事件数据（不含类型标签）
    pub fn payload(&self) -> Value {
        if let GameEvent::Custom { data, .. } = self {
            return data.clone();
        }
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove("data").unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    pub fn custom(event_type: impl Into<String>, data: Value) -> Self {
        GameEvent::Custom {
            event_type: event_type.into(),
            data,
        }
    }
}

/// 单个处理器的执行结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResult {
    pub handler_index: usize,
    pub handler: String,
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// 中间件执行失败记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MiddlewareError {
    pub middleware: String,
    pub error: String,
}

/// 已触发事件的完整记录
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: Value,
    pub importance: Importance,
    pub game_id: String,
    pub triggered_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub handler_results: Vec<HandlerResult>,
    pub middleware_errors: Vec<MiddlewareError>,
    /// 中间件可写入的附加信息
    pub metadata: Map<String, Value>,
    #[serde(skip)]
    pub event: GameEvent,
}

impl EventRecord {
    fn new(game_id: &str, event: GameEvent) -> Self {
        Self {
            id: format!("event_{}", Uuid::new_v4().simple()),
            event_type: event.event_type().to_string(),
            payload: event.payload(),
            importance: event.importance(),
            game_id: game_id.to_string(),
            triggered_at: Utc::now(),
            processed_at: None,
            handler_results: Vec::new(),
            middleware_errors: Vec::new(),
            metadata: Map::new(),
            event,
        }
    }

    /// 所有处理器与中间件都成功
    pub fn all_succeeded(&self) -> bool {
        self.middleware_errors.is_empty() && self.handler_results.iter().all(|r| r.success)
    }

    pub fn failed_handlers(&self) -> impl Iterator<Item = &HandlerResult> {
        self.handler_results.iter().filter(|r| !r.success)
    }
}

/// 处理器运行时可访问的上下文
pub struct HandlerContext<'a> {
    bus: &'a mut EventBus,
    queue: Option<&'a mut ActionQueue>,
    depth: usize,
}

impl<'a> HandlerContext<'a> {
    /// 向所属游戏的动作队列追加动作
    pub fn enqueue(&mut self, kind: ActionKind, priority: Priority) -> anyhow::Result<String> {
        match self.queue.as_deref_mut() {
            Some(queue) => Ok(queue.push(kind, priority)),
            None => Err(anyhow::anyhow!("no action queue attached to this dispatch")),
        }
    }

    pub fn has_queue(&self) -> bool {
        self.queue.is_some()
    }

    /// 当前分发的嵌套深度（顶层事件为 0）
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 立即分发嵌套事件，返回其处理记录
    ///
    /// 嵌套事件在本处理器返回前处理完毕；超过最大嵌套深度时返回错误且不分发。
    pub fn trigger(&mut self, event: GameEvent) -> anyhow::Result<EventRecord> {
        let depth = self.depth + 1;
        if depth > self.bus.max_dispatch_depth {
            tracing::warn!(
                event_type = %event.event_type(),
                max_depth = self.bus.max_dispatch_depth,
                "maximum dispatch depth reached, nested event dropped"
            );
            return Err(anyhow::anyhow!(
                "maximum dispatch depth {} reached, {} not dispatched",
                self.bus.max_dispatch_depth,
                event.event_type()
            ));
        }
        Ok(self.bus.dispatch(event, self.queue.as_deref_mut(), depth))
    }
}

/// 事件处理器 trait
pub trait EventHandler: Send {
    /// 处理事件，返回值记录到事件的处理结果中
    fn handle(&mut self, event: &EventRecord, ctx: &mut HandlerContext<'_>) -> anyhow::Result<Value>;

    /// 事件处理器的名称（用于调试）
    fn name(&self) -> &str;
}

/// 闭包处理器包装
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F> FnHandler<F>
where
    F: FnMut(&EventRecord, &mut HandlerContext<'_>) -> anyhow::Result<Value> + Send,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: FnMut(&EventRecord, &mut HandlerContext<'_>) -> anyhow::Result<Value> + Send,
{
    fn handle(&mut self, event: &EventRecord, ctx: &mut HandlerContext<'_>) -> anyhow::Result<Value> {
        (self.func)(event, ctx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 事件中间件 trait - 在所有类型处理器之前/之后执行
pub trait EventMiddleware: Send {
    /// 可修改事件的元数据；返回错误只会被记录，不会中断分发
    fn before_handle(&mut self, event: &mut EventRecord) -> anyhow::Result<()>;

    /// 在事件处理之后调用
    fn after_handle(&mut self, _event: &EventRecord) {}

    /// 中间件名称（用于调试）
    fn name(&self) -> &str;
}

/// 闭包中间件包装
pub struct FnMiddleware<F> {
    name: String,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: FnMut(&mut EventRecord) -> anyhow::Result<()> + Send,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> EventMiddleware for FnMiddleware<F>
where
    F: FnMut(&mut EventRecord) -> anyhow::Result<()> + Send,
{
    fn before_handle(&mut self, event: &mut EventRecord) -> anyhow::Result<()> {
        (self.func)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 通过 tracing 记录每个事件
#[derive(Debug, Default)]
pub struct TracingMiddleware;

impl EventMiddleware for TracingMiddleware {
    fn before_handle(&mut self, event: &mut EventRecord) -> anyhow::Result<()> {
        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            importance = ?event.importance,
            "dispatching event"
        );
        event.metadata.insert("traced".to_string(), Value::Bool(true));
        Ok(())
    }

    fn after_handle(&mut self, event: &EventRecord) {
        let failures = event.failed_handlers().count();
        if failures > 0 {
            tracing::warn!(event_type = %event.event_type, failures, "event handlers failed");
        }
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// 事件统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventStats {
    pub total_events: usize,
    pub by_type: BTreeMap<String, usize>,
    pub handler_counts: BTreeMap<String, usize>,
    pub middleware_count: usize,
    pub failed_handler_runs: usize,
}

/// 已注册的处理器；运行期间处理器被取出，槽位为空
struct HandlerSlot {
    name: String,
    handler: Option<Box<dyn EventHandler>>,
}

#[derive(Serialize)]
struct BusSnapshot<'a> {
    game_id: &'a str,
    history: &'a [EventRecord],
    stats: EventStats,
}

/// 同步事件总线
pub struct EventBus {
    game_id: String,
    /// 注册的事件处理器（按事件类型分组，保持注册顺序）
    handlers: HashMap<String, Vec<HandlerSlot>>,
    /// 事件中间件
    middlewares: Vec<Box<dyn EventMiddleware>>,
    /// 事件历史（不限长度）
    history: Vec<EventRecord>,
    /// 嵌套事件的最大深度
    max_dispatch_depth: usize,
}

impl EventBus {
    pub fn new(game_id: impl Into<String>) -> Self {
        Self::with_max_depth(game_id, 10)
    }

    pub fn with_max_depth(game_id: impl Into<String>, max_dispatch_depth: usize) -> Self {
        Self {
            game_id: game_id.into(),
            handlers: HashMap::new(),
            middlewares: Vec::new(),
            history: Vec::new(),
            max_dispatch_depth,
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    // ========== 注册 API ==========

    /// 注册事件处理器，类型不能为空
    pub fn register_handler<H>(&mut self, event_type: &str, handler: H) -> Result<(), GameError>
    where
        H: EventHandler + 'static,
    {
        if event_type.trim().is_empty() {
            return Err(GameError::InvalidEventType(
                "event type must not be empty".to_string(),
            ));
        }
        self.handlers
            .entry(event_type.to_string())
            .or_default()
            .push(HandlerSlot {
                name: handler.name().to_string(),
                handler: Some(Box::new(handler)),
            });
        Ok(())
    }

    /// 以闭包注册处理器
    pub fn register_fn<F>(&mut self, event_type: &str, name: &str, func: F) -> Result<(), GameError>
    where
        F: FnMut(&EventRecord, &mut HandlerContext<'_>) -> anyhow::Result<Value> + Send + 'static,
    {
        self.register_handler(event_type, FnHandler::new(name, func))
    }

    /// 注册事件中间件（按注册顺序执行）
    pub fn register_middleware<M>(&mut self, middleware: M)
    where
        M: EventMiddleware + 'static,
    {
        self.middlewares.push(Box::new(middleware));
    }

    pub fn has_handlers(&self, event_type: &str) -> bool {
        self.handler_count(event_type) > 0
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers.get(event_type).map_or(0, Vec::len)
    }

    pub fn clear_handlers(&mut self, event_type: &str) {
        self.handlers.remove(event_type);
    }

    pub fn clear_all_handlers(&mut self) {
        self.handlers.clear();
    }

    // ========== 触发 API ==========

    /// 触发事件（处理器无法访问动作队列）
    pub fn trigger(&mut self, event: GameEvent) -> EventRecord {
        self.dispatch(event, None, 0)
    }

    /// 触发事件，处理器可以向 `queue` 追加动作
    pub fn trigger_with(&mut self, event: GameEvent, queue: &mut ActionQueue) -> EventRecord {
        self.dispatch(event, Some(queue), 0)
    }

    fn dispatch(
        &mut self,
        event: GameEvent,
        mut queue: Option<&mut ActionQueue>,
        depth: usize,
    ) -> EventRecord {
        let mut record = EventRecord::new(&self.game_id, event);

        for middleware in &mut self.middlewares {
            if let Err(e) = middleware.before_handle(&mut record) {
                tracing::warn!(
                    middleware = middleware.name(),
                    event_type = %record.event_type,
                    error = %e,
                    "middleware failed"
                );
                record.middleware_errors.push(MiddlewareError {
                    middleware: middleware.name().to_string(),
                    error: format!("{:#}", e),
                });
            }
        }

        // 先占位，嵌套事件排在外层事件之后
        let slot = self.history.len();
        self.history.push(record.clone());

        let count = self.handler_count(&record.event_type);
        let mut results = Vec::with_capacity(count);
        for index in 0..count {
            let Some((name, taken)) = self
                .handlers
                .get_mut(&record.event_type)
                .and_then(|slots| slots.get_mut(index))
                .map(|s| (s.name.clone(), s.handler.take()))
            else {
                break;
            };

            let outcome = match taken {
                Some(mut handler) => {
                    let mut ctx = HandlerContext {
                        bus: &mut *self,
                        queue: queue.as_deref_mut(),
                        depth,
                    };
                    let outcome = handler.handle(&record, &mut ctx);
                    if let Some(s) = self
                        .handlers
                        .get_mut(&record.event_type)
                        .and_then(|slots| slots.get_mut(index))
                    {
                        s.handler = Some(handler);
                    }
                    outcome
                }
                None => Err(anyhow::anyhow!("handler {} is already running", name)),
            };

            let result = match outcome {
                Ok(value) => HandlerResult {
                    handler_index: index,
                    handler: name,
                    success: true,
                    result: Some(value),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(
                        handler = %name,
                        event_type = %record.event_type,
                        error = %e,
                        "event handler failed"
                    );
                    HandlerResult {
                        handler_index: index,
                        handler: name,
                        success: false,
                        result: None,
                        error: Some(format!("{:#}", e)),
                    }
                }
            };
            results.push(result);
        }
        record.handler_results = results;

        for middleware in &mut self.middlewares {
            middleware.after_handle(&record);
        }

        record.processed_at = Some(Utc::now());
        if self.history.get(slot).is_some_and(|e| e.id == record.id) {
            self.history[slot] = record.clone();
        } else {
            self.history.push(record.clone());
        }
        record
    }

    // ========== 历史记录 API ==========

    pub fn history(&self) -> &[EventRecord] {
        &self.history
    }

    pub fn events_by_type(&self, event_type: &str) -> Vec<&EventRecord> {
        self.history
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// 获取最近的 n 个事件
    pub fn recent_events(&self, count: usize) -> &[EventRecord] {
        let start = self.history.len().saturating_sub(count);
        &self.history[start..]
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn stats(&self) -> EventStats {
        let mut by_type = BTreeMap::new();
        let mut failed_handler_runs = 0;
        for record in &self.history {
            *by_type.entry(record.event_type.clone()).or_insert(0) += 1;
            failed_handler_runs += record.failed_handlers().count();
        }
        EventStats {
            total_events: self.history.len(),
            by_type,
            handler_counts: self
                .handlers
                .iter()
                .map(|(k, v)| (k.clone(), v.len()))
                .collect(),
            middleware_count: self.middlewares.len(),
            failed_handler_runs,
        }
    }

    /// JSON 传输格式（历史记录与统计）
    pub fn to_json(&self) -> Result<String, GameError> {
        let snapshot = BusSnapshot {
            game_id: &self.game_id,
            history: &self.history,
            stats: self.stats(),
        };
        Ok(serde_json::to_string(&snapshot)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn tired() -> GameEvent {
        GameEvent::FrogTired { energy: 12 }
    }

    #[test]
    fn event_tags_and_payloads() {
        let event = GameEvent::AdventureCompleted {
            scenario_id: "pond".into(),
            adventures_completed: 3,
        };
        assert_eq!(event.event_type(), "adventure_completed");
        assert_eq!(
            event.payload(),
            json!({"scenario_id": "pond", "adventures_completed": 3})
        );

        let custom = GameEvent::custom("frog_sang", json!({"notes": 4}));
        assert_eq!(custom.event_type(), "frog_sang");
        assert_eq!(custom.payload(), json!({"notes": 4}));
        assert_eq!(
            GameEvent::GameLost {
                reason: "x".into(),
                turn: 1
            }
            .importance(),
            Importance::Critical
        );
    }

    #[test]
    fn empty_event_type_is_rejected() {
        let mut bus = EventBus::new("g");
        let err = bus
            .register_fn("  ", "noop", |_, _| Ok(Value::Null))
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidEventType(_)));
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let mut bus = EventBus::new("g");
        let seen = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            bus.register_fn("frog_tired", name, move |_, _| {
                seen.lock().unwrap().push(name);
                Ok(json!(name))
            })
            .unwrap();
        }
        let record = bus.trigger(tired());
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
        let indexes: Vec<usize> = record.handler_results.iter().map(|r| r.handler_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert!(record.processed_at.is_some());
    }

    #[test]
    fn middleware_failures_do_not_stop_handlers() {
        let mut bus = EventBus::new("g");
        bus.register_middleware(FnMiddleware::new("broken", |_: &mut EventRecord| Err(anyhow!("boom"))));
        bus.register_middleware(FnMiddleware::new("tagger", |e: &mut EventRecord| {
            e.metadata.insert("tagged".into(), json!(true));
            Ok(())
        }));
        bus.register_fn("weather_change", "reader", |e, _| {
            Ok(e.metadata.get("tagged").cloned().unwrap_or(Value::Null))
        })
        .unwrap();

        let record = bus.trigger(GameEvent::WeatherChange {
            weather: "rain".into(),
        });
        assert_eq!(record.middleware_errors.len(), 1);
        assert_eq!(record.middleware_errors[0].middleware, "broken");
        assert_eq!(record.handler_results[0].result, Some(json!(true)));
    }

    #[test]
    fn middleware_sees_events_without_handlers() {
        let mut bus = EventBus::new("g");
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        bus.register_middleware(FnMiddleware::new("count", move |_: &mut EventRecord| {
            *counter.lock().unwrap() += 1;
            Ok(())
        }));
        bus.trigger(tired());
        bus.trigger(GameEvent::SaveGame { turn: 5 });
        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn handlers_can_enqueue_when_queue_attached() {
        let mut bus = EventBus::new("g");
        let mut queue = ActionQueue::new("g");
        bus.register_fn("frog_tired", "auto_rest", |_, ctx| {
            let id = ctx.enqueue(ActionKind::AutoRest {}, Priority::High)?;
            Ok(json!(id))
        })
        .unwrap();

        let record = bus.trigger_with(tired(), &mut queue);
        assert!(record.all_succeeded());
        assert_eq!(queue.len(), 1);

        // Without a queue the handler fails but the dispatch still completes
        let record = bus.trigger(tired());
        assert!(!record.handler_results[0].success);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn nested_trigger_runs_inside_the_calling_handler() {
        let mut bus = EventBus::new("g");
        let log = Arc::new(Mutex::new(Vec::new()));

        let h1 = Arc::clone(&log);
        bus.register_fn("adventure_completed", "h1", move |_, ctx| {
            h1.lock().unwrap().push("outer.h1".to_string());
            let nested = ctx.trigger(GameEvent::NewAreaUnlocked {
                area: "misty_marsh".into(),
            })?;
            Ok(json!({"nested": nested.event_type, "ok": nested.all_succeeded()}))
        })
        .unwrap();
        let h2 = Arc::clone(&log);
        bus.register_fn("adventure_completed", "h2", move |_, _| {
            h2.lock().unwrap().push("outer.h2".to_string());
            Ok(Value::Null)
        })
        .unwrap();
        let i1 = Arc::clone(&log);
        bus.register_fn("new_area_unlocked", "i1", move |_, ctx| {
            i1.lock().unwrap().push("inner.i1".to_string());
            Ok(json!(ctx.depth()))
        })
        .unwrap();

        let record = bus.trigger(GameEvent::AdventureCompleted {
            scenario_id: "s".into(),
            adventures_completed: 3,
        });

        assert_eq!(*log.lock().unwrap(), vec!["outer.h1", "inner.i1", "outer.h2"]);
        assert_eq!(
            record.handler_results[0].result,
            Some(json!({"nested": "new_area_unlocked", "ok": true}))
        );
        let types: Vec<&str> = bus.history().iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["adventure_completed", "new_area_unlocked"]);
        assert_eq!(bus.history()[0].id, record.id);
        assert_eq!(bus.history()[0].handler_results, record.handler_results);
        assert!(bus.history()[0].processed_at.is_some());
        assert_eq!(bus.history()[1].handler_results[0].result, Some(json!(1)));
    }

    #[test]
    fn nested_chains_stop_at_max_depth() {
        let mut bus = EventBus::with_max_depth("g", 2);
        for (from, to) in [("a", "b"), ("b", "c"), ("c", "d")] {
            bus.register_fn(from, from, move |_, ctx| {
                ctx.trigger(GameEvent::custom(to, Value::Null))?;
                Ok(Value::Null)
            })
            .unwrap();
        }

        let record = bus.trigger(GameEvent::custom("a", Value::Null));

        let types: Vec<&str> = bus.history().iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["a", "b", "c"]);
        let deepest = bus.events_by_type("c")[0];
        assert!(!deepest.handler_results[0].success);
        assert!(
            deepest.handler_results[0]
                .error
                .as_deref()
                .unwrap()
                .contains("maximum dispatch depth 2")
        );
        // 外层处理器照常完成
        assert!(record.all_succeeded());
    }

    #[test]
    fn running_handler_is_not_reentered() {
        let mut bus = EventBus::new("g");
        bus.register_fn("echo", "echo", |_, ctx| {
            let nested = ctx.trigger(GameEvent::custom("echo", Value::Null))?;
            Ok(json!(nested.all_succeeded()))
        })
        .unwrap();

        let record = bus.trigger(GameEvent::custom("echo", Value::Null));

        assert_eq!(bus.events_by_type("echo").len(), 2);
        assert_eq!(record.handler_results[0].result, Some(json!(false)));
        let inner = &bus.history()[1];
        assert_eq!(
            inner.handler_results[0].error.as_deref(),
            Some("handler echo is already running")
        );
        assert_eq!(bus.handler_count("echo"), 1);

        // 处理器已放回，可以再次触发
        let again = bus.trigger(GameEvent::custom("echo", Value::Null));
        assert!(again.handler_results[0].success);
    }

    #[test]
    fn history_queries_and_stats() {
        let mut bus = EventBus::new("g");
        bus.register_middleware(TracingMiddleware);
        bus.register_fn("frog_sad", "fails", |_, _| Err(anyhow!("nope")))
            .unwrap();
        bus.trigger(tired());
        bus.trigger(GameEvent::FrogSad { happiness: 10 });
        bus.trigger(tired());

        assert_eq!(bus.events_by_type("frog_tired").len(), 2);
        assert_eq!(bus.recent_events(2)[0].event_type, "frog_sad");
        assert_eq!(bus.recent_events(10).len(), 3);
        assert_eq!(bus.history()[0].metadata.get("traced"), Some(&json!(true)));

        let stats = bus.stats();
        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.by_type.get("frog_tired"), Some(&2));
        assert_eq!(stats.handler_counts.get("frog_sad"), Some(&1));
        assert_eq!(stats.middleware_count, 1);
        assert_eq!(stats.failed_handler_runs, 1);

        let json: Value = serde_json::from_str(&bus.to_json().unwrap()).unwrap();
        assert_eq!(json["history"][1]["type"], "frog_sad");
        assert_eq!(json["history"][1]["handler_results"][0]["success"], false);

        bus.clear_history();
        assert!(bus.history().is_empty());
        assert!(bus.has_handlers("frog_sad"));
        bus.clear_handlers("frog_sad");
        assert!(!bus.has_handlers("frog_sad"));
    }
}
