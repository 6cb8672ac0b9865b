//! Turn-based frog companion engine.

pub mod action_queue;
pub mod config;
pub mod engine;
pub mod event_bus;
pub mod game_state;
pub mod interpreters;

pub use action_queue::{
    Action, ActionKind, ActionOutcome, ActionQueue, ActionStatus, ActionType, Priority, QueueStats,
};
pub use config::EngineConfig;
pub use engine::{
    CreatureStats, EngineStats, GameEngine, GameResult, Outcome, TurnRejected, TurnReport,
};
pub use event_bus::{
    EventBus, EventHandler, EventMiddleware, EventRecord, EventStats, FnHandler, FnMiddleware,
    GameEvent, HandlerContext, HandlerResult, Importance, TracingMiddleware,
};
pub use game_state::{AREA_UNLOCKS, GameState, GameStatus, STARTING_AREA};
