//! Priority-ordered queue of player intents.
//!
//! Ordering rule: a high-priority action goes to the very front, a low one to
//! the very back, and a normal one right before the first low action (or at
//! the back when there is none). Within normal and low, insertion order is
//! kept; high actions are stacked, the newest first.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use error::GameError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::EnumIter;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Move,
    UseAbility,
    Rest,
    Feed,
    Adventure,
    Interact,
    AutoRest,
    RandomEncounter,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Move => "move",
            ActionType::UseAbility => "use_ability",
            ActionType::Rest => "rest",
            ActionType::Feed => "feed",
            ActionType::Adventure => "adventure",
            ActionType::Interact => "interact",
            ActionType::AutoRest => "auto_rest",
            ActionType::RandomEncounter => "random_encounter",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use strum::IntoEnumIterator;
        ActionType::iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| GameError::invalid_action(format!("Unknown action type: {}", s)))
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl FromStr for Priority {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            other => Err(GameError::invalid_action(format!("Unknown priority: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Completed | ActionStatus::Failed)
    }
}

/// Typed action payload; the tag and parameters travel as `type` / `params`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum ActionKind {
    Move { direction: String },
    UseAbility { ability: String },
    Rest {},
    Feed { food: String },
    Adventure { scenario_id: String },
    Interact { target: String },
    AutoRest {},
    RandomEncounter {
        #[serde(default)]
        positive: Option<bool>,
    },
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionKind::Move { .. } => ActionType::Move,
            ActionKind::UseAbility { .. } => ActionType::UseAbility,
            ActionKind::Rest {} => ActionType::Rest,
            ActionKind::Feed { .. } => ActionType::Feed,
            ActionKind::Adventure { .. } => ActionType::Adventure,
            ActionKind::Interact { .. } => ActionType::Interact,
            ActionKind::AutoRest {} => ActionType::AutoRest,
            ActionKind::RandomEncounter { .. } => ActionType::RandomEncounter,
        }
    }

    /// Validates loosely-typed parameters for `action_type`.
    ///
    /// Returns the typed action plus every parameter it did not consume.
    pub fn from_params(
        action_type: ActionType,
        params: &Map<String, Value>,
    ) -> Result<(Self, Map<String, Value>), GameError> {
        let mut rest = params.clone();
        let kind = match action_type {
            ActionType::Move => ActionKind::Move {
                direction: take_required(&mut rest, "direction", "Move action requires direction")?,
            },
            ActionType::UseAbility => ActionKind::UseAbility {
                ability: take_required(
                    &mut rest,
                    "ability",
                    "Use ability action requires ability name",
                )?,
            },
            ActionType::Rest => ActionKind::Rest {},
            ActionType::Feed => ActionKind::Feed {
                food: take_required(&mut rest, "food", "Feed action requires food item")?,
            },
            ActionType::Adventure => ActionKind::Adventure {
                scenario_id: take_required(
                    &mut rest,
                    "scenario_id",
                    "Adventure action requires scenario_id",
                )?,
            },
            ActionType::Interact => ActionKind::Interact {
                target: take_required(&mut rest, "target", "Interact action requires target")?,
            },
            ActionType::AutoRest => ActionKind::AutoRest {},
            ActionType::RandomEncounter => {
                let positive = match rest.remove("positive") {
                    None | Some(Value::Null) => None,
                    Some(Value::Bool(b)) => Some(b),
                    Some(other) => {
                        return Err(GameError::invalid_action(format!(
                            "Random encounter 'positive' must be a boolean, got {}",
                            other
                        )));
                    }
                };
                ActionKind::RandomEncounter { positive }
            }
        };
        Ok((kind, rest))
    }
}

fn take_required(
    params: &mut Map<String, Value>,
    key: &str,
    message: &str,
) -> Result<String, GameError> {
    match params.remove(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(GameError::invalid_action(message)),
    }
}

/// What an interpreter reports back for one action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    pub energy_change: i32,
    pub happiness_change: i32,
    pub items_gained: Vec<String>,
    pub items_used: Vec<String>,
}

impl ActionOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_changes(mut self, energy: i32, happiness: i32) -> Self {
        self.energy_change = energy;
        self.happiness_change = happiness;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    #[serde(flatten)]
    pub kind: ActionKind,
    pub priority: Priority,
    pub status: ActionStatus,
    /// Unrecognised parameters, kept verbatim.
    #[serde(default)]
    pub extra: Map<String, Value>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<ActionOutcome>,
    pub error: Option<String>,
}

impl Action {
    pub fn new(game_id: &str, kind: ActionKind, priority: Priority) -> Self {
        Self {
            id: format!("action_{}_{}", game_id, Uuid::new_v4().simple()),
            kind,
            priority,
            status: ActionStatus::Pending,
            extra: Map::new(),
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub by_priority: BTreeMap<Priority, usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionQueue {
    game_id: String,
    actions: VecDeque<Action>,
    #[serde(default)]
    completed: usize,
    #[serde(default)]
    failed: usize,
    #[serde(skip)]
    in_flight: usize,
}

impl ActionQueue {
    pub fn new(game_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            ..Default::default()
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Validates and enqueues a loosely-typed request, returning the action id.
    pub fn enqueue(
        &mut self,
        action_type: ActionType,
        params: &Map<String, Value>,
        priority: Priority,
    ) -> Result<String, GameError> {
        let (kind, extra) = ActionKind::from_params(action_type, params)?;
        let mut action = Action::new(&self.game_id, kind, priority);
        action.extra = extra;
        Ok(self.insert(action))
    }

    /// Enqueues an already-typed action.
    pub fn push(&mut self, kind: ActionKind, priority: Priority) -> String {
        self.insert(Action::new(&self.game_id, kind, priority))
    }

    fn insert(&mut self, action: Action) -> String {
        let id = action.id.clone();
        match action.priority {
            Priority::High => self.actions.push_front(action),
            Priority::Low => self.actions.push_back(action),
            Priority::Normal => {
                match self.actions.iter().position(|a| a.priority == Priority::Low) {
                    Some(idx) => self.actions.insert(idx, action),
                    None => self.actions.push_back(action),
                }
            }
        }
        tracing::debug!(action_id = %id, queued = self.actions.len(), "action enqueued");
        id
    }

    /// Removes the head and marks it as processing.
    pub fn begin_next(&mut self) -> Option<Action> {
        let mut action = self.actions.pop_front()?;
        action.status = ActionStatus::Processing;
        action.started_at = Some(Utc::now());
        self.in_flight += 1;
        Some(action)
    }

    /// Records the interpreter result on an action taken by [`begin_next`].
    ///
    /// [`begin_next`]: ActionQueue::begin_next
    pub fn finish(&mut self, mut action: Action, result: anyhow::Result<ActionOutcome>) -> Action {
        self.in_flight = self.in_flight.saturating_sub(1);
        action.completed_at = Some(Utc::now());
        match result {
            Ok(outcome) => {
                action.status = ActionStatus::Completed;
                action.result = Some(outcome);
                self.completed += 1;
            }
            Err(e) => {
                tracing::debug!(action_id = %action.id, error = %e, "action failed");
                action.status = ActionStatus::Failed;
                action.error = Some(format!("{:#}", e));
                self.failed += 1;
            }
        }
        action
    }

    /// Dequeues and interprets the head. Interpreter errors end up on the
    /// returned action, never as a panic or an `Err`.
    pub fn process_next<F>(&mut self, interpret: F) -> Option<Action>
    where
        F: FnOnce(&Action) -> anyhow::Result<ActionOutcome>,
    {
        let action = self.begin_next()?;
        let result = interpret(&action);
        Some(self.finish(action, result))
    }

    pub fn pending(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn peek(&self) -> Option<&Action> {
        self.actions.front()
    }

    pub fn get(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn by_status(&self, status: ActionStatus) -> Vec<&Action> {
        self.actions.iter().filter(|a| a.status == status).collect()
    }

    pub fn by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type() == action_type)
            .collect()
    }

    /// Cancels a not-yet-dequeued action.
    pub fn remove(&mut self, id: &str) -> Option<Action> {
        let idx = self.actions.iter().position(|a| a.id == id)?;
        self.actions.remove(idx)
    }

    pub fn stats(&self) -> QueueStats {
        let mut by_priority = BTreeMap::new();
        for action in &self.actions {
            *by_priority.entry(action.priority).or_insert(0) += 1;
        }
        let pending = self.actions.len();
        QueueStats {
            total: pending + self.in_flight + self.completed + self.failed,
            pending,
            processing: self.in_flight,
            completed: self.completed,
            failed: self.failed,
            by_priority,
        }
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.completed = 0;
        self.failed = 0;
    }

    pub fn to_json(&self) -> Result<String, GameError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let queue: ActionQueue = serde_json::from_str(json)?;
        if let Some(done) = queue.actions.iter().find(|a| a.status.is_terminal()) {
            return Err(GameError::DeserializationError(format!(
                "action {} is already {:?}",
                done.id, done.status
            )));
        }
        Ok(queue)
    }
}
