//! 游戏错误处理模块
//!
//! 汇总回合引擎运行过程中可能出现的各种错误：动作校验、生物构造、
//! 回合状态、存档系统、序列化、IO 等。

use bincode::error::{DecodeError, EncodeError};
use creature::CreatureError;
use thiserror::Error;

/// 游戏运行过程中可能出现的错误类型
#[derive(Debug, Error)]
pub enum GameError {
    /// 动作类型未知或缺少必需参数
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// 事件类型为空
    #[error("Invalid event type: {0}")]
    InvalidEventType(String),

    /// 生物数据未通过结构校验
    #[error("Invalid creature data: {0}")]
    InvalidCreature(#[from] CreatureError),

    /// 游戏尚未开始，没有生物
    #[error("No creature in play")]
    CreatureMissing,

    /// 游戏不在进行状态
    #[error("Game is not in playing state (current: {0})")]
    NotPlaying(String),

    /// 生物生成器失败
    #[error("Creature generator error: {0}")]
    Generator(String),

    /// 存档系统错误
    #[error("Save system error: {0}")]
    SaveError(#[from] anyhow::Error),

    /// IO操作错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 反序列化错误
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// 存档数据损坏
    #[error("Corrupted save data")]
    CorruptedSave,

    /// 存档版本不兼容
    #[error("Incompatible save version: {0}")]
    VersionMismatch(String),
}

impl GameError {
    /// 动作校验失败的快捷构造
    pub fn invalid_action(message: impl Into<String>) -> Self {
        GameError::InvalidAction(message.into())
    }

    /// 是否属于调用方输入错误（不应重试）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GameError::InvalidAction(_)
                | GameError::InvalidEventType(_)
                | GameError::InvalidCreature(_)
        )
    }
}

impl From<DecodeError> for GameError {
    fn from(err: DecodeError) -> Self {
        // 反序列化时遇到非法 UTF-8 通常意味着存档损坏
        if err.to_string().contains("invalid utf-8 sequence") {
            GameError::CorruptedSave
        } else {
            GameError::DeserializationError(err.to_string())
        }
    }
}

impl From<EncodeError> for GameError {
    fn from(err: EncodeError) -> Self {
        GameError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            GameError::DeserializationError(err.to_string())
        } else {
            GameError::SerializationError(err.to_string())
        }
    }
}

/// 处理游戏错误并转换为用户友好的消息
pub fn handle_error(error: &GameError) -> String {
    match error {
        GameError::InvalidAction(reason) => format!("That action can't be queued: {}", reason),
        GameError::InvalidCreature(reason) => format!("The creature data is invalid: {}", reason),
        GameError::CreatureMissing => "Start a new game first".to_string(),
        GameError::NotPlaying(status) => format!("The game is {}, no turns can be played", status),
        GameError::CorruptedSave => "The save data is corrupted and cannot be loaded".to_string(),
        GameError::VersionMismatch(v) => format!("Incompatible save version: {}", v),
        GameError::IoError(e) => match e.kind() {
            std::io::ErrorKind::NotFound => "Save file not found".to_string(),
            std::io::ErrorKind::PermissionDenied => "No permission to access the save file".to_string(),
            _ => format!("IO error: {}", e),
        },
        _ => error.to_string(),
    }
}
