// src/save/src/lib.rs

use anyhow::{Context, Result, anyhow};
use bincode::config;
use error::GameError;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

const SAVE_EXTENSION: &str = "sav";

/// 可被存档系统保存的游戏状态
pub trait Saveable: Serialize + DeserializeOwned {
    /// 用于存档列表显示的摘要
    fn summary(&self) -> SaveSummary;

    /// 加载后的完整性检查
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// 状态摘要(写入元数据)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveSummary {
    pub turn_number: u32,
    pub status: String,
    pub creature_name: Option<String>,
}

/// 存档元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub game_id: String,
    pub timestamp: SystemTime,
    pub turn_number: u32,
    pub status: String,
    pub creature_name: Option<String>,
}

impl SaveMetadata {
    pub fn new(game_id: &str, summary: SaveSummary) -> Self {
        Self {
            game_id: game_id.to_string(),
            timestamp: SystemTime::now(),
            turn_number: summary.turn_number,
            status: summary.status,
            creature_name: summary.creature_name,
        }
    }
}

/// 存档数据(版本 + 元数据 + 完整状态)
///
/// 字段顺序固定：列表功能只解码前两个字段。
#[derive(Debug, Serialize, Deserialize)]
pub struct SaveData<S> {
    pub version: u32,
    pub metadata: SaveMetadata,
    pub state: S,
}

/// 仅包含存档头部，用于快速读取元数据
#[derive(Debug, Deserialize)]
struct SaveHeader {
    version: u32,
    metadata: SaveMetadata,
}

impl<S: Saveable> SaveData<S> {
    pub fn new(game_id: &str, state: S) -> Self {
        Self {
            version: SAVE_VERSION,
            metadata: SaveMetadata::new(game_id, state.summary()),
            state,
        }
    }

    /// Validate save data integrity
    pub fn validate(&self) -> Result<(), GameError> {
        check_version(self.version)?;
        if self.metadata.game_id.trim().is_empty() {
            return Err(GameError::CorruptedSave);
        }
        self.state.validate().context("Save data validation failed")?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, GameError> {
        Ok(bincode::serde::encode_to_vec(self, config::standard())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GameError> {
        let (data, _): (Self, usize) =
            bincode::serde::decode_from_slice(bytes, config::standard())?;
        data.validate()?;
        Ok(data)
    }
}

fn check_version(version: u32) -> Result<(), GameError> {
    if version == 0 || version > SAVE_VERSION {
        return Err(GameError::VersionMismatch(format!(
            "found v{}, supported up to v{}",
            version, SAVE_VERSION
        )));
    }
    Ok(())
}

/// 持久化协作者
///
/// 失败不会传递给调用方：`save` 只返回是否成功，`load` 失败返回 `None`。
pub trait Persistence<S>: Send {
    fn save(&mut self, game_id: &str, state: &S) -> bool;

    fn load(&mut self, game_id: &str) -> Option<S>;

    fn name(&self) -> &'static str;
}

/// 什么也不做的持久化实现(默认)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersistence;

impl<S> Persistence<S> for NoopPersistence {
    fn save(&mut self, _game_id: &str, _state: &S) -> bool {
        true
    }

    fn load(&mut self, _game_id: &str) -> Option<S> {
        None
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// 内存存档，保存编码后的字节以隔离后续修改
#[derive(Debug, Default, Clone)]
pub struct MemoryPersistence {
    slots: HashMap<String, Vec<u8>>,
    saves: usize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_save(&self, game_id: &str) -> bool {
        self.slots.contains_key(game_id)
    }

    /// 成功保存的次数
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl<S: Saveable> Persistence<S> for MemoryPersistence {
    fn save(&mut self, game_id: &str, state: &S) -> bool {
        let data = SaveData {
            version: SAVE_VERSION,
            metadata: SaveMetadata::new(game_id, state.summary()),
            state,
        };
        match bincode::serde::encode_to_vec(&data, config::standard()) {
            Ok(bytes) => {
                self.slots.insert(game_id.to_string(), bytes);
                self.saves += 1;
                true
            }
            Err(e) => {
                tracing::warn!(game_id, error = %e, "memory save failed");
                false
            }
        }
    }

    fn load(&mut self, game_id: &str) -> Option<S> {
        let bytes = self.slots.get(game_id)?;
        match SaveData::<S>::from_bytes(bytes) {
            Ok(data) => Some(data.state),
            Err(e) => {
                tracing::warn!(game_id, error = %e, "memory load failed");
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// 文件存档系统(每个游戏一个 .sav 文件)
#[derive(Debug, Clone)]
pub struct FileSaveSystem {
    save_dir: PathBuf,
}

impl FileSaveSystem {
    /// 初始化存档系统
    pub fn new(save_dir: impl AsRef<Path>) -> Result<Self, GameError> {
        let save_dir = save_dir.as_ref();

        // 创建存档目录(如果不存在)
        if !save_dir.exists() {
            fs::create_dir_all(save_dir).context("Failed to create save directory")?;
        }

        Ok(Self {
            save_dir: save_dir.to_path_buf(),
        })
    }

    /// 获取存档文件路径，拒绝空 id 与包含路径分隔符的 id
    pub fn save_path(&self, game_id: &str) -> Result<PathBuf, GameError> {
        let valid = !game_id.trim().is_empty()
            && !game_id.contains(['/', '\\'])
            && game_id != "."
            && game_id != "..";
        if !valid {
            return Err(anyhow!("Invalid game id: {:?}", game_id).into());
        }
        Ok(self
            .save_dir
            .join(format!("{}.{}", game_id, SAVE_EXTENSION)))
    }

    /// 获取所有存档列表(按时间倒序)，无法解析的文件会被跳过
    pub fn list_saves(&self) -> Result<Vec<SaveMetadata>, GameError> {
        let mut saves = Vec::new();

        let entries = fs::read_dir(&self.save_dir).context("Failed to read save directory")?;

        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if !(path.is_file() && path.extension().is_some_and(|ext| ext == SAVE_EXTENSION)) {
                continue;
            }

            let mut file = fs::File::open(&path)
                .with_context(|| format!("Failed to open save file: {:?}", path))?;
            let header: Result<SaveHeader, _> =
                bincode::serde::decode_from_std_read(&mut file, config::standard());
            match header {
                Ok(header) if check_version(header.version).is_ok() => saves.push(header.metadata),
                Ok(header) => {
                    tracing::warn!(?path, version = header.version, "skipping save with unknown version")
                }
                Err(e) => tracing::warn!(?path, error = %e, "skipping unreadable save"),
            }
        }

        saves.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(saves)
    }

    /// 保存游戏状态(写入临时文件后原子重命名)
    pub fn save_game<S: Saveable>(&self, game_id: &str, state: &S) -> Result<(), GameError> {
        let path = self.save_path(game_id)?;
        let data = SaveData {
            version: SAVE_VERSION,
            metadata: SaveMetadata::new(game_id, state.summary()),
            state,
        };

        let temp_path = path.with_extension("tmp");
        let mut file =
            fs::File::create(&temp_path).context("Failed to create temporary save file")?;

        bincode::serde::encode_into_std_write(&data, &mut file, config::standard())?;

        // 确保数据写入磁盘
        file.flush().context("Failed to flush save data")?;

        fs::rename(&temp_path, &path).context("Failed to commit save file")?;

        tracing::info!(game_id, path = ?path, "game saved");
        Ok(())
    }

    /// 加载游戏状态
    pub fn load_game<S: Saveable>(&self, game_id: &str) -> Result<SaveData<S>, GameError> {
        let path = self.save_path(game_id)?;

        let mut file = fs::File::open(&path)?;

        let data: SaveData<S> =
            bincode::serde::decode_from_std_read(&mut file, config::standard())?;

        data.validate()?;
        if data.metadata.game_id != game_id {
            return Err(GameError::CorruptedSave);
        }

        Ok(data)
    }

    /// 删除存档
    pub fn delete_save(&self, game_id: &str) -> Result<(), GameError> {
        let path = self.save_path(game_id)?;

        if path.exists() {
            fs::remove_file(path).context("Failed to delete save file")?;
        }

        Ok(())
    }

    /// 检查指定游戏是否有存档
    pub fn has_save(&self, game_id: &str) -> bool {
        self.save_path(game_id).is_ok_and(|p| p.exists())
    }

    /// 获取存档目录路径
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }
}

impl<S: Saveable> Persistence<S> for FileSaveSystem {
    fn save(&mut self, game_id: &str, state: &S) -> bool {
        match self.save_game(game_id, state) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(game_id, error = %e, "file save failed");
                false
            }
        }
    }

    fn load(&mut self, game_id: &str) -> Option<S> {
        match self.load_game::<S>(game_id) {
            Ok(data) => Some(data.state),
            Err(e) => {
                tracing::warn!(game_id, error = %e, "file load failed");
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
