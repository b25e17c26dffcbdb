// ==========================================
// 病例列表存储 - 存储配置
// ==========================================
// 来源优先级（低 -> 高）:
// 1. 内置默认值（数据库位于系统数据目录）
// 2. JSON 配置文件
// 3. 环境变量 CASE_LIST_*
// ==========================================

use crate::db;
use crate::repository::case_list_repo::{DEFAULT_MEMBERSHIP_CHUNK_SIZE, MAX_MEMBERSHIP_CHUNK_SIZE};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::SqliteCaseListRepository;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 配置键（环境变量名）
pub mod env_keys {
    pub const DB_PATH: &str = "CASE_LIST_DB_PATH";
    pub const BUSY_TIMEOUT_MS: &str = "CASE_LIST_BUSY_TIMEOUT_MS";
    pub const CREATE_MODE: &str = "CASE_LIST_CREATE_MODE";
    pub const MEMBERSHIP_CHUNK_SIZE: &str = "CASE_LIST_MEMBERSHIP_CHUNK_SIZE";
    pub const SQL_TRACE: &str = "CASE_LIST_SQL_TRACE";
}

// ==========================================
// 创建模式 (Create Mode)
// ==========================================
// Atomic: 元数据与成员关系同一事务
// NonAtomic: 两步写入，成员写入失败时保留元数据行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreateMode {
    #[default]
    Atomic,
    NonAtomic,
}

impl FromStr for CreateMode {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "ATOMIC" => Ok(CreateMode::Atomic),
            "NON_ATOMIC" | "NONATOMIC" => Ok(CreateMode::NonAtomic),
            other => Err(RepositoryError::ConfigError(format!(
                "未知的创建模式: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for CreateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateMode::Atomic => write!(f, "ATOMIC"),
            CreateMode::NonAtomic => write!(f, "NON_ATOMIC"),
        }
    }
}

// ==========================================
// StoreConfig - 存储配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub busy_timeout_ms: u64,
    pub create_mode: CreateMode,
    pub membership_chunk_size: usize,
    pub sql_trace: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            busy_timeout_ms: db::DEFAULT_BUSY_TIMEOUT_MS,
            create_mode: CreateMode::default(),
            membership_chunk_size: DEFAULT_MEMBERSHIP_CHUNK_SIZE,
            sql_trace: false,
        }
    }
}

/// 默认数据库路径: {data_dir}/case-list-store/case_lists.db
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::APP_NAME)
        .join("case_lists.db")
}

impl StoreConfig {
    /// 加载配置：默认值 -> 配置文件（可选）-> 环境变量
    pub fn load(config_file: Option<&Path>) -> RepositoryResult<Self> {
        let base = match config_file {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// 从 JSON 文件读取（缺省字段使用默认值）
    pub fn from_json_file(path: &Path) -> RepositoryResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RepositoryError::ConfigError(format!("读取配置文件失败 {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// 从 JSON 字符串解析
    pub fn from_json_str(raw: &str) -> RepositoryResult<Self> {
        let config: StoreConfig = serde_json::from_str(raw)
            .map_err(|e| RepositoryError::ConfigError(format!("配置解析失败: {}", e)))?;
        config.validate()
    }

    /// 应用覆写（lookup 通常为环境变量读取）
    pub fn with_overrides<F>(mut self, lookup: F) -> RepositoryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(env_keys::DB_PATH) {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(env_keys::BUSY_TIMEOUT_MS) {
            self.busy_timeout_ms = parse_number(env_keys::BUSY_TIMEOUT_MS, &v)?;
        }
        if let Some(v) = lookup(env_keys::CREATE_MODE) {
            self.create_mode = v.parse()?;
        }
        if let Some(v) = lookup(env_keys::MEMBERSHIP_CHUNK_SIZE) {
            self.membership_chunk_size = parse_number(env_keys::MEMBERSHIP_CHUNK_SIZE, &v)?;
        }
        if let Some(v) = lookup(env_keys::SQL_TRACE) {
            self.sql_trace = matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        self.validate()
    }

    /// 校验配置
    pub fn validate(self) -> RepositoryResult<Self> {
        if self.db_path.as_os_str().is_empty() {
            return Err(RepositoryError::ConfigError("db_path 不能为空".to_string()));
        }
        if self.membership_chunk_size == 0 || self.membership_chunk_size > MAX_MEMBERSHIP_CHUNK_SIZE {
            return Err(RepositoryError::ConfigError(format!(
                "membership_chunk_size 必须在 1..={} 之间: {}",
                MAX_MEMBERSHIP_CHUNK_SIZE, self.membership_chunk_size
            )));
        }
        Ok(self)
    }

    /// 打开连接：创建目录、应用 PRAGMA、建表
    pub fn open_connection(&self) -> RepositoryResult<Connection> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    RepositoryError::DatabaseConnectionError(format!(
                        "创建数据库目录失败 {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let mut conn = Connection::open(&self.db_path)?;
        db::configure_sqlite_connection_with_timeout(&conn, self.busy_timeout_ms)?;
        if self.sql_trace {
            db::enable_sql_trace(&mut conn);
        }
        db::init_schema(&conn)?;

        tracing::info!(
            db_path = %self.db_path.display(),
            create_mode = %self.create_mode,
            "病例列表数据库已打开"
        );
        Ok(conn)
    }

    /// 按配置组装病例列表仓储
    pub fn open_repository(&self) -> RepositoryResult<SqliteCaseListRepository> {
        let conn = Arc::new(Mutex::new(self.open_connection()?));
        Ok(self.repository_for(conn))
    }

    /// 在共享连接上按配置组装仓储
    pub fn repository_for(&self, conn: Arc<Mutex<Connection>>) -> SqliteCaseListRepository {
        SqliteCaseListRepository::from_connection(conn)
            .with_create_mode(self.create_mode)
            .with_membership_chunk_size(self.membership_chunk_size)
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> RepositoryResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| RepositoryError::ConfigError(format!("{} 不是有效数字: {}", key, raw)))
}
