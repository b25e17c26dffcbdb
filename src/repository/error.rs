// ==========================================
// 病例列表存储 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 单实体查询“未找到”返回 Ok(None)；
//       病人标识解析“未找到”是错误（PatientNotFound）
// ==========================================

use crate::domain::types::UnknownCategoryCode;
use thiserror::Error;

/// 仓储层错误类型（数据访问失败）
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 病人标识解析错误 =====
    #[error("病人未找到: stable_id={0}")]
    PatientNotFound(String),

    #[error("病人未找到: internal_id={0}")]
    PatientInternalIdNotFound(i64),

    // ===== 数据质量错误 =====
    #[error("无效的病例列表分类: {0}")]
    InvalidCategory(String),

    // ===== 配置错误 =====
    #[error("配置错误: {0}")]
    ConfigError(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    /// 是否为病人标识解析失败
    pub fn is_patient_not_found(&self) -> bool {
        matches!(
            self,
            RepositoryError::PatientNotFound(_) | RepositoryError::PatientInternalIdNotFound(_)
        )
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            rusqlite::Error::SqliteFailure(ref e, None)
                if e.code == rusqlite::ErrorCode::CannotOpen =>
            {
                RepositoryError::DatabaseConnectionError(err.to_string())
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

impl From<UnknownCategoryCode> for RepositoryError {
    fn from(err: UnknownCategoryCode) -> Self {
        RepositoryError::InvalidCategory(err.0)
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
