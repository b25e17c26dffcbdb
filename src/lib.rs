// ==========================================
// 病例列表存储 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 癌症研究病例列表 (case list) 数据访问层
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 配置层 - 存储配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{CreateMode, StoreConfig};
pub use domain::{CaseList, CaseListCategory, Patient};
pub use repository::{
    CaseListStore, InMemoryCaseListStore, PatientRegistry, PatientRepository, PatientResolver,
    RepositoryError, RepositoryResult, SqliteCaseListRepository, SqlitePatientResolver,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "case-list-store";
