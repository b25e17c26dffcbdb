// ==========================================
// 病例列表存储 - 配置层
// ==========================================
// 职责: 存储配置加载与覆写（默认值 / JSON 文件 / 环境变量）
// ==========================================

pub mod store_config;

// 重导出核心配置
pub use store_config::{default_db_path, env_keys, CreateMode, StoreConfig};
