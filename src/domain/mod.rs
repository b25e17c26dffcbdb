// ==========================================
// 病例列表存储 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑
// ==========================================

pub mod case_list;
pub mod patient;
pub mod types;

// 重导出核心类型
pub use case_list::CaseList;
pub use patient::Patient;
pub use types::{CaseListCategory, UnknownCategoryCode};
