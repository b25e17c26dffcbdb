// ==========================================
// 病例列表存储 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod case_list_repo;
pub mod case_list_store;
pub mod error;
pub mod memory_store;
pub mod patient_repo;

// 重导出核心仓储
pub use case_list_repo::{
    SqliteCaseListRepository, DEFAULT_MEMBERSHIP_CHUNK_SIZE, MAX_MEMBERSHIP_CHUNK_SIZE,
};
pub use case_list_store::CaseListStore;
pub use error::{RepositoryError, RepositoryResult};
pub use memory_store::InMemoryCaseListStore;
pub use patient_repo::{PatientRegistry, PatientRepository, PatientResolver, SqlitePatientResolver};
