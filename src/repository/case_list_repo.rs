// ==========================================
// 病例列表存储 - 病例列表数据仓储
// ==========================================
// 表: case_list (元数据) + case_list_membership (成员关系)
// 红线: Repository 不含业务逻辑，只做数据映射
// ==========================================

mod core;
mod membership;
mod queries;

#[cfg(test)]
mod tests;

pub use self::core::{
    SqliteCaseListRepository, DEFAULT_MEMBERSHIP_CHUNK_SIZE, MAX_MEMBERSHIP_CHUNK_SIZE,
};
