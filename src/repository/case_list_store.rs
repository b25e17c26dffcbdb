// ==========================================
// 病例列表存储 - 存储端口 Trait
// ==========================================
// 职责: 定义病例列表数据访问接口（不包含业务逻辑）
// 实现者:
// - SqliteCaseListRepository（rusqlite）
// - InMemoryCaseListStore（进程内，测试替身）
// ==========================================

use crate::domain::case_list::CaseList;
use crate::repository::error::RepositoryResult;

// ==========================================
// CaseListStore Trait
// ==========================================
// 约定:
// - 单实体查询未找到 => Ok(None)
// - 病人标识解析失败 => Err(PatientNotFound)
// - 返回的 CaseList 均已填充 members
pub trait CaseListStore: Send + Sync {
    /// 创建病例列表（元数据 + 成员关系）
    ///
    /// # 返回
    /// - Ok(rows): 受影响行数（元数据 1 行 + 成员行数）
    /// - Err(UniqueConstraintViolation): stable_id 重复
    /// - Err(PatientNotFound): 成员无法解析
    fn create(&self, case_list: &CaseList) -> RepositoryResult<usize>;

    /// 按稳定 ID 查询
    fn get_by_stable_id(&self, stable_id: &str) -> RepositoryResult<Option<CaseList>>;

    /// 按代理主键查询
    fn get_by_id(&self, list_id: i64) -> RepositoryResult<Option<CaseList>>;

    /// 查询某研究下全部病例列表（按名称升序）
    fn get_all_for_study(&self, cancer_study_id: i64) -> RepositoryResult<Vec<CaseList>>;

    /// 查询全部病例列表（不保证顺序）
    fn get_all(&self) -> RepositoryResult<Vec<CaseList>>;

    /// 病人是否属于任一病例列表
    ///
    /// 病人本身不存在时返回错误，而不是 false
    fn patient_has_any_membership(&self, patient_stable_id: &str) -> RepositoryResult<bool>;

    /// 清空病例列表与成员关系（不可恢复）
    fn clear_all(&self) -> RepositoryResult<()>;
}
