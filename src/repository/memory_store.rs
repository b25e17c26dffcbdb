// ==========================================
// 病例列表存储 - 内存实现
// ==========================================
// 职责: 与 SqliteCaseListRepository 相同契约的进程内实现
// 用途: 上层逻辑的单元测试替身
// 说明: 创建操作总是原子的（先解析成员，再写入）
// ==========================================

use crate::domain::case_list::CaseList;
use crate::domain::patient::Patient;
use crate::repository::case_list_store::CaseListStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::patient_repo::PatientRegistry;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    last_list_id: i64,
    lists: BTreeMap<i64, CaseList>, // list_id -> 元数据（members 为空）
    memberships: Vec<(i64, i64)>,   // (list_id, patient_internal_id)
}

/// 内存病例列表存储
#[derive(Debug, Default)]
pub struct InMemoryCaseListStore {
    state: Mutex<MemoryState>,
    patients: Arc<PatientRegistry>,
}

impl InMemoryCaseListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用共享的病人标识表
    pub fn with_patients(patients: Arc<PatientRegistry>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            patients,
        }
    }

    /// 登记病人（内存存储的病人来源）
    pub fn register_patient(&self, patient: Patient) -> RepositoryResult<()> {
        self.patients.register(patient)
    }

    pub fn patients(&self) -> &Arc<PatientRegistry> {
        &self.patients
    }

    /// 成员关系总行数
    pub fn count_memberships(&self) -> RepositoryResult<usize> {
        Ok(self.lock()?.memberships.len())
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn populate(&self, state: &MemoryState, list: &CaseList) -> RepositoryResult<CaseList> {
        let members = state
            .memberships
            .iter()
            .filter(|(list_id, _)| *list_id == list.list_id)
            .map(|(_, internal_id)| self.patients.lookup_stable_id(*internal_id))
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok(CaseList {
            members,
            ..list.clone()
        })
    }
}

impl CaseListStore for InMemoryCaseListStore {
    fn create(&self, case_list: &CaseList) -> RepositoryResult<usize> {
        let mut state = self.lock()?;

        if state
            .lists
            .values()
            .any(|l| l.stable_id == case_list.stable_id)
        {
            return Err(RepositoryError::UniqueConstraintViolation(format!(
                "case_list.stable_id={}",
                case_list.stable_id
            )));
        }

        let internal_ids = case_list
            .members
            .iter()
            .map(|m| self.patients.lookup_internal_id(m))
            .collect::<RepositoryResult<Vec<_>>>()?;

        state.last_list_id += 1;
        let list_id = state.last_list_id;
        state.lists.insert(
            list_id,
            CaseList {
                list_id,
                members: Vec::new(),
                ..case_list.clone()
            },
        );
        state
            .memberships
            .extend(internal_ids.iter().map(|&internal_id| (list_id, internal_id)));

        Ok(1 + internal_ids.len())
    }

    fn get_by_stable_id(&self, stable_id: &str) -> RepositoryResult<Option<CaseList>> {
        let state = self.lock()?;
        state
            .lists
            .values()
            .find(|l| l.stable_id == stable_id)
            .map(|l| self.populate(&state, l))
            .transpose()
    }

    fn get_by_id(&self, list_id: i64) -> RepositoryResult<Option<CaseList>> {
        let state = self.lock()?;
        state
            .lists
            .get(&list_id)
            .map(|l| self.populate(&state, l))
            .transpose()
    }

    fn get_all_for_study(&self, cancer_study_id: i64) -> RepositoryResult<Vec<CaseList>> {
        let state = self.lock()?;
        let mut lists = state
            .lists
            .values()
            .filter(|l| l.cancer_study_id == cancer_study_id)
            .map(|l| self.populate(&state, l))
            .collect::<RepositoryResult<Vec<_>>>()?;
        lists.sort_by(|a, b| a.name.cmp(&b.name).then(a.list_id.cmp(&b.list_id)));
        Ok(lists)
    }

    fn get_all(&self) -> RepositoryResult<Vec<CaseList>> {
        let state = self.lock()?;
        state
            .lists
            .values()
            .map(|l| self.populate(&state, l))
            .collect()
    }

    fn patient_has_any_membership(&self, patient_stable_id: &str) -> RepositoryResult<bool> {
        let internal_id = self.patients.lookup_internal_id(patient_stable_id)?;
        let state = self.lock()?;
        Ok(state
            .memberships
            .iter()
            .any(|(_, patient)| *patient == internal_id))
    }

    fn clear_all(&self) -> RepositoryResult<()> {
        let mut state = self.lock()?;
        state.lists.clear();
        state.memberships.clear();
        state.last_list_id = 0;
        Ok(())
    }
}
