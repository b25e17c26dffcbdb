// ==========================================
// 病例列表存储 - 病例列表领域模型
// ==========================================
// 对齐: case_list 表 + case_list_membership 表
// ==========================================

use crate::domain::types::CaseListCategory;
use serde::{Deserialize, Serialize};

// ==========================================
// CaseList - 病例列表
// ==========================================
// 某个研究下具名、分类的病人子集
// members 只在查询时由仓储填充，行映射不负责成员
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseList {
    // ===== 主键 =====
    pub list_id: i64,      // 代理主键 (创建时由存储分配，创建前为 0)
    pub stable_id: String, // 对外稳定 ID (唯一)

    // ===== 元数据 =====
    pub cancer_study_id: i64,       // 所属研究
    pub name: String,               // 显示名称
    pub category: CaseListCategory, // 分类
    pub description: String,        // 描述

    // ===== 成员 (病人稳定 ID，顺序无意义) =====
    #[serde(default)]
    pub members: Vec<String>,
}

impl CaseList {
    /// 创建尚未持久化的病例列表（list_id = 0，无成员）
    pub fn new(
        stable_id: impl Into<String>,
        cancer_study_id: i64,
        name: impl Into<String>,
        category: CaseListCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            list_id: 0,
            stable_id: stable_id.into(),
            cancer_study_id,
            name: name.into(),
            category,
            description: description.into(),
            members: Vec::new(),
        }
    }

    /// 设置成员（builder 风格）
    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = members.into_iter().map(Into::into).collect();
        self
    }

    /// 判断病人是否为成员
    pub fn contains(&self, patient_stable_id: &str) -> bool {
        self.members.iter().any(|m| m == patient_stable_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let list = CaseList::new("s1_all", 7, "All", CaseListCategory::AllCasesInStudy, "desc")
            .with_members(["P-1", "P-2"]);

        assert_eq!(list.list_id, 0);
        assert_eq!(list.members.len(), 2);
        assert!(list.contains("P-2"));
        assert!(!list.contains("P-3"));
    }

    #[test]
    fn test_deserialize_without_members() {
        let json = r#"{
            "list_id": 3,
            "stable_id": "brca_cnaseq",
            "cancer_study_id": 1,
            "name": "Sequenced",
            "category": "all_cases_with_mutation_and_cna_data",
            "description": "cases with mutation and CNA data"
        }"#;
        let list: CaseList = serde_json::from_str(json).unwrap();
        assert_eq!(list.category, CaseListCategory::AllCasesWithMutationAndCnaData);
        assert!(list.members.is_empty());
    }
}
