// ==========================================
// 病例列表存储 - 领域类型定义
// ==========================================
// 病例列表分类为封闭枚举，数据库中以 code 字符串存储
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 未知的病例列表分类 code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("未知的病例列表分类: {0}")]
pub struct UnknownCategoryCode(pub String);

// ==========================================
// 病例列表分类 (Case List Category)
// ==========================================
// 序列化格式: snake_case (与数据库 code 一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseListCategory {
    AllCasesInStudy,
    AllCasesWithMutationData,
    AllCasesWithCnaData,
    AllCasesWithLog2CnaData,
    AllCasesWithMethylationData,
    AllCasesWithMrnaArrayData,
    #[serde(rename = "all_cases_with_mrna_rnaseq_data")]
    AllCasesWithMrnaRnaSeqData,
    AllCasesWithRppaData,
    AllCasesWithMicrornaData,
    AllCasesWithMutationAndCnaData,
    AllCasesWithMutationAndCnaAndMrnaData,
    Other,
}

impl CaseListCategory {
    /// 全部分类（按定义顺序）
    pub const ALL: [CaseListCategory; 12] = [
        CaseListCategory::AllCasesInStudy,
        CaseListCategory::AllCasesWithMutationData,
        CaseListCategory::AllCasesWithCnaData,
        CaseListCategory::AllCasesWithLog2CnaData,
        CaseListCategory::AllCasesWithMethylationData,
        CaseListCategory::AllCasesWithMrnaArrayData,
        CaseListCategory::AllCasesWithMrnaRnaSeqData,
        CaseListCategory::AllCasesWithRppaData,
        CaseListCategory::AllCasesWithMicrornaData,
        CaseListCategory::AllCasesWithMutationAndCnaData,
        CaseListCategory::AllCasesWithMutationAndCnaAndMrnaData,
        CaseListCategory::Other,
    ];

    /// 从数据库 code 解析
    ///
    /// 未知 code 返回错误，不做默认值兜底
    pub fn from_code(code: &str) -> Result<Self, UnknownCategoryCode> {
        let normalized = code.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.code() == normalized)
            .ok_or_else(|| UnknownCategoryCode(code.to_string()))
    }

    /// 转换为数据库存储的 code
    pub fn code(&self) -> &'static str {
        match self {
            CaseListCategory::AllCasesInStudy => "all_cases_in_study",
            CaseListCategory::AllCasesWithMutationData => "all_cases_with_mutation_data",
            CaseListCategory::AllCasesWithCnaData => "all_cases_with_cna_data",
            CaseListCategory::AllCasesWithLog2CnaData => "all_cases_with_log2_cna_data",
            CaseListCategory::AllCasesWithMethylationData => "all_cases_with_methylation_data",
            CaseListCategory::AllCasesWithMrnaArrayData => "all_cases_with_mrna_array_data",
            CaseListCategory::AllCasesWithMrnaRnaSeqData => "all_cases_with_mrna_rnaseq_data",
            CaseListCategory::AllCasesWithRppaData => "all_cases_with_rppa_data",
            CaseListCategory::AllCasesWithMicrornaData => "all_cases_with_microrna_data",
            CaseListCategory::AllCasesWithMutationAndCnaData => {
                "all_cases_with_mutation_and_cna_data"
            }
            CaseListCategory::AllCasesWithMutationAndCnaAndMrnaData => {
                "all_cases_with_mutation_and_cna_and_mrna_data"
            }
            CaseListCategory::Other => "other",
        }
    }
}

impl FromStr for CaseListCategory {
    type Err = UnknownCategoryCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl fmt::Display for CaseListCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
