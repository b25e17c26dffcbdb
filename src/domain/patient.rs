// ==========================================
// 病例列表存储 - 病人标识领域模型
// ==========================================
// 对齐: patient 表 (稳定 ID <-> 内部 ID)
// ==========================================

use serde::{Deserialize, Serialize};

/// 病人标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Patient {
    pub internal_id: i64,  // 内部代理 ID (不对外暴露)
    pub stable_id: String, // 对外稳定 ID
}

impl Patient {
    pub fn new(internal_id: i64, stable_id: impl Into<String>) -> Self {
        Self {
            internal_id,
            stable_id: stable_id.into(),
        }
    }
}
