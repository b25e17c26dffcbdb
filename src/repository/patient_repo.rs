// ==========================================
// 病例列表存储 - 病人标识仓储与解析器
// ==========================================
// 职责:
// - PatientResolver: 稳定 ID <-> 内部 ID 的双向解析（病例列表仓储的外部依赖）
// - PatientRepository: patient 表的最小写入/查询
// 约定: 解析不到的标识一律返回 PatientNotFound 错误，不返回 None
// ==========================================

use crate::domain::patient::Patient;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

// ==========================================
// PatientResolver Trait
// ==========================================
// 调用方传入当前操作持有的连接，保证“一次操作一个连接”；
// 不访问数据库的实现可以忽略该连接
pub trait PatientResolver: Send + Sync {
    /// 稳定 ID -> 内部 ID
    fn internal_id(&self, conn: &Connection, stable_id: &str) -> RepositoryResult<i64>;

    /// 内部 ID -> 稳定 ID
    fn stable_id(&self, conn: &Connection, internal_id: i64) -> RepositoryResult<String>;
}

impl<T: PatientResolver + ?Sized> PatientResolver for Arc<T> {
    fn internal_id(&self, conn: &Connection, stable_id: &str) -> RepositoryResult<i64> {
        (**self).internal_id(conn, stable_id)
    }

    fn stable_id(&self, conn: &Connection, internal_id: i64) -> RepositoryResult<String> {
        (**self).stable_id(conn, internal_id)
    }
}

// ==========================================
// SqlitePatientResolver - 基于 patient 表的解析器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlitePatientResolver;

impl PatientResolver for SqlitePatientResolver {
    fn internal_id(&self, conn: &Connection, stable_id: &str) -> RepositoryResult<i64> {
        conn.query_row(
            "SELECT internal_id FROM patient WHERE stable_id = ?1",
            params![stable_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| RepositoryError::PatientNotFound(stable_id.to_string()))
    }

    fn stable_id(&self, conn: &Connection, internal_id: i64) -> RepositoryResult<String> {
        conn.query_row(
            "SELECT stable_id FROM patient WHERE internal_id = ?1",
            params![internal_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(RepositoryError::PatientInternalIdNotFound(internal_id))
    }
}

// ==========================================
// PatientRegistry - 内存病人标识表
// ==========================================
// 用于内存存储与预加载场景；线程安全
#[derive(Debug, Default)]
pub struct PatientRegistry {
    by_stable_id: RwLock<HashMap<String, i64>>,
    by_internal_id: RwLock<HashMap<i64, String>>,
}

impl PatientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 patient 表加载全部病人
    pub fn load_from(conn: &Connection) -> RepositoryResult<Self> {
        let registry = Self::new();
        let mut stmt = conn.prepare("SELECT internal_id, stable_id FROM patient")?;
        let rows = stmt.query_map([], |row| {
            Ok(Patient::new(row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            registry.register(row?)?;
        }
        Ok(registry)
    }

    /// 登记病人（稳定 ID 或内部 ID 重复登记时以最后一次为准，旧映射两侧均移除）
    pub fn register(&self, patient: Patient) -> RepositoryResult<()> {
        let mut by_stable = self
            .by_stable_id
            .write()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let mut by_internal = self
            .by_internal_id
            .write()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        if let Some(old_internal) = by_stable.insert(patient.stable_id.clone(), patient.internal_id) {
            by_internal.remove(&old_internal);
        }
        if let Some(old_stable) = by_internal.insert(patient.internal_id, patient.stable_id.clone()) {
            if old_stable != patient.stable_id {
                by_stable.remove(&old_stable);
            }
        }
        Ok(())
    }

    /// 已登记病人数
    pub fn len(&self) -> RepositoryResult<usize> {
        Ok(self
            .by_stable_id
            .read()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?
            .len())
    }

    pub fn is_empty(&self) -> RepositoryResult<bool> {
        Ok(self.len()? == 0)
    }

    /// 不依赖连接的稳定 ID -> 内部 ID
    pub fn lookup_internal_id(&self, stable_id: &str) -> RepositoryResult<i64> {
        self.by_stable_id
            .read()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?
            .get(stable_id)
            .copied()
            .ok_or_else(|| RepositoryError::PatientNotFound(stable_id.to_string()))
    }

    /// 不依赖连接的内部 ID -> 稳定 ID
    pub fn lookup_stable_id(&self, internal_id: i64) -> RepositoryResult<String> {
        self.by_internal_id
            .read()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?
            .get(&internal_id)
            .cloned()
            .ok_or(RepositoryError::PatientInternalIdNotFound(internal_id))
    }
}

impl PatientResolver for PatientRegistry {
    fn internal_id(&self, _conn: &Connection, stable_id: &str) -> RepositoryResult<i64> {
        self.lookup_internal_id(stable_id)
    }

    fn stable_id(&self, _conn: &Connection, internal_id: i64) -> RepositoryResult<String> {
        self.lookup_stable_id(internal_id)
    }
}

// ==========================================
// PatientRepository - 病人表仓储
// ==========================================
/// 病人表仓储
/// 职责: 管理 patient 表的插入/查询/清空
pub struct PatientRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PatientRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入病人，返回分配的内部 ID
    pub fn insert(&self, stable_id: &str) -> RepositoryResult<Patient> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO patient (stable_id) VALUES (?1)",
            params![stable_id],
        )?;
        Ok(Patient::new(conn.last_insert_rowid(), stable_id))
    }

    /// 批量插入病人（事务化）
    pub fn batch_insert<S: AsRef<str>>(&self, stable_ids: &[S]) -> RepositoryResult<Vec<Patient>> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut patients = Vec::with_capacity(stable_ids.len());
        {
            let mut stmt = tx.prepare("INSERT INTO patient (stable_id) VALUES (?1)")?;
            for stable_id in stable_ids {
                let internal_id = stmt.insert(params![stable_id.as_ref()])?;
                patients.push(Patient::new(internal_id, stable_id.as_ref()));
            }
        }

        tx.commit()?;
        Ok(patients)
    }

    /// 按稳定 ID 查询
    ///
    /// # 返回
    /// - Ok(Some(Patient)): 找到
    /// - Ok(None): 未找到
    pub fn find_by_stable_id(&self, stable_id: &str) -> RepositoryResult<Option<Patient>> {
        let conn = self.get_conn()?;
        let patient = conn
            .query_row(
                "SELECT internal_id, stable_id FROM patient WHERE stable_id = ?1",
                params![stable_id],
                |row| Ok(Patient::new(row.get(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(patient)
    }

    /// 病人总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM patient", [], |row| row.get(0))?;
        Ok(n)
    }

    /// 清空 patient 表（需先清空成员关系）
    pub fn clear_all(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM patient", [])?;
        Ok(())
    }
}
