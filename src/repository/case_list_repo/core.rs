use crate::config::CreateMode;
use crate::domain::case_list::CaseList;
use crate::repository::case_list_store::CaseListStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::patient_repo::{PatientResolver, SqlitePatientResolver};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// 单条 INSERT 语句最多携带的成员行数（每行 2 个绑定参数）
pub const DEFAULT_MEMBERSHIP_CHUNK_SIZE: usize = 500;

/// 分块上限: 内置 SQLite 的 SQLITE_MAX_VARIABLE_NUMBER (32766) / 2
pub const MAX_MEMBERSHIP_CHUNK_SIZE: usize = 16_383;

// ==========================================
// SqliteCaseListRepository - 病例列表仓储
// ==========================================
/// 病例列表仓储（SQLite 实现）
///
/// 每个公开操作在整个执行期间持有一次连接锁，
/// 锁随 MutexGuard 在所有退出路径上释放。
pub struct SqliteCaseListRepository<R: PatientResolver = SqlitePatientResolver> {
    conn: Arc<Mutex<Connection>>,
    pub(super) resolver: R,
    create_mode: CreateMode,
    pub(super) membership_chunk_size: usize,
}

impl SqliteCaseListRepository<SqlitePatientResolver> {
    /// 打开数据库文件并创建仓储（自动建表）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建仓储实例（schema 需已初始化）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self::with_resolver(conn, SqlitePatientResolver)
    }
}

impl<R: PatientResolver> SqliteCaseListRepository<R> {
    /// 使用自定义病人解析器创建仓储
    pub fn with_resolver(conn: Arc<Mutex<Connection>>, resolver: R) -> Self {
        Self {
            conn,
            resolver,
            create_mode: CreateMode::default(),
            membership_chunk_size: DEFAULT_MEMBERSHIP_CHUNK_SIZE,
        }
    }

    /// 设置创建模式
    pub fn with_create_mode(mut self, create_mode: CreateMode) -> Self {
        self.create_mode = create_mode;
        self
    }

    /// 设置成员批量插入的分块大小（限制在 1..=MAX_MEMBERSHIP_CHUNK_SIZE）
    pub fn with_membership_chunk_size(mut self, chunk_size: usize) -> Self {
        self.membership_chunk_size = chunk_size.clamp(1, MAX_MEMBERSHIP_CHUNK_SIZE);
        self
    }

    pub fn membership_chunk_size(&self) -> usize {
        self.membership_chunk_size
    }

    pub fn create_mode(&self) -> CreateMode {
        self.create_mode
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 成员关系总行数
    pub fn count_memberships(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM case_list_membership", [], |row| {
            row.get(0)
        })?;
        Ok(n)
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入元数据行，返回 (受影响行数, 新分配的 list_id)
    fn insert_metadata(
        conn: &Connection,
        case_list: &CaseList,
    ) -> RepositoryResult<(usize, i64)> {
        let rows = conn.execute(
            r#"
            INSERT INTO case_list (
                stable_id, cancer_study_id, name, category, description
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                case_list.stable_id,
                case_list.cancer_study_id,
                case_list.name,
                case_list.category.code(),
                case_list.description,
            ],
        )?;
        Ok((rows, conn.last_insert_rowid()))
    }

    /// 单事务创建：元数据与成员关系要么全部写入，要么全部回滚
    fn create_atomic(&self, conn: &Connection, case_list: &CaseList) -> RepositoryResult<usize> {
        let tx = conn.unchecked_transaction()?;
        let (rows, list_id) = Self::insert_metadata(&tx, case_list)?;
        let member_rows = self.insert_memberships(&tx, list_id, &case_list.members)?;
        tx.commit()?;

        info!(
            stable_id = %case_list.stable_id,
            list_id,
            member_rows,
            "病例列表已创建"
        );
        Ok(rows + member_rows)
    }

    /// 非事务创建：成员写入失败时元数据行保留
    fn create_non_atomic(
        &self,
        conn: &Connection,
        case_list: &CaseList,
    ) -> RepositoryResult<usize> {
        let (rows, list_id) = Self::insert_metadata(conn, case_list)?;
        let member_rows = self
            .insert_memberships(conn, list_id, &case_list.members)
            .map_err(|e| {
                warn!(
                    stable_id = %case_list.stable_id,
                    list_id,
                    error = %e,
                    "成员关系写入失败，元数据行已保留（部分写入）"
                );
                e
            })?;

        info!(
            stable_id = %case_list.stable_id,
            list_id,
            member_rows,
            "病例列表已创建"
        );
        Ok(rows + member_rows)
    }
}

impl<R: PatientResolver> CaseListStore for SqliteCaseListRepository<R> {
    fn create(&self, case_list: &CaseList) -> RepositoryResult<usize> {
        debug!(
            stable_id = %case_list.stable_id,
            cancer_study_id = case_list.cancer_study_id,
            members = case_list.members.len(),
            mode = ?self.create_mode,
            "创建病例列表"
        );
        let conn = self.get_conn()?;
        match self.create_mode {
            CreateMode::Atomic => self.create_atomic(&conn, case_list),
            CreateMode::NonAtomic => self.create_non_atomic(&conn, case_list),
        }
    }

    fn get_by_stable_id(&self, stable_id: &str) -> RepositoryResult<Option<CaseList>> {
        debug!(stable_id, "按稳定 ID 查询病例列表");
        let conn = self.get_conn()?;
        self.find_one(&conn, "WHERE stable_id = ?1", params![stable_id])
    }

    fn get_by_id(&self, list_id: i64) -> RepositoryResult<Option<CaseList>> {
        debug!(list_id, "按 list_id 查询病例列表");
        let conn = self.get_conn()?;
        self.find_one(&conn, "WHERE list_id = ?1", params![list_id])
    }

    fn get_all_for_study(&self, cancer_study_id: i64) -> RepositoryResult<Vec<CaseList>> {
        debug!(cancer_study_id, "查询研究下的病例列表");
        let conn = self.get_conn()?;
        self.find_many(
            &conn,
            "WHERE cancer_study_id = ?1 ORDER BY name ASC, list_id ASC",
            params![cancer_study_id],
        )
    }

    fn get_all(&self) -> RepositoryResult<Vec<CaseList>> {
        debug!("查询全部病例列表");
        let conn = self.get_conn()?;
        self.find_many(&conn, "", [])
    }

    fn patient_has_any_membership(&self, patient_stable_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let internal_id = self.resolver.internal_id(&conn, patient_stable_id)?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM case_list_membership WHERE patient_internal_id = ?1)",
            params![internal_id],
            |row| row.get(0),
        )?;
        debug!(patient_stable_id, internal_id, exists, "病人成员关系检查");
        Ok(exists)
    }

    fn clear_all(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            DELETE FROM case_list_membership;
            DELETE FROM case_list;
            DELETE FROM sqlite_sequence WHERE name = 'case_list';
            "#,
        )?;
        info!("病例列表与成员关系已清空");
        Ok(())
    }
}
