use super::SqliteCaseListRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::patient_repo::PatientResolver;
use rusqlite::{params, params_from_iter, Connection};

impl<R: PatientResolver> SqliteCaseListRepository<R> {
    /// 批量写入成员关系
    ///
    /// 先解析全部成员的内部 ID（任一失败即整体失败），
    /// 再以多行 VALUES 的单条语句写入；超过分块大小时按块拆分。
    ///
    /// # 返回
    /// - Ok(rows): 写入的成员行数（空成员返回 0）
    pub(super) fn insert_memberships(
        &self,
        conn: &Connection,
        list_id: i64,
        members: &[String],
    ) -> RepositoryResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }

        let internal_ids = members
            .iter()
            .map(|stable_id| self.resolver.internal_id(conn, stable_id))
            .collect::<RepositoryResult<Vec<i64>>>()?;

        let mut inserted = 0;
        for chunk in internal_ids.chunks(self.membership_chunk_size) {
            let placeholders = vec!["(?, ?)"; chunk.len()].join(", ");
            let sql = format!(
                "INSERT INTO case_list_membership (list_id, patient_internal_id) VALUES {}",
                placeholders
            );
            let values = chunk.iter().flat_map(|&internal_id| [list_id, internal_id]);
            inserted += conn.execute(&sql, params_from_iter(values))?;
        }
        Ok(inserted)
    }

    /// 读取列表成员（内部 ID -> 稳定 ID）
    pub(super) fn load_members(
        &self,
        conn: &Connection,
        list_id: i64,
    ) -> RepositoryResult<Vec<String>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT patient_internal_id
            FROM case_list_membership
            WHERE list_id = ?1
            ORDER BY rowid
            "#,
        )?;
        let internal_ids = stmt
            .query_map(params![list_id], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        internal_ids
            .into_iter()
            .map(|internal_id| self.resolver.stable_id(conn, internal_id))
            .collect()
    }
}
