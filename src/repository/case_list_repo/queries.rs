use super::SqliteCaseListRepository;
use crate::domain::case_list::CaseList;
use crate::domain::types::CaseListCategory;
use crate::repository::error::RepositoryResult;
use crate::repository::patient_repo::PatientResolver;
use rusqlite::{Connection, OptionalExtension, Params, Row};

const SELECT_CASE_LIST: &str = r#"
    SELECT list_id, stable_id, cancer_study_id, name, category, description
    FROM case_list
"#;

// ==========================================
// 行映射
// ==========================================
// category 以原始字符串读出，解析失败在闭包外转成 InvalidCategory
struct CaseListRow {
    list_id: i64,
    stable_id: String,
    cancer_study_id: i64,
    name: String,
    category: String,
    description: String,
}

impl CaseListRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            list_id: row.get(0)?,
            stable_id: row.get(1)?,
            cancer_study_id: row.get(2)?,
            name: row.get(3)?,
            category: row.get(4)?,
            description: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        })
    }

    /// 转换为实体（不含成员）
    fn into_case_list(self) -> RepositoryResult<CaseList> {
        Ok(CaseList {
            list_id: self.list_id,
            stable_id: self.stable_id,
            cancer_study_id: self.cancer_study_id,
            name: self.name,
            category: CaseListCategory::from_code(&self.category)?,
            description: self.description,
            members: Vec::new(),
        })
    }
}

impl<R: PatientResolver> SqliteCaseListRepository<R> {
    /// 查询单个病例列表并填充成员
    pub(super) fn find_one<P: Params>(
        &self,
        conn: &Connection,
        filter: &str,
        params: P,
    ) -> RepositoryResult<Option<CaseList>> {
        let sql = format!("{} {}", SELECT_CASE_LIST, filter);
        let row = conn
            .query_row(&sql, params, CaseListRow::from_row)
            .optional()?;

        match row {
            Some(row) => {
                let mut case_list = row.into_case_list()?;
                case_list.members = self.load_members(conn, case_list.list_id)?;
                Ok(Some(case_list))
            }
            None => Ok(None),
        }
    }

    /// 查询多个病例列表：先映射全部元数据行，再逐个填充成员
    pub(super) fn find_many<P: Params>(
        &self,
        conn: &Connection,
        filter: &str,
        params: P,
    ) -> RepositoryResult<Vec<CaseList>> {
        let sql = format!("{} {}", SELECT_CASE_LIST, filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params, CaseListRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut case_lists = rows
            .into_iter()
            .map(CaseListRow::into_case_list)
            .collect::<RepositoryResult<Vec<_>>>()?;

        for case_list in &mut case_lists {
            case_list.members = self.load_members(conn, case_list.list_id)?;
        }
        Ok(case_lists)
    }
}
