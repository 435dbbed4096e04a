//! Staff Repository

use super::{RepoError, RepoResult};
use shared::models::{Staff, StaffRole};
use sqlx::SqlitePool;

#[derive(sqlx::FromRow)]
struct StaffRow {
    id: i64,
    name: String,
    role: String,
    is_active: bool,
}

impl TryFrom<StaffRow> for Staff {
    type Error = RepoError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        let role: StaffRole = row
            .role
            .parse()
            .map_err(|e: shared::models::UnknownRole| RepoError::Database(e.to_string()))?;
        Ok(Staff {
            id: row.id,
            name: row.name,
            role,
            is_active: row.is_active,
        })
    }
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Staff>> {
    let row = sqlx::query_as::<_, StaffRow>(
        "SELECT id, name, role, is_active FROM staff WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(Staff::try_from).transpose()
}

pub async fn find_by_role(pool: &SqlitePool, role: StaffRole) -> RepoResult<Vec<Staff>> {
    let rows = sqlx::query_as::<_, StaffRow>(
        "SELECT id, name, role, is_active FROM staff WHERE role = ? AND is_active = 1 ORDER BY name",
    )
    .bind(role.as_str())
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Staff::try_from).collect()
}
