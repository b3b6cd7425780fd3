//! Membership authorization guard. Every mutation and page fetch resolves
//! (profile, server) to a member row before touching the store. The result
//! is never cached across requests; roles can change between calls.

use crate::{db::Db, errors::ApiError, models::{Member, Role}};
use sqlx::Row;

/// Resolve a caller's membership on a server. A missing row is `NotFound`,
/// matching the HTTP surface: the caller is authenticated but the
/// (server, membership) pair does not exist from their point of view.
pub async fn resolve(db: &Db, profile_id: &str, server_id: &str) -> Result<Member, ApiError> {
    let row = sqlx::query(
        "SELECT id, profile_id, server_id, role, created_at
         FROM members WHERE profile_id = ? AND server_id = ?",
    )
    .bind(profile_id)
    .bind(server_id)
    .fetch_optional(&db.0)
    .await?;

    let row = row.ok_or(ApiError::NotFound)?;
    let role: String = row.get("role");
    Ok(Member {
        id: row.get("id"),
        profile_id: row.get("profile_id"),
        server_id: row.get("server_id"),
        role: role.parse::<Role>().map_err(|e| {
            log::error!("member row with bad role: {e}");
            ApiError::Transient
        })?,
        created_at: row.get("created_at"),
    })
}
