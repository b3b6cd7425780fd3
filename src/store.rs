//! Durable message log. Append, soft-update, soft-delete, and cursor-paged
//! reads over the `messages` table. Deletion is a tombstone, never a row
//! removal, so cursor offsets stay stable. Concurrent writes to the same
//! row serialize at the database; last write wins.

use crate::{db::Db, errors::ApiError, models::{Member, Message, TOMBSTONE}};
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

fn row_to_message(r: SqliteRow) -> Message {
    Message {
        id: r.get("id"),
        channel_id: r.get("channel_id"),
        member_id: r.get("member_id"),
        content: r.get("content"),
        file_url: r.get("file_url"),
        nonce: r.get("nonce"),
        deleted: r.get::<i64, _>("deleted") != 0,
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

const MESSAGE_COLS: &str =
    "id, channel_id, member_id, content, file_url, nonce, deleted, created_at, updated_at";

/// May `requester` modify `msg`? Author always; elevated roles always.
/// Re-evaluated on every mutating call, never cached from the guard check.
fn can_modify(requester: &Member, msg: &Message) -> bool {
    requester.id == msg.member_id || requester.role.is_elevated()
}

/// Verify a channel exists and belongs to a server. Every channel-scoped
/// operation gates on this after the membership guard, so a caller can
/// never reach another server's channel through their own membership.
pub async fn require_channel(
    db: &Db,
    channel_id: &str,
    server_id: &str,
) -> Result<(), ApiError> {
    let chan = sqlx::query("SELECT 1 FROM channels WHERE id = ? AND server_id = ?")
        .bind(channel_id)
        .bind(server_id)
        .fetch_optional(&db.0)
        .await?;
    if chan.is_none() {
        return Err(ApiError::NotFound);
    }
    Ok(())
}

/// Append a message to a channel's log. The channel must belong to the
/// author's server. Content may be blank only when an attachment is present.
pub async fn append(
    db: &Db,
    channel_id: &str,
    author: &Member,
    content: &str,
    file_url: Option<&str>,
    nonce: Option<&str>,
) -> Result<Message, ApiError> {
    if content.trim().is_empty() && file_url.is_none() {
        return Err(ApiError::BadRequest(
            "message must have content or an attachment".into(),
        ));
    }

    require_channel(db, channel_id, &author.server_id).await?;

    let msg = Message {
        id: uuid::Uuid::new_v4().to_string(),
        channel_id: channel_id.to_string(),
        member_id: author.id.clone(),
        content: content.to_string(),
        file_url: file_url.map(str::to_string),
        nonce: nonce.map(str::to_string),
        deleted: false,
        created_at: Utc::now(),
        updated_at: None,
    };
    sqlx::query(
        "INSERT INTO messages(id, channel_id, member_id, content, file_url, nonce, deleted, created_at)
         VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(&msg.id)
    .bind(&msg.channel_id)
    .bind(&msg.member_id)
    .bind(&msg.content)
    .bind(&msg.file_url)
    .bind(&msg.nonce)
    .bind(msg.created_at)
    .execute(&db.0)
    .await?;

    Ok(msg)
}

/// Load a live (non-tombstoned) message by id.
pub async fn find_live(db: &Db, message_id: &str) -> Result<Message, ApiError> {
    let row = sqlx::query(&format!(
        "SELECT {MESSAGE_COLS} FROM messages WHERE id = ? AND deleted = 0"
    ))
    .bind(message_id)
    .fetch_optional(&db.0)
    .await?;
    row.map(row_to_message).ok_or(ApiError::NotFound)
}

/// Server owning the channel a live message belongs to. Routes use this to
/// re-resolve the caller's membership before a mutation.
pub async fn server_of_message(db: &Db, message_id: &str) -> Result<String, ApiError> {
    let row = sqlx::query(
        "SELECT c.server_id FROM messages m
         INNER JOIN channels c ON c.id = m.channel_id
         WHERE m.id = ? AND m.deleted = 0",
    )
    .bind(message_id)
    .fetch_optional(&db.0)
    .await?;
    row.map(|r| r.get("server_id")).ok_or(ApiError::NotFound)
}

/// Replace a message's content. Author-or-elevated only; a tombstoned
/// message reads as absent.
pub async fn soft_update(
    db: &Db,
    message_id: &str,
    requester: &Member,
    new_content: &str,
) -> Result<Message, ApiError> {
    if new_content.trim().is_empty() {
        return Err(ApiError::BadRequest("content required".into()));
    }
    let mut msg = find_live(db, message_id).await?;
    if !can_modify(requester, &msg) {
        return Err(ApiError::Forbidden);
    }

    let now = Utc::now();
    let res =
        sqlx::query("UPDATE messages SET content = ?, updated_at = ? WHERE id = ? AND deleted = 0")
            .bind(new_content)
            .bind(now)
            .bind(message_id)
            .execute(&db.0)
            .await?;
    // A concurrent delete can tombstone the row between the load and the
    // write; the losing writer must not report success.
    if res.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    msg.content = new_content.to_string();
    msg.updated_at = Some(now);
    Ok(msg)
}

/// Tombstone a message: content replaced with the sentinel, attachment
/// cleared, row retained. Deleting twice yields `NotFound`, so no duplicate
/// tombstone event can fire.
pub async fn soft_delete(
    db: &Db,
    message_id: &str,
    requester: &Member,
) -> Result<Message, ApiError> {
    let mut msg = find_live(db, message_id).await?;
    if !can_modify(requester, &msg) {
        return Err(ApiError::Forbidden);
    }

    let now = Utc::now();
    let res = sqlx::query(
        "UPDATE messages SET deleted = 1, content = ?, file_url = NULL, updated_at = ?
         WHERE id = ? AND deleted = 0",
    )
    .bind(TOMBSTONE)
    .bind(now)
    .bind(message_id)
    .execute(&db.0)
    .await?;
    // Racing deletes both pass the load; only the write that flipped the
    // row may report success and emit an event.
    if res.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    msg.deleted = true;
    msg.content = TOMBSTONE.to_string();
    msg.file_url = None;
    msg.updated_at = Some(now);
    Ok(msg)
}

/// One page of a channel's log, newest-first by (created_at, id). With a
/// cursor, only rows strictly older than the cursor's message are returned,
/// so pages are stable against appends made after the cursor was issued.
/// Tombstoned rows are included.
pub async fn page(
    db: &Db,
    channel_id: &str,
    cursor: Option<&str>,
    limit: i64,
) -> Result<Vec<Message>, ApiError> {
    let limit = limit.clamp(1, MAX_PAGE_LIMIT);

    let rows = if let Some(cursor_id) = cursor {
        let ref_row = sqlx::query(
            "SELECT created_at FROM messages WHERE id = ? AND channel_id = ?",
        )
        .bind(cursor_id)
        .bind(channel_id)
        .fetch_optional(&db.0)
        .await?;
        let ref_ts: chrono::DateTime<Utc> = ref_row
            .map(|r| r.get("created_at"))
            .ok_or_else(|| ApiError::BadRequest("unknown cursor".into()))?;

        sqlx::query(&format!(
            "SELECT {MESSAGE_COLS} FROM messages
             WHERE channel_id = ?
               AND (created_at < ? OR (created_at = ? AND id < ?))
             ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(channel_id)
        .bind(ref_ts)
        .bind(ref_ts)
        .bind(cursor_id)
        .bind(limit)
        .fetch_all(&db.0)
        .await?
    } else {
        sqlx::query(&format!(
            "SELECT {MESSAGE_COLS} FROM messages
             WHERE channel_id = ?
             ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(channel_id)
        .bind(limit)
        .fetch_all(&db.0)
        .await?
    };

    Ok(rows.into_iter().map(row_to_message).collect())
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::models::Role;

    pub async fn seed_channel(db: &Db, server_id: &str, channel_id: &str) {
        let now = Utc::now();
        sqlx::query("INSERT OR IGNORE INTO servers(id, name, created_at) VALUES (?, ?, ?)")
            .bind(server_id)
            .bind(server_id)
            .bind(now)
            .execute(&db.0)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO channels(id, server_id, name, kind, created_at) VALUES (?, ?, ?, 'text', ?)",
        )
        .bind(channel_id)
        .bind(server_id)
        .bind(channel_id)
        .bind(now)
        .execute(&db.0)
        .await
        .unwrap();
    }

    pub async fn seed_member(db: &Db, profile_id: &str, server_id: &str, role: Role) -> Member {
        let m = Member {
            id: uuid::Uuid::new_v4().to_string(),
            profile_id: profile_id.to_string(),
            server_id: server_id.to_string(),
            role,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO members(id, profile_id, server_id, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&m.id)
        .bind(&m.profile_id)
        .bind(&m.server_id)
        .bind(m.role.as_str())
        .bind(m.created_at)
        .execute(&db.0)
        .await
        .unwrap();
        m
    }
}
