//! Message mutation and page-fetch handlers. Each mutation runs the same
//! pipeline: resolve membership, validate, write to the store, then publish
//! the resulting message on the broadcast hub. A failed step short-circuits
//! with its own error kind and nothing is broadcast; a failed publish after
//! a successful write is logged but never rolls the write back.

use crate::{
    auth::AuthUser,
    config::Config,
    db::Db,
    errors::ApiError,
    guard, store,
    models::{Message, MessageEvent},
    ws::server::{BroadcastHub, Publish},
};
use actix::Addr;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

fn publish(hub: &Addr<BroadcastHub>, event: MessageEvent) {
    if let Err(e) = hub.try_send(Publish { event }) {
        // The store write already succeeded; the caller still gets 200 and
        // disconnected viewers self-heal via a page re-fetch.
        log::warn!("broadcast publish failed: {e}");
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct PageResponse {
    pub items: Vec<Message>,
    /// Id of the oldest returned message, or null once the log is exhausted.
    pub next_cursor: Option<String>,
}

pub async fn list_messages(
    db: web::Data<Db>,
    cfg: web::Data<Config>,
    user: AuthUser,
    path: web::Path<(String, String)>,
    q: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let (server_id, channel_id) = path.into_inner();
    guard::resolve(&db, &user.profile_id, &server_id).await?;
    // Membership alone is not enough: the channel must live on the server
    // the guard just resolved, or the caller could page another server's
    // log through their own membership.
    store::require_channel(&db, &channel_id, &server_id).await?;

    let limit = q.limit.unwrap_or(cfg.default_page_limit);
    let items = store::page(&db, &channel_id, q.cursor.as_deref(), limit).await?;

    let next_cursor = if (items.len() as i64) < limit.clamp(1, store::MAX_PAGE_LIMIT) {
        None
    } else {
        items.last().map(|m| m.id.clone())
    };
    Ok(HttpResponse::Ok().json(PageResponse { items, next_cursor }))
}

#[derive(Deserialize)]
pub struct CreateMessageReq {
    pub content: Option<String>,
    pub file_url: Option<String>,
    /// Optional client idempotency token, echoed on the message and its
    /// `created` event so the sender can reconcile its optimistic entry.
    pub nonce: Option<String>,
}

pub async fn post_message(
    db: web::Data<Db>,
    hub: web::Data<Addr<BroadcastHub>>,
    user: AuthUser,
    path: web::Path<(String, String)>,
    body: web::Json<CreateMessageReq>,
) -> Result<HttpResponse, ApiError> {
    let (server_id, channel_id) = path.into_inner();
    let member = guard::resolve(&db, &user.profile_id, &server_id).await?;

    let msg = store::append(
        &db,
        &channel_id,
        &member,
        body.content.as_deref().unwrap_or(""),
        body.file_url.as_deref(),
        body.nonce.as_deref(),
    )
    .await?;

    publish(&hub, MessageEvent::Created(msg.clone()));
    Ok(HttpResponse::Ok().json(msg))
}

#[derive(Deserialize)]
pub struct EditMessageReq {
    pub content: String,
}

pub async fn edit_message(
    db: web::Data<Db>,
    hub: web::Data<Addr<BroadcastHub>>,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<EditMessageReq>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    // Membership is re-resolved against the server owning the message, not
    // trusted from any earlier request.
    let server_id = store::server_of_message(&db, &id).await?;
    let member = guard::resolve(&db, &user.profile_id, &server_id).await?;

    let msg = store::soft_update(&db, &id, &member, &body.content).await?;

    publish(&hub, MessageEvent::Updated(msg.clone()));
    Ok(HttpResponse::Ok().json(msg))
}

pub async fn delete_message(
    db: web::Data<Db>,
    hub: web::Data<Addr<BroadcastHub>>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let server_id = store::server_of_message(&db, &id).await?;
    let member = guard::resolve(&db, &user.profile_id, &server_id).await?;

    let msg = store::soft_delete(&db, &id, &member).await?;

    publish(&hub, MessageEvent::Deleted(msg.clone()));
    Ok(HttpResponse::Ok().json(msg))
}
