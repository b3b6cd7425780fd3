use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

/// Content a deleted message is replaced with. The row stays in the log so
/// cursor pagination offsets remain stable.
pub const TOMBSTONE: &str = "This message has been deleted.";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub member_id: String,
    pub content: String,
    pub file_url: Option<String>,
    /// Client-supplied idempotency token, echoed back untouched.
    pub nonce: Option<String>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn attachment_kind(&self) -> Option<AttachmentKind> {
        self.file_url.as_deref().map(AttachmentKind::infer)
    }
}

/// How a client should render an attachment. The URL itself is opaque; the
/// kind is inferred from its extension.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    File,
}

impl AttachmentKind {
    pub fn infer(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" => AttachmentKind::Image,
            "mp4" | "webm" | "mov" => AttachmentKind::Video,
            _ => AttachmentKind::File,
        }
    }
}

/// Wire event published on a channel topic after a successful mutation.
/// Carries the full post-mutation message, not a diff. Events are not
/// persisted; a client that missed one catches up via a page fetch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum MessageEvent {
    Created(Message),
    Updated(Message),
    Deleted(Message),
}

impl MessageEvent {
    pub fn message(&self) -> &Message {
        match self {
            MessageEvent::Created(m) | MessageEvent::Updated(m) | MessageEvent::Deleted(m) => m,
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.message().channel_id
    }
}
