//! Cursor walker for scroll-back. Each `fetch_more` pulls one page of older
//! messages and advances the cursor; a short page latches exhaustion so
//! further calls never hit the source again.

use crate::{db::Db, errors::ApiError, models::Message, store};

/// Anything that can serve one page of a channel's log, newest-first.
pub trait PageSource {
    fn page(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, ApiError>> + Send;
}

impl PageSource for Db {
    async fn page(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Message>, ApiError> {
        store::page(self, channel_id, cursor, limit).await
    }
}

pub struct Paginator<S> {
    source: S,
    channel_id: String,
    limit: i64,
    cursor: Option<String>,
    exhausted: bool,
}

impl<S: PageSource> Paginator<S> {
    pub fn new(source: S, channel_id: impl Into<String>, limit: i64) -> Self {
        Self {
            source,
            channel_id: channel_id.into(),
            limit,
            cursor: None,
            exhausted: false,
        }
    }

    /// Fetch the next (older) page. Returns an empty batch without touching
    /// the source once the log is exhausted. Cancellation on view teardown
    /// is dropping the in-flight future.
    pub async fn fetch_more(&mut self) -> Result<Vec<Message>, ApiError> {
        if self.exhausted {
            return Ok(Vec::new());
        }
        let batch = self
            .source
            .page(&self.channel_id, self.cursor.as_deref(), self.limit)
            .await?;
        if (batch.len() as i64) < self.limit {
            self.exhausted = true;
        }
        if let Some(last) = batch.last() {
            self.cursor = Some(last.id.clone());
        }
        Ok(batch)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Forget the cursor and the exhausted latch, restarting the walk from
    /// the newest messages.
    pub fn reset(&mut self) {
        self.cursor = None;
        self.exhausted = false;
    }
}
