//! Per-channel merged view. Reconciles three inputs into one ordered,
//! deduplicated list: the initial page load, older pages from scroll-back,
//! and live broadcast events. Also tracks optimistic creates until the
//! store confirms or rejects them.
//!
//! A view is single-threaded: one merge at a time, driven by whoever owns
//! it. Independent channel views never share state.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Message, MessageEvent};

/// How close an optimistic placeholder's send time must be to a confirmed
/// message's creation time for the fallback reconciliation to match them.
const RECONCILE_WINDOW_SECS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Initial page not yet applied; nothing rendered.
    Loading,
    Ready,
    /// Scroll-back fetch in flight; rendered entries are kept.
    LoadingMore,
    /// A fetch failed; recoverable via `retry`.
    Failed,
}

/// An optimistic create awaiting store confirmation.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub local_id: u64,
    pub member_id: String,
    pub content: String,
    pub nonce: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum Entry {
    Confirmed(Message),
    Pending(PendingEntry),
}

impl Entry {
    pub fn content(&self) -> &str {
        match self {
            Entry::Confirmed(m) => &m.content,
            Entry::Pending(p) => &p.content,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Entry::Pending(_))
    }
}

pub struct ChannelView {
    channel_id: String,
    state: ViewState,
    /// Pending entries first (they are the newest), then confirmed messages
    /// ordered by (created_at, id) descending.
    entries: Vec<Entry>,
    next_local_id: u64,
}

impl ChannelView {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            state: ViewState::Loading,
            entries: Vec::new(),
            next_local_id: 1,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e, Entry::Confirmed(m) if m.id == message_id))
    }

    /// Start a scroll-back fetch. Rendered entries stay in place.
    pub fn begin_load_more(&mut self) {
        if self.state == ViewState::Ready {
            self.state = ViewState::LoadingMore;
        }
    }

    /// A page arrived (initial load or scroll-back). Entries already present
    /// by id are skipped.
    pub fn apply_page(&mut self, page: Vec<Message>) {
        for msg in page {
            if msg.channel_id == self.channel_id {
                self.insert_confirmed(msg);
            }
        }
        self.state = ViewState::Ready;
    }

    pub fn fetch_failed(&mut self) {
        self.state = ViewState::Failed;
    }

    /// Leave the failed state and retry the fetch that failed. Entries are
    /// kept; the caller re-issues the fetch.
    pub fn retry(&mut self) {
        if self.state == ViewState::Failed {
            self.state = if self.entries.is_empty() {
                ViewState::Loading
            } else {
                ViewState::LoadingMore
            };
        }
    }

    /// Record an optimistic create and render it immediately. Returns the
    /// local id used to remove it if the mutation fails.
    pub fn push_pending(
        &mut self,
        member_id: impl Into<String>,
        content: impl Into<String>,
        nonce: Option<String>,
    ) -> u64 {
        let local_id = self.next_local_id;
        self.next_local_id += 1;
        self.entries.insert(
            0,
            Entry::Pending(PendingEntry {
                local_id,
                member_id: member_id.into(),
                content: content.into(),
                nonce,
                sent_at: Utc::now(),
            }),
        );
        local_id
    }

    /// The create this placeholder belonged to failed; drop it. The error
    /// is surfaced by the initiating caller, nobody else saw the entry.
    pub fn fail_pending(&mut self, local_id: u64) {
        self.entries
            .retain(|e| !matches!(e, Entry::Pending(p) if p.local_id == local_id));
    }

    /// Apply one live broadcast event. Events for other channels are
    /// ignored (a stale subscription during a channel switch).
    pub fn apply_event(&mut self, event: &MessageEvent) {
        if event.channel_id() != self.channel_id {
            return;
        }
        match event {
            MessageEvent::Created(msg) => {
                self.reconcile_pending(msg);
                self.insert_confirmed(msg.clone());
            }
            MessageEvent::Updated(msg) | MessageEvent::Deleted(msg) => {
                // Replace in place, preserving position. An unknown id is
                // dropped: without event replay we cannot order it against
                // pages we have not fetched.
                for e in &mut self.entries {
                    if matches!(e, Entry::Confirmed(m) if m.id == msg.id) {
                        *e = Entry::Confirmed(msg.clone());
                        break;
                    }
                }
            }
        }
    }

    /// Remove the optimistic placeholder this confirmed message settles, if
    /// any. Nonce match is authoritative; without a nonce fall back to
    /// author + content + send-time proximity.
    fn reconcile_pending(&mut self, msg: &Message) {
        let pos = self.entries.iter().position(|e| match e {
            Entry::Pending(p) => match (&p.nonce, &msg.nonce) {
                (Some(a), Some(b)) => a == b,
                _ => {
                    p.member_id == msg.member_id
                        && p.content == msg.content
                        && (msg.created_at - p.sent_at).abs()
                            < Duration::seconds(RECONCILE_WINDOW_SECS)
                }
            },
            Entry::Confirmed(_) => false,
        });
        if let Some(pos) = pos {
            self.entries.remove(pos);
        }
    }

    /// Insert keeping (created_at, id) descending order among confirmed
    /// entries; duplicates by id are skipped. Pending entries sit above all
    /// confirmed ones.
    fn insert_confirmed(&mut self, msg: Message) {
        if self.contains(&msg.id) {
            return;
        }
        let key = (msg.created_at, msg.id.clone());
        let pos = self
            .entries
            .iter()
            .position(|e| match e {
                Entry::Pending(_) => false,
                Entry::Confirmed(m) => (m.created_at, m.id.clone()) < key,
            })
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, Entry::Confirmed(msg));
    }
}
