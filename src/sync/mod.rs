//! Client-side synchronization: the cursor-walking fetcher, the per-channel
//! merged view, and the pending-action dispatch. These hold no sockets or
//! HTTP of their own; they are the state machines a client drives.

pub mod fetcher;
pub mod modal;
pub mod view;

pub use fetcher::{PageSource, Paginator};
pub use modal::{ActionDispatch, ActionKind, PendingAction};
pub use view::{ChannelView, ViewState};
