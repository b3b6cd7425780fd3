pub mod channel;
pub mod member;
pub mod message;

pub use channel::Channel;
pub use member::{Member, Role};
pub use message::{AttachmentKind, Message, MessageEvent, TOMBSTONE};
