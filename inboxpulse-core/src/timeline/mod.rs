//! Per-conversation message timelines
//!
//! A timeline is the ordered, deduplicated set of messages a reader sees for
//! one conversation, plus the paging state needed to pull older history.
//!
//! - [`sort_key`]: canonical ordering and identity of messages
//! - [`store`]: snapshot values and the pure replace/merge operations
//! - [`sync`]: drives the store from a [`crate::api::ConversationSource`]

pub mod sort_key;
pub mod store;
pub mod sync;

pub use sort_key::{derive_sort_key, identity_key, sort_ascending, SortKey};
pub use store::{merge_messages, ExtendBlocked, Timeline, TimelineSnapshot, TimelineStore};
pub use sync::{LoadOutcome, SendOutcome, TimelineSync};
