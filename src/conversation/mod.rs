//! Shared conversation state.
//!
//! The [`ConversationStore`] is the single source of truth every agent reads
//! history from and appends its final answer to. It is append-only: the
//! only way to remove messages is [`ConversationStore::clear`].
//!
//! # Example
//!
//! ```
//! use crewkit::conversation::{AgentRole, ConversationStore};
//!
//! let mut store = ConversationStore::new();
//! store.add_message(AgentRole::Coder, "```rust\nfn main() {}\n```", None);
//! assert_eq!(store.code_blocks()[0].language, "rust");
//! ```

pub mod store;
pub mod types;

pub use store::{ConversationStore, SharedConversation};
pub use types::{AgentRole, CodeBlock, Message};
