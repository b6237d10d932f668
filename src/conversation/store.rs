//! Append-only conversation log.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{AgentRole, CodeBlock, Message};

/// Store handle shared by the orchestrator and every agent.
pub type SharedConversation = Arc<RwLock<ConversationStore>>;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(\w+)?\n(.*?)```").expect("valid code fence regex"));

/// Ordered message log with derived code blocks, a task label and the
/// review-cycle counter.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
    code_blocks: Vec<CodeBlock>,
    current_task: Option<String>,
    review_cycle: u32,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh store for sharing.
    pub fn shared() -> SharedConversation {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Append a message and record any fenced code blocks it contains.
    pub fn add_message(
        &mut self,
        role: AgentRole,
        content: impl Into<String>,
        reply_to: Option<String>,
    ) -> Message {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            reply_to,
        };

        for caps in CODE_FENCE.captures_iter(&message.content) {
            let language = caps
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "text".to_string());
            let code = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            self.code_blocks.push(CodeBlock {
                id: Uuid::new_v4().to_string(),
                language,
                code: code.to_string(),
                timestamp: message.timestamp,
                author_role: role,
            });
        }

        self.messages.push(message.clone());
        message
    }

    /// Copy of the full message sequence.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// The last `n` messages, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<Message> {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..].to_vec()
    }

    /// Messages authored by `role`.
    pub fn by_role(&self, role: AgentRole) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.role == role)
            .cloned()
            .collect()
    }

    /// All extracted code blocks in extraction order.
    pub fn code_blocks(&self) -> Vec<CodeBlock> {
        self.code_blocks.clone()
    }

    /// Most recently extracted code block.
    pub fn latest_code_block(&self) -> Option<CodeBlock> {
        self.code_blocks.last().cloned()
    }

    /// Bump the review counter and return the new value.
    pub fn increment_review_cycle(&mut self) -> u32 {
        self.review_cycle += 1;
        self.review_cycle
    }

    /// Current review counter.
    pub fn review_cycle(&self) -> u32 {
        self.review_cycle
    }

    /// Set or clear the task label.
    pub fn set_current_task(&mut self, task: Option<String>) {
        self.current_task = task;
    }

    /// Current task label.
    pub fn current_task(&self) -> Option<&str> {
        self.current_task.as_deref()
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when nothing has been said yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Short multi-line status of the conversation.
    pub fn context_summary(&self) -> String {
        [
            format!("Current Task: {}", self.current_task().unwrap_or("None")),
            format!("Review Cycle: {}", self.review_cycle),
            format!("Total Messages: {}", self.messages.len()),
            format!("Code Blocks: {}", self.code_blocks.len()),
        ]
        .join("\n")
    }

    /// History as `[ROLE]: content` paragraphs, optionally only the newest
    /// `max_messages`.
    pub fn format_for_llm(&self, max_messages: Option<usize>) -> String {
        let messages = match max_messages {
            Some(n) => &self.messages[self.messages.len().saturating_sub(n)..],
            None => &self.messages[..],
        };
        messages
            .iter()
            .map(|m| format!("{}: {}", m.role.tag(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Drop every message, code block, the task label and the counter.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_keep_insertion_order() {
        let mut store = ConversationStore::new();
        let first = store.add_message(AgentRole::User, "hello", None);
        let second = store.add_message(AgentRole::Coder, "hi", Some(first.id.clone()));
        store.add_message(AgentRole::Critic, "looks fine", None);

        let messages = store.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].reply_to.as_deref(), Some(first.id.as_str()));
        assert_eq!(messages[1].id, second.id);
        assert_eq!(messages[2].role, AgentRole::Critic);
    }

    #[test]
    fn test_read_projections_are_idempotent() {
        let mut store = ConversationStore::new();
        store.add_message(AgentRole::User, "a", None);
        store.add_message(AgentRole::Coder, "b", None);
        assert_eq!(store.messages(), store.messages());
    }

    #[test]
    fn test_last_n_matches_tail() {
        let mut store = ConversationStore::new();
        for i in 0..5 {
            store.add_message(AgentRole::User, format!("m{}", i), None);
        }
        let all = store.messages();
        for k in 0..=7 {
            let tail = store.last_n(k);
            let start = all.len().saturating_sub(k);
            assert_eq!(tail, all[start..].to_vec());
        }
    }

    #[test]
    fn test_by_role() {
        let mut store = ConversationStore::new();
        store.add_message(AgentRole::Coder, "one", None);
        store.add_message(AgentRole::Critic, "two", None);
        store.add_message(AgentRole::Coder, "three", None);
        let coder = store.by_role(AgentRole::Coder);
        assert_eq!(coder.len(), 2);
        assert_eq!(coder[1].content, "three");
    }

    #[test]
    fn test_code_block_extraction() {
        let mut store = ConversationStore::new();
        store.add_message(AgentRole::Coder, "```python\nprint(1)\n```", None);

        let blocks = store.code_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, "python");
        assert_eq!(blocks[0].code, "print(1)");
        assert_eq!(blocks[0].author_role, AgentRole::Coder);
    }

    #[test]
    fn test_untagged_fence_defaults_to_text() {
        let mut store = ConversationStore::new();
        store.add_message(
            AgentRole::Coder,
            "First:\n```\n  plain  \n```\nThen:\n```rust\nfn main() {}\n```",
            None,
        );
        let blocks = store.code_blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language, "text");
        assert_eq!(blocks[0].code, "plain");
        assert_eq!(store.latest_code_block().unwrap().language, "rust");
    }

    #[test]
    fn test_review_cycle_and_clear() {
        let mut store = ConversationStore::new();
        assert_eq!(store.increment_review_cycle(), 1);
        assert_eq!(store.increment_review_cycle(), 2);
        store.set_current_task(Some("parser".to_string()));
        store.add_message(AgentRole::User, "```sh\nls\n```", None);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.review_cycle(), 0);
        assert!(store.code_blocks().is_empty());
        assert!(store.current_task().is_none());
    }

    #[test]
    fn test_summary_and_llm_format() {
        let mut store = ConversationStore::new();
        store.set_current_task(Some("Build a CLI".to_string()));
        store.add_message(AgentRole::User, "Start", None);
        store.add_message(AgentRole::Architect, "Plan", None);

        let summary = store.context_summary();
        assert!(summary.contains("Current Task: Build a CLI"));
        assert!(summary.contains("Total Messages: 2"));
        assert!(summary.contains("Code Blocks: 0"));

        assert_eq!(store.format_for_llm(None), "[USER]: Start\n\n[ARCHITECT]: Plan");
        assert_eq!(store.format_for_llm(Some(1)), "[ARCHITECT]: Plan");
    }
}
