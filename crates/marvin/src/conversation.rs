//! Conversation assembly - turns stored history into the prompt sequence

use serde::{Deserialize, Serialize};

use crate::retrieval::RagSource;
use crate::store::{Message, Role};

/// One role-tagged entry of a prompt sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: Role,
    pub content: String,
}

impl ChatEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// `[system, history..., user]`, history kept in the order given.
pub fn assemble_conversation(system_prompt: &str, history: &[Message], user_input: &str) -> Vec<ChatEntry> {
    assemble_with_context(system_prompt, None, history, user_input)
}

/// Like [`assemble_conversation`], with an optional retrieved-context block
/// placed as a second system entry right after the system prompt.
pub fn assemble_with_context(
    system_prompt: &str,
    context: Option<&str>,
    history: &[Message],
    user_input: &str,
) -> Vec<ChatEntry> {
    let mut entries = Vec::with_capacity(history.len() + 3);
    entries.push(ChatEntry::new(Role::System, system_prompt));
    if let Some(context) = context {
        entries.push(ChatEntry::new(Role::System, context));
    }
    entries.extend(
        history
            .iter()
            .map(|message| ChatEntry::new(message.role, message.content.as_str())),
    );
    entries.push(ChatEntry::new(Role::User, user_input));
    entries
}

/// Render retrieved snippets as a context block; `None` when there are none.
pub fn format_rag_context(sources: &[RagSource]) -> Option<String> {
    if sources.is_empty() {
        return None;
    }

    let mut block = String::from(
        "Relevante Auszüge aus den Dokumenten des Nutzers. Nutze sie, wenn sie zur Frage passen:\n",
    );
    for (i, source) in sources.iter().enumerate() {
        block.push_str(&format!("\n[{}] {}\n{}\n", i + 1, source.source, source.content));
    }
    Some(block)
}

/// Prior user turns joined, used as classifier context.
pub fn user_context(history: &[Message]) -> String {
    history
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(role: Role, content: &str) -> Message {
        Message {
            id: content.to_string(),
            session_id: "s1".to_string(),
            role,
            content: content.to_string(),
            tokens: None,
            model: None,
            temperature: None,
            created_at: Utc::now(),
            metadata: None,
        }
    }

    #[test]
    fn test_assembly_order() {
        let history = vec![message(Role::User, "m1"), message(Role::Assistant, "m2")];
        let entries = assemble_conversation("SYS", &history, "u");

        assert_eq!(
            entries,
            vec![
                ChatEntry::new(Role::System, "SYS"),
                ChatEntry::new(Role::User, "m1"),
                ChatEntry::new(Role::Assistant, "m2"),
                ChatEntry::new(Role::User, "u"),
            ]
        );
    }

    #[test]
    fn test_empty_history() {
        let entries = assemble_conversation("SYS", &[], "hallo");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role, Role::System);
        assert_eq!(entries[1], ChatEntry::new(Role::User, "hallo"));
    }

    #[test]
    fn test_context_follows_system_prompt() {
        let history = vec![message(Role::User, "m1")];
        let entries = assemble_with_context("SYS", Some("CTX"), &history, "u");

        let roles: Vec<Role> = entries.iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![Role::System, Role::System, Role::User, Role::User]);
        assert_eq!(entries[1].content, "CTX");
        assert_eq!(entries[2].content, "m1");
    }

    #[test]
    fn test_rag_context_formatting() {
        assert_eq!(format_rag_context(&[]), None);

        let block = format_rag_context(&[RagSource {
            content: "Atemübung am Morgen".into(),
            source: "routine.txt".into(),
            similarity: 0.9,
        }])
        .unwrap();
        assert!(block.contains("[1] routine.txt"));
        assert!(block.contains("Atemübung am Morgen"));
    }

    #[test]
    fn test_user_context_skips_assistant_turns() {
        let history = vec![
            message(Role::User, "erste"),
            message(Role::Assistant, "antwort"),
            message(Role::User, "zweite"),
        ];
        assert_eq!(user_context(&history), "erste zweite");
    }
}
