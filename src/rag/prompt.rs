//! Prompt assembly and language resolution.

use crate::agent::{ChatMessage, Tokenizer};
use std::sync::Arc;

const DEFAULT_LANGUAGE: &str = "en";

const BEHAVIOR_TEMPLATE: &str = "You are Lumi, a concise multilingual assistant for SMB customer support. \
Answer strictly based on the provided FAQ context. If the answer is not in the context, \
say you don’t know and propose to connect a human. Use language: {lang}. \
Be brief, accurate, and friendly.";

const GUARDRAILS: &str = "If the user asks outside business scope or risky content, redirect politely. \
Do not invent facts. Prefer short paragraphs and bullet points.";

/// Lowercased language code, `"en"` when absent or blank.
pub fn resolve_language(lang: Option<&str>) -> String {
    match lang.map(str::trim) {
        Some(code) if !code.is_empty() => code.to_lowercase(),
        _ => DEFAULT_LANGUAGE.to_string(),
    }
}

/// First two characters of the resolved language; selects static texts.
pub fn language_key(lang: Option<&str>) -> String {
    resolve_language(lang).chars().take(2).collect()
}

/// Ordered messages: behavior, guardrails, optional tenant override, user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMessages {
    pub language: String,
    pub messages: Vec<ChatMessage>,
}

impl PromptMessages {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }
}

pub struct PromptAssembler {
    tokenizer: Arc<dyn Tokenizer>,
}

impl PromptAssembler {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    pub fn build(
        &self,
        lang: Option<&str>,
        context: &str,
        question: &str,
        tenant_prompt: Option<&str>,
    ) -> PromptMessages {
        let language = resolve_language(lang);

        let mut messages = vec![
            ChatMessage::system(BEHAVIOR_TEMPLATE.replace("{lang}", &language)),
            ChatMessage::system(GUARDRAILS),
        ];
        if let Some(prompt) = tenant_prompt.filter(|p| !p.trim().is_empty()) {
            messages.push(ChatMessage::system(prompt));
        }
        messages.push(ChatMessage::user(format!(
            "FAQ context:\n{}\nUser question: \"{}\"\nAnswer in {}. If insufficient context, say you don’t know.",
            context, question, language
        )));

        PromptMessages { language, messages }
    }

    /// Sum of the token counts of every message body.
    pub fn estimate_tokens(&self, prompt: &PromptMessages) -> u32 {
        prompt
            .messages
            .iter()
            .map(|message| self.tokenizer.count_tokens(&message.content))
            .fold(0u32, u32::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tokenizer::WhitespaceTokenizer;
    use crate::agent::Role;

    fn assembler() -> PromptAssembler {
        PromptAssembler::new(Arc::new(WhitespaceTokenizer))
    }

    #[test]
    fn test_resolve_language() {
        assert_eq!(resolve_language(None), "en");
        assert_eq!(resolve_language(Some("")), "en");
        assert_eq!(resolve_language(Some("  ")), "en");
        assert_eq!(resolve_language(Some("FR-CA")), "fr-ca");
        assert_eq!(language_key(Some("FR-CA")), "fr");
        assert_eq!(language_key(Some("e")), "e");
    }

    #[test]
    fn test_message_order_with_tenant_override() {
        let prompt = assembler().build(
            Some("fr"),
            "1. Q: a\n   A: b",
            "Horaires ?",
            Some("Signez avec 'Acme'."),
        );
        let roles: Vec<Role> = prompt.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::System, Role::System, Role::User]);
        assert!(prompt.messages[0].content.contains("Use language: fr."));
        assert!(prompt.messages[1].content.contains("Do not invent facts"));
        assert_eq!(prompt.messages[2].content, "Signez avec 'Acme'.");

        let user = &prompt.messages[3].content;
        assert!(user.starts_with("FAQ context:\n1. Q: a\n   A: b\n"));
        assert!(user.contains("User question: \"Horaires ?\""));
        assert!(user.contains("Answer in fr."));
    }

    #[test]
    fn test_blank_tenant_override_is_skipped() {
        let prompt = assembler().build(None, "ctx", "q", Some("  "));
        assert_eq!(prompt.messages.len(), 3);
        assert_eq!(prompt.language, "en");
    }

    #[test]
    fn test_estimate_sums_message_bodies() {
        let assembler = assembler();
        let prompt = assembler.build(None, "ctx", "q", None);
        let expected: u32 = prompt
            .messages
            .iter()
            .map(|m| WhitespaceTokenizer.count_tokens(&m.content))
            .sum();
        assert_eq!(assembler.estimate_tokens(&prompt), expected);
        assert!(expected > 0);
    }
}
