use sha2::{Digest, Sha256};
use std::time::Instant;
use crate::models::ChatMessage;

// Cache entry with timestamp
#[derive(Clone)]
pub struct CacheEntry {
    pub reply: String,
    pub created_at: Instant,
}

// Create a cache key (hash of provider + full conversation)
pub fn make_cache_key(provider: &str, messages: &[ChatMessage]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider);
    for msg in messages {
        // zero bytes keep role/content boundaries unambiguous
        hasher.update(&msg.role);
        hasher.update([0u8]);
        hasher.update(&msg.content);
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn same_conversation_same_key() {
        let a = make_cache_key("groq", &[msg("user", "hello")]);
        let b = make_cache_key("groq", &[msg("user", "hello")]);
        assert_eq!(a, b);
    }

    #[test]
    fn provider_is_part_of_the_key() {
        let a = make_cache_key("groq", &[msg("user", "hello")]);
        let b = make_cache_key("gemini", &[msg("user", "hello")]);
        assert_ne!(a, b);
    }

    #[test]
    fn message_boundaries_are_not_ambiguous() {
        let a = make_cache_key("groq", &[msg("user", "ab"), msg("user", "c")]);
        let b = make_cache_key("groq", &[msg("user", "a"), msg("user", "bc")]);
        assert_ne!(a, b);
    }
}
