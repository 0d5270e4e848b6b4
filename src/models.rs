use serde::{Deserialize, Serialize};

// One turn of the widget conversation
#[derive(Deserialize, Serialize, Clone)]
pub struct ChatMessage {
    pub role: String, // "user" or "assistant"
    pub content: String,
}

// Chat widget request format
#[derive(Deserialize, Serialize, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

// Chat widget response format
#[derive(Deserialize, Serialize, Clone)]
pub struct ChatResponse {
    pub provider: String,
    pub reply: String,
}
