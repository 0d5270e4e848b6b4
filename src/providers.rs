use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::models::ChatMessage;

// Same assistant persona for every provider
const SYSTEM_PROMPT: &str = "You are the assistant for Vanguard-IA, an AI consultancy. \
Answer questions about the firm's services (AI strategy, custom model development, \
process automation) briefly and professionally. If a question is outside that scope, \
say so and suggest contacting the team directly.";

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

// Wire dialect spoken by a hosted provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAiCompat, // groq, perplexity
    Gemini,
}

// A single hosted LLM provider
pub struct Provider {
    pub name: String,
    kind: ProviderKind,
    base_url: String,
    model: String,
    api_key: String,
}

impl Provider {
    pub fn new(name: &str, kind: ProviderKind, base_url: &str, model: &str, api_key: String) -> Self {
        Self {
            name: name.to_string(),
            kind,
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key,
        }
    }

    // One HTTP call per chat request, no retries
    pub async fn complete(
        &self,
        client: &reqwest::Client,
        messages: &[ChatMessage],
    ) -> Result<String, String> {
        match self.kind {
            ProviderKind::OpenAiCompat => self.complete_openai(client, messages).await,
            ProviderKind::Gemini => self.complete_gemini(client, messages).await,
        }
    }

    async fn complete_openai(
        &self,
        client: &reqwest::Client,
        messages: &[ChatMessage],
    ) -> Result<String, String> {
        let res = client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(UPSTREAM_TIMEOUT)
            .json(&openai_body(&self.model, messages))
            .send()
            .await
            .map_err(|e| format!("Request to {} failed: {}", self.name, e))?;

        if !res.status().is_success() {
            return Err(format!("{} returned {}", self.name, res.status()));
        }

        let body: OpenAiResponse = res
            .json()
            .await
            .map_err(|e| format!("Parse error from {}: {}", self.name, e))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| format!("{} returned no choices", self.name))
    }

    async fn complete_gemini(
        &self,
        client: &reqwest::Client,
        messages: &[ChatMessage],
    ) -> Result<String, String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let res = client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(UPSTREAM_TIMEOUT)
            .json(&gemini_body(messages))
            .send()
            .await
            .map_err(|e| format!("Request to {} failed: {}", self.name, e))?;

        if !res.status().is_success() {
            return Err(format!("{} returned {}", self.name, res.status()));
        }

        let body: GeminiResponse = res
            .json()
            .await
            .map_err(|e| format!("Parse error from {}: {}", self.name, e))?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| format!("{} returned no candidates", self.name))
    }
}

// OpenAI-style chat body, system prompt prepended
fn openai_body(model: &str, messages: &[ChatMessage]) -> Value {
    let mut wire = vec![json!({"role": "system", "content": SYSTEM_PROMPT})];
    for msg in messages {
        wire.push(json!({"role": msg.role, "content": msg.content}));
    }
    json!({"model": model, "messages": wire})
}

// Gemini body - system prompt travels separately, "assistant" becomes "model"
fn gemini_body(messages: &[ChatMessage]) -> Value {
    let contents: Vec<Value> = messages
        .iter()
        .map(|msg| {
            let role = if msg.role == "assistant" { "model" } else { "user" };
            json!({"role": role, "parts": [{"text": msg.content}]})
        })
        .collect();

    json!({
        "systemInstruction": {"parts": [{"text": SYSTEM_PROMPT}]},
        "contents": contents,
    })
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: String,
}

// The providers the portal chat widget can talk to
pub struct ProviderRegistry {
    providers: HashMap<String, Provider>,
}

impl ProviderRegistry {
    // Each provider is enabled by its API key being present in the environment
    pub fn from_env() -> Self {
        let catalog = [
            (
                "groq",
                ProviderKind::OpenAiCompat,
                "https://api.groq.com/openai/v1",
                "llama-3.3-70b-versatile",
                "GROQ_API_KEY",
            ),
            (
                "perplexity",
                ProviderKind::OpenAiCompat,
                "https://api.perplexity.ai",
                "sonar",
                "PERPLEXITY_API_KEY",
            ),
            (
                "gemini",
                ProviderKind::Gemini,
                "https://generativelanguage.googleapis.com/v1beta",
                "gemini-2.0-flash",
                "GEMINI_API_KEY",
            ),
        ];

        let mut providers = HashMap::new();
        for (name, kind, base_url, model, key_var) in catalog {
            match env::var(key_var) {
                Ok(key) if !key.is_empty() => {
                    providers.insert(
                        name.to_string(),
                        Provider::new(name, kind, base_url, model, key),
                    );
                }
                _ => println!("Provider {} disabled ({} not set)", name, key_var),
            }
        }

        if providers.is_empty() {
            panic!("At least one provider API key required");
        }

        println!("Provider registry initialized with {} providers:", providers.len());
        let registry = Self { providers };
        for (i, name) in registry.names().iter().enumerate() {
            println!(".  [{}]  {}", i + 1, name);
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<&Provider> {
        self.providers.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
