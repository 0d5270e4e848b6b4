use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use crate::cache::{CacheEntry, make_cache_key};
use crate::metrics::{
    CACHE_HITS, CACHE_MISSES, CACHE_SIZE, CHAT_REQUESTS_TOTAL, CHAT_THROTTLED_TOTAL,
    REQUEST_LATENCY,
};
use crate::models::{ChatRequest, ChatResponse};
use crate::rate_limit::now_ms;
use crate::state::AppState;

// Everything that can go wrong in the chat path. Throttled is a normal
// decision, not a failure - it just maps to 429 like the rest map to
// their status codes.
pub enum ChatError {
    UnknownProvider(String),
    EmptyConversation,
    Throttled { retry_after: u64, reset_at: u64 },
    Upstream(String),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        match self {
            ChatError::UnknownProvider(name) => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": format!("unknown provider: {}", name)})),
            )
                .into_response(),
            ChatError::EmptyConversation => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "messages must not be empty"})),
            )
                .into_response(),
            ChatError::Throttled { retry_after, reset_at } => (
                StatusCode::TOO_MANY_REQUESTS,
                [
                    ("retry-after", retry_after.to_string()),
                    ("x-ratelimit-remaining", "0".to_string()),
                    ("x-ratelimit-reset", reset_at.to_string()),
                ],
                Json(json!({
                    "error": "rate limit exceeded, try again later",
                    "retry_after": retry_after,
                })),
            )
                .into_response(),
            ChatError::Upstream(msg) => {
                (StatusCode::BAD_GATEWAY, Json(json!({"error": msg}))).into_response()
            }
        }
    }
}

// The portal's session layer injects x-user-id; anything without one
// shares the anonymous quota
fn caller_id(headers: &HeaderMap) -> &str {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("anonymous")
}

// POST /api/chat/{provider}
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ChatError> {
    CHAT_REQUESTS_TOTAL.inc();

    let provider = state
        .providers
        .get(&provider)
        .ok_or(ChatError::UnknownProvider(provider))?;

    if payload.messages.is_empty() {
        return Err(ChatError::EmptyConversation);
    }

    // one quota per provider:user pair
    let key = format!("{}:{}", provider.name, caller_id(&headers));
    let decision = state.limiter.check(&key);

    if !decision.allowed {
        CHAT_THROTTLED_TOTAL.inc();
        return Err(ChatError::Throttled {
            retry_after: decision.retry_after_secs(now_ms()),
            reset_at: decision.reset_at,
        });
    }

    let rate_headers = [
        ("x-ratelimit-limit", state.limiter.limit().to_string()),
        ("x-ratelimit-remaining", decision.remaining.to_string()),
        ("x-ratelimit-reset", decision.reset_at.to_string()),
    ];

    let start_time = Instant::now();
    let cache_key = make_cache_key(&provider.name, &payload.messages);

    // check cache first
    if let Some(entry) = state.cache.get(&cache_key) {
        if entry.created_at.elapsed() < state.ttl {
            CACHE_HITS.inc();
            let reply = entry.reply.clone();
            return Ok((
                rate_headers,
                Json(ChatResponse {
                    provider: provider.name.clone(),
                    reply,
                }),
            ));
        }
    }
    CACHE_MISSES.inc();

    let reply = provider
        .complete(&state.client, &payload.messages)
        .await
        .map_err(ChatError::Upstream)?;

    state.cache.insert(
        cache_key,
        CacheEntry {
            reply: reply.clone(),
            created_at: Instant::now(),
        },
    );
    CACHE_SIZE.set(state.cache.len() as f64);

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    Ok((
        rate_headers,
        Json(ChatResponse {
            provider: provider.name.clone(),
            reply,
        }),
    ))
}
