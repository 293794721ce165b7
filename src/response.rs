//!
//! Response composition for the OpenAI-compatible wire format.
//!
//! Turns one completed backend reply into either a single chat completion
//! JSON document or a paced Server-Sent Events stream that simulates
//! token-by-token delivery by re-chunking the finished text. The chunking
//! and pacing live here, away from the backend invocation, so a natively
//! streaming backend would only replace the data source, not the framing.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::time::Duration;

use axum::response::sse::Event;
use axum::response::{IntoResponse, Response, Sse};
use rand::RngCore;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::Result;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Complete chat completion response body (non-streaming path).
#[derive(Debug, Serialize)]
pub struct ChatCompletionResponse {
    /** response identity, `chatcmpl-` + 24 hex characters */
    pub id: String,
    /** object tag, always `chat.completion` */
    pub object: String,
    /** creation time as unix seconds */
    pub created: i64,
    /** model identifier echoed from the request */
    pub model: String,
    /** single choice carrying the full assistant message */
    pub choices: Vec<CompletionChoice>,
    /** token usage; the session backend reports none, so all fields are null */
    pub usage: TokenUsage,
}

///
/// One completion choice with the finished assistant message.
#[derive(Debug, Serialize)]
pub struct CompletionChoice {
    /** choice index, always 0 */
    pub index: u32,
    /** the assistant message */
    pub message: AssistantMessage,
    /** finish reason, always `stop` */
    pub finish_reason: String,
}

///
/// Assistant message within a completion choice.
#[derive(Debug, Serialize)]
pub struct AssistantMessage {
    /** message role, always `assistant` */
    pub role: String,
    /** full generated reply */
    pub content: String,
}

///
/// Token accounting placeholder.
///
/// The adapter has no token counts to report; every field serializes as
/// JSON null rather than being omitted, matching what streaming consumers
/// expect to find in the document.
#[derive(Debug, Default, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

///
/// One streamed chunk document (streaming path).
///
/// Every chunk of one response shares the same `id` and `created`.
#[derive(Debug, Serialize)]
pub struct ChatCompletionChunk {
    /** response identity shared by all chunks of this response */
    pub id: String,
    /** object tag, always `chat.completion.chunk` */
    pub object: String,
    /** creation time shared by all chunks of this response */
    pub created: i64,
    /** model identifier echoed from the request */
    pub model: String,
    /** single choice carrying the incremental delta */
    pub choices: Vec<ChunkChoice>,
    /** always serialized as null on the streaming path */
    pub usage: Option<TokenUsage>,
}

///
/// One choice within a streamed chunk.
#[derive(Debug, Serialize)]
pub struct ChunkChoice {
    /** choice index, always 0 */
    pub index: u32,
    /** incremental update to the assistant message */
    pub delta: ChunkDelta,
    /** null until the terminal chunk, which carries `stop` */
    pub finish_reason: Option<String>,
}

///
/// Incremental delta: role announcement, a content fragment, or empty on
/// the terminal chunk.
#[derive(Debug, Serialize)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/* --- constants ------------------------------------------------------------------------------ */

/** pacing delay between simulated stream frames */
const STREAM_DELAY: Duration = Duration::from_millis(20);

/** Channel buffer size for streaming responses */
const STREAMING_CHANNEL_BUFFER: usize = 100;

/* --- start of code -------------------------------------------------------------------------- */

///
/// Generate a fresh response identity.
///
/// `chatcmpl-` followed by 12 cryptographically random bytes hex-encoded;
/// never derived from request content, unique per request with
/// overwhelming probability.
///
/// # Returns
///  * New response identity string
pub fn completion_id() -> String {
    let mut bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("chatcmpl-{}", hex::encode(bytes))
}

///
/// Split text into maximal runs of whitespace and non-whitespace.
///
/// The whitespace itself is kept as its own token, so concatenating the
/// tokens in order reproduces the input exactly. Empty input yields no
/// tokens.
///
/// # Arguments
///  * `text` - source text to split
///
/// # Returns
///  * Ordered tokens covering the whole input
pub fn split_preserving_whitespace(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_whitespace = None;

    for (i, ch) in text.char_indices() {
        let whitespace = ch.is_whitespace();
        match in_whitespace {
            None => in_whitespace = Some(whitespace),
            Some(previous) if previous != whitespace => {
                tokens.push(&text[start..i]);
                start = i;
                in_whitespace = Some(whitespace);
            }
            Some(_) => {}
        }
    }

    if start < text.len() {
        tokens.push(&text[start..]);
    }

    tokens
}

///
/// Compose the non-streaming response body for one backend reply.
///
/// # Arguments
///  * `model` - model identifier echoed from the request
///  * `text` - full generated reply
///
/// # Returns
///  * Complete response document with a fresh identity
pub fn completion_response(model: &str, text: &str) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: completion_id(),
        object: "chat.completion".to_string(),
        created: chrono::Utc::now().timestamp(),
        model: model.to_string(),
        choices: vec![CompletionChoice {
            index: 0,
            message: AssistantMessage {
                role: "assistant".to_string(),
                content: text.to_string(),
            },
            finish_reason: "stop".to_string(),
        }],
        usage: TokenUsage::default(),
    }
}

///
/// Compose the simulated streaming response for one backend reply.
///
/// Spawns the paced emitter and returns the SSE response immediately. The
/// frame order is fixed: role announcement, one content frame per token,
/// a terminal `finish_reason: "stop"` frame, then the literal `[DONE]`
/// sentinel. An empty reply still produces the role, terminal and sentinel
/// frames. If the client disconnects mid-stream, emission stops silently.
///
/// # Arguments
///  * `model` - model identifier echoed in every chunk
///  * `text` - full generated reply to re-chunk
///
/// # Returns
///  * Server-Sent Events response
pub fn stream_completion(model: &str, text: String) -> Response {
    let (tx, rx) = mpsc::channel::<Result<Event>>(STREAMING_CHANNEL_BUFFER);

    let id = completion_id();
    let created = chrono::Utc::now().timestamp();
    let model = model.to_string();

    tokio::spawn(async move {
        emit_stream_frames(&id, created, &model, &text, &tx).await;
    });

    Sse::new(ReceiverStream::new(rx)).into_response()
}

///
/// Emit the full frame sequence for one simulated stream.
///
/// Pacing: one delay before the role frame, one after each content frame,
/// and one after the terminal frame. A failed send means the receiving end
/// is gone; the loop returns without emitting further frames.
///
/// # Arguments
///  * `id` - response identity shared by every frame
///  * `created` - timestamp shared by every frame
///  * `model` - model identifier echoed in every chunk
///  * `text` - full reply to re-chunk
///  * `tx` - event sender channel
async fn emit_stream_frames(
    id: &str,
    created: i64,
    model: &str,
    text: &str,
    tx: &mpsc::Sender<Result<Event>>,
) {
    sleep(STREAM_DELAY).await;
    if send_chunk(tx, &role_chunk(id, created, model)).await.is_err() {
        return;
    }

    for token in split_preserving_whitespace(text) {
        if send_chunk(tx, &content_chunk(id, created, model, token)).await.is_err() {
            return;
        }
        sleep(STREAM_DELAY).await;
    }

    if send_chunk(tx, &finish_chunk(id, created, model)).await.is_err() {
        return;
    }
    sleep(STREAM_DELAY).await;

    send_stream_done(tx).await;
}

///
/// Build the opening chunk announcing the assistant role.
fn role_chunk(id: &str, created: i64, model: &str) -> ChatCompletionChunk {
    chunk(id, created, model, ChunkDelta { role: Some("assistant".to_string()), content: None }, None)
}

///
/// Build one content chunk carrying a single token.
fn content_chunk(id: &str, created: i64, model: &str, token: &str) -> ChatCompletionChunk {
    chunk(id, created, model, ChunkDelta { role: None, content: Some(token.to_string()) }, None)
}

///
/// Build the terminal chunk with an empty delta and `finish_reason: "stop"`.
fn finish_chunk(id: &str, created: i64, model: &str) -> ChatCompletionChunk {
    chunk(id, created, model, ChunkDelta { role: None, content: None }, Some("stop".to_string()))
}

fn chunk(
    id: &str,
    created: i64,
    model: &str,
    delta: ChunkDelta,
    finish_reason: Option<String>,
) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: id.to_string(),
        object: "chat.completion.chunk".to_string(),
        created,
        model: model.to_string(),
        choices: vec![ChunkChoice { index: 0, delta, finish_reason }],
        usage: None,
    }
}

///
/// Serialize a chunk and send it as an SSE event.
///
/// # Arguments
///  * `tx` - event sender channel
///  * `chunk` - chunk document to serialize
///
/// # Returns
///  * `Err(())` when the receiver is gone and emission should stop
async fn send_chunk(
    tx: &mpsc::Sender<Result<Event>>,
    chunk: &ChatCompletionChunk,
) -> std::result::Result<(), ()> {
    match serde_json::to_string(chunk) {
        Ok(json) => tx.send(Ok(Event::default().data(json))).await.map_err(|_| ()),
        Err(e) => {
            tracing::error!("Failed to serialize chunk: {}", e);
            Ok(())
        }
    }
}

///
/// Send the final [DONE] event to complete the stream.
///
/// # Arguments
///  * `tx` - event sender channel
async fn send_stream_done(tx: &mpsc::Sender<Result<Event>>) {
    let _ = tx.send(Ok(Event::default().data("[DONE]"))).await;
}

/* --- tests ----------------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_completion_id_format() {
        let id = completion_id();
        let hex_part = id.strip_prefix("chatcmpl-").expect("id should carry the prefix");
        assert_eq!(hex_part.len(), 24);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_completion_ids_are_unique() {
        let ids: HashSet<String> = (0..100).map(|_| completion_id()).collect();
        assert_eq!(ids.len(), 100, "100 generated ids should be pairwise unique");
    }

    #[test]
    fn test_split_empty_text_yields_no_tokens() {
        assert!(split_preserving_whitespace("").is_empty());
    }

    #[test]
    fn test_split_single_word() {
        assert_eq!(split_preserving_whitespace("hello"), vec!["hello"]);
    }

    #[test]
    fn test_split_keeps_whitespace_runs() {
        assert_eq!(
            split_preserving_whitespace("hello  world"),
            vec!["hello", "  ", "world"]
        );
    }

    #[test]
    fn test_split_pure_whitespace_is_one_token() {
        assert_eq!(split_preserving_whitespace(" \t "), vec![" \t "]);
    }

    #[test]
    fn test_split_round_trips_awkward_text() {
        let samples = [
            "  leading and trailing  ",
            "line one\nline two\n",
            "tabs\tand  spaces",
            "non-ascii: grüße こんにちは  !",
            "\n\n",
        ];
        for text in samples {
            let rejoined: String = split_preserving_whitespace(text).concat();
            assert_eq!(rejoined, text, "tokens must reproduce the source exactly");
        }
    }

    #[test]
    fn test_completion_response_shape() {
        let response = completion_response("gemini-2.0-flash", "hi there");
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["object"], "chat.completion");
        assert_eq!(value["model"], "gemini-2.0-flash");
        assert_eq!(value["choices"][0]["index"], 0);
        assert_eq!(value["choices"][0]["message"]["role"], "assistant");
        assert_eq!(value["choices"][0]["message"]["content"], "hi there");
        assert_eq!(value["choices"][0]["finish_reason"], "stop");
        assert!(value["usage"]["prompt_tokens"].is_null());
        assert!(value["usage"]["completion_tokens"].is_null());
        assert!(value["usage"]["total_tokens"].is_null());
    }

    #[test]
    fn test_role_chunk_shape() {
        let value = serde_json::to_value(role_chunk("chatcmpl-abc", 1700000000, "m")).unwrap();

        assert_eq!(value["object"], "chat.completion.chunk");
        assert_eq!(value["choices"][0]["delta"]["role"], "assistant");
        assert!(!value["choices"][0]["delta"].as_object().unwrap().contains_key("content"));
        assert!(value["choices"][0]["finish_reason"].is_null());
        assert!(value["usage"].is_null());
    }

    #[test]
    fn test_content_chunk_shape() {
        let value =
            serde_json::to_value(content_chunk("chatcmpl-abc", 1700000000, "m", "  ")).unwrap();

        assert_eq!(value["choices"][0]["delta"]["content"], "  ");
        assert!(!value["choices"][0]["delta"].as_object().unwrap().contains_key("role"));
        assert!(value["choices"][0]["finish_reason"].is_null());
    }

    #[test]
    fn test_finish_chunk_shape() {
        let value = serde_json::to_value(finish_chunk("chatcmpl-abc", 1700000000, "m")).unwrap();

        assert_eq!(value["choices"][0]["finish_reason"], "stop");
        assert_eq!(value["choices"][0]["delta"], serde_json::json!({}));
        assert!(value["usage"].is_null());
    }
}
