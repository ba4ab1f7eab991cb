use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use futures::stream::BoxStream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    // Set when the stream producing this message failed part way
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
            truncated: false,
        }
    }
}

fn endpoint(api_hostname: &str) -> String {
    format!("{}/v1/chat/completions", api_hostname.trim_end_matches("/"))
}

pub async fn completion(
    messages: &[Message],
    api_hostname: &str,
    api_key: &str,
    model: &str,
    temperature: f32,
) -> Result<Value, Error> {
    let payload = json!({
        "model": model,
        "messages": messages,
        "temperature": temperature,
        "stream": false,
    });
    let response = reqwest::Client::new()
        .post(endpoint(api_hostname))
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 10))
        .json(&payload)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(response)
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChunkChoice {
    #[serde(default)]
    delta: Delta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<CompletionChunkChoice>,
}

/// Pulls the next complete SSE event out of `buffer`, if there is one.
///
/// Operates on bytes so that a multi-byte character split across two
/// network chunks is only decoded once the whole event has arrived.
fn next_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")?;
    let event: Vec<u8> = buffer.drain(..end + 2).take(end).collect();
    Some(event)
}

/// Result of parsing the `data:` payload of a single SSE event.
#[derive(Debug, PartialEq)]
enum SseData {
    Skip,
    Done,
    Chunk { content: Option<String>, finished: bool },
}

fn parse_event(event: &str) -> Result<SseData> {
    let event = event.trim();
    let Some(data) = event.strip_prefix("data:") else {
        return Ok(SseData::Skip);
    };
    let data = data.trim();

    // Data can sometimes be empty, e.g. keep-alive frames
    if data.is_empty() {
        return Ok(SseData::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseData::Done);
    }

    let chunk = serde_json::from_str::<CompletionChunk>(data).inspect_err(|e| {
        tracing::error!("Parsing completion chunk failed for {}\nError:{}", data, e)
    })?;
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(SseData::Skip);
    };

    Ok(SseData::Chunk {
        content: choice.delta.content.filter(|c| !c.is_empty()),
        finished: choice.finish_reason.is_some(),
    })
}

/// Request a streaming chat completion and return the content deltas
/// as a lazy stream of text fragments.
///
/// The request is sent and its status checked before returning so
/// that connection and authentication failures surface here rather
/// than as the first item of the stream.
pub async fn completion_stream(
    messages: &[Message],
    api_hostname: &str,
    api_key: &str,
    model: &str,
    temperature: f32,
) -> Result<BoxStream<'static, Result<String>>, Error> {
    let payload = json!({
        "model": model,
        "messages": messages,
        "temperature": temperature,
        "stream": true,
    });
    let response = reqwest::Client::new()
        .post(endpoint(api_hostname))
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 5))
        .json(&payload)
        .send()
        .await?
        .error_for_status()?;

    let mut bytes = response.bytes_stream();

    Ok(Box::pin(async_stream::try_stream! {
        // Buffering is necessary to handle SSE fragmentation over
        // HTTP/2 frames.
        let mut buffer: Vec<u8> = Vec::new();
        let mut finished = false;

        'outer: loop {
            let chunk = bytes.next().await;
            let eof = chunk.is_none();
            match chunk {
                Some(chunk) => buffer.extend_from_slice(&chunk?),
                // The last event may arrive without its blank line
                None if !buffer.is_empty() => buffer.extend_from_slice(b"\n\n"),
                None => {}
            }

            while let Some(event) = next_event(&mut buffer) {
                let event = std::str::from_utf8(&event)?;
                match parse_event(event)? {
                    SseData::Skip => continue,
                    SseData::Done => {
                        finished = true;
                        break 'outer;
                    }
                    SseData::Chunk { content, finished: last } => {
                        if let Some(content) = content {
                            yield content;
                        }
                        if last {
                            finished = true;
                            break 'outer;
                        }
                    }
                }
            }

            if eof {
                break;
            }
        }

        if !finished {
            Err::<(), Error>(anyhow!("Completion stream ended before it finished"))?;
        }
    }))
}
