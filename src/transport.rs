use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use std::collections::VecDeque;

use crate::error::{AssistantError, Result};
use crate::models::{ChatCompletionRequest, StreamChunk};

/// Finite, non-restartable sequence of text fragments in arrival order.
pub type FragmentStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn chat_stream(
        &self,
        api_key: &str,
        req: &ChatCompletionRequest,
    ) -> Result<FragmentStream>;
}

pub struct DeepSeekTransport {
    client: Client,
    endpoint: String,
}

impl DeepSeekTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = base_url.trim_end_matches('/');
        if base.is_empty() {
            return Err(AssistantError::Config("provider base_url is empty".to_string()));
        }
        Ok(Self {
            client: Client::new(),
            endpoint: format!("{base}/chat/completions"),
        })
    }
}

#[async_trait]
impl Transport for DeepSeekTransport {
    async fn chat_stream(
        &self,
        api_key: &str,
        req: &ChatCompletionRequest,
    ) -> Result<FragmentStream> {
        tracing::info!(
            model = %req.model,
            messages = req.messages.len(),
            "Opening chat-completion stream"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AssistantError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes_stream().boxed();
        let fragments = stream::unfold(
            (bytes, SseDecoder::new(), VecDeque::new()),
            |(mut bytes, mut decoder, mut pending)| async move {
                loop {
                    if let Some(fragment) = pending.pop_front() {
                        return Some((Ok(fragment), (bytes, decoder, pending)));
                    }
                    if decoder.is_done() {
                        return None;
                    }
                    let step = match bytes.next().await {
                        Some(Ok(chunk)) => decoder.push(&chunk),
                        Some(Err(e)) => Err(AssistantError::Network(e.to_string())),
                        None => decoder.finish(),
                    };
                    match step {
                        Ok(fragments) => pending.extend(fragments),
                        Err(e) => {
                            decoder.abort();
                            return Some((Err(e), (bytes, decoder, pending)));
                        }
                    }
                }
            },
        );

        Ok(fragments.boxed())
    }
}

/// Incremental decoder for an OpenAI-style server-sent-event body.
///
/// Bytes are buffered until a full line is available so multi-byte
/// characters split across network chunks decode intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn abort(&mut self) {
        self.buffer.clear();
        self.done = true;
    }

    /// Feeds one network chunk, returning the text fragments it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        if self.done {
            return Ok(Vec::new());
        }
        self.buffer.extend_from_slice(chunk);

        let mut fragments = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(fragment) = self.decode_line(&line)? {
                fragments.push(fragment);
            }
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        Ok(fragments)
    }

    /// Flushes a trailing line left without a newline at end of body.
    pub fn finish(&mut self) -> Result<Vec<String>> {
        let rest = std::mem::take(&mut self.buffer);
        let fragment = if self.done {
            None
        } else {
            self.decode_line(&rest)?
        };
        self.done = true;
        Ok(fragment.into_iter().collect())
    }

    fn decode_line(&mut self, raw: &[u8]) -> Result<Option<String>> {
        let line = std::str::from_utf8(raw)
            .map_err(|e| AssistantError::Stream(format!("invalid UTF-8 in stream: {e}")))?
            .trim();
        if line.is_empty() || line.starts_with(':') {
            return Ok(None);
        }
        let Some(payload) = line.strip_prefix("data:") else {
            // event:, id:, retry: lines carry nothing we need
            return Ok(None);
        };
        let payload = payload.trim();
        if payload == "[DONE]" {
            self.done = true;
            return Ok(None);
        }

        let chunk: StreamChunk = serde_json::from_str(payload)?;
        if let Some(err) = chunk.error {
            return Err(AssistantError::Stream(format!(
                "provider error mid-stream: {}",
                err.message
            )));
        }
        Ok(chunk.content().map(str::to_string))
    }
}

/// Drains a fragment stream in order, forwarding each piece to `on_fragment`.
pub async fn collect_fragments<F>(
    mut fragments: FragmentStream,
    mut on_fragment: F,
) -> Result<String>
where
    F: FnMut(&str),
{
    let mut output = String::new();
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        on_fragment(&fragment);
        output.push_str(&fragment);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[test]
    fn test_decoder_yields_fragments_in_order() {
        let mut decoder = SseDecoder::new();
        let body = format!("{}{}data: [DONE]\n\n", data("你好"), data("，世界"));
        let fragments = decoder.push(body.as_bytes()).unwrap();
        assert_eq!(fragments, vec!["你好", "，世界"]);
        assert!(decoder.is_done());
    }

    #[test]
    fn test_decoder_handles_split_multibyte_characters() {
        let mut decoder = SseDecoder::new();
        let body = data("养生建议");
        let bytes = body.as_bytes();
        // Split inside the first CJK character
        let cut = body.find('养').unwrap() + 1;

        assert!(decoder.push(&bytes[..cut]).unwrap().is_empty());
        assert_eq!(decoder.push(&bytes[cut..]).unwrap(), vec!["养生建议"]);
    }

    #[test]
    fn test_decoder_ignores_comments_and_role_deltas() {
        let mut decoder = SseDecoder::new();
        let body = ": keep-alive\n\
                    event: message\n\
                    data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\
                    \n";
        assert!(decoder.push(body.as_bytes()).unwrap().is_empty());
        assert!(!decoder.is_done());
    }

    #[test]
    fn test_decoder_stops_after_done() {
        let mut decoder = SseDecoder::new();
        let body = format!("data: [DONE]\n\n{}", data("late"));
        assert!(decoder.push(body.as_bytes()).unwrap().is_empty());
        assert!(decoder.push(data("later").as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_decoder_flushes_unterminated_tail() {
        let mut decoder = SseDecoder::new();
        let body = data("尾");
        let tail = body.trim_end();
        assert!(decoder.push(tail.as_bytes()).unwrap().is_empty());
        assert_eq!(decoder.finish().unwrap(), vec!["尾"]);
        assert!(decoder.is_done());
    }

    #[test]
    fn test_decoder_rejects_malformed_json() {
        let mut decoder = SseDecoder::new();
        let err = decoder.push(b"data: {not json}\n").unwrap_err();
        assert!(matches!(err, AssistantError::Stream(_)));
    }

    #[test]
    fn test_decoder_surfaces_error_payload() {
        let mut decoder = SseDecoder::new();
        let err = decoder
            .push(b"data: {\"error\":{\"message\":\"quota exceeded\"}}\n")
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_endpoint_from_base_url() {
        let tx = DeepSeekTransport::new("https://api.deepseek.com/").unwrap();
        assert_eq!(tx.endpoint, "https://api.deepseek.com/chat/completions");
        assert!(DeepSeekTransport::new("").is_err());
    }

    #[tokio::test]
    async fn test_collect_fragments_forwards_each_piece() {
        let fragments: FragmentStream =
            stream::iter(vec![Ok("一".to_string()), Ok("二".to_string())]).boxed();
        let mut seen = Vec::new();
        let output = collect_fragments(fragments, |f| seen.push(f.to_string()))
            .await
            .unwrap();
        assert_eq!(output, "一二");
        assert_eq!(seen, vec!["一", "二"]);
    }

    #[tokio::test]
    async fn test_collect_fragments_stops_on_error() {
        let fragments: FragmentStream = stream::iter(vec![
            Ok("partial".to_string()),
            Err(AssistantError::Stream("broken".to_string())),
            Ok("never".to_string()),
        ])
        .boxed();
        let result = collect_fragments(fragments, |_| {}).await;
        assert!(matches!(result, Err(AssistantError::Stream(_))));
    }

    #[tokio::test]
    async fn test_live_stream_when_key_present() {
        // Only runs against the real provider when a key is present.
        if let Ok(api_key) = std::env::var("DEEPSEEK_API_KEY") {
            let transport = match DeepSeekTransport::new("https://api.deepseek.com") {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Failed to create transport in test: {e}");
                    return;
                }
            };
            let req = ChatCompletionRequest {
                model: "deepseek-chat".to_string(),
                messages: vec![crate::models::ChatMessage::user("用一个词回答：你好")],
                temperature: 0.3,
                stream: true,
            };
            if let Ok(fragments) = transport.chat_stream(&api_key, &req).await {
                let output = collect_fragments(fragments, |_| {}).await;
                assert!(output.is_ok());
            }
        }
    }
}
