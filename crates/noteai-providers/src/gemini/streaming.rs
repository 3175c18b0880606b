//! SSE decoding for `streamGenerateContent?alt=sse`.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use noteai_core::{ChunkStream, ProviderError};
use tracing::debug;

use super::types::GenerateContentResponse;

/// Splits an SSE byte stream into `data:` payloads.
///
/// Network chunks may end mid-line or mid-character, so bytes are buffered
/// until a full line is available.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed raw bytes and return every payload completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = data_payload(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Payload of a trailing line not terminated by a newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        data_payload(&rest)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        None
    } else {
        Some(data.to_string())
    }
}

/// Decode one payload into a text chunk. `Ok(None)` means nothing to emit.
fn decode_payload(data: &str) -> Result<Option<String>, ProviderError> {
    let response: GenerateContentResponse =
        serde_json::from_str(data).map_err(|e| ProviderError::Decode(e.to_string()))?;
    if let Some(error) = response.error {
        return Err(error.into_provider_error());
    }
    let text = response.text();
    if let Some(reason) = response.block_reason(&text) {
        return Err(ProviderError::Blocked(reason));
    }
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Convert a response body stream into text chunks.
///
/// The first error ends the stream. A read that stalls past `timeout_ms`
/// surfaces as [`ProviderError::Timeout`].
pub(crate) fn parse_sse_stream<S>(bytes: S, timeout_ms: u64) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut decoder = SseDecoder::default();
        let mut bytes = Box::pin(bytes);

        while let Some(next) = bytes.next().await {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(super::client::map_transport_error(e, timeout_ms));
                    return;
                }
            };
            for payload in decoder.push(&chunk) {
                match decode_payload(&payload) {
                    Ok(Some(text)) => yield Ok(text),
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        if let Some(payload) = decoder.finish() {
            match decode_payload(&payload) {
                Ok(Some(text)) => yield Ok(text),
                Ok(None) => {}
                Err(e) => yield Err(e),
            }
        }
        debug!("gemini stream finished");
    };

    stream.boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_splits_lines() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.push(b"data: {\"a\":1}\r\n\r\ndata: {\"b\":2}\n\n");
        assert_eq!(payloads, vec![r#"{"a":1}"#, r#"{"b":2}"#]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_decoder_buffers_partial_lines() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"te").is_empty());
        assert!(decoder.push(b"xt\":\"hi\"}").is_empty());
        assert_eq!(decoder.push(b"\n"), vec![r#"{"text":"hi"}"#]);
    }

    #[test]
    fn test_decoder_buffers_split_characters() {
        let mut decoder = SseDecoder::default();
        let line = "data: 안녕\n".as_bytes();
        // split inside the first Hangul character
        assert!(decoder.push(&line[..8]).is_empty());
        assert_eq!(decoder.push(&line[8..]), vec!["안녕"]);
    }

    #[test]
    fn test_decoder_ignores_other_fields() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.push(b": keep-alive\nevent: message\nid: 7\ndata:\n");
        assert!(payloads.is_empty());
    }

    #[test]
    fn test_decoder_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("tail"));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_decode_payload_text() {
        let chunk = r#"{"candidates":[{"content":{"parts":[{"text":"Hel"}],"role":"model"}}]}"#;
        assert_eq!(decode_payload(chunk).unwrap().as_deref(), Some("Hel"));
    }

    #[test]
    fn test_decode_payload_without_text() {
        let chunk = r#"{"candidates":[{"content":{"parts":[]},"finishReason":"STOP"}]}"#;
        assert_eq!(decode_payload(chunk).unwrap(), None);
    }

    #[test]
    fn test_decode_payload_blocked() {
        let chunk = r#"{"promptFeedback":{"blockReason":"PROHIBITED_CONTENT"}}"#;
        match decode_payload(chunk) {
            Err(ProviderError::Blocked(reason)) => assert_eq!(reason, "PROHIBITED_CONTENT"),
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_payload_error_event() {
        let chunk = r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#;
        match decode_payload(chunk) {
            Err(ProviderError::Api { status, message }) => {
                assert_eq!(status, 429);
                assert_eq!(
                    message,
                    "Resource has been exhausted (e.g. check quota). (RESOURCE_EXHAUSTED)"
                );
            }
            other => panic!("expected Api, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_payload_malformed() {
        assert!(matches!(decode_payload("{not json"), Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_parse_stream_across_chunks() {
        let parts: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\n\ndata: {\"cand",
            )),
            Ok(Bytes::from_static(
                b"idates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]},\"finishReason\":\"STOP\"}]}\n\n",
            )),
        ];
        let chunks: Vec<_> = parse_sse_stream(futures::stream::iter(parts), 1000)
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_parse_stream_stops_after_error() {
        let parts: Vec<Result<Bytes, reqwest::Error>> = vec![Ok(Bytes::from_static(
            b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ok\"}]}}]}\n\
              data: {\"promptFeedback\":{\"blockReason\":\"SAFETY\"}}\n\
              data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"never\"}]}}]}\n",
        ))];
        let items: Vec<_> = parse_sse_stream(futures::stream::iter(parts), 1000).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "ok");
        assert!(matches!(items[1], Err(ProviderError::Blocked(_))));
    }

    #[tokio::test]
    async fn test_parse_stream_ends_on_error_event() {
        let parts: Vec<Result<Bytes, reqwest::Error>> = vec![Ok(Bytes::from_static(
            b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\n\n\
              data: {\"error\":{\"code\":500,\"message\":\"Internal error encountered.\"}}\n\n\
              data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]}}]}\n\n",
        ))];
        let items: Vec<_> = parse_sse_stream(futures::stream::iter(parts), 1000).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Hel");
        match &items[1] {
            Err(ProviderError::Api { status, message }) => {
                assert_eq!(*status, 500);
                assert_eq!(message, "Internal error encountered.");
            }
            other => panic!("expected Api, got {:?}", other),
        }
    }
}
