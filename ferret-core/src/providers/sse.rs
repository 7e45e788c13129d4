//! Server-sent events reader shared by the streaming backends.

use super::TextStream;
use crate::error::LlmError;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// One parsed SSE line.
#[derive(Debug, PartialEq)]
pub(crate) enum SseLine {
    Data(Value),
    Done,
    Skip,
}

/// Parse a single SSE line. Comments, blank lines, non-data fields and
/// undecodable payloads are skipped.
pub(crate) fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str(data) {
        Ok(value) => SseLine::Data(value),
        Err(_) => SseLine::Skip,
    }
}

/// Turn an SSE response body into a text stream.
///
/// `extract` pulls the text delta out of each event payload. The body is read
/// on a spawned task; dropping the stream stops the reader at its next send.
pub(crate) fn text_stream<F>(response: reqwest::Response, extract: F) -> TextStream
where
    F: Fn(&Value) -> Option<String> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<crate::error::Result<String>>(64);

    tokio::spawn(async move {
        let mut body = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let err = LlmError::Streaming {
                        message: format!("Failed to read stream: {e}"),
                    };
                    let _ = tx.send(Err(err.into())).await;
                    return;
                }
            };
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                match parse_sse_line(&String::from_utf8_lossy(&line)) {
                    SseLine::Done => return,
                    SseLine::Data(value) => {
                        if let Some(text) = extract(&value)
                            && !text.is_empty()
                            && tx.send(Ok(text)).await.is_err()
                        {
                            return;
                        }
                    }
                    SseLine::Skip => {}
                }
            }
        }

        if let SseLine::Data(value) = parse_sse_line(&String::from_utf8_lossy(&buffer))
            && let Some(text) = extract(&value)
            && !text.is_empty()
        {
            let _ = tx.send(Ok(text)).await;
        }
    });

    ReceiverStream::new(rx).boxed()
}
