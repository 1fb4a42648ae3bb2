//! Line-oriented response streaming shared by the SSE and NDJSON providers.
//!
//! Network chunks do not respect line boundaries, so bytes are buffered by
//! [`LineDecoder`] until a full line is available. Splitting happens on raw
//! bytes, which keeps multi-byte UTF-8 characters intact across chunks.

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::debug;

use super::{ProviderError, TextStream};

/// Fragments buffered between the reader task and the consumer.
const STREAM_CHANNEL_CAPACITY: usize = 32;

/// What one decoded line means to the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// A text fragment to forward.
    Text(String),
    /// Keep-alive, metadata, or an empty delta.
    Skip,
    /// The provider signalled the end of the response.
    Done,
}

/// Incremental newline splitter.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Feed a chunk; returns every line completed by it (without terminators).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(decode_line(&line));
        }
        lines
    }

    /// Flush a trailing line that had no terminator.
    pub fn finish(&mut self) -> Vec<String> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        let rest = std::mem::take(&mut self.buffer);
        vec![decode_line(&rest)]
    }
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(|c: char| c == '\n' || c == '\r')
        .to_owned()
}

/// Read `response` line by line on a background task and expose the text
/// fragments as a [`TextStream`].
///
/// The task stops at the first `Done` line, the first error (which is
/// forwarded), or as soon as the consumer drops the stream.
pub fn spawn_line_stream<F>(response: reqwest::Response, parse_line: F) -> TextStream
where
    F: Fn(&str) -> Result<LineOutcome, ProviderError> + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    let mut body = Box::pin(response.bytes_stream());

    tokio::spawn(async move {
        let mut decoder = LineDecoder::default();
        loop {
            let next = tokio::select! {
                next = body.next() => next,
                () = tx.closed() => {
                    debug!("stream consumer dropped, abandoning response");
                    return;
                }
            };
            let Some(chunk) = next else {
                break;
            };
            let lines = match chunk {
                Ok(bytes) => decoder.push(&bytes),
                Err(e) => {
                    let _ = tx.send(Err(ProviderError::Request(e))).await;
                    return;
                }
            };
            if !forward_lines(&tx, &parse_line, lines).await {
                return;
            }
        }
        let _ = forward_lines(&tx, &parse_line, decoder.finish()).await;
    });

    Box::pin(ReceiverStream::new(rx))
}

/// Returns `false` once the stream should stop.
async fn forward_lines<F>(
    tx: &mpsc::Sender<Result<String, ProviderError>>,
    parse_line: &F,
    lines: Vec<String>,
) -> bool
where
    F: Fn(&str) -> Result<LineOutcome, ProviderError>,
{
    for line in lines {
        match parse_line(&line) {
            Ok(LineOutcome::Text(text)) => {
                if tx.send(Ok(text)).await.is_err() {
                    debug!("stream consumer dropped, abandoning response");
                    return false;
                }
            }
            Ok(LineOutcome::Skip) => {}
            Ok(LineOutcome::Done) => return false,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return false;
            }
        }
    }
    true
}
