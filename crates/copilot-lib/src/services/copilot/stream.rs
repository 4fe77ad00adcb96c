// Response stream helpers for the copilot
// Feature: AI Copilot orchestration core
//
// Tool handlers hand back a byte stream. The orchestrator decodes it chunk by
// chunk; a multi-byte character split across two chunks is held back until
// the rest of it arrives.

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

use super::error::CopilotResult;

/// Streamed response body of a tool handler, UTF-8 in emission order
pub type TextStream = Pin<Box<dyn Stream<Item = CopilotResult<Bytes>> + Send>>;

/// Build a stream that yields the given text chunks in order
pub fn stream_from_chunks<I, S>(chunks: I) -> TextStream
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let items: Vec<CopilotResult<Bytes>> = chunks
        .into_iter()
        .map(|c| Ok(Bytes::from(c.into())))
        .collect();
    Box::pin(futures::stream::iter(items))
}

/// Incremental UTF-8 decoder
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk. Returns the text that is complete so far;
    /// an unfinished trailing sequence is kept for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut output = String::new();
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    output.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    output.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match err.error_len() {
                        Some(bad) => {
                            output.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + bad;
                        }
                        // Incomplete sequence at the end, wait for more bytes
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        output
    }

    /// Flush whatever is left at end of stream
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_decode_ascii() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(b"hello "), "hello ");
        assert_eq!(decoder.decode(b"world"), "world");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_decode_split_multibyte() {
        let text = "caf\u{e9} \u{1F600}";
        let bytes = text.as_bytes();
        let mut decoder = Utf8ChunkDecoder::new();

        let mut out = String::new();
        for byte in bytes {
            out.push_str(&decoder.decode(std::slice::from_ref(byte)));
        }
        out.push_str(&decoder.finish());

        assert_eq!(out, text);
    }

    #[test]
    fn test_decode_invalid_byte() {
        let mut decoder = Utf8ChunkDecoder::new();
        let out = decoder.decode(&[b'a', 0xFF, b'b']);
        assert_eq!(out, "a\u{FFFD}b");
    }

    #[test]
    fn test_finish_flushes_truncated_sequence() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(&[0xE2, 0x82]), "");
        assert!(decoder.has_pending());
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert!(!decoder.has_pending());
    }

    #[tokio::test]
    async fn test_stream_from_chunks_order() {
        let stream = stream_from_chunks(vec!["a", "b", "c"]);
        let collected: Vec<Bytes> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(collected, vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")]);
    }
}
