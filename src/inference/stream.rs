//! Newline-delimited JSON decoding for streamed generation responses.

use serde::Deserialize;

use crate::error::{AssistantError, Result};

/// One line of a streamed `/api/generate` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Splits a byte stream into lines and parses each complete line.
///
/// Bytes are buffered until a `\n` arrives, so multi-byte characters and
/// JSON objects may be split across network chunks.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    buffer: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<GenerateChunk>> {
        self.buffer.extend_from_slice(bytes);

        let mut chunks = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(chunk) = parse_line(&line[..line.len() - 1])? {
                chunks.push(chunk);
            }
        }
        Ok(chunks)
    }

    /// Parses whatever is left once the connection closes.
    pub fn finish(&mut self) -> Result<Option<GenerateChunk>> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Result<Option<GenerateChunk>> {
    if line.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(None);
    }
    serde_json::from_slice(line).map(Some).map_err(|e| {
        AssistantError::Inference(format!(
            "malformed stream chunk: {} (line={})",
            e,
            super::truncate_for_error(&String::from_utf8_lossy(line))
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_lines() {
        let mut decoder = ChunkDecoder::new();
        let chunks = decoder
            .push(b"{\"response\":\"Hel\",\"done\":false}\n{\"response\":\"lo\",\"done\":true}\n")
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].response, "Hel");
        assert!(!chunks[0].done);
        assert_eq!(chunks[1].response, "lo");
        assert!(chunks[1].done);
        assert_eq!(decoder.finish().unwrap(), None);
    }

    #[test]
    fn test_line_split_across_pushes() {
        let mut decoder = ChunkDecoder::new();
        assert!(decoder.push(b"{\"respon").unwrap().is_empty());
        assert!(decoder.push(b"se\":\"caf\xc3").unwrap().is_empty());

        let chunks = decoder.push(b"\xa9\"}\n").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].response, "café");
        assert!(!chunks[0].done);
    }

    #[test]
    fn test_missing_fields_default() {
        let mut decoder = ChunkDecoder::new();
        let chunks = decoder.push(b"{\"model\":\"m\",\"done\":true}\n\n").unwrap();
        assert_eq!(chunks, vec![GenerateChunk { response: String::new(), done: true }]);
    }

    #[test]
    fn test_trailing_line_without_newline() {
        let mut decoder = ChunkDecoder::new();
        assert!(decoder.push(b"{\"response\":\"end\"}").unwrap().is_empty());
        let last = decoder.finish().unwrap().unwrap();
        assert_eq!(last.response, "end");
    }

    #[test]
    fn test_malformed_line_is_error() {
        let mut decoder = ChunkDecoder::new();
        let err = decoder.push(b"<html>oops</html>\n").unwrap_err();
        assert!(matches!(err, AssistantError::Inference(_)));
    }
}
