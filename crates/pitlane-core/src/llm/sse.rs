//! Line-oriented SSE scanning.

/// Parse a single SSE line into (key, value).
///
/// SSE format: `key: value\n`
pub fn parse_sse_line(line: &str) -> Option<(&str, &str)> {
    let colon_pos = line.find(':')?;
    Some((&line[..colon_pos], line[colon_pos + 1..].trim_start()))
}

/// Accumulates raw chunks and emits complete `data:` payloads.
///
/// Chunk boundaries fall anywhere, including mid-line; the buffer keeps
/// the trailing partial line until the newline arrives.
#[derive(Default)]
pub struct SseLineBuffer {
    pending: String,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the `data:` payloads completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));

        let mut payloads = Vec::new();
        while let Some(newline) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=newline).collect();
            let line = line.trim_end();
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            if let Some(("data", payload)) = parse_sse_line(line) {
                payloads.push(payload.to_string());
            }
        }
        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(parse_sse_line("data: {\"x\":1}"), Some(("data", "{\"x\":1}")));
        assert_eq!(parse_sse_line("event: done"), Some(("event", "done")));
        assert_eq!(parse_sse_line("no separator"), None);
    }

    #[test]
    fn test_reassembles_split_lines() {
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.push(b"data: hel").is_empty());
        assert_eq!(buffer.push(b"lo\ndata: world\n"), vec!["hello", "world"]);
    }

    #[test]
    fn test_skips_heartbeats_and_blank_lines() {
        let mut buffer = SseLineBuffer::new();
        let payloads = buffer.push(b": keep-alive\n\ndata: x\n\n");
        assert_eq!(payloads, vec!["x"]);
    }

    #[test]
    fn test_done_marker_passes_through() {
        let mut buffer = SseLineBuffer::new();
        assert_eq!(buffer.push(b"data: [DONE]\n"), vec!["[DONE]"]);
    }
}
