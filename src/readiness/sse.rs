//! Minimal `text/event-stream` decoder.
//!
//! Only `data:` fields matter here.  Bytes arrive in arbitrary chunks, so a
//! partial line (possibly a partial UTF-8 sequence) is kept until its
//! newline shows up.

/// Incremental decoder yielding one payload per complete event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the payloads of every event it completed.
    /// Multi-line `data:` fields are joined with `\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data
                    .push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // Comments (`:`) and other fields (`event:`, `id:`, `retry:`)
            // are ignored.
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_event() {
        let mut d = SseDecoder::new();
        assert_eq!(d.push(b"data: {\"status\":\"ready\"}\n\n"), vec![r#"{"status":"ready"}"#]);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut d = SseDecoder::new();
        assert!(d.push(b"data: {\"sta").is_empty());
        assert!(d.push(b"tus\":\"idle\"}\n").is_empty());
        assert_eq!(d.push(b"\n"), vec![r#"{"status":"idle"}"#]);
    }

    #[test]
    fn several_events_in_one_chunk() {
        let mut d = SseDecoder::new();
        let out = d.push(b"data: a\n\ndata: b\n\n");
        assert_eq!(out, vec!["a", "b"]);
    }

    #[test]
    fn crlf_and_comments() {
        let mut d = SseDecoder::new();
        let out = d.push(b": keepalive\r\nevent: progress\r\ndata: x\r\n\r\n");
        assert_eq!(out, vec!["x"]);
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut d = SseDecoder::new();
        assert_eq!(d.push(b"data: one\ndata: two\n\n"), vec!["one\ntwo"]);
    }

    #[test]
    fn split_utf8_sequence_survives() {
        let mut d = SseDecoder::new();
        let bytes = "data: caf\u{e9}\n\n".as_bytes();
        let (a, b) = bytes.split_at(10); // inside the two-byte é
        assert!(d.push(a).is_empty());
        assert_eq!(d.push(b), vec!["caf\u{e9}"]);
    }
}
