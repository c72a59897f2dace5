//! Newline framing over an arbitrarily fragmented byte stream

/// Incremental frame decoder.
///
/// Records are separated by a single `\n`; a record is emitted only once its
/// terminating newline has been observed. The carry-over buffer of the last
/// incomplete line is the only state, which makes decoding invariant under
/// re-fragmentation of the same byte stream. Within a complete line, only
/// `data:`-prefixed lines carry a payload; the prefix and surrounding
/// whitespace are stripped, and blank payloads are dropped along with
/// keep-alive lines.
///
/// Buffering is byte-level and UTF-8 is decoded per complete line, so a
/// multi-byte character split across fragments never corrupts a record.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    carry: Vec<u8>,
}

const PAYLOAD_MARKER: &str = "data:";

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment, returning every record completed by it.
    pub fn feed(&mut self, fragment: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(fragment);

        let mut records = Vec::new();
        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.carry.drain(..=pos).collect();
            line.pop(); // the newline itself

            let line = String::from_utf8_lossy(&line);
            let Some(payload) = line.trim().strip_prefix(PAYLOAD_MARKER) else {
                continue;
            };
            let payload = payload.trim();
            if payload.is_empty() {
                continue;
            }
            records.push(payload.to_string());
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_whole(input: &str) -> Vec<String> {
        FrameDecoder::new().feed(input.as_bytes())
    }

    #[test]
    fn emits_one_record_per_data_line() {
        let records = decode_whole("data: one\ndata: two\n");
        assert_eq!(records, vec!["one", "two"]);
    }

    #[test]
    fn holds_back_incomplete_record_until_newline() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: par").is_empty());
        assert_eq!(decoder.feed(b"tial\n"), vec!["partial"]);
    }

    #[test]
    fn split_exactly_at_the_newline_byte() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: x").is_empty());
        assert_eq!(decoder.feed(b"\n"), vec!["x"]);
    }

    #[test]
    fn one_fragment_may_complete_multiple_records() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: a").is_empty());
        assert_eq!(decoder.feed(b"\ndata: b\ndata: c\n"), vec!["a", "b", "c"]);
    }

    #[test]
    fn ignores_lines_without_the_marker() {
        assert!(decode_whole("keepalive\n").is_empty());
        assert!(decode_whole("\n\n").is_empty());
    }

    #[test]
    fn ignores_empty_payloads() {
        assert!(decode_whole("data: \n").is_empty());
        assert!(decode_whole("data:\n").is_empty());
    }

    #[test]
    fn tolerates_carriage_returns() {
        assert_eq!(decode_whole("data: one\r\n"), vec!["one"]);
    }

    #[test]
    fn strips_whitespace_around_the_payload() {
        assert_eq!(decode_whole("  data:   padded  \n"), vec!["padded"]);
    }

    #[test]
    fn multibyte_character_split_across_fragments() {
        let bytes = "data: héllo\n".as_bytes();
        // Split inside the two-byte 'é'.
        let cut = bytes.iter().position(|&b| b > 0x7f).unwrap() + 1;
        let (head, tail) = bytes.split_at(cut);

        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(head).is_empty());
        assert_eq!(decoder.feed(tail), vec!["héllo"]);
    }

    #[test]
    fn trailing_bytes_without_newline_are_never_emitted() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: never terminated").is_empty());
    }
}
