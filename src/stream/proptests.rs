//! Property-based tests for the frame decoder
//!
//! The load-bearing property is fragmentation invariance: for any byte stream
//! and any way of partitioning it into fragments, decoding the fragments in
//! order yields exactly the records produced by decoding the stream whole.

use super::{classify, FrameDecoder};
use proptest::prelude::*;

/// One logical line of wire input, newline-terminated.
fn arb_line() -> impl Strategy<Value = String> {
    prop_oneof![
        // Well-formed payload lines, including JSON-looking ones.
        "[a-zA-Z0-9 {}:\",._@-]{1,60}".prop_map(|p| format!("data: {p}\n")),
        // Payload without the space after the marker.
        "[a-zA-Z0-9]{1,20}".prop_map(|p| format!("data:{p}\n")),
        // Keep-alive noise and blank lines.
        Just("keepalive\n".to_string()),
        Just("\n".to_string()),
        Just("\r\n".to_string()),
        // Empty payloads, which must be dropped.
        Just("data:\n".to_string()),
        Just("data:   \n".to_string()),
        // Lines with a marker-like but wrong prefix.
        "[a-z]{1,8}".prop_map(|p| format!("meta: {p}\n")),
        // Non-ASCII content.
        Just("data: héllo wörld\n".to_string()),
    ]
}

/// A whole wire stream, possibly with a trailing unterminated line.
fn arb_stream() -> impl Strategy<Value = Vec<u8>> {
    (
        proptest::collection::vec(arb_line(), 0..12),
        proptest::option::of("[a-zA-Z0-9 ]{0,20}"),
    )
        .prop_map(|(lines, tail)| {
            let mut bytes: Vec<u8> = lines.concat().into_bytes();
            if let Some(tail) = tail {
                bytes.extend_from_slice(format!("data: {tail}").as_bytes());
            }
            bytes
        })
}

/// A stream together with sorted cut points partitioning it into fragments.
fn arb_stream_with_cuts() -> impl Strategy<Value = (Vec<u8>, Vec<usize>)> {
    arb_stream().prop_flat_map(|bytes| {
        let len = bytes.len();
        let cuts = proptest::collection::vec(0..=len, 0..16).prop_map(|mut cuts| {
            cuts.sort_unstable();
            cuts.dedup();
            cuts
        });
        (Just(bytes), cuts)
    })
}

fn decode_whole(bytes: &[u8]) -> Vec<String> {
    FrameDecoder::new().feed(bytes)
}

fn decode_fragments(bytes: &[u8], cuts: &[usize]) -> Vec<String> {
    let mut decoder = FrameDecoder::new();
    let mut records = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        records.extend(decoder.feed(&bytes[start..cut]));
        start = cut;
    }
    records.extend(decoder.feed(&bytes[start..]));
    records
}

proptest! {
    /// Any partition of the same bytes yields the same record sequence.
    #[test]
    fn fragmentation_invariance((bytes, cuts) in arb_stream_with_cuts()) {
        prop_assert_eq!(decode_fragments(&bytes, &cuts), decode_whole(&bytes));
    }

    /// Byte-at-a-time delivery is the worst-case fragmentation.
    #[test]
    fn byte_at_a_time_matches_whole(bytes in arb_stream()) {
        let cuts: Vec<usize> = (1..bytes.len()).collect();
        prop_assert_eq!(decode_fragments(&bytes, &cuts), decode_whole(&bytes));
    }

    /// Classification is a pure per-record function, so it commutes with
    /// fragmentation as well.
    #[test]
    fn classification_commutes_with_fragmentation((bytes, cuts) in arb_stream_with_cuts()) {
        let fragmented: Vec<_> = decode_fragments(&bytes, &cuts)
            .iter()
            .filter_map(|r| classify(r))
            .collect();
        let whole: Vec<_> = decode_whole(&bytes)
            .iter()
            .filter_map(|r| classify(r))
            .collect();
        prop_assert_eq!(fragmented, whole);
    }

    /// The decoder never invents records: the emitted sequence is exactly the
    /// trimmed payloads of the complete `data:` lines, in order.
    #[test]
    fn records_come_from_data_lines(bytes in arb_stream()) {
        let text = String::from_utf8(bytes.clone()).unwrap();
        let mut lines: Vec<&str> = text.split('\n').collect();
        // The segment after the last newline is unterminated and never emitted.
        lines.pop();
        let expected: Vec<String> = lines
            .iter()
            .filter_map(|line| line.trim().strip_prefix("data:"))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        prop_assert_eq!(decode_whole(&bytes), expected);
    }
}
