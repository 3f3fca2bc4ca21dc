//! Property-based tests for stream decoding
//!
//! The decoded line sequence must not depend on where the network happened
//! to split the body.

use super::classify::classify_line;
use super::frame::FrameDecoder;
use proptest::prelude::*;

fn decode_with_splits(body: &[u8], cuts: &[usize]) -> Vec<String> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (body.len() + 1)).collect();
    points.sort_unstable();
    points.dedup();

    let mut decoder = FrameDecoder::new();
    let mut lines = Vec::new();
    let mut start = 0;
    for point in points {
        lines.extend(decoder.push(&body[start..point]));
        start = point;
    }
    lines.extend(decoder.push(&body[start..]));
    lines.extend(decoder.finish());
    lines
}

fn arb_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,20}",
        "[a-zé→ü ]{1,12}".prop_map(|s| format!("data: {{\"type\":\"token\",\"content\":\"{s}\"}}")),
        Just("data: [DONE]".to_string()),
        Just(": ping".to_string()),
        Just(String::new()),
    ]
}

fn arb_body() -> impl Strategy<Value = (String, bool)> {
    (
        proptest::collection::vec(arb_line(), 0..12),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(lines, crlf, trailing_newline)| {
            let sep = if crlf { "\r\n" } else { "\n" };
            let mut body = lines.join(sep);
            if trailing_newline && !body.is_empty() {
                body.push_str(sep);
            }
            (body, crlf)
        })
}

proptest! {
    #[test]
    fn chunking_does_not_change_lines(
        (body, _crlf) in arb_body(),
        cuts in proptest::collection::vec(any::<usize>(), 0..16),
    ) {
        let whole = decode_with_splits(body.as_bytes(), &[]);
        let split = decode_with_splits(body.as_bytes(), &cuts);
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn byte_at_a_time_matches_single_chunk((body, _crlf) in arb_body()) {
        let every_byte: Vec<usize> = (0..=body.len()).collect();
        let whole = decode_with_splits(body.as_bytes(), &[]);
        let split = decode_with_splits(body.as_bytes(), &every_byte);
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn decoded_lines_never_contain_terminators((body, _crlf) in arb_body(), cuts in proptest::collection::vec(any::<usize>(), 0..8)) {
        for line in decode_with_splits(body.as_bytes(), &cuts) {
            prop_assert!(!line.contains('\n'));
            prop_assert!(!line.ends_with('\r'));
        }
    }

    #[test]
    fn classification_is_chunking_invariant(
        (body, _crlf) in arb_body(),
        cuts in proptest::collection::vec(any::<usize>(), 0..16),
    ) {
        let whole: Vec<_> = decode_with_splits(body.as_bytes(), &[])
            .iter()
            .filter_map(|l| classify_line(l))
            .collect();
        let split: Vec<_> = decode_with_splits(body.as_bytes(), &cuts)
            .iter()
            .filter_map(|l| classify_line(l))
            .collect();
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn classify_never_panics(line in ".{0,64}") {
        let _ = classify_line(&line);
    }
}
