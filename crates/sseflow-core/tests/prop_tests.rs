use proptest::prelude::*;
use serde_json::Value;

use sseflow_core::event::MessageEvent;
use sseflow_core::parser::{ChunkParser, parse_record};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Record {
    event: Option<String>,
    id: Option<String>,
    data: Vec<String>,
}

fn record_strategy() -> impl Strategy<Value = Record> {
    (
        proptest::option::of("[a-z]{1,8}"),
        proptest::option::of("[0-9]{1,4}"),
        proptest::collection::vec("[a-z0-9{}\"]{1,8}", 1..4),
    )
        .prop_map(|(event, id, data)| Record { event, id, data })
}

fn terminator_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("\n"), Just("\r\n"), Just("\r")]
}

fn render(records: &[Record], eol: &str) -> String {
    let mut out = String::new();
    for r in records {
        if let Some(event) = &r.event {
            out.push_str(&format!("event: {event}{eol}"));
        }
        if let Some(id) = &r.id {
            out.push_str(&format!("id: {id}{eol}"));
        }
        for d in &r.data {
            out.push_str(&format!("data: {d}{eol}"));
        }
        out.push_str(eol);
    }
    out
}

/// Split `text` at the given (ASCII) offsets.
fn split_at(text: &str, cuts: &[usize]) -> Vec<String> {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (text.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for cut in cuts {
        chunks.push(text[start..cut].to_string());
        start = cut;
    }
    chunks.push(text[start..].to_string());
    chunks
}

fn parse_all(chunks: &[String]) -> Vec<MessageEvent> {
    let mut parser = ChunkParser::new();
    let mut events: Vec<MessageEvent> = chunks.iter().flat_map(|c| parser.feed(c)).collect();
    events.extend(parser.finish());
    events
}

// ---------------------------------------------------------------------------
// Property-based tests
// ---------------------------------------------------------------------------

proptest! {
    // 1. Chunk boundaries never change the parsed events.
    #[test]
    fn chunking_is_invisible(
        records in proptest::collection::vec(record_strategy(), 1..6),
        eol in terminator_strategy(),
        cuts in proptest::collection::vec(any::<usize>(), 0..12),
    ) {
        let wire = render(&records, eol);
        let whole = parse_all(&[wire.clone()]);
        let chunked = parse_all(&split_at(&wire, &cuts));
        prop_assert_eq!(whole, chunked);
    }

    // 2. Every rendered record comes back with its fields intact.
    #[test]
    fn records_roundtrip_through_parser(
        records in proptest::collection::vec(record_strategy(), 1..6),
        eol in terminator_strategy(),
    ) {
        let events = parse_all(&[render(&records, eol)]);
        prop_assert_eq!(events.len(), records.len());
        for (event, record) in events.iter().zip(&records) {
            let expected_type = record.event.clone().unwrap_or_else(|| "message".into());
            prop_assert_eq!(&event.event_type, &expected_type);
            prop_assert_eq!(&event.id, &record.id);
            prop_assert_eq!(&event.data, &Value::String(record.data.concat()));
        }
    }

    // 3. Progress never exceeds the text observed.
    #[test]
    fn progress_matches_observed_text(
        records in proptest::collection::vec(record_strategy(), 0..4),
        cuts in proptest::collection::vec(any::<usize>(), 0..8),
    ) {
        let wire = render(&records, "\n");
        let mut parser = ChunkParser::new();
        let mut observed = 0;
        for chunk in split_at(&wire, &cuts) {
            parser.feed(&chunk);
            observed += chunk.chars().count();
            prop_assert!(parser.progress() <= observed);
        }
        prop_assert_eq!(parser.progress(), wire.chars().count());
    }

    // 4. The final record survives without a trailing blank line.
    #[test]
    fn unterminated_tail_is_flushed(
        records in proptest::collection::vec(record_strategy(), 1..4),
    ) {
        let mut wire = render(&records, "\n");
        // Drop the final blank line.
        wire.pop();
        let events = parse_all(&[wire]);
        prop_assert_eq!(events.len(), records.len());
    }

    // 5. Comment lines never contribute to a record.
    #[test]
    fn comments_are_ignored(comment in "[ -~]{0,20}", data in "[a-z]{1,8}") {
        let text = format!(":{comment}\ndata: {data}\n:{comment}");
        let record = parse_record(&text).unwrap();
        prop_assert_eq!(record.data, data);
        prop_assert_eq!(record.event, "message");
    }
}
