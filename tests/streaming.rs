use bytes::Bytes;
use serde_json::Value;
use venice_relay::translate::stream::StreamTranslator;

fn translator() -> StreamTranslator {
    StreamTranslator::new("model-x".to_string(), "msg_test".to_string())
}

fn feed_all(stream: &str) -> Vec<Bytes> {
    let mut tr = translator();
    let mut out = Vec::new();
    tr.feed(stream.as_bytes(), &mut out);
    out
}

fn decode(frame: &Bytes) -> (String, Value) {
    let text = std::str::from_utf8(frame).expect("utf8 frame");
    let mut event = None;
    let mut data = None;
    for line in text.lines() {
        if let Some(name) = line.strip_prefix("event: ") {
            event = Some(name.to_string());
        } else if let Some(payload) = line.strip_prefix("data: ") {
            data = Some(serde_json::from_str(payload).expect("frame json"));
        }
    }
    (event.expect("event line"), data.expect("data line"))
}

fn names(frames: &[Bytes]) -> Vec<String> {
    frames.iter().map(|f| decode(f).0).collect()
}

const SIMPLE_TEXT: &str = concat!(
    "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
    "data: [DONE]\n\n",
);

#[test]
fn simple_text_stream_emits_exactly_the_expected_sequence() {
    let frames = feed_all(SIMPLE_TEXT);
    assert_eq!(
        names(&frames),
        [
            "message_start",
            "content_block_start",
            "content_block_delta",
            "content_block_stop",
            "message_delta",
            "message_stop",
        ]
    );
    let (_, start) = decode(&frames[0]);
    assert_eq!(start["message"]["id"], "msg_test");
    assert_eq!(start["message"]["model"], "model-x");
    assert!(start["message"]["stop_reason"].is_null());
    let (_, delta) = decode(&frames[2]);
    assert_eq!(delta["delta"]["text"], "Hi");
    let (_, message_delta) = decode(&frames[4]);
    assert_eq!(message_delta["delta"]["stop_reason"], "end_turn");
    assert_eq!(message_delta["usage"]["output_tokens"], 0);
}

#[test]
fn output_is_invariant_under_any_chunk_split() {
    let whole = feed_all(SIMPLE_TEXT);
    let bytes = SIMPLE_TEXT.as_bytes();
    for split in 0..=bytes.len() {
        let mut tr = translator();
        let mut out = Vec::new();
        tr.feed(&bytes[..split], &mut out);
        tr.feed(&bytes[split..], &mut out);
        assert_eq!(out, whole, "split at {split}");
    }
}

#[test]
fn output_is_invariant_under_byte_at_a_time_delivery() {
    let whole = feed_all(SIMPLE_TEXT);
    let mut tr = translator();
    let mut out = Vec::new();
    for byte in SIMPLE_TEXT.as_bytes() {
        tr.feed(std::slice::from_ref(byte), &mut out);
    }
    assert_eq!(out, whole);
}

#[test]
fn block_indices_are_monotonic_with_matched_start_and_stop() {
    let stream = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Let me check.\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"id\":\"call_a\",\"function\":{\"name\":\"search\",\"arguments\":\"\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"function\":{\"arguments\":\"{\\\"q\\\":\\\"rust\\\"}\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Found it.\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    );
    let frames = feed_all(stream);

    let mut open = Vec::new();
    let mut last_started: Option<i64> = None;
    for frame in &frames {
        let (name, json) = decode(frame);
        match name.as_str() {
            "content_block_start" => {
                let index = json["index"].as_i64().expect("index");
                if let Some(prev) = last_started {
                    assert_eq!(index, prev + 1, "indices must increase by one");
                }
                last_started = Some(index);
                open.push(index);
            }
            "content_block_delta" => {
                assert_eq!(Some(&json["index"].as_i64().expect("index")), open.last());
            }
            "content_block_stop" => {
                let index = json["index"].as_i64().expect("index");
                assert_eq!(open.pop(), Some(index), "stop must match the open block");
            }
            _ => {}
        }
    }
    assert!(open.is_empty(), "every started block must be stopped");
    assert_eq!(last_started, Some(2));
}

#[test]
fn tool_arguments_concatenate_to_the_original_json() {
    let stream = concat!(
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"id\":\"call_b\",\"function\":{\"name\":\"calc\",\"arguments\":\"\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"function\":{\"arguments\":\"{\\\"a\\\":1,\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"function\":{\"arguments\":\"\\\"b\\\":2}\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
    );
    let frames = feed_all(stream);
    let reconstructed: String = frames
        .iter()
        .filter_map(|frame| {
            let (name, json) = decode(frame);
            if name == "content_block_delta" {
                json["delta"]["partial_json"].as_str().map(str::to_string)
            } else {
                None
            }
        })
        .collect();
    let parsed: Value = serde_json::from_str(&reconstructed).expect("reconstructed arguments");
    assert_eq!(parsed, serde_json::json!({ "a": 1, "b": 2 }));
}

#[test]
fn second_tool_call_closes_block_without_reemitting_arguments() {
    // The first call's arguments went out as they arrived; opening the
    // second call must stop block 0 without another input_json_delta
    // repeating them.
    let stream = concat!(
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"id\":\"call_a\",\"function\":{\"name\":\"first\",\"arguments\":\"\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"function\":{\"arguments\":\"{\\\"x\\\":1}\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"id\":\"call_b\",\"function\":{\"name\":\"second\",\"arguments\":\"{\\\"y\\\":2}\"}}]}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
    );
    let frames = feed_all(stream);
    assert_eq!(
        names(&frames),
        [
            "message_start",
            "content_block_start",
            "content_block_delta",
            "content_block_stop",
            "content_block_start",
            "content_block_delta",
            "content_block_stop",
            "message_delta",
            "message_stop",
        ]
    );

    let mut per_block: Vec<String> = vec![String::new(), String::new()];
    for frame in &frames {
        let (name, json) = decode(frame);
        if name == "content_block_delta" {
            let index = json["index"].as_u64().expect("index") as usize;
            per_block[index].push_str(json["delta"]["partial_json"].as_str().expect("fragment"));
        }
    }
    assert_eq!(
        serde_json::from_str::<Value>(&per_block[0]).expect("first arguments"),
        serde_json::json!({ "x": 1 })
    );
    assert_eq!(
        serde_json::from_str::<Value>(&per_block[1]).expect("second arguments"),
        serde_json::json!({ "y": 2 })
    );

    let (_, first) = decode(&frames[1]);
    assert_eq!(first["content_block"]["name"], "first");
    let (_, second) = decode(&frames[4]);
    assert_eq!(second["content_block"]["name"], "second");
    assert_eq!(second["index"], 1);
}

#[test]
fn terminating_triple_is_emitted_once_even_with_trailing_done() {
    // finish_reason arrives first, [DONE] follows; the second
    // terminator must not produce more events.
    let frames = feed_all(concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
        "data: [DONE]\n\n",
    ));
    let names = names(&frames);
    assert_eq!(names.iter().filter(|n| *n == "message_delta").count(), 1);
    assert_eq!(names.iter().filter(|n| *n == "message_stop").count(), 1);
}

#[test]
fn feeding_after_termination_is_a_no_op() {
    let mut tr = translator();
    let mut out = Vec::new();
    tr.feed(SIMPLE_TEXT.as_bytes(), &mut out);
    assert!(tr.ended());
    let len = out.len();
    tr.feed(
        b"data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n",
        &mut out,
    );
    tr.finish("end_turn", &mut out);
    tr.fail("api_error", "late failure", &mut out);
    assert_eq!(out.len(), len);
}

#[test]
fn length_finish_reason_maps_to_max_tokens() {
    let frames = feed_all(concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"length\"}]}\n\n",
    ));
    let (_, message_delta) = decode(&frames[frames.len() - 2]);
    assert_eq!(message_delta["delta"]["stop_reason"], "max_tokens");
}

#[test]
fn mid_stream_failure_emits_error_and_stops() {
    let mut tr = translator();
    let mut out = Vec::new();
    tr.feed(
        b"data: {\"choices\":[{\"delta\":{\"content\":\"hal\"}}]}\n\n",
        &mut out,
    );
    tr.fail("api_error", "connection reset", &mut out);
    assert!(tr.ended());
    let names = names(&out);
    assert_eq!(names.last().map(String::as_str), Some("error"));
    assert!(!names.contains(&"message_stop".to_string()));
    let (_, error) = decode(out.last().expect("frame"));
    assert_eq!(error["error"]["type"], "api_error");
    assert_eq!(error["error"]["message"], "connection reset");
}

#[test]
fn frames_are_well_formed_sse() {
    for frame in feed_all(SIMPLE_TEXT) {
        let text = std::str::from_utf8(&frame).expect("utf8");
        assert!(text.starts_with("event: "));
        assert!(text.ends_with("\n\n"));
        assert_eq!(text.matches("\ndata: ").count(), 1);
        let (name, json) = decode(&frame);
        assert_eq!(json["type"], name, "event name must match the type tag");
    }
}
