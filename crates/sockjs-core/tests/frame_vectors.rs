//! Frame codec vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use sockjs_core::protocol::frame::{close_frame, data_frame, quote, quote_for_script};

use vector_loader::{load, FrameVector};

#[test]
fn frame_vectors() {
    let files = [
        "data_single.json",
        "data_ordered.json",
        "data_quotes.json",
        "data_controls.json",
        "data_unsafe_ranges.json",
        "data_safe_unicode.json",
        "close_normal.json",
        "close_another_connection.json",
        "close_escaped_reason.json",
    ];

    for f in files {
        let v: FrameVector = load(f);
        let rendered = match v.kind.as_str() {
            "data" => data_frame(&v.messages),
            "close" => close_frame(v.code, &v.reason),
            other => panic!("unsupported vector kind: {other}"),
        };
        assert_eq!(rendered, v.expect_frame, "vector={}", v.description);

        // whatever the escaping, a conforming JSON parser gets the input back
        let body = &rendered[1..];
        match v.kind.as_str() {
            "data" => {
                let back: Vec<String> = serde_json::from_str(body).unwrap();
                assert_eq!(back, v.messages, "vector={}", v.description);
            }
            _ => {
                let back: (u32, String) = serde_json::from_str(body).unwrap();
                assert_eq!(back, (v.code, v.reason.clone()), "vector={}", v.description);
            }
        }
    }
}

#[test]
fn every_unsafe_code_point_is_escaped_and_recovered() {
    let ranges = [
        0x0000u32..=0x001F,
        0x200C..=0x200F,
        0x2028..=0x202F,
        0x2060..=0x206F,
        0xFFF0..=0xFFFF,
    ];
    for range in ranges {
        for cp in range {
            let c = char::from_u32(cp).unwrap();
            let msg = format!("x{c}y");
            let quoted = quote(&msg);
            assert_eq!(quoted, format!("\"x\\u{cp:04x}y\""), "cp={cp:#06x}");
            assert!(quoted.is_ascii(), "cp={cp:#06x}");
            let back: String = serde_json::from_str(&quoted).unwrap();
            assert_eq!(back, msg, "cp={cp:#06x}");
        }
    }
}

#[test]
fn script_quoting_cannot_end_the_script_element() {
    let v: FrameVector = load("script_close_tag.json");
    assert_eq!(v.kind, "script");
    let frame = data_frame(&v.messages);
    let quoted = quote_for_script(&frame);
    assert_eq!(quoted, v.expect_frame, "vector={}", v.description);
    assert!(!quoted.contains('<') && !quoted.contains('>') && !quoted.contains('&'));

    // the page's JS parser still sees the original frame
    let back: String = serde_json::from_str(&quoted).unwrap();
    assert_eq!(back, frame);

    // plain quoting leaves them alone
    assert_eq!(quote("<&>"), "\"<&>\"");
}
