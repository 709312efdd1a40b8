//! Outbound frame codec.
//!
//! Frame kinds and their textual form:
//! - open: `o`
//! - heartbeat: `h`
//! - data: `a["m1","m2",...]`
//! - close: `c[<code>,"<reason>"]`
//!
//! Strings are JSON-quoted by [`quote`], which additionally escapes code points
//! that some browser JSON parsers mishandle. Every transport must carry these
//! bytes unchanged inside its own wrapper.

use std::fmt::Write;

/// Open frame, sent once when the first receiver attaches.
pub const OPEN_FRAME: &str = "o";
/// Heartbeat frame.
pub const HEARTBEAT_FRAME: &str = "h";

/// Close code sent when the server ends a session without an explicit reason.
pub const CLOSE_GO_AWAY: u32 = 3000;
pub const CLOSE_GO_AWAY_REASON: &str = "Go away!";

/// Close code sent to a second receiver racing an already attached one.
pub const CLOSE_ANOTHER_CONNECTION: u32 = 2010;
pub const CLOSE_ANOTHER_CONNECTION_REASON: &str = "Another connection still open";

/// Frame kind, recovered from rendered frame text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Open,
    Heartbeat,
    Data,
    Close,
}

/// Classify a rendered frame. Returns `None` for anything that is not a
/// well-formed frame prefix.
pub fn frame_kind(frame: &str) -> Option<FrameKind> {
    match frame {
        OPEN_FRAME => Some(FrameKind::Open),
        HEARTBEAT_FRAME => Some(FrameKind::Heartbeat),
        f if f.starts_with("a[") => Some(FrameKind::Data),
        f if f.starts_with("c[") => Some(FrameKind::Close),
        _ => None,
    }
}

/// Render a data frame carrying `messages` in order.
pub fn data_frame<S: AsRef<str>>(messages: &[S]) -> String {
    let mut out = String::with_capacity(2 + messages.iter().map(|m| m.as_ref().len() + 3).sum::<usize>());
    out.push_str("a[");
    for (i, m) in messages.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        quote_into(&mut out, m.as_ref());
    }
    out.push(']');
    out
}

/// Render a close frame.
pub fn close_frame(code: u32, reason: &str) -> String {
    let mut out = String::with_capacity(reason.len() + 16);
    let _ = write!(out, "c[{code},");
    quote_into(&mut out, reason);
    out.push(']');
    out
}

/// Parse a rendered close frame back into `(code, reason)`.
///
/// Used by transports without an envelope, which translate the close frame
/// into their native close message.
pub fn parse_close_frame(frame: &str) -> Option<(u32, String)> {
    let body = frame.strip_prefix('c')?;
    serde_json::from_str::<(u32, String)>(body).ok()
}

/// JSON-quote `s`, escaping every code point in the unsafe ranges as `\uXXXX`.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    quote_into(&mut out, s);
    out
}

/// Like [`quote`], but also escapes `<`, `>` and `&` so the result can sit
/// inside an HTML `<script>` element without ending it.
pub fn quote_for_script(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    quote_with(&mut out, s, true);
    out
}

fn quote_into(out: &mut String, s: &str) {
    quote_with(out, s, false);
}

fn quote_with(out: &mut String, s: &str, script: bool) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if is_unsafe(c) || (script && matches!(c, '<' | '>' | '&')) => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Code points that must never reach a browser unescaped.
fn is_unsafe(c: char) -> bool {
    matches!(
        u32::from(c),
        0x0000..=0x001F | 0x200C..=0x200F | 0x2028..=0x202F | 0x2060..=0x206F | 0xFFF0..=0xFFFF
    )
}
