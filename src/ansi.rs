//! Removal of terminal control sequences from remote output.
//!
//! Session output is shown as plain text, so every escape sequence is
//! dropped: OSC strings (window titles and the like), CSI sequences
//! (`ESC [ parameters intermediates final`) and the shorter
//! `ESC intermediates final` escapes such as `ESC ( B` or `ESC M`. The literal
//! clear-screen pair `ESC[H ESC[J` is removed before the general pass.

use std::sync::LazyLock;

use regex::Regex;

/// Cursor home followed by erase display.
pub const CLEAR_SCREEN: &str = "\x1b[H\x1b[J";

/// Longest unterminated escape tail carried over to the next chunk.
const MAX_CARRY: usize = 256;

static OSC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B\][^\x07\x1B]*(?:\x07|\x1B\\)").expect("valid OSC regex"));

static ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B(?:\[[0-?]*[ -/]*[@-~]|[ -/]*[0-~])").expect("valid escape regex"));

static INCOMPLETE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\x1B(?:\][^\x07\x1B]*|\[[0-?]*[ -/]*|[ -/]+)?$").expect("valid incomplete regex")
});

/// Strip all control sequences from `text`.
///
/// Removing one sequence can join the bytes around it into a new one
/// (`ESC ESC[0m [A`), so passes repeat until nothing changes. The result is
/// a fixed point: stripping it again returns it unchanged.
pub fn strip(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Decode `bytes` lossily as UTF-8 and strip it.
pub fn strip_bytes(bytes: &[u8]) -> String {
    strip(&String::from_utf8_lossy(bytes))
}

fn strip_once(text: &str) -> String {
    if !text.contains('\x1b') {
        return text.to_string();
    }
    let text = text.replace(CLEAR_SCREEN, "");
    let text = OSC_RE.replace_all(&text, "");
    ESCAPE_RE.replace_all(&text, "").into_owned()
}

/// Split off a trailing escape sequence that has not been terminated yet.
///
/// Returns `(ready, carry)`: `ready` can be stripped now, `carry` should be
/// prefixed to the next chunk. An over-long carry is released as-is.
pub fn split_incomplete(text: &str) -> (&str, &str) {
    let Some(idx) = text.rfind('\x1b') else {
        return (text, "");
    };
    let tail = &text[idx..];
    if tail.len() <= MAX_CARRY && INCOMPLETE_RE.is_match(tail) {
        (&text[..idx], tail)
    } else {
        (text, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_plain_text_untouched() {
        assert_eq!(strip("hello world\r\n"), "hello world\r\n");
    }

    #[test]
    fn test_strip_colors_and_cursor_moves() {
        assert_eq!(strip("\x1b[01;34mdir\x1b[0m  file"), "dir  file");
        assert_eq!(strip("a\x1b[2Kb\x1b[1Ac"), "abc");
        assert_eq!(strip("\x1b[?2004huser@host:~$ "), "user@host:~$ ");
    }

    #[test]
    fn test_strip_short_escapes() {
        assert_eq!(strip("\x1b=\x1b>text\x1bM"), "text");
        assert_eq!(strip("\x1b[m\x1b(Bplain"), "plain");
    }

    #[test]
    fn test_strip_osc_title() {
        assert_eq!(strip("\x1b]0;user@host: ~\x07prompt$ "), "prompt$ ");
        assert_eq!(strip("\x1b]2;title\x1b\\prompt$ "), "prompt$ ");
    }

    #[test]
    fn test_clear_screen_removed_next_to_other_sequences() {
        assert_eq!(strip("\x1b[0m\x1b[H\x1b[J\x1b[1mtop"), "top");
        assert_eq!(strip("before\x1b[H\x1b[Jafter"), "beforeafter");
        assert_eq!(strip("\x1b\x1b[H\x1b[J[A"), "");
    }

    #[test]
    fn test_strip_reaches_fixed_point() {
        // Removing the inner sequence exposes ESC[A
        assert_eq!(strip("\x1b\x1b[0m[Ax"), "x");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let samples = [
            "",
            "plain",
            "\x1b",
            "\x1b\x1b\x1b",
            "\x1b[",
            "\x1b[31",
            "x\x1b[31mred\x1b[0m\x1b",
            "\x1b\x1b[0m[A\x1b\x1b[1m[0m",
            "\x1b]0;t\x07\x1b]unterminated",
            "\x1b[H\x1b[H\x1b[J\x1b[J",
            "tab\tnew\nline\r\x07bell",
            "\x1b\u{1b}[\u{1b}[0m31m",
            "ünïcödé \x1b[32m✓\x1b[0m",
        ];
        for sample in samples {
            let once = strip(sample);
            assert_eq!(strip(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_strip_bytes_handles_invalid_utf8() {
        assert_eq!(strip_bytes(b"ok\xff\x1b[0m!"), "ok\u{FFFD}!");
    }

    #[test]
    fn test_split_incomplete_holds_back_partial_sequence() {
        assert_eq!(split_incomplete("abc\x1b[3"), ("abc", "\x1b[3"));
        assert_eq!(split_incomplete("abc\x1b"), ("abc", "\x1b"));
        assert_eq!(split_incomplete("abc\x1b]0;tit"), ("abc", "\x1b]0;tit"));
        assert_eq!(split_incomplete("abc\x1b("), ("abc", "\x1b("));
    }

    #[test]
    fn test_split_incomplete_passes_complete_text() {
        assert_eq!(split_incomplete("abc"), ("abc", ""));
        assert_eq!(split_incomplete("abc\x1b[31m"), ("abc\x1b[31m", ""));
        assert_eq!(split_incomplete("\x1bhello"), ("\x1bhello", ""));
    }

    #[test]
    fn test_split_incomplete_releases_long_tail() {
        let long = format!("\x1b]{}", "x".repeat(MAX_CARRY));
        assert_eq!(split_incomplete(&long), (long.as_str(), ""));
    }
}
