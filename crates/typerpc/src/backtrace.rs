//! Best-effort capture of the responder's call stack.

use std::backtrace::Backtrace;
use std::panic;

/// Maximum number of frames attached to an error reply.
pub const BACKTRACE_DEPTH: usize = 30;

/// Captures the current call stack as at most `depth` printable frames.
///
/// Returns `None` when the platform cannot produce one. Never panics.
pub fn capture(depth: usize) -> Option<Vec<String>> {
    panic::catch_unwind(|| render(&Backtrace::force_capture().to_string(), depth))
        .ok()
        .flatten()
}

/// Folds the textual form of a backtrace into one string per frame.
///
/// Frame lines look like `"  3: symbol"`; the `"at file:line"` lines that
/// follow are appended to their frame.
pub(crate) fn render(text: &str, depth: usize) -> Option<Vec<String>> {
    let mut frames: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_frame_start(line) {
            if frames.len() == depth {
                break;
            }
            frames.push(line.to_string());
        } else if let Some(last) = frames.last_mut() {
            last.push(' ');
            last.push_str(line);
        }
    }
    if frames.is_empty() { None } else { Some(frames) }
}

fn is_frame_start(line: &str) -> bool {
    match line.split_once(':') {
        Some((index, _)) => !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}
