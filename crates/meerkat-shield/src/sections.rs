//! # Section Splitting
//!
//! Input is split into independently-scanned sections so that a single
//! malicious paragraph can be removed without discarding an entire
//! otherwise-safe message.

use regex::Regex;
use std::sync::OnceLock;

fn blank_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t]*\n+").expect("blank-line regex must be valid"))
}

/// Split input into sections: first try blank-line boundaries; if that
/// yields only one section, fall back to newline boundaries; if that also
/// yields only one section, treat the whole input as a single section.
pub fn split_sections(input: &str) -> Vec<String> {
    let by_blank_line: Vec<String> = blank_line_regex()
        .split(input)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if by_blank_line.len() > 1 {
        return by_blank_line;
    }

    let by_newline: Vec<String> = input
        .lines()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if by_newline.len() > 1 {
        return by_newline;
    }

    vec![input.trim().to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_lines_when_present() {
        let input = "first paragraph\nstill first\n\nsecond paragraph";
        let sections = split_sections(input);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0], "first paragraph\nstill first");
        assert_eq!(sections[1], "second paragraph");
    }

    #[test]
    fn falls_back_to_newlines_without_blank_lines() {
        let input = "line one\nline two\nline three";
        let sections = split_sections(input);
        assert_eq!(sections.len(), 3);
    }

    #[test]
    fn falls_back_to_whole_input_for_single_line() {
        let input = "just one line, no breaks at all";
        let sections = split_sections(input);
        assert_eq!(sections, vec![input.to_string()]);
    }

    #[test]
    fn ignores_blank_lines_at_edges() {
        let input = "\n\nonly section\n\n";
        let sections = split_sections(input);
        assert_eq!(sections, vec!["only section".to_string()]);
    }
}
