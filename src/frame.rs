//! Source-context frames for violation messages.
//!
//! A frame shows the offending line inside a small window of its
//! neighbors, with a gutter of line numbers, a `>` marker on the
//! flagged line and a caret under the flagged column. Rendering works
//! against the same normalized text the engine checked, so reported
//! positions line up with what the reader sees.

use colored::Colorize;

use crate::engine::Position;

/// Frame window and styling knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOptions {
    /// Context lines shown above the flagged line.
    pub lines_above: usize,
    /// Context lines shown below the flagged line.
    pub lines_below: usize,
    /// Colorize the gutter and marker. Off by default; report text
    /// usually lands in logs.
    pub color: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        FrameOptions {
            lines_above: 2,
            lines_below: 3,
            color: false,
        }
    }
}

/// Renders the context frame around `position`. Out-of-range positions
/// clamp to the nearest real line and column instead of failing; the
/// engine's idea of the text and ours never disagree by much.
pub fn render_frame(text: &str, position: Position, opts: &FrameOptions) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let total = lines.len().max(1);
    let marked = position.line.clamp(1, total);
    let first = marked.saturating_sub(opts.lines_above).max(1);
    let last = (marked + opts.lines_below).min(total);
    let width = last.to_string().len();

    let mut rows = Vec::with_capacity(last - first + 2);
    for number in first..=last {
        let content = lines.get(number - 1).copied().unwrap_or("");
        rows.push(content_row(number, marked, width, content, opts));
        if number == marked {
            rows.push(caret_row(width, content, position.column, opts));
        }
    }
    rows.join("\n")
}

fn content_row(
    number: usize,
    marked: usize,
    width: usize,
    content: &str,
    opts: &FrameOptions,
) -> String {
    let gutter = format!("{number:>width$}");
    let mut row = String::new();
    if number == marked {
        row.push_str(&paint("> ", Tint::Marker, opts));
    } else {
        row.push_str("  ");
    }
    row.push_str(&paint(&gutter, Tint::Gutter, opts));
    row.push(' ');
    row.push_str(&paint("|", Tint::Gutter, opts));
    if !content.is_empty() {
        row.push(' ');
        row.push_str(content);
    }
    row
}

fn caret_row(width: usize, content: &str, column: usize, opts: &FrameOptions) -> String {
    let caret_col = column.clamp(1, content.chars().count() + 1);
    let mut row = String::new();
    row.push_str("  ");
    row.push_str(&" ".repeat(width));
    row.push(' ');
    row.push_str(&paint("|", Tint::Gutter, opts));
    row.push(' ');
    row.push_str(&" ".repeat(caret_col - 1));
    row.push_str(&paint("^", Tint::Marker, opts));
    row
}

enum Tint {
    Gutter,
    Marker,
}

fn paint(text: &str, tint: Tint, opts: &FrameOptions) -> String {
    if !opts.color {
        return text.to_string();
    }
    match tint {
        Tint::Gutter => text.blue().to_string(),
        Tint::Marker => text.red().bold().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain() -> FrameOptions {
        FrameOptions::default()
    }

    #[test]
    fn test_window_and_caret_placement() {
        let text = "one\ntwo\nthree\nfour <b>x</b>\nfive\nsix\nseven\neight";
        let frame = render_frame(text, Position::new(4, 6), &plain());
        assert_eq!(
            frame,
            "  2 | two\n\
             \x20 3 | three\n\
             > 4 | four <b>x</b>\n\
             \x20   |      ^\n\
             \x20 5 | five\n\
             \x20 6 | six\n\
             \x20 7 | seven"
        );
    }

    #[test]
    fn test_window_clamps_at_start_of_text() {
        let frame = render_frame("a\nb\nc", Position::new(1, 1), &plain());
        assert_eq!(frame, "> 1 | a\n    | ^\n  2 | b\n  3 | c");
    }

    #[test]
    fn test_window_clamps_at_end_of_text() {
        let frame = render_frame("a\nb\nc", Position::new(3, 1), &plain());
        assert_eq!(frame, "  1 | a\n  2 | b\n> 3 | c\n    | ^");
    }

    #[test]
    fn test_gutter_aligns_across_digit_widths() {
        let text = (1..=12).map(|n| format!("line {n}")).collect::<Vec<_>>().join("\n");
        let frame = render_frame(&text, Position::new(9, 1), &plain());
        assert_eq!(
            frame,
            "   7 | line 7\n\
             \x20  8 | line 8\n\
             >  9 | line 9\n\
             \x20    | ^\n\
             \x20 10 | line 10\n\
             \x20 11 | line 11\n\
             \x20 12 | line 12"
        );
    }

    #[test]
    fn test_positions_past_the_text_clamp() {
        let frame = render_frame("short", Position::new(40, 40), &plain());
        assert_eq!(frame, "> 1 | short\n    |      ^");
    }

    #[test]
    fn test_empty_text_still_renders_a_marked_line() {
        let frame = render_frame("", Position::new(1, 1), &plain());
        assert_eq!(frame, "> 1 |\n    | ^");
    }

    #[test]
    fn test_blank_lines_render_without_trailing_space() {
        let frame = render_frame("a\n\nc", Position::new(3, 1), &plain());
        assert_eq!(frame, "  1 | a\n  2 |\n> 3 | c\n    | ^");
    }
}
