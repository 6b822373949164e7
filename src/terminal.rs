//! Writing styled lines to the terminal as ANSI sequences.

use crossterm::style::{
    Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetForegroundColor,
};
use crossterm::queue;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use std::io::{self, Stdout, Write};

const ATTRIBUTES: [(Modifier, Attribute); 6] = [
    (Modifier::BOLD, Attribute::Bold),
    (Modifier::DIM, Attribute::Dim),
    (Modifier::ITALIC, Attribute::Italic),
    (Modifier::UNDERLINED, Attribute::Underlined),
    (Modifier::REVERSED, Attribute::Reverse),
    (Modifier::CROSSED_OUT, Attribute::CrossedOut),
];

/// Write `lines` to `writer`, one per row. Styling is emitted only when
/// `use_color` is set. The caller is responsible for flushing.
pub fn write_lines<W: Write>(writer: &mut W, lines: &[Line<'_>], use_color: bool) -> io::Result<()> {
    for line in lines {
        for span in &line.spans {
            let style = line.style.patch(span.style);
            if use_color && style != Style::default() {
                write_styled(writer, &span.content, style)?;
            } else {
                queue!(writer, Print(&span.content))?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn write_styled<W: Write>(writer: &mut W, text: &str, style: Style) -> io::Result<()> {
    if let Some(color) = style.fg {
        queue!(writer, SetForegroundColor(term_color(color)))?;
    }
    for (modifier, attribute) in ATTRIBUTES {
        if style.add_modifier.contains(modifier) {
            queue!(writer, SetAttribute(attribute))?;
        }
    }
    queue!(writer, Print(text), SetAttribute(Attribute::Reset), ResetColor)
}

/// ratatui's `Red` is ANSI red, which crossterm calls `DarkRed`; the light
/// variants map to crossterm's plain names.
fn term_color(color: Color) -> TermColor {
    match color {
        Color::Reset => TermColor::Reset,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
        Color::Indexed(i) => TermColor::AnsiValue(i),
    }
}

/// Create a BufWriter wrapping stdout with a generous buffer.
pub fn buffered_stdout() -> io::BufWriter<Stdout> {
    io::BufWriter::with_capacity(64 * 1024, io::stdout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::text::Span;

    #[test]
    fn plain_output_has_no_escapes() {
        let lines = vec![
            Line::from(vec![Span::styled("src/", Style::new().fg(Color::Blue)), Span::raw(" x")]),
            Line::from("b"),
        ];
        let mut out = Vec::new();
        write_lines(&mut out, &lines, false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "src/ x\nb\n");
    }

    #[test]
    fn styled_output_wraps_spans() {
        let lines = vec![Line::from(Span::styled(
            "Cargo.toml",
            Style::new().fg(Color::Rgb(1, 2, 3)).add_modifier(Modifier::BOLD),
        ))];
        let mut out = Vec::new();
        write_lines(&mut out, &lines, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\x1b[38;2;1;2;3m"), "{text:?}");
        assert!(text.contains("\x1b[1m"), "{text:?}");
        assert!(text.contains("Cargo.toml\x1b[0m"), "{text:?}");
        assert!(text.ends_with('\n'));
    }
}
