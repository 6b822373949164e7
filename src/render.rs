//! Listing rendering using ratatui Line/Span styling.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use tracing::debug;

use crate::node::{DetailField, DisplayFields, LinkDest, SymlinkState};
use crate::tree::{Context, Listing};

/// Configuration for the rendering pipeline.
pub struct RenderConfig {
    /// Whether to emit color styling.
    pub use_color: bool,
}

const PREFIX_STYLE: Style = Style::new().fg(Color::DarkGray);
const HEADER_STYLE: Style = Style::new().add_modifier(Modifier::UNDERLINED);
const ERROR_STYLE: Style = Style::new().fg(Color::Red);
const BROKEN_STYLE: Style = Style::new().fg(Color::Red).add_modifier(Modifier::BOLD);
const LOOP_STYLE: Style = Style::new().fg(Color::Yellow);

/// Marker appended to the target of a broken link.
const BROKEN_MARK: &str = "\u{26a0}";

/// Sanitize control characters to avoid terminal control-sequence injection.
pub fn sanitize_terminal_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let code = c as u32;
                if code <= 0xFF {
                    out.push_str(&format!("\\x{:02X}", code));
                } else {
                    out.push_str(&format!("\\u{{{:X}}}", code));
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Fold style tokens into one style. A token may hold several words, such as
/// `bold underline`. Later tokens override earlier colors.
pub fn style_from_tokens<S: AsRef<str>>(tokens: &[S]) -> Style {
    let mut style = Style::new();
    for word in tokens.iter().flat_map(|t| t.as_ref().split_whitespace()) {
        style = match word {
            "bold" => style.add_modifier(Modifier::BOLD),
            "dim" => style.add_modifier(Modifier::DIM),
            "italic" => style.add_modifier(Modifier::ITALIC),
            "underline" => style.add_modifier(Modifier::UNDERLINED),
            "strikethrough" => style.add_modifier(Modifier::CROSSED_OUT),
            "reverse" => style.add_modifier(Modifier::REVERSED),
            other => match parse_color(other) {
                Some(color) => style.fg(color),
                None => {
                    debug!(token = other, "ignoring unknown style token");
                    style
                }
            },
        };
    }
    style
}

fn parse_color(word: &str) -> Option<Color> {
    if let Some(args) = word.strip_prefix("rgb(").and_then(|w| w.strip_suffix(')')) {
        let parts: Vec<u8> = args
            .split(',')
            .map(|p| p.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .ok()?;
        return match parts[..] {
            [r, g, b] => Some(Color::Rgb(r, g, b)),
            _ => None,
        };
    }
    let color = match word {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::Gray,
        "grey" | "gray" | "bright_black" => Color::DarkGray,
        "bright_red" => Color::LightRed,
        "bright_green" => Color::LightGreen,
        "bright_yellow" => Color::LightYellow,
        "bright_blue" => Color::LightBlue,
        "bright_magenta" => Color::LightMagenta,
        "bright_cyan" => Color::LightCyan,
        "bright_white" => Color::White,
        _ => return None,
    };
    Some(color)
}

/// Convert the visible nodes of `listing` into styled lines, one per node,
/// preceded by a header row when detail columns are requested.
pub fn listing_to_lines(
    listing: &Listing,
    ctx: &Context<'_>,
    render: &RenderConfig,
) -> Vec<Line<'static>> {
    let rows: Vec<(DisplayFields, &str)> = listing
        .walk_visible()
        .into_iter()
        .map(|(id, _)| {
            let node = listing.get(id);
            let fields = node.display_fields(ctx.config, ctx.options, ctx.owners);
            (fields, node.prefix.as_str())
        })
        .collect();

    let columns = &ctx.options.details;
    let mut widths: Vec<usize> = columns.iter().map(|f| f.header().chars().count()).collect();
    for (fields, _) in &rows {
        for (width, cell) in widths.iter_mut().zip(&fields.cells) {
            *width = (*width).max(sanitize_terminal_text(&cell.text).chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    if !columns.is_empty() {
        let headers = columns.iter().map(|f| (f.header(), None::<&str>));
        let mut spans = cell_spans(columns, headers, &widths, render);
        spans.push(Span::raw("name"));
        let header = spans
            .into_iter()
            .map(|span| {
                if render.use_color && !span.content.trim().is_empty() {
                    span.style(HEADER_STYLE)
                } else {
                    span
                }
            })
            .collect::<Vec<_>>();
        lines.push(Line::from(header));
    }

    for (fields, prefix) in &rows {
        let cells = fields
            .cells
            .iter()
            .map(|cell| (cell.text.as_str(), cell.style.as_deref()));
        let mut spans = cell_spans(columns, cells, &widths, render);
        if !prefix.is_empty() {
            spans.push(styled(prefix.to_string(), PREFIX_STYLE, render));
        }
        spans.extend(name_spans(fields, render, true));
        if let Some(err) = &fields.error {
            let text = format!(" [{}]", sanitize_terminal_text(err));
            spans.push(styled(text, ERROR_STYLE, render));
        }
        lines.push(Line::from(spans));
    }
    lines
}

/// Padded detail cells, each followed by a separating space.
fn cell_spans<'c>(
    columns: &[DetailField],
    cells: impl IntoIterator<Item = (&'c str, Option<&'c str>)>,
    widths: &[usize],
    render: &RenderConfig,
) -> Vec<Span<'static>> {
    let mut spans = Vec::with_capacity(columns.len() * 2);
    for ((field, (cell, style)), width) in columns.iter().zip(cells).zip(widths) {
        let cell = sanitize_terminal_text(cell);
        let text = if field.is_numeric() {
            format!("{cell:>width$}")
        } else {
            format!("{cell:<width$}")
        };
        match style {
            Some(style) => spans.push(styled(text, style_from_tokens(&[style]), render)),
            None => spans.push(Span::raw(text)),
        }
        spans.push(Span::raw(" "));
    }
    spans
}

/// Icon, name and suffix, then the symlink destination chain.
fn name_spans(fields: &DisplayFields, render: &RenderConfig, with_icon: bool) -> Vec<Span<'static>> {
    let style = style_from_tokens(&fields.color_tokens);
    let mut spans = Vec::new();
    if with_icon {
        if let Some(icon) = &fields.icon {
            spans.push(styled(format!("{icon} "), style, render));
        }
    }
    let name = format!(
        "{}{}",
        sanitize_terminal_text(&fields.name),
        sanitize_terminal_text(&fields.suffix)
    );
    spans.push(styled(name, style, render));

    if let Some(link) = &fields.link {
        spans.push(Span::raw(format!(" {} ", link.glyph)));
        match (&link.dest, link.state) {
            (LinkDest::Node(dest), _) => spans.extend(name_spans(dest, render, false)),
            (LinkDest::Raw(raw), SymlinkState::Broken) => {
                let text = format!("{}{BROKEN_MARK}", sanitize_terminal_text(raw));
                spans.push(styled(text, BROKEN_STYLE, render));
            }
            (LinkDest::Raw(raw), _) => {
                spans.push(styled(sanitize_terminal_text(raw), LOOP_STYLE, render));
            }
        }
    }
    spans
}

fn styled(text: String, style: Style, render: &RenderConfig) -> Span<'static> {
    if render.use_color {
        Span::styled(text, style)
    } else {
        Span::raw(text)
    }
}

/// Extract plain text from a `Line` (useful for testing).
pub fn line_to_plain_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::git::VcsStatusMap;
    use crate::node::Owners;
    use crate::options::{IconStyle, Options};
    use std::fs;
    use tempfile::TempDir;

    fn render(dir: &std::path::Path, options: &Options, use_color: bool) -> Vec<Line<'static>> {
        let config = Config::built_in().unwrap();
        let vcs = VcsStatusMap::default();
        let owners = Owners::new();
        let ctx = Context {
            config: &config,
            vcs: &vcs,
            options,
            owners: &owners,
        };
        let listing = Listing::read(dir, &ctx).unwrap();
        listing_to_lines(&listing, &ctx, &RenderConfig { use_color })
    }

    fn plain_options() -> Options {
        Options {
            icon: IconStyle::None,
            ..Options::default()
        }
    }

    #[test]
    fn tokens_fold_into_style() {
        let style = style_from_tokens(&["blue", "bold underline", "rgb(247, 76, 0)"]);
        assert_eq!(style.fg, Some(Color::Rgb(247, 76, 0)));
        assert!(style.add_modifier.contains(Modifier::BOLD));
        assert!(style.add_modifier.contains(Modifier::UNDERLINED));

        let style = style_from_tokens(&["sparkly", "bright_cyan"]);
        assert_eq!(style.fg, Some(Color::LightCyan));
        assert_eq!(style_from_tokens(&["rgb(1,2)"]), Style::new());
    }

    #[test]
    fn sanitizes_control_characters() {
        assert_eq!(sanitize_terminal_text("a\nb\x1b[31m"), "a\\nb\\x1B[31m");
        assert_eq!(sanitize_terminal_text("plain"), "plain");
    }

    #[test]
    fn names_carry_type_suffix() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("docs")).unwrap();
        fs::write(tmp.path().join("notes.txt"), "").unwrap();

        let lines = render(tmp.path(), &plain_options(), false);
        let text: Vec<String> = lines.iter().map(line_to_plain_text).collect();
        assert_eq!(text, vec!["docs/", "notes.txt"]);
    }

    #[test]
    fn detail_columns_are_aligned_under_header() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("big.bin"), vec![0u8; 2048]).unwrap();
        fs::write(tmp.path().join("small.bin"), "x").unwrap();

        let options = Options {
            details: vec![DetailField::Type, DetailField::Size],
            ..plain_options()
        };
        let text: Vec<String> = render(tmp.path(), &options, false)
            .iter()
            .map(line_to_plain_text)
            .collect();
        assert_eq!(text[0], "T    size name");
        assert_eq!(text[1], "f 2.0 KiB big.bin");
        assert_eq!(text[2], "f     1 B small.bin");
    }

    #[cfg(unix)]
    #[test]
    fn owner_cells_take_owner_style() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("mine.txt"), "").unwrap();

        let options = Options {
            details: vec![DetailField::User],
            ..plain_options()
        };
        let lines = render(tmp.path(), &options, true);
        assert_eq!(lines[1].spans[0].style, style_from_tokens(&["blue bold"]));
        assert_eq!(lines[1].spans[1].content, " ");
    }

    #[cfg(unix)]
    #[test]
    fn broken_link_is_marked() {
        let tmp = TempDir::new().unwrap();
        std::os::unix::fs::symlink("nowhere", tmp.path().join("dangling")).unwrap();

        let text = line_to_plain_text(&render(tmp.path(), &plain_options(), true)[0]);
        assert_eq!(text, "dangling@ \u{219d} nowhere\u{26a0}");
    }
}
