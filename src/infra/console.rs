// ============================================================
// Layer 6 - Styled Console
// ============================================================
// A Theme maps each message role to a colour, and a Console
// binds a Theme to one input and one output stream.
//
// Both are ordinary values built in the CLI layer and handed to
// whoever needs them. Tests build a Console over a byte buffer
// with Theme::plain() and read back exactly what was printed.
//
// Reference: colored crate documentation

use colored::{Color, Colorize};
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Success,
    Error,
    Info,
    Warning,
    Menu,
}

#[derive(Debug, Clone, Copy)]
struct Style {
    color: Color,
    bold:  bool,
}

#[derive(Debug, Clone)]
pub struct Theme {
    success: Style,
    error:   Style,
    info:    Style,
    warning: Style,
    menu:    Style,
    enabled: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            success: Style { color: Color::Green,   bold: false },
            error:   Style { color: Color::Red,     bold: false },
            info:    Style { color: Color::Cyan,    bold: false },
            warning: Style { color: Color::Yellow,  bold: false },
            menu:    Style { color: Color::Magenta, bold: true  },
            enabled: true,
        }
    }
}

impl Theme {
    /// Same roles, no escape codes.
    pub fn plain() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    pub fn paint(&self, role: Role, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        let style = match role {
            Role::Success => self.success,
            Role::Error   => self.error,
            Role::Info    => self.info,
            Role::Warning => self.warning,
            Role::Menu    => self.menu,
        };
        let painted = text.color(style.color);
        if style.bold { painted.bold().to_string() } else { painted.to_string() }
    }
}

pub struct Console<I, O> {
    theme:  Theme,
    input:  I,
    output: O,
}

impl<I: BufRead, O: Write> Console<I, O> {
    pub fn new(theme: Theme, input: I, output: O) -> Self {
        Self { theme, input, output }
    }

    pub fn print(&mut self, role: Role, text: &str) -> io::Result<()> {
        writeln!(self.output, "{}", self.theme.paint(role, text))
    }

    /// Draws a rounded box with a left-aligned title.
    pub fn panel(&mut self, title: &str, lines: &[Vec<(Role, String)>]) -> io::Result<()> {
        let content_width = lines
            .iter()
            .map(|spans| spans.iter().map(|(_, s)| s.chars().count()).sum::<usize>())
            .max()
            .unwrap_or(0);
        let width = content_width.max(title.chars().count() + 2) + 2;

        let title_bar = format!(" {title} ");
        let rule = "─".repeat(width.saturating_sub(title_bar.chars().count() + 1));
        writeln!(
            self.output,
            "╭─{}{}╮",
            self.theme.paint(Role::Menu, &title_bar),
            rule
        )?;

        for spans in lines {
            let used: usize = spans.iter().map(|(_, s)| s.chars().count()).sum();
            let body: String = spans
                .iter()
                .map(|(role, text)| self.theme.paint(*role, text))
                .collect();
            writeln!(self.output, "│ {}{} │", body, " ".repeat(width - 2 - used))?;
        }

        writeln!(self.output, "╰{}╯", "─".repeat(width))
    }

    /// Prints `prompt` and reads one line with its line ending removed.
    /// Returns `None` once the input is exhausted.
    pub fn prompt(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", self.theme.paint(Role::Menu, prompt))?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        let trimmed = line.strip_suffix('\n').unwrap_or(&line);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
        Ok(Some(trimmed.to_string()))
    }

    #[cfg(test)]
    pub fn output(&self) -> &O {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Theme::plain(), Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn printed(c: &Console<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(c.output().clone()).unwrap()
    }

    #[test]
    fn plain_theme_emits_no_escape_codes() {
        assert_eq!(Theme::plain().paint(Role::Error, "boom"), "boom");
    }

    #[test]
    fn coloured_theme_wraps_text() {
        colored::control::set_override(true);
        let painted = Theme::default().paint(Role::Success, "ok");
        assert!(painted.contains("ok"));
        assert!(painted.contains('\u{1b}'));
    }

    #[test]
    fn prompt_strips_only_the_line_ending() {
        let mut c = console(" 1\r\nnext\n");
        assert_eq!(c.prompt("> ").unwrap().as_deref(), Some(" 1"));
        assert_eq!(c.prompt("> ").unwrap().as_deref(), Some("next"));
        assert_eq!(c.prompt("> ").unwrap(), None);
    }

    #[test]
    fn panel_lines_share_one_width() {
        let mut c = console("");
        c.panel(
            "Title",
            &[
                vec![],
                vec![(Role::Menu, "1. ".into()), (Role::Info, "Short".into())],
                vec![(Role::Menu, "2. ".into()), (Role::Info, "A longer line".into())],
            ],
        )
        .unwrap();
        let out = printed(&c);
        let widths: Vec<usize> = out.lines().map(|l| l.chars().count()).collect();
        assert_eq!(widths.len(), 5);
        assert!(widths.iter().all(|w| *w == widths[0]), "{out}");
        assert!(out.starts_with("╭─ Title "));
    }
}
