use crate::types::{Align, DisplayRow, COLUMNS};
use chrono::Local;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Write};

pub const TITLE: &str = "Peer Monitor (press 'q' to quit)";

/// Paints a refresh worth of rows.
pub trait TableSink: Send {
    /// Draw `rows` in order, anomalous rows highlighted, followed by `notices`.
    fn render(&mut self, rows: &[DisplayRow], notices: &[String]) -> io::Result<()>;

    /// A refresh failed; keep whatever is on screen and say why.
    fn show_error(&mut self, message: &str) -> io::Result<()>;
}

fn build_label() -> String {
    format!(
        "peerwatch {} ({})",
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_COMMIT_HASH").unwrap_or("unknown")
    )
}

fn summary(rows: &[DisplayRow]) -> String {
    let anomalous = rows.iter().filter(|row| row.anomalous).count();
    format!(
        "updated {} | {} peers | {} missing NODE_NETWORK | {}",
        Local::now().format("%H:%M:%S"),
        rows.len(),
        anomalous,
        build_label()
    )
}

/// Header, separator and one line per row, padded into columns.
/// The flag marks lines to highlight.
pub fn table_lines(rows: &[DisplayRow]) -> Vec<(String, bool)> {
    let mut widths: Vec<usize> = COLUMNS.iter().map(|(name, _)| name.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.cells()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: &[&str]| -> String {
        cells
            .iter()
            .zip(widths.iter())
            .zip(COLUMNS.iter())
            .map(|((cell, width), (_, align))| match align {
                Align::Left => format!("{:<width$}", cell, width = *width),
                Align::Right => format!("{:>width$}", cell, width = *width),
            })
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let headers: Vec<&str> = COLUMNS.iter().map(|(name, _)| *name).collect();
    let header = format_line(&headers[..]);
    let separator = "-".repeat(header.chars().count());

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push((header, false));
    lines.push((separator, false));
    for row in rows {
        lines.push((format_line(&row.cells()[..]), row.anomalous));
    }
    lines
}

fn clip(line: &str, width: usize) -> String {
    line.chars().take(width).collect()
}

/// Full-screen view on the alternate screen. The terminal is restored on drop.
pub struct ScreenSink<W: Write + Send> {
    out: W,
    last_rows: Vec<DisplayRow>,
    last_notices: Vec<String>,
}

impl<W: Write + Send> ScreenSink<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(out, EnterAlternateScreen, Hide)?;
        Ok(Self {
            out,
            last_rows: Vec::new(),
            last_notices: Vec::new(),
        })
    }

    fn draw(&mut self, banner: Option<&str>) -> io::Result<()> {
        let (cols, height) = terminal::size().unwrap_or((200, 50));
        let width = cols as usize;
        let mut y: u16 = 0;

        let mut lines: Vec<(String, Option<Color>, bool)> = Vec::new();
        lines.push((TITLE.to_string(), None, true));
        lines.push((summary(&self.last_rows), None, false));
        if let Some(message) = banner {
            lines.push((format!("Error: {}", message), Some(Color::Red), true));
        }
        lines.push((String::new(), None, false));
        for (line, highlight) in table_lines(&self.last_rows) {
            lines.push((line, highlight.then_some(Color::Yellow), false));
        }
        if !self.last_notices.is_empty() {
            lines.push((String::new(), None, false));
            for notice in &self.last_notices {
                lines.push((notice.clone(), Some(Color::DarkYellow), false));
            }
        }

        for (text, color, bold) in lines {
            if y >= height {
                break;
            }
            queue!(self.out, MoveTo(0, y))?;
            if bold {
                queue!(self.out, SetAttribute(Attribute::Bold))?;
            }
            if let Some(color) = color {
                queue!(self.out, SetForegroundColor(color))?;
            }
            queue!(
                self.out,
                Print(clip(&text, width)),
                SetAttribute(Attribute::Reset),
                ResetColor,
                Clear(ClearType::UntilNewLine)
            )?;
            y += 1;
        }
        if y < height {
            queue!(self.out, MoveTo(0, y), Clear(ClearType::FromCursorDown))?;
        }
        self.out.flush()
    }
}

impl<W: Write + Send> TableSink for ScreenSink<W> {
    fn render(&mut self, rows: &[DisplayRow], notices: &[String]) -> io::Result<()> {
        self.last_rows = rows.to_vec();
        self.last_notices = notices.to_vec();
        self.draw(None)
    }

    fn show_error(&mut self, message: &str) -> io::Result<()> {
        self.draw(Some(message))
    }
}

impl<W: Write + Send> Drop for ScreenSink<W> {
    fn drop(&mut self) {
        let _ = execute!(self.out, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Append-style output, one block per refresh.
pub struct PlainSink<W: Write + Send> {
    out: W,
    colored: bool,
}

impl<W: Write + Send> PlainSink<W> {
    pub fn new(out: W, colored: bool) -> Self {
        Self { out, colored }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> TableSink for PlainSink<W> {
    fn render(&mut self, rows: &[DisplayRow], notices: &[String]) -> io::Result<()> {
        writeln!(self.out, "{}", summary(rows))?;
        if rows.is_empty() {
            writeln!(self.out, "No peers connected.")?;
        } else {
            for (line, highlight) in table_lines(rows) {
                if highlight && self.colored {
                    queue!(
                        self.out,
                        SetForegroundColor(Color::Yellow),
                        Print(line),
                        ResetColor,
                        Print("\n")
                    )?;
                } else {
                    writeln!(self.out, "{}", line)?;
                }
            }
        }
        for notice in notices {
            writeln!(self.out, "{}", notice)?;
        }
        writeln!(self.out)?;
        self.out.flush()
    }

    fn show_error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "Error: {}", message)?;
        self.out.flush()
    }
}
