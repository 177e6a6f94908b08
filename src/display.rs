use crate::port::{VideoFrame, SCREEN_HEIGHT, SCREEN_WIDTH};
use crossterm::{
    cursor,
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::text::Text;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders, Paragraph};
use tui::Terminal;

/// Display is used by the host to put video frames on a screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work.
pub trait Display {
    /// draw one 256x256 frame of palette indices
    fn draw(&mut self, frame: &VideoFrame) -> Result<(), io::Error>;

    /// text drawn over the next frames (info, help); empty to clear
    fn set_overlay(&mut self, _lines: Vec<String>) {}
}

/// indices 0..=215 are the colour cube; the rest are undefined
pub const PALETTE_SIZE: usize = 216;

/// what undefined indices are drawn as
pub const SENTINEL_RGB: (u8, u8, u8) = (0, 0, 0);

/// each of the 6 channel levels is 0x33 apart
const CHANNEL_STEP: u8 = 0x33;

/// palette index -> (r, g, b); index = 36r + 6g + b with each channel 0-5
pub fn palette_rgb(index: u8) -> (u8, u8, u8) {
    if index as usize >= PALETTE_SIZE {
        return SENTINEL_RGB;
    }
    let r = index / 36;
    let g = (index / 6) % 6;
    let b = index % 6;
    (r * CHANNEL_STEP, g * CHANNEL_STEP, b * CHANNEL_STEP)
}

/// Group pixels by palette entry as canvas points. Undefined indices join the
/// sentinel; anything black is left out since the canvas is black already.
fn points_by_colour(frame: &VideoFrame) -> Vec<(Color, Vec<(f64, f64)>)> {
    let mut buckets: Vec<Vec<(f64, f64)>> = vec![Vec::new(); PALETTE_SIZE];
    for (y, row) in frame.rows().enumerate() {
        for (x, &index) in row.iter().enumerate() {
            if palette_rgb(index) == (0, 0, 0) {
                continue;
            }
            buckets[index as usize].push((x as f64, -(y as f64)));
        }
    }
    buckets
        .into_iter()
        .enumerate()
        .filter(|(_, coords)| !coords.is_empty())
        .map(|(index, coords)| {
            let (r, g, b) = palette_rgb(index as u8);
            (Color::Rgb(r, g, b), coords)
        })
        .collect()
}

/// colour display in a terminal, rendered using TUI and crossterm
pub struct TermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    overlay: Vec<String>,
}

impl TermDisplay {
    pub fn new() -> Result<TermDisplay, io::Error> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(TermDisplay {
            terminal,
            overlay: Vec::new(),
        })
    }
}

impl Drop for TermDisplay {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
    }
}

impl Display for TermDisplay {
    fn draw(&mut self, frame: &VideoFrame) -> Result<(), io::Error> {
        let points = points_by_colour(frame);
        let overlay = &self.overlay;
        self.terminal.draw(|f| {
            let size = f.size();
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("BytePusher")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds([0.0, (SCREEN_WIDTH - 1) as f64])
                .y_bounds([-((SCREEN_HEIGHT - 1) as f64), 0.0])
                .marker(Marker::Block)
                .paint(|ctx| {
                    for (color, coords) in &points {
                        ctx.draw(&Points {
                            coords,
                            color: *color,
                        });
                    }
                });
            f.render_widget(canvas, size);

            if !overlay.is_empty() {
                let width = overlay.iter().map(|l| l.len()).max().unwrap_or(0) as u16;
                let area = Rect::new(
                    1,
                    1,
                    width.min(size.width.saturating_sub(2)),
                    (overlay.len() as u16).min(size.height.saturating_sub(2)),
                );
                let text = Text::raw(overlay.join("\n"));
                f.render_widget(
                    Paragraph::new(text).style(Style::default().fg(Color::White).bg(Color::Black)),
                    area,
                );
            }
        })?;
        Ok(())
    }

    fn set_overlay(&mut self, lines: Vec<String>) {
        self.overlay = lines;
    }
}

/// useful for testing non-display routines
pub struct DummyDisplay {
    pub frames_drawn: usize,
    pub overlay: Vec<String>,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay {
            frames_drawn: 0,
            overlay: Vec::new(),
        }
    }
}

impl Default for DummyDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, _frame: &VideoFrame) -> Result<(), io::Error> {
        self.frames_drawn += 1;
        Ok(())
    }

    fn set_overlay(&mut self, lines: Vec<String>) {
        self.overlay = lines;
    }
}
