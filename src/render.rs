//! Terminal preview of the composited canvas.
//!
//! Each terminal cell shows two vertically stacked canvas pixels using the
//! upper half block glyph (foreground = top, background = bottom).

use crate::canvas::{Canvas, Rgb};
use std::io::Write;

pub struct Frame<'a> {
    pub term_cols: u16,
    pub visual_rows: u16,
    pub canvas: &'a Canvas,
    pub hud: &'a str,
    pub hud_rows: u16,
    pub sync_updates: bool,
}

pub trait Renderer {
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

pub struct HalfBlockRenderer {
    scaled: Canvas,
    last_fg: Option<Rgb>,
    last_bg: Option<Rgb>,
}

impl HalfBlockRenderer {
    const HALF_BLOCK: char = '\u{2580}';

    pub fn new() -> Self {
        Self {
            scaled: Canvas::new(1, 1),
            last_fg: None,
            last_bg: None,
        }
    }

    fn rescale(&mut self, canvas: &Canvas, w: usize, h: usize) {
        if self.scaled.width() != w || self.scaled.height() != h {
            self.scaled = Canvas::new(w, h);
        }
        self.scaled.blit_scaled(
            canvas.pixels_rgba(),
            canvas.width(),
            canvas.height(),
            255,
        );
    }

    fn set_colors(&mut self, out: &mut dyn Write, fg: Rgb, bg: Rgb) -> std::io::Result<()> {
        if self.last_fg != Some(fg) {
            write!(out, "\x1b[38;2;{};{};{}m", fg.r, fg.g, fg.b)?;
            self.last_fg = Some(fg);
        }
        if self.last_bg != Some(bg) {
            write!(out, "\x1b[48;2;{};{};{}m", bg.r, bg.g, bg.b)?;
            self.last_bg = Some(bg);
        }
        Ok(())
    }
}

impl Default for HalfBlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HalfBlockRenderer {
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let cols = frame.term_cols as usize;
        let rows = frame.visual_rows as usize;
        if cols == 0 || rows == 0 {
            return Ok(());
        }
        self.rescale(frame.canvas, cols, rows * 2);

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }
        // Home, reset, autowrap off so full-width rows do not wrap.
        out.write_all(b"\x1b[H\x1b[0m\x1b[?7l")?;
        self.last_fg = None;
        self.last_bg = None;

        for row in 0..rows {
            for x in 0..cols {
                let top = self.scaled.get(x, row * 2);
                let bottom = self.scaled.get(x, row * 2 + 1);
                self.set_colors(out, top, bottom)?;
                write!(out, "{}", Self::HALF_BLOCK)?;
            }
            out.write_all(b"\r\n")?;
        }

        let mut hud_lines = frame.hud.lines();
        for i in 0..frame.hud_rows as usize {
            write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", rows + i + 1)?;
            if let Some(line) = hud_lines.next() {
                let clipped: String = line.chars().take(cols).collect();
                out.write_all(clipped.as_bytes())?;
            }
        }

        out.write_all(b"\x1b[?7h")?;
        if frame.sync_updates {
            out.write_all(b"\x1b[?2026l")?;
        }
        out.flush()?;
        Ok(())
    }
}
