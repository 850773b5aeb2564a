//! # E-paper panel abstraction
//!
//! The panel controller and its bus protocol live outside this crate. What the
//! clock needs from a panel is small: its size, a way to hand it a finished
//! frame, and a refresh command. [`Panel`] captures that contract.
//!
//! Frames are composed in a [`DisplayBuffer`], a two-plane (black/red) 1-bpp
//! buffer in the layout tri-colour controllers expect. It implements
//! `embedded_graphics::DrawTarget`, so anything embedded-graphics can draw can
//! be drawn into it.
//!
//! E-paper must not be refreshed more often than every 180 seconds.
//! [`RateLimitedPanel`] enforces that for any wrapped panel.

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Minimum time between two panel refreshes.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(180);

/// Colors supported by tri-colour e-paper
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
    Red,
}

/// Foreground colour used for text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ink {
    Black,
    Red,
}

impl From<Ink> for Color {
    fn from(ink: Ink) -> Self {
        match ink {
            Ink::Black => Color::Black,
            Ink::Red => Color::Red,
        }
    }
}

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("refresh requested {remaining_secs}s too early (minimum interval 180s)")]
    RefreshTooSoon { remaining_secs: u64 },

    #[error("frame is {actual:?}, panel is {expected:?}")]
    SizeMismatch { expected: Size, actual: Size },

    #[error("panel I/O: {0}")]
    Io(#[from] io::Error),
}

/// The contract the clock needs from an e-paper panel.
pub trait Panel {
    /// Visible area in pixels.
    fn size(&self) -> Size;

    /// Load a complete frame into the panel's memory without refreshing.
    fn show(&mut self, frame: &DisplayBuffer) -> Result<(), PanelError>;

    /// Physically redraw the panel from its memory.
    fn refresh(&mut self) -> Result<(), PanelError>;
}

/// Two-plane frame buffer: a black plane (bit clear = black) and a red plane
/// (bit set = red), rows packed MSB-first.
pub struct DisplayBuffer {
    width: u32,
    height: u32,
    ink: Color,
    black_buffer: Vec<u8>,
    red_buffer: Vec<u8>,
}

impl DisplayBuffer {
    pub fn new(width: u32, height: u32, ink: Ink) -> Self {
        // Buffer size: each row has (width+7)/8 bytes, total height rows
        let bytes_per_row = width.div_ceil(8);
        let buffer_size = (bytes_per_row * height) as usize;
        Self {
            width,
            height,
            ink: ink.into(),
            black_buffer: vec![0xFF; buffer_size], // White by default
            red_buffer: vec![0x00; buffer_size],   // No red by default
        }
    }

    /// Black plane as sent to the controller; a clear bit is black.
    pub fn black_buffer(&self) -> &[u8] {
        &self.black_buffer
    }

    /// Red plane as sent to the controller; a set bit is red.
    pub fn red_buffer(&self) -> &[u8] {
        &self.red_buffer
    }

    fn index(&self, x: u32, y: u32) -> (usize, u8) {
        let bytes_per_row = self.width.div_ceil(8);
        let byte_index = (y * bytes_per_row + x / 8) as usize;
        (byte_index, 0x80 >> (x % 8))
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let (byte_index, bit_mask) = self.index(x, y);

        match color {
            Color::White => {
                self.black_buffer[byte_index] |= bit_mask;
                self.red_buffer[byte_index] &= !bit_mask;
            }
            Color::Black => {
                self.black_buffer[byte_index] &= !bit_mask;
                self.red_buffer[byte_index] &= !bit_mask;
            }
            Color::Red => {
                self.black_buffer[byte_index] |= bit_mask;
                self.red_buffer[byte_index] |= bit_mask;
            }
        }
    }

    /// Colour at (`x`, `y`); out-of-bounds reads as white.
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        if x >= self.width || y >= self.height {
            return Color::White;
        }
        let (byte_index, bit_mask) = self.index(x, y);
        if self.red_buffer[byte_index] & bit_mask != 0 {
            Color::Red
        } else if self.black_buffer[byte_index] & bit_mask == 0 {
            Color::Black
        } else {
            Color::White
        }
    }

    /// Number of non-white pixels.
    pub fn inked_pixels(&self) -> usize {
        let black = self.black_buffer.iter().map(|&b| b.count_zeros()).sum::<u32>();
        let red = self.red_buffer.iter().map(|&b| b.count_ones()).sum::<u32>();
        (black + red) as usize
    }
}

impl OriginDimensions for DisplayBuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for DisplayBuffer {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let color = match color {
                BinaryColor::On => self.ink,
                BinaryColor::Off => Color::White,
            };
            self.set_pixel(point.x as u32, point.y as u32, color);
        }
        Ok(())
    }
}

/// Wraps a panel and refuses refreshes closer together than
/// [`MIN_REFRESH_INTERVAL`].
pub struct RateLimitedPanel<P> {
    inner: P,
    last_refresh: Option<Instant>,
}

impl<P: Panel> RateLimitedPanel<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            last_refresh: None,
        }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    /// Refresh as of `now`, or fail if the previous refresh is too recent.
    pub fn refresh_at(&mut self, now: Instant) -> Result<(), PanelError> {
        if let Some(last) = self.last_refresh {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < MIN_REFRESH_INTERVAL {
                let remaining = MIN_REFRESH_INTERVAL - elapsed;
                return Err(PanelError::RefreshTooSoon {
                    remaining_secs: remaining.as_secs_f64().ceil() as u64,
                });
            }
        }
        self.inner.refresh()?;
        self.last_refresh = Some(now);
        Ok(())
    }
}

impl<P: Panel> Panel for RateLimitedPanel<P> {
    fn size(&self) -> Size {
        self.inner.size()
    }

    fn show(&mut self, frame: &DisplayBuffer) -> Result<(), PanelError> {
        self.inner.show(frame)
    }

    fn refresh(&mut self) -> Result<(), PanelError> {
        self.refresh_at(Instant::now())
    }
}

/// Host panel that "refreshes" by printing the frame as half-block text.
///
/// Two pixel rows share one text row: `▀` top only, `▄` bottom only, `█`
/// both. Red and black both print as ink.
pub struct TerminalPanel<W> {
    out: W,
    size: Size,
    rows: Vec<String>,
}

impl TerminalPanel<io::Stdout> {
    pub fn stdout(width: u32, height: u32) -> Self {
        Self::new(io::stdout(), width, height)
    }
}

impl<W: Write> TerminalPanel<W> {
    pub fn new(out: W, width: u32, height: u32) -> Self {
        Self {
            out,
            size: Size::new(width, height),
            rows: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Panel for TerminalPanel<W> {
    fn size(&self) -> Size {
        self.size
    }

    fn show(&mut self, frame: &DisplayBuffer) -> Result<(), PanelError> {
        let actual = OriginDimensions::size(frame);
        if actual != self.size {
            return Err(PanelError::SizeMismatch {
                expected: self.size,
                actual,
            });
        }

        let inked = |x, y| frame.pixel(x, y) != Color::White;
        self.rows = (0..self.size.height)
            .step_by(2)
            .map(|y| {
                (0..self.size.width)
                    .map(|x| match (inked(x, y), inked(x, y + 1)) {
                        (false, false) => ' ',
                        (true, false) => '▀',
                        (false, true) => '▄',
                        (true, true) => '█',
                    })
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect();
        debug!(rows = self.rows.len(), "frame loaded");
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), PanelError> {
        let border = "─".repeat(self.size.width as usize);
        writeln!(self.out, "┌{}┐", border)?;
        for row in &self.rows {
            writeln!(
                self.out,
                "│{:<width$}│",
                row,
                width = self.size.width as usize
            )?;
        }
        writeln!(self.out, "└{}┘", border)?;
        self.out.flush()?;
        info!("terminal panel refreshed");
        Ok(())
    }
}
