//! # Display rendering
//!
//! Rasterises planned [`DisplayLine`]s into a [`DisplayBuffer`] and hands the
//! frame to a [`Panel`] with a single refresh.
//!
//! Text uses the 6×10 monospace font, magnified by each line's integer
//! `scale` (every font pixel becomes a `scale`×`scale` block).
//!
//! Lines whose glyphs would run past the bottom of the panel are skipped and
//! counted in the [`RenderReport`]; a long tide list therefore loses its last
//! lines instead of drawing half-clipped text.

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::Rectangle,
    text::{Baseline, Text},
};
use tracing::{info, warn};

use crate::panel::{DisplayBuffer, Ink, Panel, PanelError};
use crate::planner::DisplayLine;

const GLYPH_HEIGHT: u32 = 10;

/// What happened to the planned lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub drawn: usize,
    pub clipped: usize,
    pub inked_pixels: usize,
}

/// A draw target that magnifies everything drawn into it.
///
/// Coordinates are in unscaled units relative to `origin`; pixel (x, y) lands
/// on the `scale`×`scale` block at `origin + (x, y) * scale` of the inner
/// target.
struct Magnified<'a, D> {
    target: &'a mut D,
    origin: Point,
    scale: u32,
}

impl<D: DrawTarget<Color = BinaryColor>> Dimensions for Magnified<'_, D> {
    fn bounding_box(&self) -> Rectangle {
        let size = self.target.bounding_box().size;
        Rectangle::new(
            Point::zero(),
            Size::new(size.width / self.scale, size.height / self.scale),
        )
    }
}

impl<D: DrawTarget<Color = BinaryColor>> DrawTarget for Magnified<'_, D> {
    type Color = BinaryColor;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let step = self.scale as i32;
        for Pixel(point, color) in pixels {
            let block = Rectangle::new(
                self.origin + Point::new(point.x * step, point.y * step),
                Size::new_equal(self.scale),
            );
            self.target.fill_solid(&block, color)?;
        }
        Ok(())
    }
}

/// Height in pixels of a line of text at `scale`.
pub fn line_height(scale: u32) -> u32 {
    GLYPH_HEIGHT.saturating_mul(scale.max(1))
}

/// True when the whole line lies within `panel_height` rows.
pub fn fits(line: &DisplayLine, panel_height: u32) -> bool {
    line.y >= 0 && (line.y as u32).saturating_add(line_height(line.scale)) <= panel_height
}

/// Draw one line into any binary draw target.
pub fn draw_line<D>(target: &mut D, line: &DisplayLine) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let mut magnified = Magnified {
        target,
        origin: Point::new(line.x, line.y),
        scale: line.scale.max(1),
    };
    Text::with_baseline(&line.text, Point::zero(), style, Baseline::Top).draw(&mut magnified)?;
    Ok(())
}

/// Compose a full frame from `lines`, skipping lines that do not fit.
pub fn compose(size: Size, ink: Ink, lines: &[DisplayLine]) -> (DisplayBuffer, RenderReport) {
    let mut frame = DisplayBuffer::new(size.width, size.height, ink);
    let mut report = RenderReport::default();

    for line in lines {
        if !fits(line, size.height) {
            report.clipped += 1;
            continue;
        }
        draw_line(&mut frame, line).ok();
        report.drawn += 1;
    }

    report.inked_pixels = frame.inked_pixels();
    (frame, report)
}

/// Render `lines` on `panel`: compose, load, refresh once.
pub fn render<P: Panel>(
    panel: &mut P,
    ink: Ink,
    lines: &[DisplayLine],
) -> Result<RenderReport, PanelError> {
    let (frame, report) = compose(panel.size(), ink, lines);
    if report.clipped > 0 {
        warn!(
            clipped = report.clipped,
            panel_height = panel.size().height,
            "lines below the bottom of the panel were not drawn"
        );
    }

    panel.show(&frame)?;
    panel.refresh()?;

    info!(
        drawn = report.drawn,
        inked_pixels = report.inked_pixels,
        "panel refreshed"
    );
    Ok(report)
}
