//! # Render planning
//!
//! Turns the cycle's tide events into positioned text lines. The layout is
//! fixed: a title in the top-left corner, the date on the same row further
//! right, then one line per tide event stepping down the panel.
//!
//! ```text
//! Tide Clock              Sat 01 Jun
//! Low  - 15:15  0.80m
//! High - 21:31  2.61m
//! ```
//!
//! The planner emits a line for every event it is given. Whether a line fits
//! on the physical panel is the renderer's concern.

use chrono::Timelike;

use crate::LocalTideEvent;

/// Where each part of the screen goes, in panel pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub title_x: i32,
    pub title_y: i32,
    pub title_scale: u32,
    pub date_x: i32,
    pub date_scale: u32,
    pub event_x: i32,
    pub first_event_y: i32,
    pub line_increment: i32,
    pub event_scale: u32,
}

/// A run of text at a pixel position, magnified by `scale`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayLine {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub scale: u32,
}

/// `"<High|Low> - HH:MM  H.HHm "`, e.g. `"Low  - 15:15  0.80m "`.
pub fn format_event(event: &LocalTideEvent) -> String {
    format!(
        "{:<4} - {:02}:{:02}  {:.2}m ",
        event.level,
        event.local_time.hour(),
        event.local_time.minute(),
        event.height_m
    )
}

/// Lay out the header and one line per event.
///
/// Always returns `events.len() + 2` lines: title, date, then events in the
/// order given.
pub fn plan(
    layout: &Layout,
    title: &str,
    date: &str,
    events: &[LocalTideEvent],
) -> Vec<DisplayLine> {
    let mut lines = Vec::with_capacity(events.len() + 2);

    lines.push(DisplayLine {
        x: layout.title_x,
        y: layout.title_y,
        text: title.to_string(),
        scale: layout.title_scale,
    });
    lines.push(DisplayLine {
        x: layout.date_x,
        y: layout.title_y,
        text: date.to_string(),
        scale: layout.date_scale,
    });

    let mut y = layout.first_event_y;
    for event in events {
        lines.push(DisplayLine {
            x: layout.event_x,
            y,
            text: format_event(event),
            scale: layout.event_scale,
        });
        y += layout.line_increment;
    }

    lines
}
