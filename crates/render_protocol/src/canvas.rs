//! Canvas abstraction that paint commands are played back into.
//!
//! `RecordingCanvas` captures commands into a [`Picture`]; `PixelCanvas` is a small software
//! raster with a save/clip/translate stack, used by the demo binary and by tests that need to
//! look at actual output.

use std::sync::Arc;

use model::{IntPoint, IntRect};

use crate::{ButtonOverlay, Color, OverlayState, PaintCommand, Picture};

pub trait Canvas {
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, dx: i32, dy: i32);
    /// Intersects the current clip with `rect` (in current coordinates).
    fn clip_rect(&mut self, rect: IntRect);
    fn fill_rect(&mut self, rect: IntRect, color: Color);
    fn draw_text(&mut self, origin: IntPoint, text: &str, color: Color);
    fn draw_overlay(&mut self, overlay: &ButtonOverlay);
    /// Device-space extent of the drawing surface.
    fn device_bounds(&self) -> IntRect;

    fn apply(&mut self, command: &PaintCommand) {
        match command {
            PaintCommand::Save => self.save(),
            PaintCommand::Restore => self.restore(),
            PaintCommand::Translate { dx, dy } => self.translate(*dx, *dy),
            PaintCommand::ClipRect(rect) => self.clip_rect(*rect),
            PaintCommand::FillRect { rect, color } => self.fill_rect(*rect, *color),
            PaintCommand::DrawText {
                origin,
                text,
                color,
            } => self.draw_text(*origin, text, *color),
            PaintCommand::DrawOverlay(overlay) => self.draw_overlay(overlay),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordingCanvas {
    bounds: IntRect,
    commands: Vec<PaintCommand>,
}

impl RecordingCanvas {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            bounds: IntRect::from_size(width, height),
            commands: Vec::new(),
        }
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn finish(self, origin: IntPoint) -> Picture {
        Picture::from_commands(origin, self.commands)
    }
}

impl Canvas for RecordingCanvas {
    fn save(&mut self) {
        self.commands.push(PaintCommand::Save);
    }

    fn restore(&mut self) {
        self.commands.push(PaintCommand::Restore);
    }

    fn translate(&mut self, dx: i32, dy: i32) {
        self.commands.push(PaintCommand::Translate { dx, dy });
    }

    fn clip_rect(&mut self, rect: IntRect) {
        self.commands.push(PaintCommand::ClipRect(rect));
    }

    fn fill_rect(&mut self, rect: IntRect, color: Color) {
        self.commands.push(PaintCommand::FillRect { rect, color });
    }

    fn draw_text(&mut self, origin: IntPoint, text: &str, color: Color) {
        self.commands.push(PaintCommand::DrawText {
            origin,
            text: Arc::from(text),
            color,
        });
    }

    fn draw_overlay(&mut self, overlay: &ButtonOverlay) {
        self.commands.push(PaintCommand::DrawOverlay(*overlay));
    }

    fn device_bounds(&self) -> IntRect {
        self.bounds
    }

    fn apply(&mut self, command: &PaintCommand) {
        self.commands.push(command.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CanvasState {
    offset: IntPoint,
    clip: IntRect,
}

/// Software raster over an RGBA buffer. Text renders as solid 6x8 cells per character.
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    width: i32,
    height: i32,
    pixels: Vec<Color>,
    state: CanvasState,
    saved: Vec<CanvasState>,
    filled_pixels: u64,
}

pub const GLYPH_WIDTH: i32 = 6;
pub const GLYPH_HEIGHT: i32 = 8;

impl PixelCanvas {
    pub fn new(width: i32, height: i32) -> Self {
        assert!(
            width >= 0 && height >= 0,
            "pixel canvas dimensions must be non-negative"
        );
        let pixel_count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![Color::TRANSPARENT; pixel_count],
            state: CanvasState {
                offset: IntPoint::new(0, 0),
                clip: IntRect::from_size(width, height),
            },
            saved: Vec::new(),
            filled_pixels: 0,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y as usize * self.width as usize + x as usize])
    }

    /// Total pixel writes since creation, overdraw included.
    pub fn filled_pixels(&self) -> u64 {
        self.filled_pixels
    }

    pub fn save_depth(&self) -> usize {
        self.saved.len()
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    fn fill_device_rect(&mut self, local: IntRect, color: Color) {
        let device = local.translated(self.state.offset.x, self.state.offset.y);
        let Some(target) = device.intersection(&self.state.clip) else {
            return;
        };
        for y in target.min_y..target.max_y {
            let row_start = y as usize * self.width as usize;
            for x in target.min_x..target.max_x {
                self.pixels[row_start + x as usize] = color;
            }
        }
        self.filled_pixels += target.area() as u64;
    }
}

impl Canvas for PixelCanvas {
    fn save(&mut self) {
        self.saved.push(self.state);
    }

    fn restore(&mut self) {
        match self.saved.pop() {
            Some(state) => self.state = state,
            None => debug_assert!(false, "pixel canvas restore without matching save"),
        }
    }

    fn translate(&mut self, dx: i32, dy: i32) {
        self.state.offset = self.state.offset.offset_by(dx, dy);
    }

    fn clip_rect(&mut self, rect: IntRect) {
        let device = rect.translated(self.state.offset.x, self.state.offset.y);
        self.state.clip = self.state.clip.intersection(&device).unwrap_or(IntRect::EMPTY);
    }

    fn fill_rect(&mut self, rect: IntRect, color: Color) {
        self.fill_device_rect(rect, color);
    }

    fn draw_text(&mut self, origin: IntPoint, text: &str, color: Color) {
        let glyphs = text.chars().filter(|glyph| !glyph.is_whitespace()).count() as i32;
        if glyphs == 0 {
            return;
        }
        let width = glyphs.saturating_mul(GLYPH_WIDTH);
        self.fill_device_rect(IntRect::from_xywh(origin.x, origin.y, width, GLYPH_HEIGHT), color);
    }

    fn draw_overlay(&mut self, overlay: &ButtonOverlay) {
        let color = match overlay.state {
            OverlayState::Normal => Color::rgb(0xe0, 0xe0, 0xe0),
            OverlayState::Focused => Color::rgb(0xff, 0xa5, 0x00),
            OverlayState::Pressed => Color::rgb(0x80, 0x80, 0x80),
        };
        self.fill_device_rect(overlay.rect, color);
    }

    fn device_bounds(&self) -> IntRect {
        IntRect::from_size(self.width, self.height)
    }
}
