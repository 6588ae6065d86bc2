//! # Face Rendering
//!
//! Draws a [`Surface`] into any monochrome `embedded-graphics` target and
//! provides [`FrameBuffer`], an in-memory target that prints as terminal
//! art for development on a desktop.
//!
//! Watch system fonts are mapped onto the closest built-in mono fonts.
//! Each field is clipped to its own frame, so long text never bleeds into a
//! neighbouring region.

use crate::display::{FontKey, Surface, TextField};
use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10, FONT_7X13_BOLD, FONT_9X18_BOLD},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use std::convert::Infallible;

fn font(key: FontKey) -> &'static MonoFont<'static> {
    match key {
        FontKey::Bitham42Bold => &FONT_10X20,
        FontKey::Gothic24Bold => &FONT_9X18_BOLD,
        FontKey::Gothic18Bold => &FONT_7X13_BOLD,
        FontKey::Gothic14 => &FONT_6X10,
    }
}

/// Render every field of the surface, back to front.
///
/// The screen starts white; fields with a background fill their frame
/// first, then draw their text on top.
pub fn draw_surface<D>(surface: &Surface, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;
    for field in surface.fields() {
        draw_field(field, target)?;
    }
    Ok(())
}

fn draw_field<D>(field: &TextField, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let style = field.style();
    let frame = style.frame;
    let mut clipped = target.clipped(&frame);

    if let Some(background) = style.background {
        frame
            .into_styled(PrimitiveStyle::with_fill(background))
            .draw(&mut clipped)?;
    }
    if field.text().is_empty() {
        return Ok(());
    }

    let anchor_x = match style.alignment {
        Alignment::Left => frame.top_left.x,
        Alignment::Center => frame.top_left.x + frame.size.width as i32 / 2,
        Alignment::Right => frame.top_left.x + frame.size.width as i32 - 1,
    };
    let character_style = MonoTextStyle::new(font(style.font), style.foreground);
    let text_style = TextStyleBuilder::new()
        .alignment(style.alignment)
        .baseline(Baseline::Top)
        .build();

    Text::with_text_style(
        field.text(),
        Point::new(anchor_x, frame.top_left.y),
        character_style,
        text_style,
    )
    .draw(&mut clipped)?;
    Ok(())
}

/// One bit per pixel, `true` is ink.
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; width as usize * height as usize], // White by default
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.pixels[self.offset(x, y)]
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Count of ink pixels inside `area`.
    pub fn ink_in(&self, area: &Rectangle) -> usize {
        area.points()
            .filter(|p| p.x >= 0 && p.y >= 0 && self.pixel(p.x as u32, p.y as u32))
            .count()
    }

    /// Terminal art, two pixel rows per text line using half blocks.
    pub fn to_ascii(&self) -> String {
        let mut out =
            String::with_capacity((self.width as usize + 1) * self.height.div_ceil(2) as usize);
        for y in (0..self.height).step_by(2) {
            for x in 0..self.width {
                let top = self.pixel(x, y);
                let bottom = self.pixel(x, y + 1);
                out.push(match (top, bottom) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                });
            }
            out.push('\n');
        }
        out
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32, point.y as u32);
            if x >= self.width || y >= self.height {
                continue;
            }
            let offset = self.offset(x, y);
            self.pixels[offset] = color.is_on();
        }
        Ok(())
    }
}

/// Render a surface into a fresh frame and return it as terminal art.
pub fn draw_ascii(surface: &Surface) -> String {
    let size = surface.size();
    let mut frame = FrameBuffer::new(size.width, size.height);
    match draw_surface(surface, &mut frame) {
        Ok(()) => frame.to_ascii(),
        Err(never) => match never {},
    }
}

/// Plain listing of every field, for logs.
pub fn describe(surface: &Surface) -> String {
    surface
        .fields()
        .map(|field| format!("{:?}={:?}", field.id(), field.text()))
        .collect::<Vec<_>>()
        .join(" ")
}
