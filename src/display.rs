//! # Display Surface
//!
//! The face is a fixed set of text regions. Each [`TextField`] has a frame,
//! a font, colors and an alignment chosen when the [`Surface`] is created;
//! only its text changes afterwards.
//!
//! ## Layout (144x168)
//! ```text
//! +----------------------------+  y=0
//! |           13:05            |  time banner, black
//! |  Jan 05             72F    |  date / temperature overlay, y=42
//! +----------------------------+  y=75
//! | 80m-40m  fair  good        |  band summary + day/night columns
//! | ...                        |
//! |                            |
//! +----------------------------+  y=h-30
//! |      18:05 | Jan 05        |  UTC banner, black
//! +----------------------------+
//! ```
//!
//! ## Bounded Buffers
//! Text lives in a `heapless::String<FIELD_BUFFER>` and every field also
//! carries its own capacity (5 bytes for `"00:00"`, 14 for
//! `"00:00 | JAN 00"`, ...). Writes go through [`Surface::set_text`] or
//! [`Surface::format_into`], which either replace the whole text or leave
//! it untouched. Nothing is ever truncated.

use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::{Point, Size},
    primitives::Rectangle,
    text::Alignment,
};
use heapless::String;
use std::fmt::{self, Write};
use thiserror::Error;

/// Backing storage shared by every field; individual capacities are smaller.
pub const FIELD_BUFFER: usize = 48;

/// Placeholder shown in the band block until band data arrives.
pub const BAND_LOADING: &str = "\n    Loading...\n    Data from hamqsl.com\n";

/// Errors raised by writes into the surface.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DisplayError {
    /// Formatted text would not fit into the field's buffer
    #[error("{field:?} holds {capacity} bytes, refusing {len}-byte text")]
    Overflow {
        field: FieldId,
        len: usize,
        capacity: usize,
    },
}

/// Every region on the face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldId {
    LocalTime,
    LocalDate,
    UtcTimeDate,
    Temperature,
    BandSummary,
    DayBandQuality,
    NightBandQuality,
}

impl FieldId {
    /// All fields in the order they are stacked onto the screen.
    pub const ALL: [FieldId; 7] = [
        FieldId::LocalTime,
        FieldId::LocalDate,
        FieldId::UtcTimeDate,
        FieldId::Temperature,
        FieldId::BandSummary,
        FieldId::DayBandQuality,
        FieldId::NightBandQuality,
    ];

    /// Longest text the field accepts, in bytes.
    pub fn capacity(self) -> usize {
        match self {
            FieldId::LocalTime => 5,
            FieldId::LocalDate => 6,
            FieldId::UtcTimeDate => 14,
            // "-2147483648" plus the unit letter
            FieldId::Temperature => 12,
            FieldId::BandSummary => FIELD_BUFFER,
            FieldId::DayBandQuality | FieldId::NightBandQuality => 32,
        }
    }

    fn index(self) -> usize {
        match self {
            FieldId::LocalTime => 0,
            FieldId::LocalDate => 1,
            FieldId::UtcTimeDate => 2,
            FieldId::Temperature => 3,
            FieldId::BandSummary => 4,
            FieldId::DayBandQuality => 5,
            FieldId::NightBandQuality => 6,
        }
    }
}

/// Fonts available on the face, named after the watch system fonts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontKey {
    Bitham42Bold,
    Gothic24Bold,
    Gothic18Bold,
    Gothic14,
}

/// Visual attributes fixed at creation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldStyle {
    pub frame: Rectangle,
    pub font: FontKey,
    pub foreground: BinaryColor,
    /// `None` is a clear background
    pub background: Option<BinaryColor>,
    pub alignment: Alignment,
}

/// One text region.
#[derive(Debug)]
pub struct TextField {
    id: FieldId,
    style: FieldStyle,
    text: String<FIELD_BUFFER>,
}

impl TextField {
    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn style(&self) -> &FieldStyle {
        &self.style
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Ink colors. The watch draws black-on-white with `On` as black ink.
const BLACK: BinaryColor = BinaryColor::On;
const WHITE: BinaryColor = BinaryColor::Off;

/// The set of fields of one visible screen.
///
/// Created when the screen is shown and dropped when it is hidden. Holding
/// a `&mut Surface` is the only way to write a field, so nothing can touch
/// a field after the screen is gone.
#[derive(Debug)]
pub struct Surface {
    size: Size,
    fields: [TextField; 7],
    revision: u64,
    strict: bool,
}

impl Surface {
    /// Create every field with its placeholder text.
    pub fn create(width: u32, height: u32) -> Self {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);

        let field = |id, frame, font, foreground, background, alignment, placeholder: &str| {
            let mut text = String::new();
            // Placeholders are compile-time constants well under capacity
            let _ = text.push_str(placeholder);
            TextField {
                id,
                style: FieldStyle {
                    frame,
                    font,
                    foreground,
                    background,
                    alignment,
                },
                text,
            }
        };
        let rect = |x: i32, y: i32, rw: i32, rh: i32| {
            Rectangle::new(Point::new(x, y), Size::new(rw.max(0) as u32, rh.max(0) as u32))
        };

        let fields = [
            field(
                FieldId::LocalTime,
                rect(0, 0, w, 75),
                FontKey::Bitham42Bold,
                WHITE,
                Some(BLACK),
                Alignment::Center,
                "00:00",
            ),
            field(
                FieldId::LocalDate,
                rect(14, 42, 50, 30),
                FontKey::Gothic24Bold,
                WHITE,
                None,
                Alignment::Left,
                "JAN 00",
            ),
            field(
                FieldId::UtcTimeDate,
                rect(0, h - 30, w, 30),
                FontKey::Gothic18Bold,
                WHITE,
                Some(BLACK),
                Alignment::Center,
                "00:00 JAN 01",
            ),
            field(
                FieldId::Temperature,
                rect(w - 48, 42, 30, 30),
                FontKey::Gothic24Bold,
                WHITE,
                None,
                Alignment::Left,
                "...",
            ),
            field(
                FieldId::BandSummary,
                rect(5, 75, w, 60),
                FontKey::Gothic14,
                BLACK,
                None,
                Alignment::Left,
                BAND_LOADING,
            ),
            field(
                FieldId::DayBandQuality,
                rect(65, 75, 30, 60),
                FontKey::Gothic14,
                BLACK,
                None,
                Alignment::Left,
                "",
            ),
            field(
                FieldId::NightBandQuality,
                rect(100, 75, 30, 60),
                FontKey::Gothic14,
                BLACK,
                None,
                Alignment::Left,
                "",
            ),
        ];

        log::debug!("Surface created at {}x{}", width, height);
        Surface {
            size: Size::new(width, height),
            fields,
            revision: 0,
            strict: false,
        }
    }

    /// Make overflowing writes panic in debug builds instead of only
    /// returning an error.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Bumped on every successful write.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn field(&self, id: FieldId) -> &TextField {
        &self.fields[id.index()]
    }

    pub fn text(&self, id: FieldId) -> &str {
        self.field(id).text()
    }

    /// Fields in stacking order.
    pub fn fields(&self) -> impl Iterator<Item = &TextField> {
        self.fields.iter()
    }

    /// Replace a field's text.
    pub fn set_text(&mut self, id: FieldId, text: &str) -> Result<(), DisplayError> {
        self.format_into(id, |out| out.write_str(text))
    }

    /// Format straight into a field.
    ///
    /// The closure writes into scratch space bounded by the field's
    /// capacity; the field only changes if the whole text fits.
    pub fn format_into<F>(&mut self, id: FieldId, write: F) -> Result<(), DisplayError>
    where
        F: FnOnce(&mut dyn Write) -> fmt::Result,
    {
        let capacity = id.capacity();
        let mut scratch = Bounded::new(capacity);
        let outcome = write(&mut scratch);

        if outcome.is_err() || scratch.overflowed {
            let err = DisplayError::Overflow {
                field: id,
                len: scratch.attempted,
                capacity,
            };
            debug_assert!(!self.strict, "{}", err);
            return Err(err);
        }

        let field = &mut self.fields[id.index()];
        if field.text != scratch.text {
            field.text = scratch.text;
            self.revision += 1;
        }
        Ok(())
    }
}

/// Writer that refuses anything past `capacity` bytes.
struct Bounded {
    text: String<FIELD_BUFFER>,
    capacity: usize,
    attempted: usize,
    overflowed: bool,
}

impl Bounded {
    fn new(capacity: usize) -> Self {
        Bounded {
            text: String::new(),
            capacity: capacity.min(FIELD_BUFFER),
            attempted: 0,
            overflowed: false,
        }
    }
}

impl Write for Bounded {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.attempted += s.len();
        if self.overflowed || self.text.len() + s.len() > self.capacity {
            self.overflowed = true;
            return Ok(());
        }
        self.text.push_str(s).map_err(|_| fmt::Error)
    }
}
