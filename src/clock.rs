//! # Clock Formatter
//!
//! Turns a timestamp into the three clock strings on the face:
//!
//! | field         | 24h            | 12h            |
//! |---------------|----------------|----------------|
//! | local time    | `%H:%M`        | `%I:%M`        |
//! | local date    | `%b %d`        | `%b %d`        |
//! | UTC time/date | `%H:%M \| %b %d` | `%H:%M \| %b %d` |
//!
//! There is never an AM/PM suffix: midnight is `00:00` or `12:00`. With
//! [`UtcFormat::TimeOnly`] the UTC field shows only the time, following the
//! same 12/24-hour rule as local time.
//!
//! The writers are pure functions of their inputs and write into any
//! `fmt::Write`, which lets [`refresh`] format straight into the bounded
//! buffers of the [`Surface`].

use crate::display::{DisplayError, FieldId, Surface};
use crate::host::HostClock;
use crate::ClockStyle;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Write};

/// What the UTC banner shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtcFormat {
    /// `18:05 | Jan 05`
    #[default]
    TimeAndDate,
    /// `18:05`
    TimeOnly,
}

fn time_pattern(style: ClockStyle) -> &'static str {
    match style {
        ClockStyle::TwentyFourHour => "%H:%M",
        ClockStyle::TwelveHour => "%I:%M",
    }
}

/// Hour and minute in the wearer's style.
pub fn write_local_time<Tz>(out: &mut dyn Write, t: &DateTime<Tz>, style: ClockStyle) -> fmt::Result
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    write!(out, "{}", t.format(time_pattern(style)))
}

/// Abbreviated month and zero-padded day.
pub fn write_local_date<Tz>(out: &mut dyn Write, t: &DateTime<Tz>) -> fmt::Result
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    write!(out, "{}", t.format("%b %d"))
}

/// The UTC banner.
pub fn write_utc<Tz>(
    out: &mut dyn Write,
    t: &DateTime<Tz>,
    style: ClockStyle,
    format: UtcFormat,
) -> fmt::Result
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match format {
        UtcFormat::TimeAndDate => write!(out, "{}", t.format("%H:%M | %b %d")),
        UtcFormat::TimeOnly => write_local_time(out, t, style),
    }
}

/// Reformat every clock field from a fresh timestamp.
///
/// The timestamp and the clock style are both read from the host on each
/// call; nothing is cached between ticks.
pub fn refresh<C: HostClock + ?Sized>(
    surface: &mut Surface,
    clock: &C,
    format: UtcFormat,
) -> Result<(), DisplayError> {
    let now = clock.now();
    let style = clock.clock_style();
    let local = now.with_timezone(&clock.local_offset(now));

    surface.format_into(FieldId::LocalTime, |out| write_local_time(out, &local, style))?;
    surface.format_into(FieldId::LocalDate, |out| write_local_date(out, &local))?;
    surface.format_into(FieldId::UtcTimeDate, |out| write_utc(out, &now, style, format))?;
    Ok(())
}
