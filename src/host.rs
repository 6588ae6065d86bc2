//! # Host Services
//!
//! The watch face never talks to the platform directly. It reads time
//! through [`HostClock`] and sends companion requests through
//! [`CompanionChannel`]; the host binary and the tests provide the
//! implementations.

use crate::config::Config;
use crate::message::MessageResult;
use crate::ClockStyle;
use chrono::{DateTime, FixedOffset, Local, TimeDelta, TimeZone, Timelike, Utc};
use std::path::PathBuf;
use std::time::Duration;

/// Slack added past the boundary so a timer never fires a hair early and
/// reads the previous minute.
const TICK_SLACK: Duration = Duration::from_millis(5);

/// Wall clock and the wearer's clock preference.
pub trait HostClock {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Local UTC offset in effect at `at`.
    fn local_offset(&self, at: DateTime<Utc>) -> FixedOffset;

    /// 12/24-hour preference, read fresh on every call.
    fn clock_style(&self) -> ClockStyle;
}

/// Outbound half of the companion link.
///
/// `send` only hands the payload over. Delivery is reported later by the
/// host as an `OutboxSent` or `OutboxFailed` event; an `Err` here means the
/// payload was refused outright and no completion will follow.
pub trait CompanionChannel {
    fn send(&mut self, payload: &[u8]) -> Result<(), MessageResult>;
}

/// Time left until the next wall-clock minute boundary after `now`.
pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    MinuteSchedule::starting_at(now).wait(now)
}

/// The next minute boundary a host still owes a tick for.
///
/// The boundary only moves when [`MinuteSchedule::fire`] is called, so a
/// host woken early by other input keeps waiting for the same boundary, and
/// one woken late fires at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteSchedule {
    next: DateTime<Utc>,
}

impl MinuteSchedule {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        MinuteSchedule {
            next: next_boundary(now),
        }
    }

    /// Boundary the next tick belongs to.
    pub fn next(&self) -> DateTime<Utc> {
        self.next
    }

    /// Time to sleep before firing; zero once the boundary has passed.
    pub fn wait(&self, now: DateTime<Utc>) -> Duration {
        match (self.next - now).to_std() {
            Ok(left) => left + TICK_SLACK,
            Err(_) => Duration::ZERO,
        }
    }

    /// Record the tick delivered at `now` and move to the boundary after it.
    pub fn fire(&mut self, now: DateTime<Utc>) {
        self.next = next_boundary(now.max(self.next));
    }
}

fn next_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    // Zeroing seconds and nanos is always valid on a UTC instant
    let minute = now
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    minute + TimeDelta::minutes(1)
}

/// The machine's own clock.
///
/// When constructed with a settings path, the clock style is re-read from
/// that file on every call so edits take effect on the next tick.
#[derive(Debug, Clone)]
pub struct SystemClock {
    settings: Option<PathBuf>,
    default_style: ClockStyle,
    fixed_offset: Option<FixedOffset>,
}

impl SystemClock {
    pub fn new(config: &Config, settings: Option<PathBuf>) -> Self {
        let fixed_offset = config
            .clock
            .utc_offset_minutes
            .and_then(|minutes| minutes.checked_mul(60))
            .and_then(FixedOffset::east_opt);
        if config.clock.utc_offset_minutes.is_some() && fixed_offset.is_none() {
            log::warn!(
                "Ignoring out-of-range utc_offset_minutes {:?}, using system zone",
                config.clock.utc_offset_minutes
            );
        }

        SystemClock {
            settings,
            default_style: config.clock.style,
            fixed_offset,
        }
    }
}

impl HostClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_offset(&self, at: DateTime<Utc>) -> FixedOffset {
        self.fixed_offset
            .unwrap_or_else(|| Local.offset_from_utc_datetime(&at.naive_utc()))
    }

    fn clock_style(&self) -> ClockStyle {
        let Some(path) = &self.settings else {
            return self.default_style;
        };
        match Config::read_from_path(path) {
            Ok(config) => config.clock.style,
            Err(e) => {
                log::debug!("Clock style unreadable ({}), keeping default", e);
                self.default_style
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_until_next_minute() {
        let at = Utc.with_ymd_and_hms(2024, 1, 5, 13, 7, 45).unwrap();
        assert_eq!(until_next_minute(at), Duration::from_secs(15) + TICK_SLACK);

        let on_boundary = Utc.with_ymd_and_hms(2024, 1, 5, 13, 8, 0).unwrap();
        assert_eq!(until_next_minute(on_boundary), Duration::from_secs(60) + TICK_SLACK);
    }

    #[test]
    fn test_early_wakeup_keeps_the_pending_boundary() {
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 12, 29, 40).unwrap();
        let mut schedule = MinuteSchedule::starting_at(start);
        let boundary = Utc.with_ymd_and_hms(2024, 1, 5, 12, 30, 0).unwrap();
        assert_eq!(schedule.next(), boundary);

        // Input arrives 3ms past the boundary, inside the slack
        let woken = boundary + TimeDelta::milliseconds(3);
        assert_eq!(schedule.wait(woken), Duration::ZERO);

        schedule.fire(woken);
        assert_eq!(schedule.next(), boundary + TimeDelta::minutes(1));
        assert!(schedule.wait(woken) > Duration::from_secs(59));
    }

    #[test]
    fn test_wait_before_boundary_includes_slack() {
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 12, 29, 40).unwrap();
        let schedule = MinuteSchedule::starting_at(start);
        let early = Utc.with_ymd_and_hms(2024, 1, 5, 12, 29, 58).unwrap();
        assert_eq!(schedule.wait(early), Duration::from_secs(2) + TICK_SLACK);
    }

    #[test]
    fn test_late_fire_skips_to_the_following_boundary() {
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 12, 29, 40).unwrap();
        let mut schedule = MinuteSchedule::starting_at(start);
        let late = Utc.with_ymd_and_hms(2024, 1, 5, 12, 32, 10).unwrap();
        schedule.fire(late);
        assert_eq!(
            schedule.next(),
            Utc.with_ymd_and_hms(2024, 1, 5, 12, 33, 0).unwrap()
        );
    }

    #[test]
    fn test_style_follows_settings_file_edits() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[clock]\nstyle = \"12h\"").unwrap();

        let clock = SystemClock::new(&Config::default(), Some(file.path().to_path_buf()));
        assert_eq!(clock.clock_style(), ClockStyle::TwelveHour);

        std::fs::write(file.path(), "[clock]\nstyle = \"24h\"\n").unwrap();
        assert_eq!(clock.clock_style(), ClockStyle::TwentyFourHour);
    }

    #[test]
    fn test_missing_settings_use_default_style() {
        let mut config = Config::default();
        config.clock.style = ClockStyle::TwelveHour;
        let clock = SystemClock::new(&config, Some(PathBuf::from("/nonexistent/hamface.toml")));
        assert_eq!(clock.clock_style(), ClockStyle::TwelveHour);
    }

    #[test]
    fn test_fixed_offset_from_config() {
        let mut config = Config::default();
        config.clock.utc_offset_minutes = Some(-300);
        let clock = SystemClock::new(&config, None);
        let offset = clock.local_offset(Utc::now());
        assert_eq!(offset.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_system_zone() {
        let mut config = Config::default();
        config.clock.utc_offset_minutes = Some(100_000);
        let clock = SystemClock::new(&config, None);
        let at = Utc::now();
        assert_eq!(
            clock.local_offset(at),
            Local.offset_from_utc_datetime(&at.naive_utc())
        );
    }
}
