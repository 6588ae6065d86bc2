//! # Hamface Desktop Host
//!
//! Runs the watch face on a desktop. The binary stands in for the watch
//! platform: it delivers minute ticks from the system clock, reads companion
//! messages as JSON objects (one per line) from stdin, writes outbound
//! requests as JSON lines to stdout and redraws the screen to stderr.
//!
//! `--stdout` renders a single frame to stdout and exits, for checking the
//! layout without a companion.

use anyhow::Context;
use hamface::companion::{dictionary_to_json, encode_json};
use hamface::config::{Config, CONFIG_FILE};
use hamface::host::{CompanionChannel, HostClock, MinuteSchedule, SystemClock};
use hamface::message::{Dictionary, MessageResult};
use hamface::renderer::{describe, draw_ascii};
use hamface::watchface::{Event, FaceSettings, WatchFace};
use std::env;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Companion link over stdout: each request becomes one JSON line.
///
/// Writes complete synchronously, so every accepted payload is reported
/// back as delivered on the next pass of the host loop.
#[derive(Default)]
struct StdoutChannel {
    delivered: usize,
}

impl StdoutChannel {
    fn take_delivered(&mut self) -> usize {
        std::mem::take(&mut self.delivered)
    }
}

impl CompanionChannel for StdoutChannel {
    fn send(&mut self, payload: &[u8]) -> Result<(), MessageResult> {
        let dict = Dictionary::decode(payload).map_err(|e| {
            log::error!("Refusing malformed outbound payload: {}", e);
            MessageResult::InvalidArgs
        })?;

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", dictionary_to_json(&dict))
            .and_then(|_| stdout.flush())
            .map_err(|e| {
                log::warn!("Companion pipe closed: {}", e);
                MessageResult::NotConnected
            })?;

        self.delivered += 1;
        Ok(())
    }
}

type Face = WatchFace<SystemClock, StdoutChannel>;

/// Dispatch everything queued, feed back send completions, and redraw the
/// screen if any field changed since the last frame.
fn settle(face: &mut Face, last_drawn: &mut Option<u64>) {
    face.run_pending();
    for _ in 0..face.channel_mut().take_delivered() {
        face.post(Event::OutboxSent);
    }
    face.run_pending();

    let Some(surface) = face.surface() else {
        return;
    };
    if *last_drawn != Some(surface.revision()) {
        eprint!("{}", draw_ascii(surface));
        log::debug!("{}", describe(surface));
        *last_drawn = Some(surface.revision());
    }
}

fn local_now(face: &Face) -> chrono::DateTime<chrono::FixedOffset> {
    let now = face.clock().now();
    now.with_timezone(&face.clock().local_offset(now))
}

/// Drive the face until `shutdown` resolves, then hide it and hand it back.
///
/// `input` yields companion JSON lines. `shutdown` is pinned once and
/// polled again on every pass of the loop.
async fn run<R, S>(mut face: Face, input: R, shutdown: S) -> anyhow::Result<Face>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = std::io::Result<()>>,
{
    let mut lines = input.lines();
    let mut input_open = true;
    let mut last_drawn = None;
    let mut schedule = MinuteSchedule::starting_at(face.clock().now());
    tokio::pin!(shutdown);

    face.post(Event::Show);
    loop {
        settle(&mut face, &mut last_drawn);

        let wait = schedule.wait(face.clock().now());
        tokio::select! {
            _ = tokio::time::sleep(wait), if face.wants_ticks() => {
                schedule.fire(face.clock().now());
                let local = local_now(&face);
                face.post(Event::Tick(local));
            }
            line = lines.next_line(), if input_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match encode_json(&line) {
                    Ok(bytes) => face.post(Event::InboxReceived(bytes)),
                    Err(e) => log::warn!("Ignoring companion line: {}", e),
                },
                Ok(None) => {
                    log::info!("Companion input closed");
                    input_open = false;
                }
                Err(e) => {
                    log::warn!("Companion input failed: {}", e);
                    input_open = false;
                }
            },
            signal = &mut shutdown => {
                signal.context("listen for Ctrl-C")?;
                face.post(Event::Hide);
                face.run_pending();
                log::info!("Watch face closed");
                return Ok(face);
            }
        }
    }
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    // Development mode: render one frame to stdout
    let args: Vec<String> = env::args().collect();
    let development_mode = args.iter().any(|arg| arg == "--stdout");
    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

    let config = Config::load_from_path(&config_path);
    let clock = SystemClock::new(&config, Some(config_path));
    let mut face = WatchFace::new(clock, StdoutChannel::default(), FaceSettings::from(&config));

    if development_mode {
        face.post(Event::Show);
        face.run_pending();
        let surface = face.surface().context("screen did not appear")?;
        print!("{}", draw_ascii(surface));
        return Ok(());
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start runtime")?;
    let input = BufReader::new(tokio::io::stdin());
    rt.block_on(run(face, input, tokio::signal::ctrl_c()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::Poll;

    fn face() -> Face {
        let config = Config::default();
        WatchFace::new(
            SystemClock::new(&config, None),
            StdoutChannel::default(),
            FaceSettings::from(&config),
        )
    }

    #[tokio::test]
    async fn test_shutdown_hides_the_face() {
        let ready = std::future::ready(Ok::<(), std::io::Error>(()));
        let face = run(face(), tokio::io::empty(), ready)
            .await
            .unwrap();
        assert!(face.surface().is_none());
        assert!(!face.wants_ticks());
    }

    #[tokio::test]
    async fn test_shutdown_raised_after_first_pass_is_seen() {
        // Pending on the first poll, ready on any later one
        let mut polled = false;
        let shutdown = std::future::poll_fn(move |cx| {
            if polled {
                Poll::Ready(Ok::<(), std::io::Error>(()))
            } else {
                polled = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        });
        let input: &[u8] = b"{\"KEY_TEMPERATURE_F\": 72}\n";
        let face = run(face(), input, shutdown).await.unwrap();
        assert!(face.surface().is_none());
    }
}
