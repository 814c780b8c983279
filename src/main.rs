use std::{
    env,
    fs::OpenOptions,
    io::Write,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use env_logger::{Builder, Target};
use log::{error, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use stillframe_drm::DisplaySession;
use stillframe_shared::{GlobalArgs, Pattern, RawImage};

fn main() -> anyhow::Result<()> {
    let Some(args) = GlobalArgs::parse(env::args().skip(1)) else {
        return Ok(());
    };

    init_logger(args.log_file.as_deref())?;

    run_app(&args).inspect_err(|err| error!("An error occurred: {err}"))
}

fn init_logger(log_file: Option<&str>) -> anyhow::Result<()> {
    let mut builder = Builder::from_default_env();
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context("Failed to open log file")?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.format(|buf, record| writeln!(buf, "[{:<5}] {}", record.level(), record.args()));
    builder.init();

    Ok(())
}

/// Brings one frame onto the display, holds it, and tears everything down.
fn run_app(args: &GlobalArgs) -> anyhow::Result<()> {
    let mut session = DisplaySession::open(&args.device)?;
    let (width, height) = session.resolution();

    let image = match &args.image {
        Some(path) => RawImage::from_file(path, width, height)?,
        None => pattern_image(args.pattern, width, height),
    };

    session.draw(image.pixels(), image.width(), image.height())?;
    info!("Frame is on screen, holding for {}s", args.hold.as_secs());

    hold(args.hold)?;

    session.close();
    Ok(())
}

fn pattern_image(pattern: Pattern, width: u32, height: u32) -> RawImage {
    match pattern {
        Pattern::Bars => RawImage::color_bars(width, height),
        Pattern::Gradient => RawImage::gradient(width, height),
        Pattern::Checker => RawImage::checkerboard(width, height, 64, (255, 255, 255), (0, 0, 0)),
    }
}

/// Blocks until the hold duration elapses or a termination signal arrives.
fn hold(duration: Duration) -> anyhow::Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGTERM, Arc::clone(&stop))
        .context("Failed to register SIGTERM handler")?;
    signal_hook::flag::register(SIGINT, Arc::clone(&stop))
        .context("Failed to register SIGINT handler")?;

    if wait_until(Instant::now() + duration, &stop) {
        info!("Received termination signal, releasing the display early");
    }

    Ok(())
}

/// Sleeps in short slices until `deadline` passes or `stop` is set.
/// Returns whether the wait was stopped early.
fn wait_until(deadline: Instant, stop: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(200);

    loop {
        if stop.load(Ordering::Relaxed) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(SLICE.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_until_returns_once_the_deadline_has_passed() {
        let stop = AtomicBool::new(false);

        assert!(!wait_until(Instant::now(), &stop));
    }

    #[test]
    fn wait_until_stops_early_when_the_flag_is_set() {
        let stop = AtomicBool::new(true);
        let deadline = Instant::now() + Duration::from_secs(3600);

        let start = Instant::now();
        assert!(wait_until(deadline, &stop));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn pattern_image_matches_the_requested_resolution() {
        let image = pattern_image(Pattern::Gradient, 64, 48);

        assert_eq!(image.width(), 64);
        assert_eq!(image.height(), 48);
        assert_eq!(image.pixels().len(), 64 * 48);
    }
}
