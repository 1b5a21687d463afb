//! Glossa entrypoint: ingest a reader page, render it with status highlights in
//! the terminal, and optionally replay status updates and gestures.
use anyhow::{Context, Result, bail};
use clap::Parser;
use core_config::Config;
use core_events::ReaderEvent;
use core_ingest::Ingestor;
use core_input::{Gesture, GestureDisambiguator, HitContext};
use core_model::{Status, TermId};
use core_render::{DecorationEngine, GridLayout, force_refresh};
use core_state::ReaderState;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

mod terminal;

use terminal::TerminalSurface;

const LOG_FILE: &str = "glossa.log";

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "glossa", version, about = "Annotated reading text in the terminal")]
struct Args {
    /// Markup page to read (pre-rendered or annotated HTML).
    pub path: PathBuf,
    /// Optional configuration file path (overrides discovery of `glossa.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Wrap width in terminal columns.
    #[arg(long, default_value_t = 80)]
    pub width: u16,
    /// Status update `TERM=STATUS`, applied in order after the first frame.
    #[arg(long = "set", value_parser = parse_update)]
    pub updates: Vec<(TermId, Status)>,
    /// Simulated tap at `COL,ROW`; consecutive taps are `--tap-gap-ms` apart.
    #[arg(long = "tap", value_parser = parse_point)]
    pub taps: Vec<(f32, f32)>,
    #[arg(long = "tap-gap-ms", default_value_t = 300)]
    pub tap_gap_ms: u64,
    /// Simulated long press at `COL,ROW`.
    #[arg(long = "long-press", value_parser = parse_point)]
    pub long_presses: Vec<(f32, f32)>,
}

fn parse_update(s: &str) -> Result<(TermId, Status)> {
    let Some((term, status)) = s.split_once('=') else {
        bail!("expected TERM=STATUS, got {s:?}");
    };
    let term: u64 = term.trim().parse().context("term id")?;
    let status: i32 = status.trim().parse().context("status")?;
    Ok((TermId(term), Status(status)))
}

fn parse_point(s: &str) -> Result<(f32, f32)> {
    let Some((x, y)) = s.split_once(',') else {
        bail!("expected COL,ROW, got {s:?}");
    };
    Ok((x.trim().parse()?, y.trim().parse()?))
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join(LOG_FILE);
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        if tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
            .is_ok()
        {
            self.log_guard = Some(guard);
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

fn load_state(args: &Args, config: &Config) -> Result<ReaderState> {
    let markup = std::fs::read_to_string(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;
    let doc = Ingestor::new(config.file.markup.clone()).parse(&markup);
    info!(
        target: "runtime.startup",
        path = %args.path.display(),
        paragraphs = doc.paragraph_count(),
        segments = doc.segment_count(),
        config_override = args.config.is_some(),
        "bootstrap_complete"
    );
    Ok(ReaderState::new(
        &doc.paragraphs,
        DecorationEngine::from_config(&config.file),
    ))
}

/// Replay the simulated gestures against the current layout; events go to `tx`.
fn replay_gestures(
    args: &Args,
    state: &ReaderState,
    config: &Config,
    mut tx: mpsc::UnboundedSender<ReaderEvent>,
) {
    let grid = GridLayout::with_decorations(
        state.flat().buffer(),
        args.width,
        1.0,
        1.0,
        state.layer(),
    );
    let ctx = HitContext::new(state.flat(), Some(&grid));
    let mut gestures = GestureDisambiguator::from_config(&config.file.gesture);
    let gap = Duration::from_millis(args.tap_gap_ms);
    let mut now = Instant::now();
    for &(x, y) in &args.taps {
        gestures.handle(&ctx, Gesture::TapDown { x, y }, now, &mut tx);
        gestures.handle(&ctx, Gesture::TapUp { x, y }, now, &mut tx);
        now += gap;
    }
    for &(x, y) in &args.long_presses {
        now += config.file.gesture.long_press_threshold();
        gestures.handle(&ctx, Gesture::TapDown { x, y }, now, &mut tx);
        gestures.handle(&ctx, Gesture::LongPress { x, y }, now, &mut tx);
    }
    gestures.poll(now + gestures.window(), &mut tx);
}

fn describe(event: &ReaderEvent) -> String {
    match event {
        ReaderEvent::WordTapped {
            term_id,
            text,
            screen_x,
            screen_y,
            segment_id,
        } => format!(
            "word_tapped term={} segment={} text={text:?} at=({screen_x},{screen_y})",
            term_id.0, segment_id.0
        ),
        ReaderEvent::SentenceLongPressed {
            sentence,
            language_id,
            screen_x,
            screen_y,
        } => format!(
            "sentence_long_pressed language={} sentence={sentence:?} at=({screen_x},{screen_y})",
            language_id.0
        ),
        ReaderEvent::SingleTap(t) | ReaderEvent::DoubleTap(t) => format!(
            "{} term={} segment={} text={:?}",
            event.name(),
            t.term_id.0,
            t.segment_id.0,
            t.text
        ),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = core_config::load_from(args.config.clone())?;
    let mut state = load_state(&args, &config)?;

    let mut surface = TerminalSurface::new(std::io::stdout(), args.width);
    let full = 0..state.flat().len();
    force_refresh(&mut surface, &state.rendered(), &[full]);

    if !args.updates.is_empty() {
        for report in state.update_many(args.updates.iter().copied(), &mut surface) {
            if report.segments_updated == 0 {
                warn!(target: "runtime", term = report.term.0, "update_matched_nothing");
            }
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    replay_gestures(&args, &state, &config, tx);
    while let Some(event) = rx.recv().await {
        println!("{}", describe(&event));
    }

    info!(target: "runtime", frames = surface.frames(), "shutdown");
    Ok(())
}
