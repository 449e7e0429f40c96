//! objectlens - run object detection over a webcam, image, or video
//!
//! Non-interactive runs start immediately with the given mode and input and
//! tick the capture loop until it ends, `--frames` passes have rendered, or
//! Ctrl-C is pressed. `--interactive` reads line commands from stdin instead.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};

use objectlens::{
    run_interactive, run_session, AppConfig, BackendRegistry, HostEvent, Inbox, InputMode,
    ModelGateway, RefreshDriver, Session, StderrNotifier, Ui,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input mode (webcam|image|video).
    #[arg(long, default_value = "webcam", value_name = "MODE")]
    mode: String,
    /// Image or video file for the image/video modes.
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,
    /// Camera device (e.g. /dev/video0 or stub://cam).
    #[arg(long, value_name = "DEV")]
    device: Option<String>,
    /// Detector backend name (overrides config).
    #[arg(long)]
    backend: Option<String>,
    /// Stop after this many rendered passes.
    #[arg(long)]
    frames: Option<u64>,
    /// Write a PNG snapshot of the last render here when the run ends.
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,
    /// UI mode for the loading indicator (auto|plain|pretty|quiet)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
    /// Read commands from stdin (mode, file, start, stop, capture, tick, status, quit).
    #[arg(long)]
    interactive: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty);

    let mut config = AppConfig::load()?;
    if let Some(device) = &args.device {
        config.camera.device = device.clone();
    }
    if let Some(backend) = &args.backend {
        config.model.backend = backend.clone();
    }
    if let Some(path) = &args.snapshot {
        config.snapshot_path = path.clone();
    }
    config.validate()?;

    let registry = BackendRegistry::with_builtin();
    log::info!("detector backends: {}", registry.list().join(", "));
    let mut gateway = ModelGateway::new(registry, config.model.clone());
    // Start retries the load, so a failed preload is only a warning.
    if let Err(err) = gateway.load() {
        log::warn!("model preload failed: {:#}", err);
    }
    let mut session = Session::new(&config, gateway, ui, Box::new(StderrNotifier));

    let (tx, rx) = mpsc::channel();
    let interrupt = tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt.send(HostEvent::Interrupt);
    })
    .context("set Ctrl-C handler")?;
    let mut inbox = Inbox::new(rx);

    let mut driver = RefreshDriver::new(config.refresh_fps);
    if args.interactive {
        spawn_stdin_reader(tx);
        let mut stdout = std::io::stdout();
        run_interactive(&mut session, &mut driver, &mut inbox, &mut stdout)
    } else {
        let mode: InputMode = args.mode.parse()?;
        session.select_mode(mode);
        if mode.needs_file() {
            session.choose_file(args.input.clone())?;
        }
        let report = run_session(
            &mut session,
            &mut driver,
            &mut inbox,
            args.frames,
            args.snapshot.is_some(),
        )?;
        log::info!("{} pass(es) rendered", report.rendered);
        Ok(())
    }
}

/// Forward stdin lines to the host channel, then end of input.
fn spawn_stdin_reader(tx: Sender<HostEvent>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(HostEvent::Command(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(HostEvent::EndOfInput);
    });
}
