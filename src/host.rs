//! Host event loop shared by the CLI.
//!
//! Signals and stdin lines arrive as [`HostEvent`]s on one mpsc channel. The
//! signal handler only sends; the loop owning the [`Session`] decides when to
//! capture and stop, so an interrupt never tears the session down under it.

use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};

use anyhow::Result;

use crate::capture::{PassOutcome, RefreshDriver};
use crate::session::{Session, StartOutcome};
use crate::source::InputMode;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// One line typed by the user.
    Command(String),
    /// Ctrl-C.
    Interrupt,
    /// stdin closed.
    EndOfInput,
}

/// Receiving end of the host channel.
///
/// Interrupts can be polled between ticks without losing commands that
/// arrived alongside them.
pub struct Inbox {
    rx: Receiver<HostEvent>,
    pending: VecDeque<HostEvent>,
}

impl Inbox {
    pub fn new(rx: Receiver<HostEvent>) -> Self {
        Self {
            rx,
            pending: VecDeque::new(),
        }
    }

    /// Drain queued events without blocking; true if an interrupt was among them.
    pub fn interrupted(&mut self) -> bool {
        if self.pending.contains(&HostEvent::Interrupt) {
            return true;
        }
        loop {
            match self.rx.try_recv() {
                Ok(HostEvent::Interrupt) => {
                    self.pending.push_back(HostEvent::Interrupt);
                    return true;
                }
                Ok(event) => self.pending.push_back(event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Next event, blocking. A closed channel reads as end of input.
    pub fn next(&mut self) -> HostEvent {
        if let Some(event) = self.pending.pop_front() {
            return event;
        }
        self.rx.recv().unwrap_or(HostEvent::EndOfInput)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickEnd {
    /// The requested number of passes rendered.
    Limit,
    /// The loop halted or a single-pass source finished.
    Finished,
    /// An interrupt arrived; the session is left as it was.
    Interrupted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub rendered: u64,
    pub end: TickEnd,
}

/// Tick the session until it ends, `limit` passes render, or an interrupt arrives.
pub fn run_ticks(
    session: &mut Session,
    driver: &mut RefreshDriver,
    limit: Option<u64>,
    inbox: &mut Inbox,
) -> Result<TickReport> {
    let mut rendered = 0u64;
    let end = loop {
        if inbox.interrupted() {
            break TickEnd::Interrupted;
        }
        if !session.is_active() {
            break TickEnd::Finished;
        }
        if limit.is_some_and(|limit| rendered >= limit) {
            break TickEnd::Limit;
        }
        driver.wait_for_next();
        match session.on_refresh()? {
            PassOutcome::Rendered { .. } => rendered += 1,
            PassOutcome::Idle if !session.mode().is_continuous() => break TickEnd::Finished,
            PassOutcome::Idle => {}
            PassOutcome::Halted => break TickEnd::Finished,
        }
    };
    Ok(TickReport { rendered, end })
}

/// One-shot run: start, tick, optionally snapshot the last render, stop.
///
/// The snapshot is taken before Stop hides the output, including when the
/// run was interrupted.
pub fn run_session(
    session: &mut Session,
    driver: &mut RefreshDriver,
    inbox: &mut Inbox,
    limit: Option<u64>,
    snapshot: bool,
) -> Result<TickReport> {
    session.start()?;
    let report = run_ticks(session, driver, limit, inbox);
    if let Ok(report) = &report {
        if report.end == TickEnd::Interrupted {
            log::info!("interrupted after {} pass(es)", report.rendered);
        }
    }
    let saved = if !snapshot {
        Ok(())
    } else if session.canvas().is_displayed() {
        session.capture().map(drop)
    } else {
        log::warn!("no rendered frame to snapshot");
        Ok(())
    };
    session.stop();
    let report = report?;
    saved?;
    Ok(report)
}

/// Line-command loop: mode, file, start, stop, capture, tick, status, quit.
///
/// Returns on `quit`, end of input, or an interrupt.
pub fn run_interactive(
    session: &mut Session,
    driver: &mut RefreshDriver,
    inbox: &mut Inbox,
    out: &mut impl Write,
) -> Result<()> {
    prompt(out)?;
    loop {
        let line = match inbox.next() {
            HostEvent::Command(line) => line,
            HostEvent::Interrupt => {
                log::info!("interrupt received, leaving");
                break;
            }
            HostEvent::EndOfInput => break,
        };
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            prompt(out)?;
            continue;
        };
        let arg = words.next();

        // Failures are already reported through the session's notifier.
        match command {
            "mode" => match arg.map(str::parse::<InputMode>) {
                Some(Ok(mode)) => {
                    if !session.select_mode(mode) {
                        writeln!(out, "stop detection before changing mode")?;
                    }
                }
                Some(Err(err)) => writeln!(out, "{}", err)?,
                None => writeln!(out, "usage: mode webcam|image|video")?,
            },
            "file" => {
                let _ = session.choose_file(arg.map(PathBuf::from));
            }
            "start" => {
                if let Ok(StartOutcome::AlreadyActive) = session.start() {
                    writeln!(out, "detection is already running")?;
                }
            }
            "stop" => session.stop(),
            "capture" => {
                if let Ok(path) = session.capture() {
                    writeln!(out, "saved {}", path.display())?;
                }
            }
            "tick" => {
                let count = match arg.map(str::parse::<u64>) {
                    None => 1,
                    Some(Ok(count)) => count,
                    Some(Err(err)) => {
                        writeln!(out, "tick: {}", err)?;
                        prompt(out)?;
                        continue;
                    }
                };
                if let Ok(report) = run_ticks(session, driver, Some(count), inbox) {
                    writeln!(out, "rendered {}", report.rendered)?;
                }
            }
            "status" => print_status(session, out)?,
            "quit" | "exit" => break,
            other => writeln!(out, "unknown command: {}", other)?,
        }
        prompt(out)?;
    }

    session.stop();
    Ok(())
}

fn print_status(session: &Session, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{} loop={:?}", session.state(), session.loop_state())?;
    writeln!(out, "{}", session.view())?;
    let panel = session.panel();
    if panel.active {
        writeln!(out, "top: {} {}", panel.label, panel.confidence)?;
    }
    writeln!(out, "tracks: {}", session.active_tracks())?;
    writeln!(out, "snapshot: {}", session.snapshot_path().display())?;
    Ok(())
}

fn prompt(out: &mut impl Write) -> Result<()> {
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}
