use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use objectlens::config::{AppConfig, CameraSettings};
use objectlens::detect::StubBackend;
use objectlens::{
    run_interactive, run_session, BackendRegistry, DetectorBackend, HostEvent, Inbox,
    ModelGateway, RecordingNotifier, RefreshDriver, Session, TickEnd, Ui,
};

fn stub_session(snapshot: &Path, registry: BackendRegistry) -> (Session, RecordingNotifier) {
    let config = AppConfig {
        camera: CameraSettings {
            device: "stub://desk".to_string(),
            width: 64,
            height: 48,
        },
        snapshot_path: snapshot.to_path_buf(),
        ..AppConfig::default()
    };
    let notifier = RecordingNotifier::new();
    let gateway = ModelGateway::new(registry, config.model.clone());
    let session = Session::new(&config, gateway, Ui::quiet(), Box::new(notifier.clone()));
    (session, notifier)
}

fn fast_driver() -> RefreshDriver {
    RefreshDriver::new(1000)
}

#[test]
fn interrupt_after_rendering_saves_the_last_render() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let snapshot = dir.path().join("shot.png");
    let (mut session, notices) = stub_session(&snapshot, BackendRegistry::with_builtin());
    let (tx, rx) = mpsc::channel();
    let mut inbox = Inbox::new(rx);
    let mut driver = fast_driver();

    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        let _ = tx.send(HostEvent::Interrupt);
        tx
    });
    let report = run_session(&mut session, &mut driver, &mut inbox, Some(10_000), true)?;
    let _tx = interrupter.join();

    assert_eq!(report.end, TickEnd::Interrupted);
    assert!(report.rendered > 0 && report.rendered < 10_000);
    let decoded = image::open(&snapshot)?;
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
    assert!(!session.is_active());
    assert_eq!(session.active_tracks(), 0);
    assert!(notices.messages().is_empty());
    Ok(())
}

#[test]
fn frame_limit_run_saves_snapshot_and_stops() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let snapshot = dir.path().join("shot.png");
    let (mut session, _notices) = stub_session(&snapshot, BackendRegistry::with_builtin());
    let (_tx, rx) = mpsc::channel();
    let mut inbox = Inbox::new(rx);

    let report = run_session(&mut session, &mut fast_driver(), &mut inbox, Some(4), true)?;

    assert_eq!(report.rendered, 4);
    assert_eq!(report.end, TickEnd::Limit);
    assert!(snapshot.exists());
    assert!(!session.is_active());
    Ok(())
}

#[test]
fn interrupt_during_slow_model_load_is_not_lost() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let snapshot = dir.path().join("shot.png");
    let (tx, rx) = mpsc::channel();
    let mut inbox = Inbox::new(rx);

    let mut registry = BackendRegistry::new();
    registry.register("stub", move |_| {
        // Ctrl-C lands while the model is still loading.
        let _ = tx.send(HostEvent::Interrupt);
        thread::sleep(Duration::from_millis(20));
        Ok(Box::new(StubBackend::new()) as Box<dyn DetectorBackend>)
    });
    let (mut session, _notices) = stub_session(&snapshot, registry);

    let report = run_session(&mut session, &mut fast_driver(), &mut inbox, None, false)?;

    assert_eq!(report.end, TickEnd::Interrupted);
    assert_eq!(report.rendered, 0);
    assert_eq!(session.loop_runs(), 1);
    assert!(!session.is_active());
    Ok(())
}

#[test]
fn interactive_loop_leaves_on_interrupt_without_eof() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (mut session, _notices) =
        stub_session(&dir.path().join("shot.png"), BackendRegistry::with_builtin());
    let (tx, rx) = mpsc::channel();
    let mut inbox = Inbox::new(rx);
    for line in ["start", "tick 2", "status"] {
        tx.send(HostEvent::Command(line.to_string()))?;
    }
    // stdin stays open; only Ctrl-C can end the loop.
    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        let _ = tx.send(HostEvent::Interrupt);
        tx
    });

    let mut out = Vec::new();
    run_interactive(&mut session, &mut fast_driver(), &mut inbox, &mut out)?;
    let _tx = interrupter.join();

    let text = String::from_utf8(out)?;
    assert!(text.contains("rendered 2"));
    assert!(text.contains("mode=webcam active"));
    assert!(!session.is_active());
    Ok(())
}

#[test]
fn interrupt_cuts_an_interactive_tick_short() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (mut session, _notices) =
        stub_session(&dir.path().join("shot.png"), BackendRegistry::with_builtin());
    let (tx, rx) = mpsc::channel();
    let mut inbox = Inbox::new(rx);
    tx.send(HostEvent::Command("start".to_string()))?;
    tx.send(HostEvent::Command("tick 1000".to_string()))?;
    tx.send(HostEvent::Interrupt)?;

    let mut out = Vec::new();
    run_interactive(&mut session, &mut fast_driver(), &mut inbox, &mut out)?;

    let text = String::from_utf8(out)?;
    assert!(text.contains("rendered 0"));
    assert!(!session.is_active());
    Ok(())
}

#[test]
fn interactive_loop_ends_with_input() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (mut session, _notices) =
        stub_session(&dir.path().join("shot.png"), BackendRegistry::with_builtin());
    let (tx, rx) = mpsc::channel();
    let mut inbox = Inbox::new(rx);
    for line in ["mode video", "bogus", "start"] {
        tx.send(HostEvent::Command(line.to_string()))?;
    }
    tx.send(HostEvent::EndOfInput)?;

    let mut out = Vec::new();
    run_interactive(&mut session, &mut fast_driver(), &mut inbox, &mut out)?;

    let text = String::from_utf8(out)?;
    assert!(text.contains("unknown command: bogus"));
    assert!(!session.is_active());
    Ok(())
}
