use std::time::Duration;

use deposit_scanner::{
    BoundingBox, CategoryTable, ConsensusSettings, ScanController, ScanError, ScanEvent,
    ScanSession, ScanSettings, ScanState, ScriptedBackend, ScriptedRecognizer, ScriptedSource,
    SkipReason, StepOutcome, StopReason, StubBackend, StubRecognizer,
};

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;

fn settings() -> ScanSettings {
    ScanSettings {
        min_interval: Duration::ZERO,
        idle_sleep: Duration::ZERO,
        ..ScanSettings::default()
    }
}

fn item_box() -> BoundingBox {
    BoundingBox::new(40.0, 30.0, 120.0, 90.0)
}

fn controller(detector: ScriptedBackend, recognizer: ScriptedRecognizer) -> ScanController {
    ScanController::new(
        Box::new(detector),
        Box::new(recognizer),
        CategoryTable::default(),
        ConsensusSettings::default(),
        settings(),
    )
    .expect("controller")
}

fn frames(count: usize) -> ScriptedSource {
    ScriptedSource::new("test")
        .then_blank_frames(count, WIDTH, HEIGHT)
        .expect("frames")
}

#[test]
fn two_agreeing_frames_commit_once() {
    let mut ctl = controller(
        ScriptedBackend::new()
            .then_box(item_box())
            .then_box(item_box())
            .then_nothing(),
        ScriptedRecognizer::new()
            .then_text("ABCD 1234")
            .then_text("ABCD-1234"),
    );
    let mut session = ScanSession::new();
    let source = frames(3);
    let probe = source.probe();
    ctl.start(Box::new(source)).unwrap();

    let first = ctl.step(&mut session).unwrap();
    assert!(matches!(first, StepOutcome::Buffered { pending: 1, .. }));
    assert!(session.ledger().is_empty());

    let StepOutcome::Committed(commit) = ctl.step(&mut session).unwrap() else {
        panic!("expected a commit on frame 2");
    };
    assert_eq!(commit.entry.token.as_str(), "ABCD1234");
    assert_eq!(commit.entry.category, "HDPE");
    assert_eq!(commit.entry.value, 20);
    assert_eq!(commit.running_total, 20);
    assert_eq!(ctl.pending(), 0);

    assert_eq!(
        ctl.step(&mut session).unwrap(),
        StepOutcome::Skipped(SkipReason::NoDetection)
    );
    assert_eq!(
        ctl.step(&mut session).unwrap(),
        StepOutcome::Stopped(StopReason::EndOfStream)
    );

    assert_eq!(session.ledger().item_count(), 1);
    assert_eq!(session.ledger().running_total(), 20);
    assert_eq!(session.ledger().saved_images().len(), 1);
    assert_eq!(ctl.state(), ScanState::Stopped);
    assert!(!probe.is_open());
    assert_eq!(probe.releases(), 1);
}

#[test]
fn run_reports_events_in_order() {
    let mut ctl = controller(
        ScriptedBackend::new()
            .then_box(item_box())
            .then_box(item_box())
            .then_nothing(),
        ScriptedRecognizer::new().then_repeat("ABCD1234", 2),
    );
    let mut session = ScanSession::new();
    ctl.start(Box::new(frames(3))).unwrap();

    let mut events = Vec::new();
    let reason = ctl
        .run(&mut session, |event| events.push(event.clone()))
        .unwrap();

    assert_eq!(reason, StopReason::EndOfStream);
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], ScanEvent::Observed { pending: 1, .. }));
    assert!(matches!(&events[1], ScanEvent::Committed(c) if c.running_total == 20));
    assert_eq!(events[2], ScanEvent::Stopped(StopReason::EndOfStream));
}

#[test]
fn disagreement_keeps_buffering_until_majority() {
    let mut ctl = controller(
        ScriptedBackend::new()
            .then_box(item_box())
            .then_box(item_box())
            .then_box(item_box()),
        ScriptedRecognizer::new()
            .then_text("AAAA1111")
            .then_text("BBBB2222")
            .then_text("AAAA1111"),
    );
    let mut session = ScanSession::new();
    ctl.start(Box::new(frames(3))).unwrap();

    ctl.step(&mut session).unwrap();
    let second = ctl.step(&mut session).unwrap();
    assert!(matches!(second, StepOutcome::Buffered { pending: 2, .. }));
    assert_eq!(ctl.pending(), 2);
    assert!(session.ledger().is_empty());

    let StepOutcome::Committed(commit) = ctl.step(&mut session).unwrap() else {
        panic!("2 of 3 readings agree");
    };
    assert_eq!(commit.entry.token.as_str(), "AAAA1111");
    assert_eq!(ctl.pending(), 0);
}

#[test]
fn recognition_failure_and_rejects_are_skipped() {
    let mut ctl = controller(
        ScriptedBackend::new()
            .then_box(item_box())
            .then_box(item_box())
            .then_box(item_box())
            .then_box(item_box()),
        ScriptedRecognizer::new()
            .then_fail("engine crashed")
            .then_text("ABCD1234")
            .then_text("no digits here")
            .then_text("ABCD1234"),
    );
    let mut session = ScanSession::new();
    ctl.start(Box::new(frames(4))).unwrap();

    assert_eq!(
        ctl.step(&mut session).unwrap(),
        StepOutcome::Skipped(SkipReason::RecognitionFailed)
    );
    assert!(matches!(
        ctl.step(&mut session).unwrap(),
        StepOutcome::Buffered { pending: 1, .. }
    ));
    assert_eq!(
        ctl.step(&mut session).unwrap(),
        StepOutcome::Skipped(SkipReason::Rejected)
    );
    assert!(matches!(
        ctl.step(&mut session).unwrap(),
        StepOutcome::Committed(_)
    ));
    assert_eq!(ctl.state(), ScanState::Scanning);
}

#[test]
fn device_open_failure_stays_idle() {
    let mut ctl = controller(ScriptedBackend::new(), ScriptedRecognizer::new());
    let source = ScriptedSource::new("broken").failing_open("no such camera");
    let probe = source.probe();

    let err = ctl.start(Box::new(source)).unwrap_err();
    assert!(matches!(err, ScanError::Device { .. }));
    assert!(err.to_string().contains("no such camera"));
    assert_eq!(ctl.state(), ScanState::Idle);
    assert!(!probe.is_open());
}

#[test]
fn read_failure_stops_and_releases() {
    let mut ctl = controller(
        ScriptedBackend::new().then_box(item_box()),
        ScriptedRecognizer::new().then_text("ABCD1234"),
    );
    let mut session = ScanSession::new();
    let source = frames(1).then_read_error("usb disconnected");
    let probe = source.probe();
    ctl.start(Box::new(source)).unwrap();

    let mut events = Vec::new();
    let err = ctl
        .run(&mut session, |event| events.push(event.clone()))
        .unwrap_err();

    assert!(matches!(err, ScanError::Device { .. }));
    assert_eq!(ctl.state(), ScanState::Stopped);
    assert!(!probe.is_open());
    assert_eq!(probe.releases(), 1);
    assert!(matches!(
        events.last(),
        Some(ScanEvent::Stopped(StopReason::DeviceError(message))) if message.contains("usb disconnected")
    ));
}

#[test]
fn ledger_survives_stop_and_restart() {
    let mut ctl = ScanController::new(
        Box::new(StubBackend::new()),
        Box::new(StubRecognizer::new("ABCD1234")),
        CategoryTable::default(),
        ConsensusSettings::default(),
        settings(),
    )
    .unwrap();
    let mut session = ScanSession::new();

    ctl.start(Box::new(frames(2))).unwrap();
    let first = ctl.scan_item(&mut session, &mut |_: &ScanEvent| {}).unwrap();
    assert!(first.is_some());
    assert_eq!(ctl.stop().unwrap(), StopReason::Requested);
    assert_eq!(ctl.state(), ScanState::Stopped);

    // One pending reading, then stop: the restart must begin with an empty buffer.
    ctl.start(Box::new(frames(1))).unwrap();
    ctl.step(&mut session).unwrap();
    assert_eq!(ctl.pending(), 1);
    ctl.stop().unwrap();

    ctl.start(Box::new(frames(2))).unwrap();
    assert_eq!(ctl.pending(), 0);
    ctl.run(&mut session, |_| {}).unwrap();

    assert_eq!(session.ledger().item_count(), 2);
    assert_eq!(session.ledger().entries_for(&first.unwrap().entry.token).len(), 2);
    assert_eq!(session.ledger().running_total(), 40);
}

#[test]
fn new_session_only_when_not_scanning() {
    let mut ctl = ScanController::new(
        Box::new(StubBackend::new()),
        Box::new(StubRecognizer::new("ABCD1234")),
        CategoryTable::default(),
        ConsensusSettings::default(),
        settings(),
    )
    .unwrap();
    let mut session = ScanSession::new();
    let original_id = session.id().to_string();

    ctl.start(Box::new(frames(3))).unwrap();
    ctl.scan_item(&mut session, &mut |_: &ScanEvent| {}).unwrap();
    assert!(matches!(
        ctl.new_session(&mut session),
        Err(ScanError::SessionActive)
    ));
    assert_eq!(session.ledger().item_count(), 1);

    ctl.stop().unwrap();
    ctl.new_session(&mut session).unwrap();
    assert!(session.ledger().is_empty());
    assert!(session.ledger().saved_images().is_empty());
    assert_ne!(session.id(), original_id);
    assert_eq!(ctl.pending(), 0);
}

#[test]
fn receipt_groups_committed_items() {
    let mut ctl = controller(
        ScriptedBackend::new()
            .then_box(item_box())
            .then_box(item_box())
            .then_box(item_box())
            .then_box(item_box())
            .then_box(item_box())
            .then_box(item_box()),
        ScriptedRecognizer::new()
            .then_repeat("ABCD1234", 2)
            .then_repeat("ABCD5678", 2)
            .then_repeat("CAN00001", 2),
    );
    let mut session = ScanSession::new();
    ctl.start(Box::new(frames(6))).unwrap();
    ctl.run(&mut session, |_| {}).unwrap();

    // 'A' -> HDPE (20), 'C' -> 67 % 4 + 1 = 4 -> GLASS (15)
    let receipt = session.receipt().unwrap();
    assert_eq!(receipt.total_items, 3);
    assert_eq!(receipt.total_value, 55);
    assert_eq!(receipt.image_digests.len(), 3);
    let lines: Vec<(&str, u64, u64)> = receipt
        .lines
        .iter()
        .map(|line| (line.category.as_str(), line.count, line.value))
        .collect();
    assert_eq!(lines, vec![("GLASS", 1, 15), ("HDPE", 2, 40)]);

    let text = receipt.render_text();
    assert!(text.contains("HDPE: 2 x 0.40 €"));
    assert!(text.contains("Total Value: 0.55 €"));
}
