//! End-to-end tests for a prayer session.
//!
//! These drive a `Stepper` through whole sessions against an in-memory
//! store and a settable clock, with recording ports standing in for the
//! keep-awake, bell and completion hosts. One test writes snapshots to a
//! real directory and one delivers a completion through the journal.
//!
//! Run with: `cargo test --test session_flow`

use std::sync::Arc;
use std::time::Duration;

use rosary::completion::{CompletionIntegration, CompletionService, JournalIntegration};
use rosary::effects::recording::{RecordingHaptics, RecordingKeepAwake, RecordingSink};
use rosary::effects::{NoopCompletionSink, NoopHaptics, NoopKeepAwake, SideEffects};
use rosary::persistence::{
    FileStore, ManualClock, MemoryStore, PersistedSnapshot, SessionGateway,
};
use rosary::progress;
use rosary::sequence::{Mystery, Sequence, SequenceShape, StepKind};
use rosary::session::{Phase, StepOutcome, Stepper};

const START_MILLIS: i64 = 1_760_000_000_000;
const MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

// ─── Helpers ────────────────────────────────────────────────────────────────

struct Host {
    store: MemoryStore,
    clock: ManualClock,
    awake: RecordingKeepAwake,
    haptics: RecordingHaptics,
    sink: RecordingSink,
}

impl Host {
    fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            clock: ManualClock::at(START_MILLIS),
            awake: RecordingKeepAwake::new(),
            haptics: RecordingHaptics::new(),
            sink: RecordingSink::new(),
        }
    }

    fn gateway(&self) -> SessionGateway {
        SessionGateway::new(
            Arc::new(self.store.clone()),
            Arc::new(self.clock.clone()),
            "session",
            MAX_AGE,
        )
    }

    /// A fresh stepper sharing this host's store, clock and ports, as a
    /// relaunched process would
    fn stepper(&self) -> Stepper<Mystery> {
        let effects = SideEffects::new(
            Box::new(self.awake.clone()),
            Box::new(self.haptics.clone()),
            Arc::new(self.sink.clone()),
        );
        Stepper::new(SequenceShape::default(), self.gateway(), effects)
    }

    fn snapshot(&self) -> Option<PersistedSnapshot<Mystery>> {
        self.gateway().load()
    }
}

fn index(stepper: &Stepper<Mystery>) -> usize {
    stepper
        .visible_step()
        .map(|step| step.index)
        .expect("stepper should be active")
}

fn all_four() -> Vec<Mystery> {
    vec![
        Mystery::Joyful,
        Mystery::Sorrowful,
        Mystery::Glorious,
        Mystery::Luminous,
    ]
}

// ─── Walkthroughs ───────────────────────────────────────────────────────────

#[test]
fn test_single_set_completes_on_the_final_advance() {
    let host = Host::new();
    let mut stepper = host.stepper();
    stepper.start(&[Mystery::Joyful]).unwrap();
    assert_eq!(stepper.sequence().unwrap().len(), 82);

    for call in 1..81 {
        let outcome = stepper.advance();
        assert!(
            matches!(outcome, StepOutcome::Moved { .. }),
            "call {call} should move, got {outcome:?}"
        );
        assert_eq!(stepper.phase(), Phase::Active);
    }
    assert_eq!(index(&stepper), 81);
    assert!(host.sink.records().is_empty());

    assert_eq!(stepper.advance(), StepOutcome::Completed);
    assert_eq!(stepper.phase(), Phase::Completed);

    let records = host.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].steps, 82);
    assert_eq!(records[0].primary_selector, "joyful");
    assert_eq!(
        records[0].completion_id,
        stepper.state().unwrap().session_id()
    );

    assert!(host.snapshot().is_none());
    assert!(!stepper.holds_keep_awake());
}

#[test]
fn test_completion_is_recorded_once() {
    let host = Host::new();
    let mut stepper = host.stepper();
    stepper.start(&[Mystery::Sorrowful]).unwrap();
    stepper.jump_to(usize::MAX);
    assert_eq!(stepper.advance(), StepOutcome::Completed);

    assert_eq!(stepper.advance(), StepOutcome::Ignored);
    assert_eq!(stepper.retreat(), StepOutcome::Ignored);
    assert_eq!(stepper.jump_to(3), StepOutcome::Ignored);
    assert_eq!(host.sink.records().len(), 1);

    let progress = stepper.progress().unwrap();
    assert!(progress.completed);
    assert_eq!(progress.percentage, 100);
}

#[test]
fn test_complete_rosary_jump_lands_in_third_set() {
    let host = Host::new();
    let mut stepper = host.stepper();
    stepper.start(&all_four()).unwrap();
    assert_eq!(stepper.sequence().unwrap().len(), 292);

    assert_eq!(
        stepper.jump_to(150),
        StepOutcome::Moved { from: 0, to: 150 }
    );

    let progress = stepper.progress().unwrap();
    assert_eq!(progress.current_index, 150);
    assert_eq!(progress.layout.groups.len(), 20);
    assert_eq!(progress.layout.current_cluster, Some(10));
    assert_eq!(progress.layout.position_in_cluster, Some(2));

    let cluster = &progress.layout.groups[10];
    assert_eq!(cluster.selector_key.as_deref(), Some("glorious"));
    assert_eq!(cluster.position, Some(1));
    assert_eq!(cluster.span.start, 148);
    assert_eq!(cluster.span.end, 161);
}

#[test]
fn test_failed_write_keeps_in_memory_position() {
    let host = Host::new();
    let mut stepper = host.stepper();
    stepper.start(&[Mystery::Luminous]).unwrap();
    stepper.jump_to(5);
    let saved = host.snapshot().unwrap();
    assert_eq!(saved.current_index, 5);

    host.store.fail_next_writes(1);
    assert_eq!(stepper.advance(), StepOutcome::Moved { from: 5, to: 6 });

    assert_eq!(index(&stepper), 6);
    assert_eq!(stepper.phase(), Phase::Active);
    // The failed write left the previous snapshot in place
    assert_eq!(host.snapshot().unwrap().current_index, 5);

    stepper.advance();
    assert_eq!(host.snapshot().unwrap().current_index, 7);
}

#[test]
fn test_unavailable_storage_still_allows_a_full_session() {
    let host = Host::new();
    host.store.set_unavailable(true);
    let mut stepper = host.stepper();
    stepper.start(&[Mystery::Glorious]).unwrap();

    while stepper.advance() != StepOutcome::Completed {}

    assert_eq!(stepper.phase(), Phase::Completed);
    assert_eq!(host.sink.records().len(), 1);
}

// ─── Properties ─────────────────────────────────────────────────────────────

#[test]
fn test_sequence_is_deterministic() {
    for selectors in [vec![Mystery::Joyful], all_four()] {
        let first = Sequence::build(&selectors, SequenceShape::default()).unwrap();
        let second = Sequence::build(&selectors, SequenceShape::default()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_length_matches_shape_formula() {
    let shapes = [
        SequenceShape::default(),
        SequenceShape {
            group_size: 3,
            repeat_count: 7,
            include_salutation: false,
        },
        SequenceShape {
            group_size: 1,
            repeat_count: 1,
            include_salutation: true,
        },
    ];

    let four = all_four();
    for shape in shapes {
        for count in 1..=4 {
            let sequence = Sequence::build(&four[..count], shape).unwrap();
            assert_eq!(
                sequence.len(),
                8 + count * shape.group_size * shape.group_width() + 4,
                "shape {shape:?} with {count} selectors"
            );
            assert_eq!(sequence.len(), shape.sequence_len(count));
        }
    }
}

#[test]
fn test_groups_follow_selector_order() {
    let selectors = [Mystery::Luminous, Mystery::Joyful];
    let sequence = Sequence::build(&selectors, SequenceShape::default()).unwrap();

    let announced: Vec<_> = sequence
        .steps()
        .iter()
        .filter(|step| step.kind() == StepKind::GroupAnnouncement)
        .map(|step| (step.selector().copied(), step.group_position()))
        .collect();

    assert_eq!(announced.len(), 10);
    assert_eq!(announced[0], (Some(Mystery::Luminous), Some(1)));
    assert_eq!(announced[4], (Some(Mystery::Luminous), Some(5)));
    assert_eq!(announced[5], (Some(Mystery::Joyful), Some(1)));
    assert_eq!(announced[9], (Some(Mystery::Joyful), Some(5)));
}

#[test]
fn test_index_stays_in_bounds_under_any_navigation() {
    let host = Host::new();
    let mut stepper = host.stepper();
    stepper.start(&[Mystery::Joyful, Mystery::Glorious]).unwrap();
    let len = stepper.sequence().unwrap().len();

    let targets = [0, 1, len - 1, len, len + 40, usize::MAX, 77];
    for target in targets {
        stepper.jump_to(target);
        assert!(index(&stepper) < len);
        stepper.retreat();
        assert!(index(&stepper) < len);
    }

    stepper.jump_to(0);
    for _ in 0..5 {
        stepper.retreat();
        assert_eq!(index(&stepper), 0);
    }
}

#[test]
fn test_boundary_operations_are_noops() {
    let host = Host::new();
    let mut stepper = host.stepper();
    stepper.start(&[Mystery::Joyful]).unwrap();
    let pulses = host.haptics.pulses();

    assert_eq!(stepper.retreat(), StepOutcome::Unchanged);
    assert_eq!(stepper.jump_to(0), StepOutcome::Unchanged);
    assert_eq!(host.haptics.pulses(), pulses);

    stepper.jump_to(usize::MAX);
    assert_eq!(stepper.jump_to(500), StepOutcome::Unchanged);
    assert_eq!(stepper.phase(), Phase::Active);
    assert!(host.sink.records().is_empty());
}

#[test]
fn test_percentage_never_reaches_full_before_completion() {
    let host = Host::new();
    let mut stepper = host.stepper();
    stepper.start(&[Mystery::Joyful]).unwrap();

    let mut last = 0;
    loop {
        let progress = stepper.progress().unwrap();
        assert!(progress.percentage >= last);
        assert!(progress.percentage < 100);
        last = progress.percentage;
        if stepper.advance() == StepOutcome::Completed {
            break;
        }
    }
    assert_eq!(stepper.progress().unwrap().percentage, 100);
}

#[test]
fn test_ordinals_count_within_each_group() {
    let sequence = Sequence::build(&[Mystery::Joyful], SequenceShape::default()).unwrap();

    let mut ordinals = Vec::new();
    for (i, step) in sequence.steps().iter().enumerate() {
        if step.kind() == StepKind::RepeatedPrayer {
            ordinals.push(progress::ordinal_within_group(&sequence, i).unwrap());
        }
    }

    assert_eq!(ordinals.len(), 50);
    for group in ordinals.chunks(10) {
        assert_eq!(group, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }
}

// ─── Resume and expiry ──────────────────────────────────────────────────────

#[test]
fn test_resume_restores_position_and_selectors() {
    let host = Host::new();
    {
        let mut stepper = host.stepper();
        stepper.start(&all_four()).unwrap();
        stepper.jump_to(211);
    }

    host.clock.advance(60 * 60 * 1000);
    let mut resumed = host.stepper();
    assert!(resumed.try_resume());
    assert_eq!(resumed.phase(), Phase::Active);
    assert_eq!(index(&resumed), 211);
    assert_eq!(resumed.state().unwrap().parametrization(), all_four().as_slice());
    assert_eq!(resumed.sequence().unwrap().len(), 292);
    assert!(resumed.holds_keep_awake());

    // Resuming rewrites the snapshot with the current time
    assert_eq!(
        host.snapshot().unwrap().saved_at,
        START_MILLIS + 60 * 60 * 1000
    );
}

#[test]
fn test_snapshot_past_max_age_is_dropped() {
    let host = Host::new();
    host.stepper().start(&[Mystery::Joyful]).unwrap();

    let max_age = i64::try_from(MAX_AGE.as_millis()).unwrap();
    host.clock.set(START_MILLIS + max_age + 1);

    let mut stepper = host.stepper();
    assert!(!stepper.try_resume());
    assert_eq!(stepper.phase(), Phase::Idle);
    assert!(host.store.raw("session").is_none());
}

#[test]
fn test_snapshot_just_inside_max_age_resumes() {
    let host = Host::new();
    {
        let mut stepper = host.stepper();
        stepper.start(&[Mystery::Joyful]).unwrap();
        stepper.jump_to(12);
    }

    let max_age = i64::try_from(MAX_AGE.as_millis()).unwrap();
    host.clock.set(START_MILLIS + max_age - 1);

    let mut stepper = host.stepper();
    assert!(stepper.try_resume());
    assert_eq!(index(&stepper), 12);
}

#[test]
fn test_resume_after_completion_finds_nothing() {
    let host = Host::new();
    {
        let mut stepper = host.stepper();
        stepper.start(&[Mystery::Joyful]).unwrap();
        stepper.jump_to(usize::MAX);
        stepper.advance();
    }

    let mut stepper = host.stepper();
    assert!(!stepper.try_resume());
    assert_eq!(stepper.phase(), Phase::Idle);
}

#[test]
fn test_resume_ignores_snapshot_with_impossible_timestamp() {
    let host = Host::new();
    host.store.insert_raw(
        "session",
        &format!(
            r#"{{"currentIndex":10,"parametrization":["joyful"],"savedAt":{}}}"#,
            i64::MIN
        ),
    );

    let mut stepper = host.stepper();
    assert!(!stepper.try_resume());
    assert_eq!(stepper.phase(), Phase::Idle);
    assert!(host.store.raw("session").is_none());

    stepper.start(&[Mystery::Joyful]).unwrap();
    assert_eq!(index(&stepper), 0);
}

#[test]
fn test_reset_clears_snapshot() {
    let host = Host::new();
    let mut stepper = host.stepper();
    stepper.start(&[Mystery::Joyful]).unwrap();
    stepper.advance();
    assert!(host.snapshot().is_some());

    stepper.reset();
    assert_eq!(stepper.phase(), Phase::Idle);
    assert!(host.snapshot().is_none());
    assert!(!host.stepper().try_resume());
}

#[test]
fn test_haptics_preference_survives_restart() {
    let host = Host::new();
    let mut stepper = host.stepper();
    stepper.set_haptics_enabled(false);
    stepper.start(&[Mystery::Joyful]).unwrap();
    stepper.advance();
    assert_eq!(host.haptics.pulses(), 0);

    let mut relaunched = host.stepper();
    assert!(!relaunched.haptics_enabled());
    relaunched.set_haptics_enabled(true);
    assert!(host.stepper().haptics_enabled());
}

#[test]
fn test_snapshots_persist_across_file_store_instances() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::at(START_MILLIS);
    let open = || {
        let gateway = SessionGateway::new(
            Arc::new(FileStore::new(dir.path())),
            Arc::new(clock.clone()),
            "session",
            MAX_AGE,
        );
        let effects = SideEffects::new(
            Box::new(NoopKeepAwake),
            Box::new(NoopHaptics),
            Arc::new(NoopCompletionSink),
        );
        Stepper::<Mystery>::new(SequenceShape::default(), gateway, effects)
    };

    {
        let mut stepper = open();
        stepper.start(&[Mystery::Sorrowful, Mystery::Luminous]).unwrap();
        stepper.jump_to(40);
    }
    assert!(dir.path().join("session.json").exists());

    let mut stepper = open();
    assert!(stepper.try_resume());
    assert_eq!(index(&stepper), 40);
    assert_eq!(
        stepper.state().unwrap().parametrization(),
        &[Mystery::Sorrowful, Mystery::Luminous]
    );
}

// ─── Completion delivery ────────────────────────────────────────────────────

#[tokio::test]
async fn test_completion_reaches_the_journal() {
    let dir = tempfile::tempdir().unwrap();
    let journal_path = dir.path().join("completions.jsonl");
    let journal: Arc<dyn CompletionIntegration> =
        Arc::new(JournalIntegration::new(&journal_path, true));
    let service = Arc::new(CompletionService::with_integrations(vec![journal], true));

    let host = Host::new();
    let effects = SideEffects::new(
        Box::new(host.awake.clone()),
        Box::new(NoopHaptics),
        service.clone(),
    );
    let mut stepper = Stepper::new(SequenceShape::default(), host.gateway(), effects);
    stepper.start(&[Mystery::Joyful]).unwrap();
    stepper.jump_to(usize::MAX);
    assert_eq!(stepper.advance(), StepOutcome::Completed);

    service.flush(Duration::from_secs(5)).await;

    let history = JournalIntegration::history(&journal_path).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].event, "session.completed");
    assert_eq!(history[0].record.steps, 82);
    assert_eq!(history[0].record.selectors, vec!["joyful".to_string()]);
}
