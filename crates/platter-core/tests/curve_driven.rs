use platter_core::{
    ControlPoint, EventConsumer, MidiEventKind, Orientation, RenderMode, RenderSession,
    SessionConfig, SourceHandle, TimedMessage, event_channel,
    fixtures::index_ramp_source,
};

const RATE: u32 = 44_100;
const BLOCK: usize = 512;

fn session(config: SessionConfig) -> (RenderSession, EventConsumer) {
    let handle = SourceHandle::with_source(index_ramp_source(RATE, 4 * RATE as usize));
    let (producer, consumer) = event_channel(1_024);
    let mut session = RenderSession::new(config, handle, producer);
    session.prepare(f64::from(RATE), BLOCK);
    (session, consumer)
}

fn render_mono(session: &mut RenderSession, midi: &[TimedMessage], frames: usize) -> RenderMode {
    let mut left = vec![0.0_f32; frames];
    let mut output = [left.as_mut_slice()];
    session.render_block(midi, &mut output).mode
}

fn forward_push() -> [TimedMessage; 2] {
    [
        TimedMessage::pitch_bend(0, 0, 8_192),
        TimedMessage::pitch_bend(256, 0, 16_383),
    ]
}

#[test]
fn bends_shape_the_following_block() {
    let (mut session, _consumer) = session(SessionConfig::default());

    assert_eq!(
        render_mono(&mut session, &forward_push(), BLOCK),
        RenderMode::FixedRatio,
        "bends are rendered one block late"
    );
    assert_eq!(render_mono(&mut session, &[], BLOCK), RenderMode::CurveDriven);

    let ratios = session.ratios();
    assert_eq!(ratios.len(), BLOCK);
    assert!(
        ratios[1..=256].iter().all(|ratio| *ratio > 1.0),
        "pushing the wheel forward speeds playback up"
    );
    assert!(
        ratios[257..].iter().all(|ratio| (ratio - 1.0).abs() < 1e-9),
        "the curve holds once the last knot is passed"
    );

    let peak = session.mapping().displacement(16_383);
    let expected = 2.0 * BLOCK as f64 + peak;
    assert!(
        (session.playhead() - expected).abs() < 1e-6,
        "playhead {} should include the full displacement {peak}",
        session.playhead()
    );
}

#[test]
fn curve_tail_anchors_the_next_block() {
    let (mut session, _consumer) = session(SessionConfig::default());
    render_mono(&mut session, &forward_push(), BLOCK);
    render_mono(&mut session, &[], BLOCK);

    let tail = *session.curve().last().expect("curve-driven block keeps its curve");
    let continuity = session.continuity();
    assert_eq!(continuity.anchor, Some(ControlPoint::new(-1, tail)));
    assert_eq!(
        continuity.last_bend.map(|bend| bend.offset),
        Some(256),
        "last rendered bend is remembered"
    );

    assert_eq!(render_mono(&mut session, &[], BLOCK), RenderMode::FixedRatio);
    assert!(session.continuity().is_empty());
}

#[test]
fn look_ahead_bend_joins_the_current_curve() {
    let (mut session, _consumer) = session(SessionConfig::default());
    render_mono(&mut session, &forward_push(), BLOCK);

    let next = [TimedMessage::pitch_bend(100, 0, 4_096)];
    assert_eq!(render_mono(&mut session, &next, BLOCK), RenderMode::CurveDriven);

    let points = session.control_points().as_slice();
    let offsets: Vec<i64> = points.iter().map(|point| point.offset).collect();
    assert_eq!(offsets, vec![0, 256, 612]);
    assert!(points[2].value < 0.0, "a pulled-back wheel maps below zero");
}

#[test]
fn block_resize_discards_continuity() {
    let (mut session, _consumer) = session(SessionConfig::default());
    render_mono(&mut session, &forward_push(), BLOCK);
    render_mono(&mut session, &[], BLOCK);
    assert!(session.continuity().anchor.is_some());

    let mut left = vec![0.0_f32; 256];
    let report = {
        let mut output = [left.as_mut_slice()];
        session.render_block(&[], &mut output)
    };

    assert!(report.block_resized);
    assert_eq!(report.mode, RenderMode::FixedRatio);
    assert_eq!(report.frames, 256);
    assert!(session.continuity().anchor.is_none());
}

#[test]
fn bend_channel_filter_ignores_other_channels() {
    let config = SessionConfig {
        bend_channel: Some(2),
        ..SessionConfig::default()
    };
    let (mut session, _consumer) = session(config);
    render_mono(&mut session, &forward_push(), BLOCK);

    assert_eq!(render_mono(&mut session, &[], BLOCK), RenderMode::FixedRatio);
    assert!((session.playhead() - 2.0 * BLOCK as f64).abs() < 1e-9);
}

#[test]
fn reversed_orientation_reads_the_reversed_buffer() {
    let config = SessionConfig {
        orientation: Orientation::Reversed,
        ..SessionConfig::default()
    };
    let (mut session, _consumer) = session(config);
    let frames = 4 * RATE as usize;

    let mut left = vec![0.0_f32; 4];
    {
        let mut output = [left.as_mut_slice()];
        session.render_block(&[], &mut output);
    }
    let last = (frames - 1) as f32;
    assert_eq!(left, vec![last, last - 1.0, last - 2.0, last - 3.0]);
}

#[test]
fn every_incoming_message_reaches_the_monitor() {
    let (mut session, mut consumer) = session(SessionConfig::default());
    let midi = [
        TimedMessage::parse(3, &[0x91, 60, 100]).expect("note on parses"),
        TimedMessage::pitch_bend(10, 1, 9_000),
        TimedMessage::parse(20, &[0xB1, 64, 127]).expect("controller parses"),
    ];
    render_mono(&mut session, &midi, BLOCK);

    let mut events = Vec::new();
    consumer.drain(&mut events);
    let kinds: Vec<MidiEventKind> = events.iter().map(|event| event.kind).collect();
    assert_eq!(
        kinds,
        vec![
            MidiEventKind::NoteOn,
            MidiEventKind::PitchBend,
            MidiEventKind::ControlChange
        ]
    );
    assert_eq!(events[1].sample_offset, 10);
    assert_eq!(events[1].pitch_value, 9_000);
    assert_eq!(events[0].channel, 2, "channels are reported one-based");
}

#[test]
fn consecutive_curve_blocks_join_without_a_jump() {
    let (mut session, _consumer) = session(SessionConfig::default());
    let wheel: [(u16, u16); 7] = [
        (8_192, 9_400),
        (10_100, 11_800),
        (12_500, 10_900),
        (9_000, 6_200),
        (4_800, 5_500),
        (7_300, 8_192),
        (8_600, 9_900),
    ];

    let mut previous_tail: Option<f64> = None;
    let mut joined = 0;
    for (block, (early, late)) in wheel.into_iter().enumerate() {
        let midi = [
            TimedMessage::pitch_bend(100, 0, early),
            TimedMessage::pitch_bend(400, 0, late),
        ];
        let mode = render_mono(&mut session, &midi, BLOCK);

        if mode == RenderMode::CurveDriven {
            let curve = session.curve();
            let ratios = session.ratios();
            if let Some(tail) = previous_tail {
                let expected = 1.0 + curve[0] - tail;
                assert!(
                    (ratios[0] - expected).abs() < 1e-6,
                    "block {block}: first ratio {} should continue from tail {tail}",
                    ratios[0]
                );
                joined += 1;
            }
            previous_tail = curve.last().copied();
        } else {
            assert_eq!(block, 0, "only the first block lacks history");
            previous_tail = None;
        }
    }
    assert_eq!(joined, 5);
}

#[test]
fn prepare_reports_one_block_of_latency() {
    let (mut session, _consumer) = session(SessionConfig::default());
    assert_eq!(session.latency_samples(), BLOCK);

    session.prepare(f64::from(RATE), 128);
    assert_eq!(session.latency_samples(), 128);
}

#[test]
fn flipping_orientation_keeps_the_needle_in_place() {
    let (mut session, _consumer) = session(SessionConfig::default());
    let frames = 4 * RATE as usize;
    render_mono(&mut session, &[], 100);
    assert!((session.playhead() - 100.0).abs() < 1e-9);

    session.set_orientation(Orientation::Reversed);
    assert_eq!(session.config().orientation, Orientation::Reversed);
    assert!((session.playhead() - (frames - 101) as f64).abs() < 1e-9);

    let mut left = vec![0.0_f32; 3];
    {
        let mut output = [left.as_mut_slice()];
        session.render_block(&[], &mut output);
    }
    assert_eq!(left, vec![100.0, 99.0, 98.0], "the recording now runs backwards");

    session.set_orientation(Orientation::Forward);
    assert!((session.playhead() - 97.0).abs() < 1e-9);
}
