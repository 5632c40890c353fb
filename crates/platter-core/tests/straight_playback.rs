use platter_core::{
    BlockReport, RenderMode, RenderSession, SessionConfig, SourceHandle, SourceTransition,
    TimedMessage, event_channel, fixtures::index_ramp_source,
};

const RATE: u32 = 44_100;
const BLOCK: usize = 512;

fn session_with(handle: SourceHandle) -> RenderSession {
    let (producer, _consumer) = event_channel(1_024);
    let mut session = RenderSession::new(SessionConfig::default(), handle, producer);
    session.prepare(f64::from(RATE), BLOCK);
    session
}

fn render(session: &mut RenderSession, midi: &[TimedMessage], left: &mut [f32]) -> RenderMode {
    let mut output = [left];
    session.render_block(midi, &mut output).mode
}

#[test]
fn centered_wheel_plays_at_unity_speed() {
    let handle = SourceHandle::with_source(index_ramp_source(RATE, 4 * RATE as usize));
    let mut session = session_with(handle);
    let mut block = vec![0.0_f32; BLOCK];

    let centered = [TimedMessage::pitch_bend(0, 0, 8_192)];
    for index in 0..10 {
        let midi: &[TimedMessage] = if index == 0 { &centered } else { &[] };
        render(&mut session, midi, &mut block);
    }

    assert!(
        (session.playhead() - 5_120.0).abs() < 1e-9,
        "playhead should sit at 10 blocks, got {}",
        session.playhead()
    );
}

#[test]
fn blocks_without_bends_copy_the_source() {
    let handle = SourceHandle::with_source(index_ramp_source(RATE, 4_000));
    let mut session = session_with(handle);
    let mut block = vec![0.0_f32; BLOCK];

    for index in 0..3 {
        let mode = render(&mut session, &[], &mut block);
        assert_eq!(mode, RenderMode::FixedRatio);
        let start = index * BLOCK;
        for (frame, sample) in block.iter().enumerate() {
            assert!(
                (sample - (start + frame) as f32).abs() < 1e-3,
                "block {index} frame {frame} read {sample}"
            );
        }
    }
    assert!((session.playhead() - (3 * BLOCK) as f64).abs() < 1e-9);
}

#[test]
fn playhead_wraps_at_the_end_of_the_source() {
    let handle = SourceHandle::with_source(index_ramp_source(RATE, 700));
    let mut session = session_with(handle);
    let mut block = vec![0.0_f32; BLOCK];

    render(&mut session, &[], &mut block);
    render(&mut session, &[], &mut block);

    assert!((session.playhead() - 324.0).abs() < 1e-9);
    // frame 188 of the second block reads source frame 0 again
    assert!(block[188].abs() < 1e-6);
    assert!((block[187] - 699.0).abs() < 1e-3);
}

#[test]
fn missing_source_renders_silence_and_holds_playhead() {
    let mut session = session_with(SourceHandle::new());
    let mut block = vec![0.7_f32; BLOCK];

    let midi = [
        TimedMessage::pitch_bend(0, 0, 8_192),
        TimedMessage::pitch_bend(200, 0, 12_000),
    ];
    assert_eq!(render(&mut session, &midi, &mut block), RenderMode::NoSource);
    assert_eq!(render(&mut session, &[], &mut block), RenderMode::NoSource);

    assert!(block.iter().all(|sample| *sample == 0.0));
    assert!(session.playhead().abs() < f64::EPSILON);
}

#[test]
fn mono_source_fans_out_to_every_output_channel() {
    let handle = SourceHandle::with_source(index_ramp_source(RATE, 2_048));
    let mut session = session_with(handle);

    let mut left = vec![0.0_f32; BLOCK];
    let mut right = vec![0.0_f32; BLOCK];
    {
        let mut output = [left.as_mut_slice(), right.as_mut_slice()];
        session.render_block(&[], &mut output);
    }

    assert_eq!(left, right);
    assert!((left[10] - 10.0).abs() < 1e-6);
}

#[test]
fn source_published_mid_stream_is_picked_up() {
    let handle = SourceHandle::new();
    let mut session = session_with(handle.clone());
    let mut block = vec![0.0_f32; BLOCK];

    assert_eq!(render(&mut session, &[], &mut block), RenderMode::NoSource);
    handle.publish(index_ramp_source(RATE, 4_096));
    assert_eq!(render(&mut session, &[], &mut block), RenderMode::FixedRatio);
    assert!((block[1] - 1.0).abs() < 1e-6);

    handle.clear();
    assert_eq!(render(&mut session, &[], &mut block), RenderMode::NoSource);
}

fn render_report(session: &mut RenderSession, frames: usize) -> BlockReport {
    let mut left = vec![0.0_f32; frames];
    let mut output = [left.as_mut_slice()];
    session.render_block(&[], &mut output)
}

#[test]
fn source_and_block_changes_are_reported_not_logged() {
    let handle = SourceHandle::new();
    let mut session = session_with(handle.clone());

    let first = render_report(&mut session, BLOCK);
    assert_eq!(first.source_transition, None, "no source yet, nothing changed");
    assert!(!first.block_resized);

    handle.publish(index_ramp_source(RATE, 4_096));
    let appeared = render_report(&mut session, BLOCK);
    assert_eq!(appeared.source_transition, Some(SourceTransition::Appeared));
    assert_eq!(render_report(&mut session, BLOCK).source_transition, None);

    let resized = render_report(&mut session, 128);
    assert!(resized.block_resized);
    assert_eq!(resized.source_transition, None);

    handle.clear();
    let lost = render_report(&mut session, 128);
    assert_eq!(lost.source_transition, Some(SourceTransition::Lost));
    assert_eq!(lost.mode, RenderMode::NoSource);
    assert!(!lost.block_resized);
}
