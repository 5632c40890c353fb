use std::f32::consts::TAU;

use crate::{
    event::{PITCH_BEND_CENTER, PITCH_BEND_MAX},
    offline::{BendScript, ScriptMessage},
    source::AudioSource,
};

#[must_use]
pub fn demo_source(sample_rate: u32, seconds: f64) -> AudioSource {
    let sample_rate = sample_rate.max(1);
    let frames = (seconds.max(0.01) * f64::from(sample_rate)).round() as usize;
    let rate = sample_rate as f32;
    let tone = (0..frames)
        .map(|frame| (frame as f32 / rate * 220.0 * TAU).sin() * 0.5)
        .collect();
    let saw = (0..frames)
        .map(|frame| ((frame as f32 / rate * 110.0).fract() * 2.0 - 1.0) * 0.4)
        .collect();
    AudioSource::from_channels(f64::from(sample_rate), vec![tone, saw])
        .expect("fixture source should be valid")
}

#[must_use]
pub fn index_ramp_source(sample_rate: u32, frames: usize) -> AudioSource {
    let data = (0..frames).map(|frame| frame as f32).collect();
    AudioSource::from_channels(f64::from(sample_rate.max(1)), vec![data])
        .expect("fixture ramp should be valid")
}

#[must_use]
pub fn demo_script(block_size: usize) -> BendScript {
    let block = block_size.max(1) as u64;
    let mut script = BendScript::default();
    script.push(
        0,
        0,
        ScriptMessage::NoteOn {
            key: 60,
            velocity: 100,
        },
    );
    script.push(
        block,
        0,
        ScriptMessage::Controller {
            controller: 64,
            value: 127,
        },
    );

    let center = i32::from(PITCH_BEND_CENTER);
    let gesture: [i32; 12] = [0, 0, 600, 1_400, 2_000, 1_600, 400, -900, -1_800, -1_200, -300, 0];
    for (step, offset) in gesture.into_iter().enumerate() {
        let value = (center + offset).clamp(0, i32::from(PITCH_BEND_MAX)) as u16;
        let frame = (step as u64 + 2) * block + (step as u64 * 37) % block;
        script.push_bend(frame, value);
    }

    let release = (gesture.len() as u64 + 4) * block;
    script.push(
        release,
        0,
        ScriptMessage::NoteOff {
            key: 60,
            velocity: 0,
        },
    );
    script
}
