use crate::source::{AudioSource, Orientation};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Playhead {
    position: f64,
}

impl Playhead {
    #[must_use]
    pub fn new(position: f64) -> Self {
        Self { position }
    }

    #[must_use]
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
    }

    pub fn advance(&mut self, delta: f64, frames: usize) {
        self.position = wrap_position(self.position + delta, frames);
    }

    pub fn clamp_to(&mut self, frames: usize) {
        self.position = wrap_position(self.position, frames);
    }
}

fn wrap_position(position: f64, frames: usize) -> f64 {
    if frames == 0 || !position.is_finite() {
        return 0.0;
    }
    let length = frames as f64;
    if (0.0..length).contains(&position) {
        return position;
    }
    let wrapped = position.rem_euclid(length);
    // rem_euclid can round up to `length` for tiny negative inputs.
    if wrapped >= length { 0.0 } else { wrapped }
}

// Read position at sample i is i + curve[i]; `previous` stands in for curve[-1].
pub fn derive_ratios(curve: &[f64], previous: f64, out: &mut Vec<f64>) {
    out.clear();
    let mut last = previous;
    for &value in curve {
        out.push(1.0 + (value - last));
        last = value;
    }
}

fn write_frame(
    source: &AudioSource,
    orientation: Orientation,
    position: f64,
    output: &mut [&mut [f32]],
    frame: usize,
) {
    let frames = source.frame_count();
    let index0 = (position as usize).min(frames - 1);
    let index1 = if index0 + 1 == frames { 0 } else { index0 + 1 };
    let frac = (position - index0 as f64) as f32;
    let channel_count = source.channel_count();

    for (channel, out) in output.iter_mut().enumerate() {
        let data = source.channel(orientation, channel % channel_count);
        let value0 = data[index0];
        let value1 = data[index1];
        out[frame] = value0 + frac * (value1 - value0);
    }
}

pub fn render_fixed(
    source: &AudioSource,
    orientation: Orientation,
    playhead: &mut Playhead,
    output: &mut [&mut [f32]],
    frames: usize,
) {
    if source.is_empty() {
        silence(output, frames);
        return;
    }
    playhead.clamp_to(source.frame_count());
    for frame in 0..frames {
        write_frame(source, orientation, playhead.position, output, frame);
        playhead.advance(1.0, source.frame_count());
    }
}

pub fn render_with_ratios(
    source: &AudioSource,
    orientation: Orientation,
    playhead: &mut Playhead,
    ratios: &[f64],
    output: &mut [&mut [f32]],
    frames: usize,
) -> bool {
    if ratios.len() != frames {
        render_fixed(source, orientation, playhead, output, frames);
        return false;
    }
    if source.is_empty() {
        silence(output, frames);
        return true;
    }
    playhead.clamp_to(source.frame_count());
    for (frame, &ratio) in ratios.iter().enumerate() {
        write_frame(source, orientation, playhead.position, output, frame);
        playhead.advance(ratio, source.frame_count());
    }
    true
}

pub fn silence(output: &mut [&mut [f32]], frames: usize) {
    for channel in output.iter_mut() {
        let end = frames.min(channel.len());
        channel[..end].fill(0.0);
    }
}
