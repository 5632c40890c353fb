use std::sync::Arc;

use arc_swap::{ArcSwapOption, Guard};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SourceError {
    #[error("audio source needs at least one channel")]
    NoChannels,
    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),
    #[error("channel {channel} has {frames} frames, expected {expected}")]
    ChannelLengthMismatch {
        channel: usize,
        frames: usize,
        expected: usize,
    },
    #[error(
        "reversed buffer is {reversed_channels}x{reversed_frames}, forward is {channels}x{frames}"
    )]
    OrientationMismatch {
        channels: usize,
        frames: usize,
        reversed_channels: usize,
        reversed_frames: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Forward,
    Reversed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    sample_rate: f64,
    frames: usize,
    forward: Vec<Vec<f32>>,
    reversed: Vec<Vec<f32>>,
}

impl AudioSource {
    pub fn from_channels(sample_rate: f64, channels: Vec<Vec<f32>>) -> Result<Self, SourceError> {
        let reversed = channels
            .iter()
            .map(|channel| channel.iter().rev().copied().collect())
            .collect();
        Self::from_parts(sample_rate, channels, reversed)
    }

    pub fn from_interleaved(
        sample_rate: f64,
        channel_count: usize,
        samples: &[f32],
    ) -> Result<Self, SourceError> {
        if channel_count == 0 {
            return Err(SourceError::NoChannels);
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        Self::from_channels(sample_rate, channels)
    }

    pub fn from_parts(
        sample_rate: f64,
        forward: Vec<Vec<f32>>,
        reversed: Vec<Vec<f32>>,
    ) -> Result<Self, SourceError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(SourceError::InvalidSampleRate(sample_rate));
        }
        let frames = validate_planar(&forward)?;
        let reversed_frames = validate_planar(&reversed).unwrap_or(usize::MAX);
        if reversed.len() != forward.len() || reversed_frames != frames {
            return Err(SourceError::OrientationMismatch {
                channels: forward.len(),
                frames,
                reversed_channels: reversed.len(),
                reversed_frames: reversed.first().map_or(0, Vec::len),
            });
        }

        Ok(Self {
            sample_rate,
            frames,
            forward,
            reversed,
        })
    }

    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.forward.len()
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.frames as f64 / self.sample_rate
    }

    #[must_use]
    pub fn channel(&self, orientation: Orientation, channel: usize) -> &[f32] {
        match orientation {
            Orientation::Forward => &self.forward[channel],
            Orientation::Reversed => &self.reversed[channel],
        }
    }

    #[must_use]
    pub fn sample(&self, orientation: Orientation, channel: usize, frame: usize) -> Option<f32> {
        let data = match orientation {
            Orientation::Forward => self.forward.get(channel)?,
            Orientation::Reversed => self.reversed.get(channel)?,
        };
        data.get(frame).copied()
    }
}

fn validate_planar(channels: &[Vec<f32>]) -> Result<usize, SourceError> {
    let expected = channels.first().ok_or(SourceError::NoChannels)?.len();
    for (channel, data) in channels.iter().enumerate() {
        if data.len() != expected {
            return Err(SourceError::ChannelLengthMismatch {
                channel,
                frames: data.len(),
                expected,
            });
        }
    }
    Ok(expected)
}

#[derive(Debug, Clone, Default)]
pub struct SourceHandle {
    slot: Arc<ArcSwapOption<AudioSource>>,
}

impl SourceHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_source(source: AudioSource) -> Self {
        let handle = Self::new();
        handle.publish(source);
        handle
    }

    #[must_use]
    pub fn snapshot(&self) -> Guard<Option<Arc<AudioSource>>> {
        self.slot.load()
    }

    #[must_use]
    pub fn current(&self) -> Option<Arc<AudioSource>> {
        self.slot.load_full()
    }

    pub fn publish(&self, source: AudioSource) {
        self.publish_shared(Arc::new(source));
    }

    pub fn publish_shared(&self, source: Arc<AudioSource>) {
        self.slot.store(Some(source));
    }

    pub fn clear(&self) {
        self.slot.store(None);
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.slot.load().is_some()
    }
}
