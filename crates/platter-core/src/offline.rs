use std::{fs, path::Path};

use anyhow::{Context, Result};
use midly::{
    MidiMessage, PitchBend,
    num::{u7, u14},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    channel::{DEFAULT_EVENT_CAPACITY, event_channel},
    config::PlatterConfig,
    event::{MidiEvent, PITCH_BEND_MAX, TimedMessage},
    session::{
        BlockReport, DEFAULT_BLOCK_SIZE, RenderMode, RenderSession, SessionConfig,
        SourceTransition,
    },
    source::{AudioSource, SourceHandle},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptMessage {
    PitchBend { value: u16 },
    NoteOn { key: u8, velocity: u8 },
    NoteOff { key: u8, velocity: u8 },
    Controller { controller: u8, value: u8 },
}

impl ScriptMessage {
    #[must_use]
    pub fn to_midi(self) -> MidiMessage {
        match self {
            Self::PitchBend { value } => MidiMessage::PitchBend {
                bend: PitchBend(u14::from(value.min(PITCH_BEND_MAX))),
            },
            Self::NoteOn { key, velocity } => MidiMessage::NoteOn {
                key: u7::from(key.min(127)),
                vel: u7::from(velocity.min(127)),
            },
            Self::NoteOff { key, velocity } => MidiMessage::NoteOff {
                key: u7::from(key.min(127)),
                vel: u7::from(velocity.min(127)),
            },
            Self::Controller { controller, value } => MidiMessage::Controller {
                controller: u7::from(controller.min(127)),
                value: u7::from(value.min(127)),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptEvent {
    pub frame: u64,
    #[serde(default)]
    pub channel: u8,
    pub message: ScriptMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BendScript {
    pub events: Vec<ScriptEvent>,
}

impl BendScript {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let mut script: BendScript =
            serde_json::from_slice(bytes).context("invalid bend script json")?;
        script.sort();
        Ok(script)
    }

    #[instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read bend script: {}", path.display()))?;
        let script = Self::from_json(&bytes)?;
        debug!(events = script.events.len(), "bend script loaded");
        Ok(script)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create script directory: {}", parent.display())
            })?;
        }
        let json = serde_json::to_vec_pretty(self).context("failed to encode bend script")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write bend script: {}", path.display()))?;
        Ok(())
    }

    pub fn push(&mut self, frame: u64, channel: u8, message: ScriptMessage) {
        self.events.push(ScriptEvent {
            frame,
            channel,
            message,
        });
    }

    pub fn push_bend(&mut self, frame: u64, value: u16) {
        self.push(frame, 0, ScriptMessage::PitchBend { value });
    }

    pub fn sort(&mut self) {
        self.events.sort_by_key(|event| event.frame);
    }

    #[must_use]
    pub fn end_frame(&self) -> u64 {
        self.events
            .iter()
            .map(|event| event.frame + 1)
            .max()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfflineOptions {
    pub block_size: usize,
    pub sample_rate: u32,
    pub output_channels: usize,
    // None renders the longer of the source and the script, plus a block.
    pub total_frames: Option<u64>,
    pub event_capacity: usize,
    pub session: SessionConfig,
}

impl Default for OfflineOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            sample_rate: 44_100,
            output_channels: 2,
            total_frames: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            session: SessionConfig::default(),
        }
    }
}

impl From<&PlatterConfig> for OfflineOptions {
    fn from(config: &PlatterConfig) -> Self {
        Self {
            block_size: config.render.block_size.max(1),
            sample_rate: config.render.sample_rate.max(8_000),
            output_channels: config.render.output_channels.max(1),
            total_frames: None,
            event_capacity: config.engine.event_capacity,
            session: config.engine.session_config(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModeCounts {
    pub no_source: usize,
    pub fixed_ratio: usize,
    pub curve_driven: usize,
}

impl ModeCounts {
    pub fn record(&mut self, report: &BlockReport) {
        match report.mode {
            RenderMode::NoSource => self.no_source += 1,
            RenderMode::FixedRatio => self.fixed_ratio += 1,
            RenderMode::CurveDriven => self.curve_driven += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.no_source + self.fixed_ratio + self.curve_driven
    }
}

#[derive(Debug, Clone)]
pub struct OfflineRender {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
    pub modes: ModeCounts,
    pub final_playhead: f64,
    // Output lags the script by this many frames; it is not trimmed.
    pub latency_samples: usize,
    pub events: Vec<MidiEvent>,
    pub events_dropped: usize,
}

impl OfflineRender {
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

#[instrument(
    skip(source, script),
    fields(events = script.events.len(), block_size = options.block_size)
)]
pub fn render_offline(
    source: Option<AudioSource>,
    script: &BendScript,
    options: &OfflineOptions,
) -> OfflineRender {
    let block_size = options.block_size.max(1);
    let output_channels = options.output_channels.max(1);
    let source_frames = source.as_ref().map_or(0, |source| source.frame_count() as u64);
    let total_frames = options.total_frames.unwrap_or_else(|| {
        source_frames.max(script.end_frame() + block_size as u64)
    });

    let handle = SourceHandle::new();
    if let Some(source) = source {
        handle.publish(source);
    }
    let (producer, mut consumer) = event_channel(options.event_capacity);
    let mut session = RenderSession::new(options.session, handle, producer);
    session.prepare(f64::from(options.sample_rate), block_size);

    let frame_capacity = usize::try_from(total_frames).unwrap_or_default();
    let mut channels: Vec<Vec<f32>> = (0..output_channels)
        .map(|_| Vec::with_capacity(frame_capacity))
        .collect();
    let mut scratch = vec![vec![0.0_f32; block_size]; output_channels];
    let mut block_midi = Vec::new();
    let mut events = Vec::new();
    let mut modes = ModeCounts::default();
    let mut ordered = script.events.clone();
    ordered.sort_by_key(|event| event.frame);
    let mut pending = ordered.iter().peekable();

    let mut start = 0_u64;
    while start < total_frames {
        let len = (total_frames - start).min(block_size as u64) as usize;
        let end = start + len as u64;

        block_midi.clear();
        while let Some(event) = pending.next_if(|event| event.frame < end) {
            let offset = event.frame.saturating_sub(start) as usize;
            block_midi.push(TimedMessage::new(
                offset,
                event.channel,
                event.message.to_midi(),
            ));
        }

        let report = {
            let mut output: Vec<&mut [f32]> = scratch
                .iter_mut()
                .map(|channel| &mut channel[..len])
                .collect();
            session.render_block(&block_midi, &mut output)
        };
        modes.record(&report);
        log_block_transitions(start, &report);

        for (target, rendered) in channels.iter_mut().zip(&scratch) {
            target.extend_from_slice(&rendered[..len]);
        }
        consumer.drain(&mut events);
        start = end;
    }

    let events_dropped = consumer.take_drop_count();
    info!(
        frames = total_frames,
        latency_samples = session.latency_samples(),
        curve_driven = modes.curve_driven,
        fixed_ratio = modes.fixed_ratio,
        no_source = modes.no_source,
        events = events.len(),
        events_dropped,
        "offline render completed"
    );

    OfflineRender {
        sample_rate: options.sample_rate,
        channels,
        modes,
        final_playhead: session.playhead(),
        latency_samples: session.latency_samples(),
        events,
        events_dropped,
    }
}

fn log_block_transitions(start: u64, report: &BlockReport) {
    if report.block_resized {
        debug!(start, frames = report.frames, "block size changed, continuity dropped");
    }
    match report.source_transition {
        Some(SourceTransition::Appeared) => debug!(start, "audio source became available"),
        Some(SourceTransition::Lost) => warn!(start, "audio source missing, rendering silence"),
        None => {}
    }
    if report.events_dropped > 0 {
        warn!(start, dropped = report.events_dropped, "monitor channel overflowed");
    }
}

#[instrument(skip(render), fields(path = %path.display(), frames = render.frame_count()))]
pub fn write_wav(path: &Path, render: &OfflineRender) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create wav output directory: {}",
                parent.display()
            )
        })?;
    }

    let spec = hound::WavSpec {
        channels: u16::try_from(render.channels.len()).context("too many output channels")?,
        sample_rate: render.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("failed to create wav file: {}", path.display()))?;

    for frame in 0..render.frame_count() {
        for channel in &render.channels {
            writer
                .write_sample(quantize(channel[frame]))
                .context("failed to write wav sample")?;
        }
    }

    writer.finalize().context("failed to finalize wav file")?;
    info!("wav export completed");
    Ok(())
}

#[must_use]
pub fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}
