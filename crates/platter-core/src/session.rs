use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    bend::{
        BendMapping, Continuity, ControlPoints, DEFAULT_BEND_RANGE_SECONDS,
        DEFAULT_MAX_CONTROL_POINTS, PitchBendExtractor,
    },
    channel::EventProducer,
    event::{MidiEvent, TimedMessage},
    resample::{self, Playhead},
    source::{AudioSource, Orientation, SourceHandle},
    spline::CubicSpline,
};

pub const DEFAULT_BLOCK_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub bend_range_seconds: f64,
    pub orientation: Orientation,
    pub max_control_points: usize,
    pub bend_channel: Option<u8>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bend_range_seconds: DEFAULT_BEND_RANGE_SECONDS,
            orientation: Orientation::Forward,
            max_control_points: DEFAULT_MAX_CONTROL_POINTS,
            bend_channel: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    NoSource,
    FixedRatio,
    CurveDriven,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTransition {
    Appeared,
    Lost,
}

// Nothing on the render path logs; transitions surface here and the caller
// reports them from its own thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockReport {
    pub mode: RenderMode,
    pub frames: usize,
    pub control_points: usize,
    pub events_dropped: usize,
    pub block_resized: bool,
    pub source_transition: Option<SourceTransition>,
}

pub struct RenderSession {
    config: SessionConfig,
    source: SourceHandle,
    events: EventProducer,
    mapping: BendMapping,
    extractor: PitchBendExtractor,
    points: ControlPoints,
    spline: CubicSpline,
    curve: Vec<f64>,
    ratios: Vec<f64>,
    playhead: Playhead,
    continuity: Continuity,
    block_len: Option<usize>,
    latency: usize,
    had_source: bool,
}

impl RenderSession {
    #[must_use]
    pub fn new(config: SessionConfig, source: SourceHandle, events: EventProducer) -> Self {
        let capacity = config.max_control_points.max(2);
        Self {
            config,
            source,
            events,
            mapping: BendMapping::new(config.bend_range_seconds, 44_100.0),
            extractor: PitchBendExtractor::new(capacity, config.bend_channel),
            points: ControlPoints::with_capacity(capacity),
            spline: CubicSpline::with_capacity(capacity),
            curve: Vec::with_capacity(DEFAULT_BLOCK_SIZE),
            ratios: Vec::with_capacity(DEFAULT_BLOCK_SIZE),
            playhead: Playhead::default(),
            continuity: Continuity::default(),
            block_len: None,
            latency: 0,
            had_source: false,
        }
    }

    #[instrument(skip(self))]
    pub fn prepare(&mut self, host_sample_rate: f64, max_block_len: usize) {
        self.mapping = BendMapping::new(self.config.bend_range_seconds, host_sample_rate);
        reserve_to(&mut self.curve, max_block_len);
        reserve_to(&mut self.ratios, max_block_len);
        // bends shape the block after the one they arrive in
        self.latency = max_block_len;
        self.reset_transport();
        info!(
            host_sample_rate,
            max_block_len,
            latency_samples = self.latency,
            orientation = ?self.config.orientation,
            "render session prepared"
        );
    }

    #[must_use]
    pub fn latency_samples(&self) -> usize {
        self.latency
    }

    pub fn reset_transport(&mut self) {
        self.playhead.reset();
        self.continuity = Continuity::default();
        self.extractor.forget_history();
        self.block_len = None;
    }

    // Off the audio thread. The playhead is mirrored so the same point of
    // the recording stays under the needle.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        if orientation == self.config.orientation {
            return;
        }
        self.config.orientation = orientation;
        let frames = self.source.snapshot().as_deref().map_or(0, AudioSource::frame_count);
        if frames > 0 {
            let mirrored = frames as f64 - 1.0 - self.playhead.position();
            self.playhead = Playhead::new(mirrored);
            self.playhead.clamp_to(frames);
        }
        info!(?orientation, playhead = self.playhead.position(), "orientation changed");
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn mapping(&self) -> &BendMapping {
        &self.mapping
    }

    #[must_use]
    pub fn playhead(&self) -> f64 {
        self.playhead.position()
    }

    #[must_use]
    pub fn continuity(&self) -> Continuity {
        self.continuity
    }

    #[must_use]
    pub fn curve(&self) -> &[f64] {
        &self.curve
    }

    #[must_use]
    pub fn ratios(&self) -> &[f64] {
        &self.ratios
    }

    #[must_use]
    pub fn control_points(&self) -> &ControlPoints {
        &self.points
    }

    // `midi` is ordered by offset. Fills every output channel up to the
    // shortest channel length.
    pub fn render_block(
        &mut self,
        midi: &[TimedMessage],
        output: &mut [&mut [f32]],
    ) -> BlockReport {
        let frames = output.iter().map(|channel| channel.len()).min().unwrap_or(0);

        let mut events_dropped = 0;
        for message in midi {
            if !self.events.push(MidiEvent::from_timed(message)) {
                events_dropped += 1;
            }
        }

        let block_resized = self.block_len.is_some_and(|len| len != frames);
        if block_resized {
            self.continuity = Continuity::default();
            self.extractor.forget_history();
        }
        self.block_len = Some(frames);

        self.extractor.collect(
            &self.continuity,
            midi,
            frames,
            &self.mapping,
            &mut self.points,
        );

        self.curve.clear();
        self.ratios.clear();
        let curve_tail = if self.points.len() >= 2 && frames > 0 {
            self.build_curve(frames)
        } else {
            None
        };
        let rendered_bend = self.extractor.finish_block();
        self.continuity = Continuity::carry(rendered_bend, curve_tail, frames, &self.mapping);

        let snapshot = self.source.snapshot();
        let mut source_transition = None;
        let mode = match snapshot.as_deref() {
            Some(source) if !source.is_empty() => {
                if !self.had_source {
                    source_transition = Some(SourceTransition::Appeared);
                    self.had_source = true;
                }
                let orientation = self.config.orientation;
                match curve_tail {
                    Some(_)
                        if resample::render_with_ratios(
                            source,
                            orientation,
                            &mut self.playhead,
                            &self.ratios,
                            output,
                            frames,
                        ) =>
                    {
                        RenderMode::CurveDriven
                    }
                    // length mismatch, already rendered straight
                    Some(_) => RenderMode::FixedRatio,
                    None => {
                        resample::render_fixed(
                            source,
                            orientation,
                            &mut self.playhead,
                            output,
                            frames,
                        );
                        RenderMode::FixedRatio
                    }
                }
            }
            _ => {
                if self.had_source {
                    source_transition = Some(SourceTransition::Lost);
                    self.had_source = false;
                }
                resample::silence(output, frames);
                RenderMode::NoSource
            }
        };

        BlockReport {
            mode,
            frames,
            control_points: self.points.len(),
            events_dropped,
            block_resized,
            source_transition,
        }
    }

    fn build_curve(&mut self, frames: usize) -> Option<f64> {
        if self.spline.fit(self.points.as_slice()).is_err() {
            return None;
        }
        self.spline.evaluate_block(frames, &mut self.curve);
        let previous = self.spline.value_at(-1.0);
        resample::derive_ratios(&self.curve, previous, &mut self.ratios);
        self.curve.last().copied()
    }
}

fn reserve_to(buffer: &mut Vec<f64>, len: usize) {
    if buffer.capacity() < len {
        buffer.reserve(len - buffer.len());
    }
}
