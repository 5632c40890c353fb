use serde::{Deserialize, Serialize};

use crate::event::{TimedMessage, normalize_bend};

pub const DEFAULT_BEND_RANGE_SECONDS: f64 = 2.0;
pub const DEFAULT_MAX_CONTROL_POINTS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BendMapping {
    pub range_seconds: f64,
    pub sample_rate: f64,
}

impl Default for BendMapping {
    fn default() -> Self {
        Self {
            range_seconds: DEFAULT_BEND_RANGE_SECONDS,
            sample_rate: 44_100.0,
        }
    }
}

impl BendMapping {
    #[must_use]
    pub fn new(range_seconds: f64, sample_rate: f64) -> Self {
        Self {
            range_seconds,
            sample_rate,
        }
    }

    #[must_use]
    pub fn displacement(&self, value: u16) -> f64 {
        normalize_bend(value) * self.range_seconds * self.sample_rate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BendEvent {
    pub offset: usize,
    pub value: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub offset: i64,
    pub value: f64,
}

impl ControlPoint {
    #[must_use]
    pub fn new(offset: i64, value: f64) -> Self {
        Self { offset, value }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ControlPoints {
    points: Vec<ControlPoint>,
    capacity: usize,
}

impl ControlPoints {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, point: ControlPoint) -> bool {
        if !point.value.is_finite() {
            return false;
        }
        if let Some(last) = self.points.last_mut() {
            if last.offset == point.offset {
                last.value = point.value;
                return true;
            }
            if last.offset > point.offset {
                return false;
            }
        }
        if self.points.len() >= self.capacity {
            return false;
        }
        self.points.push(point);
        true
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ControlPoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<ControlPoint> {
        self.points.first().copied()
    }

    #[must_use]
    pub fn last(&self) -> Option<ControlPoint> {
        self.points.last().copied()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Continuity {
    pub last_bend: Option<BendEvent>,
    pub anchor: Option<ControlPoint>,
}

impl Continuity {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.last_bend.is_none() && self.anchor.is_none()
    }

    #[must_use]
    pub fn carry(
        last_bend: Option<BendEvent>,
        curve_tail: Option<f64>,
        block_len: usize,
        mapping: &BendMapping,
    ) -> Self {
        let anchor = match (curve_tail, last_bend) {
            (Some(value), _) => Some(ControlPoint::new(-1, value)),
            (None, Some(bend)) => Some(ControlPoint::new(
                bend.offset as i64 - block_len as i64,
                mapping.displacement(bend.value),
            )),
            (None, None) => None,
        };
        Self { last_bend, anchor }
    }
}

// Runs one block behind the wheel: bends from block k become knots while
// k + 1 renders, and the first bend of k + 1 is placed past its end.
#[derive(Debug, Clone)]
pub struct PitchBendExtractor {
    previous: Vec<BendEvent>,
    incoming: Vec<BendEvent>,
    capacity: usize,
    channel: Option<u8>,
}

impl PitchBendExtractor {
    #[must_use]
    pub fn new(capacity: usize, channel: Option<u8>) -> Self {
        Self {
            previous: Vec::with_capacity(capacity),
            incoming: Vec::with_capacity(capacity),
            capacity,
            channel,
        }
    }

    #[must_use]
    pub fn previous_bends(&self) -> &[BendEvent] {
        &self.previous
    }

    pub fn forget_history(&mut self) {
        self.previous.clear();
        self.incoming.clear();
    }

    pub fn collect(
        &mut self,
        continuity: &Continuity,
        midi: &[TimedMessage],
        block_len: usize,
        mapping: &BendMapping,
        points: &mut ControlPoints,
    ) {
        points.clear();
        self.incoming.clear();
        let last_offset = block_len.saturating_sub(1);
        for message in midi {
            if self.incoming.len() >= self.capacity {
                break;
            }
            if self
                .channel
                .is_some_and(|channel| channel != message.channel.as_int())
            {
                continue;
            }
            if let Some(value) = message.bend_value() {
                self.incoming.push(BendEvent {
                    offset: message.offset.min(last_offset),
                    value,
                });
            }
        }

        if let Some(anchor) = continuity.anchor {
            points.push(anchor);
        }

        for bend in &self.previous {
            points.push(ControlPoint::new(
                bend.offset as i64,
                mapping.displacement(bend.value),
            ));
        }

        if let Some(first) = self.incoming.first() {
            points.push(ControlPoint::new(
                (first.offset + block_len) as i64,
                mapping.displacement(first.value),
            ));
        }
    }

    pub fn finish_block(&mut self) -> Option<BendEvent> {
        let rendered = self.previous.last().copied();
        std::mem::swap(&mut self.previous, &mut self.incoming);
        self.incoming.clear();
        rendered
    }
}
