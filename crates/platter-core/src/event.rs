use std::fmt;

use midly::{
    MidiMessage, PitchBend,
    live::LiveEvent,
    num::{u4, u14},
};
use serde::{Deserialize, Serialize};

pub const PITCH_BEND_CENTER: u16 = 8_192;
pub const PITCH_BEND_MAX: u16 = 16_383;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidiEventKind {
    #[default]
    Other,
    NoteOn,
    NoteOff,
    ControlChange,
    PitchBend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub sample_offset: usize,
    pub kind: MidiEventKind,
    pub channel: u8,
    pub data1: u8,
    pub data2: u8,
    pub pitch_value: u16,
}

impl Default for MidiEvent {
    fn default() -> Self {
        Self {
            sample_offset: 0,
            kind: MidiEventKind::Other,
            channel: 1,
            data1: 0,
            data2: 0,
            pitch_value: PITCH_BEND_CENTER,
        }
    }
}

impl MidiEvent {
    #[must_use]
    pub fn from_timed(message: &TimedMessage) -> Self {
        let mut event = Self {
            sample_offset: message.offset,
            channel: message.channel.as_int() + 1,
            ..Self::default()
        };

        match message.message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                event.kind = MidiEventKind::NoteOn;
                event.data1 = key.as_int();
                event.data2 = vel.as_int();
            }
            MidiMessage::NoteOn { key, vel } | MidiMessage::NoteOff { key, vel } => {
                event.kind = MidiEventKind::NoteOff;
                event.data1 = key.as_int();
                event.data2 = vel.as_int();
            }
            MidiMessage::Controller { controller, value } => {
                event.kind = MidiEventKind::ControlChange;
                event.data1 = controller.as_int();
                event.data2 = value.as_int();
            }
            MidiMessage::PitchBend { bend } => {
                event.kind = MidiEventKind::PitchBend;
                event.pitch_value = bend.0.as_int();
            }
            MidiMessage::Aftertouch { .. }
            | MidiMessage::ProgramChange { .. }
            | MidiMessage::ChannelAftertouch { .. } => {}
        }

        event
    }

    #[must_use]
    pub fn normalized_bend(&self) -> f64 {
        normalize_bend(self.pitch_value)
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MidiEventKind::NoteOn => write!(
                f,
                "NoteOn  ch:{} note:{} vel:{} @{}",
                self.channel, self.data1, self.data2, self.sample_offset
            ),
            MidiEventKind::NoteOff => write!(
                f,
                "NoteOff ch:{} note:{} vel:{} @{}",
                self.channel, self.data1, self.data2, self.sample_offset
            ),
            MidiEventKind::ControlChange => write!(
                f,
                "CC      ch:{} cc:{} val:{} @{}",
                self.channel, self.data1, self.data2, self.sample_offset
            ),
            MidiEventKind::PitchBend => write!(
                f,
                "Pitch   ch:{} val:{} ({:.3}) @{}",
                self.channel,
                self.pitch_value,
                self.normalized_bend(),
                self.sample_offset
            ),
            MidiEventKind::Other => {
                write!(f, "Other   ch:{} @{}", self.channel, self.sample_offset)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedMessage {
    pub offset: usize,
    pub channel: u4,
    pub message: MidiMessage,
}

impl TimedMessage {
    #[must_use]
    pub fn new(offset: usize, channel: u8, message: MidiMessage) -> Self {
        Self {
            offset,
            channel: u4::from(channel.min(15)),
            message,
        }
    }

    #[must_use]
    pub fn pitch_bend(offset: usize, channel: u8, value: u16) -> Self {
        Self::new(
            offset,
            channel,
            MidiMessage::PitchBend {
                bend: PitchBend(u14::from(value.min(PITCH_BEND_MAX))),
            },
        )
    }

    #[must_use]
    pub fn parse(offset: usize, raw: &[u8]) -> Option<Self> {
        match LiveEvent::parse(raw).ok()? {
            LiveEvent::Midi { channel, message } => Some(Self {
                offset,
                channel,
                message,
            }),
            LiveEvent::Common(_) | LiveEvent::Realtime(_) => None,
        }
    }

    #[must_use]
    pub fn bend_value(&self) -> Option<u16> {
        match self.message {
            MidiMessage::PitchBend { bend } => Some(bend.0.as_int()),
            _ => None,
        }
    }
}

#[must_use]
pub fn normalize_bend(value: u16) -> f64 {
    (f64::from(value.min(PITCH_BEND_MAX)) - f64::from(PITCH_BEND_CENTER))
        / f64::from(PITCH_BEND_CENTER)
}
