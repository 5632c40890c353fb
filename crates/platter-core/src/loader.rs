use std::{
    fs::File,
    io::ErrorKind,
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
};

use anyhow::{Context, Result};
use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use tracing::{debug, error, info, instrument, warn};

use crate::source::{AudioSource, SourceHandle};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Published {
        path: PathBuf,
        channels: usize,
        frames: usize,
        sample_rate: f64,
    },
    Failed {
        path: PathBuf,
        reason: String,
    },
}

impl LoadOutcome {
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

#[instrument(fields(path = %path.display()))]
pub fn decode_audio_file(path: &Path) -> Result<AudioSource> {
    let file = File::open(path)
        .with_context(|| format!("failed to open audio file: {}", path.display()))?;
    let source = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|value| value.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        source,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| anyhow::anyhow!("no default audio track found in {}", path.display()))?;
    let track_id = track.id;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
    let mut planar: Vec<Vec<f32>> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(error)) if error.kind() == ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                return Err(anyhow::anyhow!(
                    "audio stream reset required for {}",
                    path.display()
                ));
            }
            Err(error) => return Err(error.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(reason)) => {
                warn!(reason, "skipping undecodable packet");
                continue;
            }
            Err(error) => return Err(error.into()),
        };

        sample_rate = decoded.spec().rate;
        push_planar_samples(decoded, &mut planar);
    }

    if planar.first().is_none_or(Vec::is_empty) {
        return Err(anyhow::anyhow!(
            "decoded zero samples from {}",
            path.display()
        ));
    }

    let reversed = planar
        .iter()
        .map(|channel| {
            let mut copy = channel.clone();
            copy.reverse();
            copy
        })
        .collect();

    let source = AudioSource::from_parts(f64::from(sample_rate), planar, reversed)
        .with_context(|| format!("decoded buffers are inconsistent for {}", path.display()))?;
    debug!(
        sample_rate,
        channels = source.channel_count(),
        frames = source.frame_count(),
        "audio decode complete"
    );
    Ok(source)
}

pub fn spawn_load(handle: SourceHandle, path: impl Into<PathBuf>) -> JoinHandle<LoadOutcome> {
    let path = path.into();
    thread::spawn(move || load_and_publish(&handle, path))
}

#[instrument(skip(handle), fields(path = %path.display()))]
pub fn load_and_publish(handle: &SourceHandle, path: PathBuf) -> LoadOutcome {
    match decode_audio_file(&path) {
        Ok(source) => {
            let outcome = LoadOutcome::Published {
                channels: source.channel_count(),
                frames: source.frame_count(),
                sample_rate: source.sample_rate(),
                path,
            };
            handle.publish(source);
            info!(?outcome, "audio source published");
            outcome
        }
        Err(error) => {
            error!(?error, "audio load failed, keeping previous source");
            LoadOutcome::Failed {
                path,
                reason: format!("{error:#}"),
            }
        }
    }
}

fn push_planar_samples(
    decoded: symphonia::core::audio::AudioBufferRef<'_>,
    planar: &mut Vec<Vec<f32>>,
) {
    let spec = *decoded.spec();
    let channel_count = spec.channels.count().max(1);
    if planar.len() < channel_count {
        let frames = planar.first().map_or(0, Vec::len);
        planar.resize_with(channel_count, || vec![0.0; frames]);
    }

    let mut sample_buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
    sample_buffer.copy_interleaved_ref(decoded);

    for frame in sample_buffer.samples().chunks(channel_count) {
        for (channel, data) in planar.iter_mut().enumerate() {
            data.push(frame.get(channel).copied().unwrap_or(0.0));
        }
    }
}
