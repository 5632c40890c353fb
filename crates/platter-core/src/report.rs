use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::offline::{OfflineRender, quantize};

const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderReport {
    pub schema_version: u32,
    pub sample_rate: u32,
    pub frames: usize,
    pub channels: usize,
    pub blocks: usize,
    pub curve_driven_blocks: usize,
    pub fixed_ratio_blocks: usize,
    pub silent_blocks: usize,
    pub final_playhead: f64,
    pub latency_samples: usize,
    pub events_logged: usize,
    pub events_dropped: usize,
    pub audio_hash: String,
}

#[instrument(skip(render), fields(frames = render.frame_count()))]
#[must_use]
pub fn generate_report(render: &OfflineRender) -> RenderReport {
    let mut hasher = Sha256::new();
    for frame in 0..render.frame_count() {
        for channel in &render.channels {
            hasher.update(quantize(channel[frame]).to_le_bytes());
        }
    }

    RenderReport {
        schema_version: REPORT_SCHEMA_VERSION,
        sample_rate: render.sample_rate,
        frames: render.frame_count(),
        channels: render.channels.len(),
        blocks: render.modes.total(),
        curve_driven_blocks: render.modes.curve_driven,
        fixed_ratio_blocks: render.modes.fixed_ratio,
        silent_blocks: render.modes.no_source,
        final_playhead: render.final_playhead,
        latency_samples: render.latency_samples,
        events_logged: render.events.len(),
        events_dropped: render.events_dropped,
        audio_hash: format!("{:x}", hasher.finalize()),
    }
}

pub fn read_report(path: &Path) -> Result<RenderReport> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read render report: {}", path.display()))?;
    let report: RenderReport =
        serde_json::from_slice(&bytes).context("failed to parse render report json")?;
    Ok(report)
}

pub fn write_report(path: &Path, report: &RenderReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory: {}", parent.display()))?;
    }

    let json = serde_json::to_vec_pretty(report).context("failed to encode render report json")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write render report: {}", path.display()))?;
    Ok(())
}
