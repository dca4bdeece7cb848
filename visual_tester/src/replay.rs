// Offline replay: feeds recorded tracker output through the pipeline, one JSON line
// per frame, and renders the result onto blank frames.
//
// Input line format: {"tracks": [[x1, y1, x2, y2, id], ...]}

use crate::settings::AppConfig;
use action_ball::core_modules::frame_annotator::{self, ImageCanvas};
use action_ball::core_modules::geometry::{BoundingBox, Track};
use action_ball::core_modules::utils::image_helper::{self, FontVec};
use action_ball::{BallPipeline, FrameReport, PipelineState};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

const BACKGROUND: Rgb<u8> = Rgb([24, 24, 24]);

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub input: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub font: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct TrackFrame {
    #[serde(default)]
    tracks: Vec<[f64; 5]>,
}

/// One line of the per-frame JSON output.
#[derive(Debug, Serialize)]
struct FrameSummary<'a> {
    frame: u64,
    state: PipelineState,
    action: Option<u64>,
    stationary: &'a BTreeSet<u64>,
    tracks: usize,
    rejected: usize,
}

#[derive(Debug, Default, PartialEq)]
pub struct ReplaySummary {
    pub frames: u64,
    pub role_changes: u64,
    pub rejected_tracks: usize,
}

/// Largest id an `f64` still holds exactly; above it distinct ids would collapse.
const MAX_EXACT_ID: f64 = 9_007_199_254_740_992.0;

fn to_track(row: &[f64; 5]) -> Option<Track> {
    let [x1, y1, x2, y2, id] = *row;
    if !id.is_finite() || id < 0.0 || id.fract() != 0.0 || id > MAX_EXACT_ID {
        return None;
    }
    Some(Track::new(BoundingBox::new(x1, y1, x2, y2), id as u64))
}

pub fn run(options: &ReplayOptions, app: &AppConfig, stop: &AtomicBool, out: &mut impl Write) -> Result<ReplaySummary> {
    let input = std::fs::File::open(&options.input)
        .with_context(|| format!("cannot open track file {}", options.input.display()))?;
    if let Some(dir) = &options.output_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }
    let font = options
        .font
        .as_deref()
        .map(image_helper::load_font)
        .transpose()?
        .map(Arc::new);

    let mut pipeline = BallPipeline::new(app.pipeline.clone())?;
    let mut summary = ReplaySummary::default();
    let mut last_action = None;

    for (index, line) in BufReader::new(input).lines().enumerate() {
        if stop.load(Ordering::Relaxed) {
            info!(frames = summary.frames, "replay interrupted");
            break;
        }
        let line = line.context("failed to read track file")?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: TrackFrame =
            serde_json::from_str(&line).with_context(|| format!("line {} is not a track frame", index + 1))?;

        let mut bad_ids = 0;
        let tracks: Vec<Track> = frame
            .tracks
            .iter()
            .filter_map(|row| {
                let track = to_track(row);
                if track.is_none() {
                    bad_ids += 1;
                }
                track
            })
            .collect();
        if bad_ids > 0 {
            warn!(line = index + 1, count = bad_ids, "dropping tracks with invalid identities");
        }

        let report = pipeline.process_tracks(tracks);
        summary.frames += 1;
        summary.rejected_tracks += report.rejected_tracks + bad_ids;
        if report.roles.action != last_action {
            summary.role_changes += 1;
            last_action = report.roles.action;
        }

        if let Some(dir) = &options.output_dir {
            let path = dir.join(image_helper::frame_file_name(report.frame_number));
            let image = render(&report, options, font.clone())?;
            image_helper::save(&path, &image)?;
        }

        write_summary(out, &report)?;
    }

    info!(
        frames = summary.frames,
        identities = pipeline.history().len(),
        role_changes = summary.role_changes,
        "replay finished"
    );
    Ok(summary)
}

fn render(report: &FrameReport, options: &ReplayOptions, font: Option<Arc<FontVec>>) -> Result<RgbImage> {
    let blank = RgbImage::from_pixel(options.width, options.height, BACKGROUND);
    let mut canvas = match font {
        Some(font) => ImageCanvas::with_font(blank, font),
        None => ImageCanvas::new(blank),
    };
    frame_annotator::annotate(&mut canvas, &report.tracks, &report.roles, &report.trail)?;
    Ok(canvas.into_image())
}

fn write_summary(out: &mut impl Write, report: &FrameReport) -> Result<()> {
    let line = FrameSummary {
        frame: report.frame_number,
        state: report.state,
        action: report.roles.action,
        stationary: &report.roles.stationary,
        tracks: report.tracks.len(),
        rejected: report.rejected_tracks,
    };
    serde_json::to_writer(&mut *out, &line)?;
    writeln!(out)?;
    Ok(())
}
