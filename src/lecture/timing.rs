//! Slide-to-audio frame timing.
//!
//! Each clip contributes `round(duration * fps)` frames. Boundaries are the
//! running totals, so the slide drawn at frame `f` is the first boundary
//! whose cumulative count exceeds `f`.

use serde::Serialize;

/// End of one slide's frame span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameBoundary {
    /// Cumulative frame count up to and including this slide.
    pub cumulative_frames: u64,
    /// 0-based slide index.
    pub slide: usize,
}

/// A maximal run of consecutive frames showing the same slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameRun {
    pub slide: usize,
    pub start_frame: u64,
    pub frames: u64,
}

impl FrameRun {
    /// Display time of the run at the given frame rate.
    pub fn seconds(&self, fps: u32) -> f64 {
        if fps == 0 {
            return 0.0;
        }
        self.frames as f64 / fps as f64
    }
}

/// Frames contributed by a clip of `duration` seconds.
///
/// Negative or non-finite durations count as zero frames.
pub fn frames_for(duration: f64, fps: u32) -> u64 {
    let frames = (duration * fps as f64).round();
    if frames.is_finite() && frames > 0.0 {
        frames as u64
    } else {
        0
    }
}

/// Cumulative frame boundaries for per-clip durations.
pub fn frame_boundaries(durations: &[f64], fps: u32) -> Vec<FrameBoundary> {
    let mut total = 0u64;
    durations
        .iter()
        .enumerate()
        .map(|(slide, duration)| {
            total += frames_for(*duration, fps);
            FrameBoundary {
                cumulative_frames: total,
                slide,
            }
        })
        .collect()
}

/// Total frame count of a boundary list.
pub fn total_frames(boundaries: &[FrameBoundary]) -> u64 {
    boundaries.last().map(|b| b.cumulative_frames).unwrap_or(0)
}

/// Slide drawn at `frame`, or `None` past the end.
pub fn slide_for_frame(boundaries: &[FrameBoundary], frame: u64) -> Option<usize> {
    boundaries
        .iter()
        .find(|b| b.cumulative_frames > frame)
        .map(|b| b.slide)
}

/// Group frames into runs of the same slide.
///
/// Slides whose clip rounds to zero frames produce no run.
pub fn frame_runs(boundaries: &[FrameBoundary]) -> Vec<FrameRun> {
    let mut runs: Vec<FrameRun> = Vec::new();

    for frame in 0..total_frames(boundaries) {
        let Some(slide) = slide_for_frame(boundaries, frame) else {
            break;
        };
        match runs.last_mut() {
            Some(run) if run.slide == slide => run.frames += 1,
            _ => runs.push(FrameRun {
                slide,
                start_frame: frame,
                frames: 1,
            }),
        }
    }

    runs
}
