//! Stitching slide images and narration clips into an MP4.

use super::audio::AudioClip;
use super::ffmpeg::MediaToolkit;
use super::timing::{frame_boundaries, frame_runs, FrameRun};
use crate::error::{Result, SmartLearnError};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

/// Quote a path for an ffmpeg concat file.
fn quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}

/// Concat list joining audio clips in order.
pub fn audio_concat_list(clips: &[AudioClip]) -> String {
    clips
        .iter()
        .map(|c| format!("file {}\n", quote(&c.path)))
        .collect()
}

/// Concat list showing each run's slide for the run's duration.
///
/// The last entry is repeated without a duration so ffmpeg honours the
/// final one.
pub fn image_concat_list(images: &[PathBuf], runs: &[FrameRun], fps: u32) -> String {
    let mut list = String::new();
    let mut last = None;
    for run in runs {
        let Some(image) = images.get(run.slide) else {
            continue;
        };
        let _ = writeln!(list, "file {}", quote(image));
        let _ = writeln!(list, "duration {:.6}", run.seconds(fps));
        last = Some(image);
    }
    if let Some(image) = last {
        let _ = writeln!(list, "file {}", quote(image));
    }
    list
}

/// Combines rendered slides with per-slide narration.
pub struct VideoGenerator {
    media: Arc<dyn MediaToolkit>,
    fps: u32,
}

impl VideoGenerator {
    pub fn new(media: Arc<dyn MediaToolkit>, fps: u32) -> Self {
        Self { media, fps }
    }

    /// Write the lecture video to `out`, returning the slide runs it shows.
    ///
    /// Slide and clip counts must match. Any encoder failure aborts.
    #[instrument(skip_all, fields(slides = slide_images.len(), clips = clips.len()))]
    pub async fn generate(
        &self,
        slide_images: &[PathBuf],
        clips: &[AudioClip],
        work_dir: &Path,
        out: &Path,
    ) -> Result<Vec<FrameRun>> {
        if slide_images.len() != clips.len() {
            return Err(SmartLearnError::SlideAudioMismatch {
                slides: slide_images.len(),
                clips: clips.len(),
            });
        }
        if clips.is_empty() {
            return Err(SmartLearnError::InvalidInput("Lecture has no slides".to_string()));
        }

        tokio::fs::create_dir_all(work_dir).await?;

        let audio_list = work_dir.join("audio_list.txt");
        let narration = work_dir.join("narration.mp3");
        tokio::fs::write(&audio_list, audio_concat_list(clips)).await?;
        self.media.concat_audio(&audio_list, &narration).await?;

        let durations: Vec<f64> = clips.iter().map(|c| c.duration).collect();
        let boundaries = frame_boundaries(&durations, self.fps);
        let runs = frame_runs(&boundaries);
        if runs.is_empty() {
            return Err(SmartLearnError::Lecture("Narration has no audible frames".to_string()));
        }

        let image_list = work_dir.join("image_list.txt");
        tokio::fs::write(&image_list, image_concat_list(slide_images, &runs, self.fps)).await?;
        self.media.mux(&image_list, &narration, out, self.fps).await?;

        info!("Encoded {} slide runs at {} fps", runs.len(), self.fps);
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lecture::test_support::FakeMedia;

    fn clip(slide: u32, duration: f64) -> AudioClip {
        AudioClip {
            slide,
            filename: format!("slide_{slide}.mp3"),
            path: PathBuf::from(format!("/work/slide_{slide}.mp3")),
            duration,
            silent: false,
        }
    }

    #[test]
    fn test_image_list_durations_follow_runs() {
        let images = vec![PathBuf::from("/r/slide-1.png"), PathBuf::from("/r/it's-2.png")];
        let runs = frame_runs(&frame_boundaries(&[2.0, 0.5], 24));
        let list = image_concat_list(&images, &runs, 24);

        assert_eq!(
            list,
            "file '/r/slide-1.png'\nduration 2.000000\n\
             file '/r/it'\\''s-2.png'\nduration 0.500000\n\
             file '/r/it'\\''s-2.png'\n"
        );
    }

    #[tokio::test]
    async fn test_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let generator = VideoGenerator::new(Arc::new(FakeMedia::default()), 24);
        let images = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];

        let result = generator
            .generate(&images, &[clip(1, 1.0)], dir.path(), &dir.path().join("out.mp4"))
            .await;

        assert!(matches!(
            result,
            Err(SmartLearnError::SlideAudioMismatch { slides: 2, clips: 1 })
        ));
        assert!(!dir.path().join("out.mp4").exists());
    }

    #[tokio::test]
    async fn test_generate_writes_video() {
        let dir = tempfile::tempdir().unwrap();
        let generator = VideoGenerator::new(Arc::new(FakeMedia::default()), 24);
        let images = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
        let out = dir.path().join("out.mp4");

        let runs = generator
            .generate(&images, &[clip(1, 1.0), clip(2, 3.0)], dir.path(), &out)
            .await
            .unwrap();

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].frames, 72);
        let video = std::fs::read_to_string(&out).unwrap();
        assert!(video.contains("duration 3.000000"));
    }
}
