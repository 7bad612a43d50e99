//! External media tools: ffmpeg, ffprobe and pdftoppm.

use crate::error::{Result, SmartLearnError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, instrument};

/// Media operations the lecture pipeline shells out for.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Rasterize every PDF page to PNG in `out_dir`, in page order.
    async fn render_slides(&self, pdf: &Path, out_dir: &Path, dpi: u32) -> Result<Vec<PathBuf>>;

    /// Duration of an audio file in seconds.
    async fn measure_duration(&self, path: &Path) -> Result<f64>;

    /// Write a silent MP3 of the given length.
    async fn write_silence(&self, path: &Path, seconds: f64) -> Result<()>;

    /// Join the clips listed in an ffmpeg concat file into one MP3.
    async fn concat_audio(&self, list: &Path, out: &Path) -> Result<()>;

    /// Encode the image concat list with the narration into an MP4.
    async fn mux(&self, image_list: &Path, audio: &Path, out: &Path, fps: u32) -> Result<()>;
}

/// Run a tool to completion, mapping a missing binary and a non-zero exit.
async fn run_tool(tool: &str, command: &mut Command) -> Result<Output> {
    let result = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SmartLearnError::ToolNotFound(tool.to_string()));
        }
        Err(e) => {
            return Err(SmartLearnError::ToolFailed(format!("{tool} execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SmartLearnError::ToolFailed(format!("{tool} failed: {}", stderr.trim())));
    }

    Ok(output)
}

/// Parse `format.duration` from `ffprobe -print_format json` output.
pub fn parse_duration_output(stdout: &[u8]) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|_| SmartLearnError::ToolFailed("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| SmartLearnError::ToolFailed("Could not determine audio duration".into()))
}

/// Page number in a pdftoppm output name such as `slide-07.png`.
fn page_index(path: &Path) -> Option<u32> {
    path.file_stem()?
        .to_str()?
        .rsplit('-')
        .next()?
        .parse()
        .ok()
}

/// The real tools, found on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ffmpeg;

impl Ffmpeg {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaToolkit for Ffmpeg {
    #[instrument(skip(self))]
    async fn render_slides(&self, pdf: &Path, out_dir: &Path, dpi: u32) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(out_dir).await?;

        run_tool(
            "pdftoppm",
            Command::new("pdftoppm")
                .arg("-r").arg(dpi.to_string())
                .arg("-png")
                .arg(pdf)
                .arg(out_dir.join("slide")),
        )
        .await?;

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_slide = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("slide-") && n.ends_with(".png"));
            if let (true, Some(index)) = (is_slide, page_index(&path)) {
                pages.push((index, path));
            }
        }
        pages.sort_by_key(|(index, _)| *index);

        debug!("Rendered {} slide images", pages.len());
        Ok(pages.into_iter().map(|(_, path)| path).collect())
    }

    async fn measure_duration(&self, path: &Path) -> Result<f64> {
        let output = run_tool(
            "ffprobe",
            Command::new("ffprobe")
                .arg("-v").arg("quiet")
                .arg("-print_format").arg("json")
                .arg("-show_format")
                .arg(path),
        )
        .await?;

        parse_duration_output(&output.stdout)
    }

    async fn write_silence(&self, path: &Path, seconds: f64) -> Result<()> {
        run_tool(
            "ffmpeg",
            Command::new("ffmpeg")
                .arg("-f").arg("lavfi")
                .arg("-i").arg("anullsrc=r=24000:cl=mono")
                .arg("-t").arg(format!("{:.3}", seconds))
                .arg("-codec:a").arg("libmp3lame")
                .arg("-y")
                .arg("-loglevel").arg("error")
                .arg(path),
        )
        .await
        .map(|_| ())
    }

    async fn concat_audio(&self, list: &Path, out: &Path) -> Result<()> {
        run_tool(
            "ffmpeg",
            Command::new("ffmpeg")
                .arg("-f").arg("concat")
                .arg("-safe").arg("0")
                .arg("-i").arg(list)
                .arg("-codec:a").arg("libmp3lame")
                .arg("-qscale:a").arg("2")
                .arg("-y")
                .arg("-loglevel").arg("error")
                .arg(out),
        )
        .await
        .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn mux(&self, image_list: &Path, audio: &Path, out: &Path, fps: u32) -> Result<()> {
        run_tool(
            "ffmpeg",
            Command::new("ffmpeg")
                .arg("-f").arg("concat")
                .arg("-safe").arg("0")
                .arg("-i").arg(image_list)
                .arg("-i").arg(audio)
                .arg("-vf")
                .arg(format!("fps={fps},scale=trunc(iw/2)*2:trunc(ih/2)*2,format=yuv420p"))
                .arg("-c:v").arg("libx264")
                .arg("-c:a").arg("aac")
                .arg("-y")
                .arg("-loglevel").arg("error")
                .arg(out),
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_output() {
        let json = br#"{"format": {"filename": "a.mp3", "duration": "3.456000"}}"#;
        assert!((parse_duration_output(json).unwrap() - 3.456).abs() < 1e-9);
        assert!(parse_duration_output(b"{}").is_err());
        assert!(parse_duration_output(b"not json").is_err());
    }

    #[test]
    fn test_page_index_handles_padding() {
        assert_eq!(page_index(Path::new("/tmp/x/slide-07.png")), Some(7));
        assert_eq!(page_index(Path::new("/tmp/x/slide-12.png")), Some(12));
        assert_eq!(page_index(Path::new("/tmp/x/cover.png")), None);
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_not_found() {
        let result = run_tool(
            "definitely-not-installed",
            &mut Command::new("definitely-not-installed-smartlearn-tool"),
        )
        .await;
        assert!(matches!(result, Err(SmartLearnError::ToolNotFound(_))));
    }
}
