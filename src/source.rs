//! Where frames come from.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::RgbImage;

use crate::config::CaptureConfig;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("failed to run capture program {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("capture program {program} exited with {status}: {stderr}")]
    CaptureFailed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("failed to decode frame {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("no more frames")]
    Exhausted,
}

/// Produces decoded frames, one per loop iteration.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<RgbImage, FrameError>;
}

/// Decodes any format the `image` crate understands, flattening to RGB.
///
/// BMP files store rows bottom-up with blue first; decoding takes care of both.
pub fn open_frame(path: &Path) -> Result<RgbImage, FrameError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| FrameError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Runs an external still-capture program and decodes what it wrote.
#[derive(Debug, Clone)]
pub struct CaptureCommand {
    config: CaptureConfig,
}

impl CaptureCommand {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }
}

impl FrameSource for CaptureCommand {
    fn next_frame(&mut self) -> Result<RgbImage, FrameError> {
        let program = &self.config.program;
        let output = Command::new(program)
            .args(&self.config.args)
            .output()
            .map_err(|source| FrameError::Spawn {
                program: program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(FrameError::CaptureFailed {
                program: program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        tracing::debug!(program = %program, "took picture");
        open_frame(&self.config.output)
    }
}

/// Replays image files in order; optionally loops forever.
#[derive(Debug, Clone)]
pub struct ImageFiles {
    paths: Vec<PathBuf>,
    next: usize,
    repeat: bool,
}

impl ImageFiles {
    pub fn new(paths: Vec<PathBuf>, repeat: bool) -> Self {
        Self {
            paths,
            next: 0,
            repeat,
        }
    }

    /// Path of the frame most recently returned.
    pub fn current(&self) -> Option<&Path> {
        let idx = self.next.checked_sub(1)?;
        self.paths.get(idx).map(PathBuf::as_path)
    }
}

impl FrameSource for ImageFiles {
    fn next_frame(&mut self) -> Result<RgbImage, FrameError> {
        if self.next >= self.paths.len() {
            if !self.repeat || self.paths.is_empty() {
                return Err(FrameError::Exhausted);
            }
            self.next = 0;
        }
        let path = &self.paths[self.next];
        self.next += 1;
        open_frame(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_replay_is_exhausted() {
        let mut files = ImageFiles::new(Vec::new(), true);
        assert!(matches!(files.next_frame(), Err(FrameError::Exhausted)));
        assert!(files.current().is_none());
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let mut files = ImageFiles::new(vec![PathBuf::from("does/not/exist.bmp")], false);
        assert!(matches!(files.next_frame(), Err(FrameError::Decode { .. })));
        assert_eq!(files.current(), Some(Path::new("does/not/exist.bmp")));
        assert!(matches!(files.next_frame(), Err(FrameError::Exhausted)));
    }

    #[test]
    fn missing_capture_program_fails_to_spawn() {
        let mut capture = CaptureCommand::new(CaptureConfig {
            program: "definitely-not-a-capture-program".to_string(),
            args: Vec::new(),
            output: PathBuf::from("unused.bmp"),
        });
        assert!(matches!(capture.next_frame(), Err(FrameError::Spawn { .. })));
    }
}
