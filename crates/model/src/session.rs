//! Recorded landmark sessions.
//!
//! A session file is JSONL: a `# {header}` comment line followed by one
//! [`LandmarkFrame`] per line. Frames tagged with a calibration target
//! ordinal belong to calibration; untagged frames are tracking input.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::geometry::ScreenSize;
use crate::landmark::Landmark;
use crate::StoreError;

/// Monotonic timestamp in nanoseconds since session start.
pub type TimestampNs = u64;

/// Current session file schema version.
pub const SESSION_SCHEMA_VERSION: &str = "1.0";

/// Session metadata written as the first line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHeader {
    /// Schema version for forward compatibility.
    pub schema_version: String,

    /// Wall-clock time at session start (ISO 8601).
    pub epoch_wall: String,

    /// Screen the session was recorded against.
    pub screen: ScreenSize,

    /// Nominal camera frame rate (Hz).
    pub fps: u32,
}

/// One camera frame worth of landmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Monotonic nanoseconds since session start.
    #[serde(rename = "t")]
    pub timestamp_ns: TimestampNs,

    /// Calibration target ordinal being looked at, if this is a calibration frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,

    /// Landmarks; empty when no face was detected.
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

impl LandmarkFrame {
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_ns as f64 / 1_000_000_000.0
    }
}

/// A parsed session file.
#[derive(Debug, Clone)]
pub struct Session {
    pub header: Option<SessionHeader>,
    pub frames: Vec<LandmarkFrame>,
}

impl Session {
    /// Read and parse a session file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let header = parse_header(&content).map_err(|e| StoreError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let frames = parse_frames(&content).map_err(|e| StoreError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self { header, frames })
    }

    /// Frames that carry a calibration target.
    pub fn calibration_frames(&self) -> impl Iterator<Item = &LandmarkFrame> {
        self.frames.iter().filter(|f| f.target.is_some())
    }

    /// Frames without a calibration target.
    pub fn tracking_frames(&self) -> impl Iterator<Item = &LandmarkFrame> {
        self.frames.iter().filter(|f| f.target.is_none())
    }
}

/// Parse the `# {header}` line, if present.
pub fn parse_header(jsonl: &str) -> Result<Option<SessionHeader>, serde_json::Error> {
    match jsonl
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
    {
        Some(line) => serde_json::from_str(line.trim_start_matches('#').trim()).map(Some),
        None => Ok(None),
    }
}

/// Parse frames from JSONL content (one JSON object per line).
pub fn parse_frames(jsonl: &str) -> Result<Vec<LandmarkFrame>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Writes frames to a JSONL session file.
pub struct FrameWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    frames_written: u64,
}

impl FrameWriter {
    /// Create a new session file, writing the header as the first line.
    pub fn new(path: PathBuf, header: &SessionHeader) -> Result<Self, StoreError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::IoError { path, source }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(io_err(path.as_path()))?;

        let mut writer = BufWriter::new(file);

        let header_json = serde_json::to_string(header).map_err(|e| StoreError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        writeln!(writer, "# {header_json}").map_err(io_err(path.as_path()))?;

        Ok(Self {
            writer,
            path,
            frames_written: 0,
        })
    }

    /// Write a single frame as a JSONL line.
    pub fn write_frame(&mut self, frame: &LandmarkFrame) -> Result<(), StoreError> {
        let json = serde_json::to_string(frame).map_err(|e| StoreError::ParseError {
            path: self.path.clone(),
            source: e,
        })?;
        writeln!(self.writer, "{json}").map_err(|e| StoreError::IoError {
            path: self.path.clone(),
            source: e,
        })?;
        self.frames_written += 1;

        // Frames are large; flush every 300 (~10 s at 30 Hz)
        if self.frames_written % 300 == 0 {
            self.flush()?;
        }

        Ok(())
    }

    /// Flush buffered writes to disk.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.writer.flush().map_err(|e| StoreError::IoError {
            path: self.path.clone(),
            source: e,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FrameWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> SessionHeader {
        SessionHeader {
            schema_version: SESSION_SCHEMA_VERSION.to_string(),
            epoch_wall: "2026-01-01T00:00:00Z".to_string(),
            screen: ScreenSize::new(1920, 1080),
            fps: 30,
        }
    }

    #[test]
    fn test_frame_writer_and_session_load() {
        let dir = std::env::temp_dir().join("gazepoint_test_session");
        let _ = std::fs::remove_dir_all(&dir);

        let path = dir.join("session.jsonl");
        {
            let mut writer = FrameWriter::new(path.clone(), &header()).unwrap();
            writer
                .write_frame(&LandmarkFrame {
                    timestamp_ns: 0,
                    target: Some(1),
                    landmarks: vec![Landmark::new(0.5, 0.5, 0.0); 3],
                })
                .unwrap();
            writer
                .write_frame(&LandmarkFrame {
                    timestamp_ns: 33_000_000,
                    target: None,
                    landmarks: vec![],
                })
                .unwrap();
            assert_eq!(writer.frames_written(), 2);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.lines().next().unwrap().starts_with("# "));

        let session = Session::load(&path).unwrap();
        assert_eq!(session.header, Some(header()));
        assert_eq!(session.frames.len(), 2);
        assert_eq!(session.calibration_frames().count(), 1);
        assert_eq!(session.tracking_frames().count(), 1);
        assert!((session.frames[1].timestamp_secs() - 0.033).abs() < 1e-9);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_parse_frames_skips_comments_and_blank_lines() {
        let jsonl = "# {}\n\n{\"t\":5}\n";
        let frames = parse_frames(jsonl).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].timestamp_ns, 5);
        assert!(frames[0].target.is_none());
        assert!(frames[0].landmarks.is_empty());
    }

    #[test]
    fn test_parse_header_absent() {
        assert!(parse_header("{\"t\":0}").unwrap().is_none());
    }
}
