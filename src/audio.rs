//! Audio normalization for speech recognition.
//!
//! Shells out to ffmpeg to re-encode arbitrary containers/codecs into the
//! canonical decodable form (16 kHz mono PCM WAV). Files already in WAV
//! form pass through untouched.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;

/// Errors from the transcoding stage. Non-fatal to the process; a failed
/// transcode fails the attempt for that file only.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Failed to run ffmpeg: {0}")]
    Spawn(std::io::Error),

    #[error("ffmpeg failed for {path}: {stderr}")]
    Ffmpeg { path: PathBuf, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Canonical audio ready for the transcription provider.
///
/// Holds the temp directory for re-encoded output alive until the
/// transcription stage is done with the file.
#[derive(Debug)]
pub enum CanonicalAudio {
    /// The source was already canonical WAV.
    Original(PathBuf),

    /// Re-encoded copy in a scoped temp directory.
    Transcoded { path: PathBuf, _dir: TempDir },
}

impl CanonicalAudio {
    pub fn path(&self) -> &Path {
        match self {
            CanonicalAudio::Original(path) => path,
            CanonicalAudio::Transcoded { path, .. } => path,
        }
    }
}

/// ffmpeg-backed transcoder.
#[derive(Debug, Clone)]
pub struct AudioTranscoder {
    ffmpeg_path: String,
}

impl Default for AudioTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioTranscoder {
    /// Resolve the ffmpeg binary from FFMPEG_PATH or the system PATH.
    pub fn new() -> Self {
        Self {
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
        }
    }

    /// Whether a source file is already in the canonical container.
    pub fn is_canonical(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("wav"))
            .unwrap_or(false)
    }

    /// Normalize a recording into canonical WAV form.
    ///
    /// Tolerates partially written or unreadable input by returning an
    /// error for this attempt rather than panicking.
    pub async fn to_canonical(&self, input: &Path) -> Result<CanonicalAudio, TranscodeError> {
        if Self::is_canonical(input) {
            return Ok(CanonicalAudio::Original(input.to_path_buf()));
        }

        let dir = tempfile::tempdir()?;
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let output = dir.path().join(format!("{}.wav", stem));

        let result = Command::new(&self.ffmpeg_path)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-ar")
            .arg("16000")
            .arg("-ac")
            .arg("1")
            .arg("-c:a")
            .arg("pcm_s16le")
            .arg(&output)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(TranscodeError::Spawn)?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(TranscodeError::Ffmpeg {
                path: input.to_path_buf(),
                stderr,
            });
        }

        Ok(CanonicalAudio::Transcoded {
            path: output,
            _dir: dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_is_canonical() {
        assert!(AudioTranscoder::is_canonical(Path::new("call.wav")));
        assert!(AudioTranscoder::is_canonical(Path::new("call.WAV")));
        assert!(!AudioTranscoder::is_canonical(Path::new("call.mp3")));
        assert!(!AudioTranscoder::is_canonical(Path::new("call")));
    }

    #[tokio::test]
    async fn test_canonical_passthrough() {
        let temp = tempfile::tempdir().unwrap();
        let wav = temp.path().join("call.wav");
        tokio::fs::write(&wav, b"riff").await.unwrap();

        let transcoder = AudioTranscoder::new();
        let canonical = transcoder.to_canonical(&wav).await.unwrap();
        assert_eq!(canonical.path(), wav.as_path());
    }
}
