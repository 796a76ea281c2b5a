use super::AudioError;
use hound::WavReader;
use std::io::Cursor;
use std::path::Path;
use tracing::{info, warn};

/// Header facts about a WAV payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// An audio chunk payload loaded from its `audio_ref`
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub path: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    /// Present when the payload parses as WAV
    pub wav: Option<WavInfo>,
}

impl AudioChunk {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AudioError> {
        let path = path.as_ref();
        info!("Loading audio chunk: {}", path.display());

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AudioError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                AudioError::Io(e)
            }
        })?;

        if bytes.is_empty() {
            return Err(AudioError::Empty {
                path: path.display().to_string(),
            });
        }

        let mime_type = mime_type_for(path);
        let wav = if mime_type == "audio/wav" {
            match probe_wav(&bytes) {
                Ok(info) => {
                    info!(
                        "Audio chunk loaded: {:.1}s, {}Hz, {} channels, {} bytes",
                        info.duration_seconds,
                        info.sample_rate,
                        info.channels,
                        bytes.len()
                    );
                    Some(info)
                }
                Err(e) => {
                    // The oracle may still make sense of it
                    warn!("Could not read WAV header of {}: {}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            path: path.display().to_string(),
            mime_type,
            bytes,
            wav,
        })
    }
}

/// Read duration and format from an in-memory WAV payload.
pub fn probe_wav(bytes: &[u8]) -> Result<WavInfo, hound::Error> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    // duration() counts frames, i.e. samples per channel
    let duration_seconds = reader.duration() as f64 / spec.sample_rate as f64;

    Ok(WavInfo {
        duration_seconds,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp3") => "audio/mp3",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("m4a") | Some("aac") => "audio/aac",
        _ => "audio/wav",
    }
}

/// File extension to store an upload under, from its file name or content type.
///
/// Falls back to `wav`, the format chunk recorders send.
pub fn upload_extension(file_name: Option<&str>, content_type: Option<&str>) -> &'static str {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|e| e.to_str())
        .and_then(|e| match e.to_ascii_lowercase().as_str() {
            "wav" => Some("wav"),
            "mp3" => Some("mp3"),
            "flac" => Some("flac"),
            "ogg" => Some("ogg"),
            "m4a" => Some("m4a"),
            "aac" => Some("aac"),
            _ => None,
        });

    if let Some(ext) = from_name {
        return ext;
    }

    match content_type.map(|c| c.to_ascii_lowercase()).as_deref() {
        Some("audio/mpeg") | Some("audio/mp3") => "mp3",
        Some("audio/flac") | Some("audio/x-flac") => "flac",
        Some("audio/ogg") => "ogg",
        Some("audio/mp4") | Some("audio/x-m4a") | Some("audio/m4a") => "m4a",
        Some("audio/aac") => "aac",
        _ => "wav",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("a/b/chunk-001.wav")), "audio/wav");
        assert_eq!(mime_type_for(Path::new("chunk.MP3")), "audio/mp3");
        assert_eq!(mime_type_for(Path::new("chunk")), "audio/wav");
    }

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload_extension(Some("visit.MP3"), Some("audio/wav")), "mp3");
        assert_eq!(upload_extension(Some("blob"), Some("audio/x-m4a")), "m4a");
        assert_eq!(upload_extension(None, Some("audio/mpeg")), "mp3");
        assert_eq!(upload_extension(Some("chunk.exe"), None), "wav");
        assert_eq!(upload_extension(None, None), "wav");

        let stored = format!("chunk.{}", upload_extension(None, Some("audio/mp4")));
        assert_eq!(mime_type_for(Path::new(&stored)), "audio/aac");
    }

    #[test]
    fn test_probe_rejects_garbage() {
        assert!(probe_wav(b"definitely not a wav file").is_err());
    }
}
