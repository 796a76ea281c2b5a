// Integration tests for chunk audio storage and loading
//
// These verify that uploaded payloads land under predictable names and that
// stored chunks load back with their WAV metadata.

mod common;

use anyhow::Result;
use std::fs;
use tempfile::TempDir;
use visit_scribe::audio::{AudioChunk, AudioError, ChunkStorage};

#[tokio::test]
async fn test_save_names_file_after_visit_and_chunk() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = ChunkStorage::new(temp_dir.path())?;

    let path = storage.save("visit-42", 7, "wav", &common::wav_bytes(0.5)?).await?;

    assert!(path.exists(), "Chunk file should exist");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    assert!(name.starts_with("visit-42-chunk-007-"));
    assert!(name.ends_with(".wav"));

    // No temporary file left behind
    let names: Vec<_> = fs::read_dir(temp_dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![name]);

    Ok(())
}

#[tokio::test]
async fn test_each_upload_gets_its_own_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = ChunkStorage::new(temp_dir.path())?;

    let first = storage.save("v", 1, "wav", &common::wav_bytes(0.5)?).await?;
    let second = storage.save("v", 1, "wav", &common::wav_bytes(1.0)?).await?;
    assert_ne!(first, second);

    let earlier = AudioChunk::load(&first).await?;
    let wav = earlier.wav.expect("WAV header should parse");
    assert!((wav.duration_seconds - 0.5).abs() < 0.01);

    let later = AudioChunk::load(&second).await?;
    let wav = later.wav.expect("WAV header should parse");
    assert!((wav.duration_seconds - 1.0).abs() < 0.01);

    Ok(())
}

#[tokio::test]
async fn test_saved_extension_drives_mime_type() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = ChunkStorage::new(temp_dir.path())?;

    let path = storage.save("v", 2, "mp3", b"ID3 frames").await?;
    let chunk = AudioChunk::load(&path).await?;

    assert_eq!(chunk.mime_type, "audio/mp3");
    assert!(chunk.wav.is_none());

    Ok(())
}

#[tokio::test]
async fn test_empty_upload_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let storage = ChunkStorage::new(temp_dir.path())?;

    let result = storage.save("v", 1, "wav", &[]).await;
    assert!(matches!(result, Err(AudioError::Empty { .. })));
    assert_eq!(fs::read_dir(temp_dir.path())?.count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_load_reports_wav_metadata() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("chunk.wav");
    fs::write(&path, common::wav_bytes(2.0)?)?;

    let chunk = AudioChunk::load(&path).await?;

    assert_eq!(chunk.mime_type, "audio/wav");
    assert!(chunk.path.contains("chunk.wav"));
    let wav = chunk.wav.expect("WAV header should parse");
    assert_eq!(wav.sample_rate, 16000);
    assert_eq!(wav.channels, 1);
    assert!((wav.duration_seconds - 2.0).abs() < 0.01);

    Ok(())
}

#[tokio::test]
async fn test_load_non_wav_payload_keeps_bytes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("chunk.mp3");
    fs::write(&path, b"ID3 not really an mp3")?;

    let chunk = AudioChunk::load(&path).await?;

    assert_eq!(chunk.mime_type, "audio/mp3");
    assert!(chunk.wav.is_none());
    assert_eq!(chunk.bytes.len(), 21);

    Ok(())
}

#[tokio::test]
async fn test_load_missing_file() {
    let result = AudioChunk::load("/nonexistent/path/to/chunk.wav").await;
    assert!(matches!(result, Err(AudioError::NotFound { .. })));
}
