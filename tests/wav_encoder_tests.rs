// Tests for encoding raw PCM captures into WAV containers
//
// Captures are written to a temp directory and read back with hound.

use anyhow::Result;
use hound::WavReader;
use std::fs;
use tempfile::TempDir;
use voice_relay::audio::{wav, CaptureFile, CaptureKind};
use voice_relay::RelayError;

fn samples_as_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[test]
fn test_encode_capture_to_container() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let samples: Vec<i16> = (0..8000).map(|i| ((i % 200) as i16 - 100) * 50).collect();
    let pcm = samples_as_bytes(&samples);

    let mut capture = CaptureFile::create(temp_dir.path(), "section-1", CaptureKind::Original)?;
    for chunk in pcm.chunks(640) {
        capture.write(chunk)?;
    }
    let summary = capture.finish()?;
    assert_eq!(summary.bytes_written, pcm.len() as u64);

    let wav_path = wav::encode(&summary.path)?;
    assert_eq!(wav_path, temp_dir.path().join("section-1.wav"));
    assert!(!summary.path.exists(), "raw capture should be removed");

    let bytes = fs::read(&wav_path)?;
    assert_eq!(bytes.len(), 44 + pcm.len());
    assert_eq!(&bytes[44..], pcm.as_slice());

    // Readable by a standard decoder
    let mut reader = WavReader::open(&wav_path)?;
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);

    let decoded: Vec<i16> = reader.samples::<i16>().collect::<Result<_, _>>()?;
    assert_eq!(decoded, samples);

    let info = wav::inspect(&wav_path)?;
    assert!((info.duration_seconds - 0.5).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_second_encode_reports_missing_source() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let raw = temp_dir.path().join("abc.raw");
    fs::write(&raw, samples_as_bytes(&[1, 2, 3, 4]))?;

    let first = wav::encode(&raw)?;
    let err = wav::encode(&raw).unwrap_err();

    assert!(matches!(err, RelayError::SourceNotFound(ref p) if p == &raw));
    // First container is untouched
    assert_eq!(fs::metadata(&first)?.len(), 44 + 8);

    Ok(())
}

#[test]
fn test_empty_capture_yields_header_only() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let capture = CaptureFile::create(temp_dir.path(), "silent", CaptureKind::Translated)?;
    let summary = capture.finish()?;
    assert_eq!(
        summary.path.file_name().and_then(|n| n.to_str()),
        Some("silent_translated.raw")
    );

    let wav_path = wav::encode(&summary.path)?;
    let bytes = fs::read(&wav_path)?;

    assert_eq!(bytes.len(), 44);
    assert_eq!(&bytes[40..44], &0u32.to_le_bytes());
    assert_eq!(&bytes[4..8], &36u32.to_le_bytes());

    Ok(())
}

#[test]
fn test_odd_length_capture_is_copied_verbatim() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let raw = temp_dir.path().join("odd.raw");
    fs::write(&raw, [0x01, 0x02, 0x03])?;

    let wav_path = wav::encode(&raw)?;
    let bytes = fs::read(&wav_path)?;

    assert_eq!(bytes.len(), 47);
    assert_eq!(&bytes[40..44], &3u32.to_le_bytes());
    assert_eq!(&bytes[44..], &[0x01, 0x02, 0x03]);

    Ok(())
}

#[test]
fn test_no_temporary_files_left_behind() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let raw = temp_dir.path().join("tidy.raw");
    fs::write(&raw, vec![0u8; 1024])?;

    wav::encode(&raw)?;

    let names: Vec<String> = fs::read_dir(temp_dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["tidy.wav".to_string()]);

    Ok(())
}
