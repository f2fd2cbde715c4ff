//! Raw PCM → WAV container encoding for finished captures.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use hound::WavReader;
use tracing::{info, warn};

use crate::error::{RelayError, RelayResult};

/// Capture sample rate (fixed system-wide, not negotiated per session)
pub const SAMPLE_RATE: u32 = 16_000;
/// Captures are mono
pub const CHANNELS: u16 = 1;
/// Little-endian signed 16-bit samples
pub const BITS_PER_SAMPLE: u16 = 16;
/// Size of the canonical PCM WAV header
pub const HEADER_LEN: u64 = 44;
/// Header bytes counted by the RIFF size field
const RIFF_OVERHEAD: u32 = 36;
/// Largest PCM payload whose RIFF size still fits in 32 bits
pub const MAX_DATA_LEN: u32 = u32::MAX - RIFF_OVERHEAD;

/// Build the 44-byte header for `data_len` bytes of 16 kHz mono 16-bit PCM.
///
/// `data_len` is expected to be at most `MAX_DATA_LEN`.
pub fn header(data_len: u32) -> [u8; HEADER_LEN as usize] {
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = SAMPLE_RATE * block_align as u32;

    let mut h = [0u8; HEADER_LEN as usize];
    h[0..4].copy_from_slice(b"RIFF");
    h[4..8].copy_from_slice(&RIFF_OVERHEAD.saturating_add(data_len).to_le_bytes());
    h[8..12].copy_from_slice(b"WAVE");
    h[12..16].copy_from_slice(b"fmt ");
    h[16..20].copy_from_slice(&16u32.to_le_bytes());
    h[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    h[22..24].copy_from_slice(&CHANNELS.to_le_bytes());
    h[24..28].copy_from_slice(&SAMPLE_RATE.to_le_bytes());
    h[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    h[32..34].copy_from_slice(&block_align.to_le_bytes());
    h[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    h[36..40].copy_from_slice(b"data");
    h[40..44].copy_from_slice(&data_len.to_le_bytes());
    h
}

/// Container path for a raw capture (`x.raw` → `x.wav`).
pub fn container_path(raw_path: &Path) -> PathBuf {
    raw_path.with_extension("wav")
}

/// Encode a raw capture into a WAV container next to it.
///
/// The container is written to a temporary sibling, synced and renamed into
/// place. The raw file is removed only after that succeeds.
pub fn encode(raw_path: impl AsRef<Path>) -> RelayResult<PathBuf> {
    let raw_path = raw_path.as_ref();

    let raw = match File::open(raw_path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RelayError::SourceNotFound(raw_path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let data_len = checked_data_len(raw.metadata()?.len())?;

    let wav_path = container_path(raw_path);
    let tmp_path = raw_path.with_extension("wav.part");

    let written = write_container(raw, data_len, &tmp_path);
    if let Err(e) = written {
        if let Err(rm) = fs::remove_file(&tmp_path) {
            warn!("Failed to remove partial container {}: {}", tmp_path.display(), rm);
        }
        return Err(e);
    }

    fs::rename(&tmp_path, &wav_path)?;
    remove_source(raw_path);

    info!(
        "Encoded {} ({} bytes of PCM) -> {}",
        raw_path.display(),
        data_len,
        wav_path.display()
    );

    Ok(wav_path)
}

/// Delete an encoded raw capture; failure leaves the container valid
fn remove_source(raw_path: &Path) -> bool {
    match fs::remove_file(raw_path) {
        Ok(()) => true,
        Err(e) => {
            warn!("Encoded {} but could not remove it: {}", raw_path.display(), e);
            false
        }
    }
}

/// PCM length as a header field, rejecting captures whose RIFF size overflows
fn checked_data_len(len: u64) -> RelayResult<u32> {
    u32::try_from(len)
        .ok()
        .filter(|len| len.checked_add(RIFF_OVERHEAD).is_some())
        .ok_or_else(|| {
            RelayError::Capture(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("raw capture too large for WAV: {} bytes", len),
            ))
        })
}

fn write_container(raw: File, data_len: u32, out_path: &Path) -> RelayResult<()> {
    let out = File::create(out_path)?;
    let mut writer = BufWriter::new(out);

    writer.write_all(&header(data_len))?;
    let copied = io::copy(&mut BufReader::new(raw), &mut writer)?;
    if copied != data_len as u64 {
        return Err(RelayError::Capture(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("raw capture changed during encode: expected {} bytes, copied {}", data_len, copied),
        )));
    }

    let out = writer.into_inner().map_err(|e| e.into_error())?;
    out.sync_all()?;
    Ok(())
}

/// Facts read back from a finished container.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub duration_seconds: f64,
}

/// Read a container's header with `hound`.
pub fn inspect(path: impl AsRef<Path>) -> anyhow::Result<ContainerInfo> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let frames = reader.duration();

    Ok(ContainerInfo {
        path: path.to_path_buf(),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        duration_seconds: frames as f64 / spec.sample_rate as f64,
    })
}
