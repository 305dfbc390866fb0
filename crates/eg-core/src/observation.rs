//! Observation codec
//!
//! The bridge sends the GBA screen as a flat RGB888 byte buffer, usually
//! base64-wrapped so it survives the JSON line protocol. Decoding is total:
//! a missing or broken payload yields an all-black frame instead of an error,
//! so one bad frame never ends an episode.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ndarray::Array3;
use thiserror::Error;

/// GBA screen height in pixels
pub const OBS_HEIGHT: usize = 160;
/// GBA screen width in pixels
pub const OBS_WIDTH: usize = 240;
/// RGB channels per pixel
pub const OBS_CHANNELS: usize = 3;
/// Observation shape, `(height, width, channels)`
pub const OBS_SHAPE: (usize, usize, usize) = (OBS_HEIGHT, OBS_WIDTH, OBS_CHANNELS);
/// Bytes in one screen buffer (115200)
pub const OBS_LEN: usize = OBS_HEIGHT * OBS_WIDTH * OBS_CHANNELS;

/// A decoded screen, always `OBS_SHAPE`
pub type Observation = Array3<u8>;

/// Screen payload as delivered by a bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObsPayload {
    /// Base64 text wrapping the raw bytes
    Base64(String),
    /// Raw bytes, e.g. from an in-process screen copy
    Raw(Vec<u8>),
}

/// Why a payload could not be turned into an observation
#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("invalid base64 payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("screen buffer has {actual} bytes, expected {expected}")]
    WrongLength { expected: usize, actual: usize },

    #[error("unsupported observation payload: {0}")]
    Unsupported(String),
}

/// All-zero observation used when nothing usable was received
pub fn blank() -> Observation {
    Array3::zeros(OBS_SHAPE)
}

/// Reshape a flat RGB888 buffer
pub fn from_raw(bytes: Vec<u8>) -> Result<Observation, ObservationError> {
    if bytes.len() != OBS_LEN {
        return Err(ObservationError::WrongLength {
            expected: OBS_LEN,
            actual: bytes.len(),
        });
    }
    Array3::from_shape_vec(OBS_SHAPE, bytes).map_err(|_| ObservationError::WrongLength {
        expected: OBS_LEN,
        actual: OBS_LEN,
    })
}

/// Decode a payload, reporting why it was rejected
pub fn try_decode(payload: &ObsPayload) -> Result<Observation, ObservationError> {
    match payload {
        ObsPayload::Base64(text) => from_raw(STANDARD.decode(text.trim())?),
        ObsPayload::Raw(bytes) => from_raw(bytes.clone()),
    }
}

/// Decode a payload, falling back to `blank()` on absence or failure
pub fn decode(payload: Option<&ObsPayload>) -> Observation {
    let Some(payload) = payload else {
        return blank();
    };
    try_decode(payload).unwrap_or_else(|err| {
        tracing::warn!("malformed observation: {err}");
        blank()
    })
}

/// Encode a raw screen the way a bridge puts it on the wire
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
