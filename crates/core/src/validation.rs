//! Validation of incoming track payloads.

use validator::Validate;

use crate::error::{Error, Result, ValidationErrorCode};
use crate::limits::MAX_PIXEL_PAYLOAD_BYTES;
use crate::track::NewTrack;

/// Validates raw payload size BEFORE deserialization.
pub fn validate_payload_size(raw_bytes: &[u8]) -> Result<()> {
    if raw_bytes.len() > MAX_PIXEL_PAYLOAD_BYTES {
        return Err(Error::validation(
            ValidationErrorCode::FieldTooLong,
            format!(
                "payload {}KB exceeds {}KB limit",
                raw_bytes.len() / 1024,
                MAX_PIXEL_PAYLOAD_BYTES / 1024
            ),
        ));
    }
    Ok(())
}

/// Parses a JSON track payload.
pub fn parse_track(raw_bytes: &[u8]) -> Result<NewTrack> {
    validate_payload_size(raw_bytes)?;

    let track: NewTrack = serde_json::from_slice(raw_bytes).map_err(|e| {
        Error::validation(ValidationErrorCode::InvalidFormat, format!("invalid track: {}", e))
    })?;

    validate_track(&track)?;
    Ok(track)
}

/// Validates a track payload against its field limits.
pub fn validate_track(track: &NewTrack) -> Result<()> {
    if track.anonymous_id.trim().is_empty() {
        return Err(Error::validation(
            ValidationErrorCode::InvalidFormat,
            "anonymousId is required",
        ));
    }

    track
        .validate()
        .map_err(|e| Error::validation(ValidationErrorCode::FieldTooLong, format!("{}", e)))
}
