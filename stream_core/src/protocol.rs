//! Binary wire-format decoding for server audio frames.
//!
//! Every transport delivery starts with a fixed 4-byte bit-packed header:
//! version and header length (in 4-byte units) share the first byte, message
//! type and flags share the second, serialization and compression method the
//! third, the fourth is reserved. Audio responses (`0xB`) carry an 8-byte
//! sub-header after the header: a big-endian i32 sequence number followed by
//! a big-endian u32 declared payload size. The remainder is raw PCM.

use tracing::debug;

use crate::error::DecodeError;

/// Message type of server audio responses.
pub const MSG_AUDIO_RESPONSE: u8 = 0xB;

/// Flag values within an audio-response frame.
const FLAG_ACK: u8 = 0x0;
const FLAG_CHUNK: u8 = 0x1;
const FLAG_CHUNK_ALT: u8 = 0x2;
const FLAG_FINAL: u8 = 0x3;

/// A single decoded transport delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Server acknowledgement, no payload.
    Ack,
    /// One sequence-numbered slice of synthesized audio.
    AudioChunk { sequence: i32, payload: Vec<u8> },
    /// The last audio slice of the current request.
    FinalChunk { sequence: i32, payload: Vec<u8> },
    /// Valid frame of a kind this layer takes no action on.
    Ignorable,
}

/// Parse one opaque delivery into a [`Frame`].
///
/// The header length field is honored rather than assumed to be one unit, so
/// frames from newer protocol revisions with extended headers still decode.
/// The declared payload size is informational only: the byte count actually
/// delivered wins, so a lying length field can never read past the buffer.
pub fn decode(raw: &[u8]) -> Result<Frame, DecodeError> {
    if raw.len() < 4 {
        return Err(DecodeError::Truncated {
            needed: 4,
            got: raw.len(),
        });
    }

    let header_len = (raw[0] & 0x0F) as usize * 4;
    if raw.len() < header_len {
        return Err(DecodeError::Truncated {
            needed: header_len,
            got: raw.len(),
        });
    }

    let msg_type = (raw[1] >> 4) & 0x0F;
    let flags = raw[1] & 0x0F;

    if msg_type != MSG_AUDIO_RESPONSE {
        return Ok(Frame::Ignorable);
    }

    match flags {
        FLAG_ACK => Ok(Frame::Ack),
        FLAG_CHUNK | FLAG_CHUNK_ALT | FLAG_FINAL => {
            let sub_end = header_len + 8;
            if raw.len() < sub_end {
                return Err(DecodeError::Truncated {
                    needed: sub_end,
                    got: raw.len(),
                });
            }

            let o = header_len;
            let sequence = i32::from_be_bytes([raw[o], raw[o + 1], raw[o + 2], raw[o + 3]]);
            let declared =
                u32::from_be_bytes([raw[o + 4], raw[o + 5], raw[o + 6], raw[o + 7]]) as usize;

            let payload = raw[sub_end..].to_vec();
            if declared != payload.len() {
                debug!(
                    sequence,
                    declared,
                    actual = payload.len(),
                    "declared payload size disagrees with delivery, using actual"
                );
            }

            if flags == FLAG_FINAL {
                Ok(Frame::FinalChunk { sequence, payload })
            } else {
                Ok(Frame::AudioChunk { sequence, payload })
            }
        }
        _ => Ok(Frame::Ignorable),
    }
}

/// Build a well-formed audio-response frame.
///
/// Used by the transport simulator and by tests; the outbound request
/// protocol itself lives with the connection layer, not here.
pub fn encode_audio_frame(sequence: i32, payload: &[u8], last: bool) -> Vec<u8> {
    let flags = if last { FLAG_FINAL } else { FLAG_CHUNK };
    let mut out = Vec::with_capacity(12 + payload.len());
    out.push(0x11); // version 1, header of one 4-byte unit
    out.push((MSG_AUDIO_RESPONSE << 4) | flags);
    out.push(0x00);
    out.push(0x00);
    out.extend_from_slice(&sequence.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Build a payload-less server acknowledgement frame.
pub fn encode_ack() -> Vec<u8> {
    vec![0x11, (MSG_AUDIO_RESPONSE << 4) | FLAG_ACK, 0x00, 0x00]
}
