use crate::config::RadarConfigParams;
use crate::wire::header::{read_f32, read_u16, read_u32, PacketHeader};
use serde::{Deserialize, Serialize};

pub const TLV_HEADER_LEN: usize = 8;
pub const TLV_DETECTED_POINTS: u32 = 1;
pub const TLV_SIDE_INFO: u32 = 7;

/// Sub-headers beyond these bounds mean the stream lost alignment.
pub const MAX_TLV_TYPE: u32 = 20;
pub const MAX_TLV_LENGTH: u32 = 10_000;

const POINT_RECORD_LEN: usize = 16;
const SIDE_INFO_RECORD_LEN: usize = 4;
const Q_DESCRIPTOR_LEN: usize = 4;
const Q_POINT_RECORD_LEN: usize = 12;

/// Layout of the detected-points TLV as selected in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointFormat {
    /// x, y, z, velocity as f32 per object.
    #[default]
    Float,
    /// Legacy packed layout with i16 positions scaled by a Q-format exponent.
    QFormat,
}

/// Runtime payload layout, carrying the constants the Q-format path needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadLayout {
    Float,
    QFormat {
        num_doppler_bins: u32,
        doppler_resolution_mps: f64,
    },
}

impl PayloadLayout {
    pub fn new(format: PointFormat, params: &RadarConfigParams) -> Self {
        match format {
            PointFormat::Float => PayloadLayout::Float,
            PointFormat::QFormat => PayloadLayout::QFormat {
                num_doppler_bins: params.num_doppler_bins,
                doppler_resolution_mps: params.doppler_resolution_mps,
            },
        }
    }
}

/// Per-object values merged from the points and side-info TLVs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawDetectedObject {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub velocity: f32,
    pub snr: u16,
    pub noise: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvHeader {
    pub tlv_type: u32,
    pub length: u32,
}

impl TlvHeader {
    fn read(bytes: &[u8], offset: usize) -> Self {
        Self {
            tlv_type: read_u32(bytes, offset),
            length: read_u32(bytes, offset + 4),
        }
    }

    pub fn is_sane(&self) -> bool {
        self.tlv_type <= MAX_TLV_TYPE && self.length <= MAX_TLV_LENGTH
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadFault {
    #[error("TLV {index} failed sanity check (type {tlv_type}, length {length})")]
    Corrupt {
        index: u32,
        tlv_type: u32,
        length: u32,
    },
    #[error("TLV {index} (type {tlv_type}) needs {needed} bytes, {available} left in packet")]
    Truncated {
        index: u32,
        tlv_type: u32,
        needed: usize,
        available: usize,
    },
    #[error("TLV type {tlv_type} declared {declared} bytes but {consumed} were decoded")]
    LengthMismatch {
        tlv_type: u32,
        declared: u32,
        consumed: usize,
    },
}

/// Objects decoded from one packet, with the first fault observed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedPayload {
    pub objects: Vec<RawDetectedObject>,
    pub fault: Option<PayloadFault>,
}

impl DecodedPayload {
    fn aborted(fault: PayloadFault) -> Self {
        Self {
            objects: Vec::new(),
            fault: Some(fault),
        }
    }

    /// Corruption discards the whole packet; a length mismatch does not.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self.fault,
            Some(PayloadFault::Corrupt { .. }) | Some(PayloadFault::Truncated { .. })
        )
    }
}

/// Decode the TLV region of a packet into raw objects.
///
/// Walks exactly `header.num_tlvs` records. A sub-header outside the sanity
/// bounds, or a record running past the end of `payload`, aborts with no
/// objects. Unknown types are skipped by their declared length.
pub fn decode_payload(
    payload: &[u8],
    header: &PacketHeader,
    layout: PayloadLayout,
) -> DecodedPayload {
    let count = header.num_detected_objects as usize;
    let mut objects = Vec::new();
    let mut fault = None;
    let mut cursor = 0usize;

    for index in 0..header.num_tlvs {
        if cursor + TLV_HEADER_LEN > payload.len() {
            return DecodedPayload::aborted(PayloadFault::Truncated {
                index,
                tlv_type: 0,
                needed: TLV_HEADER_LEN,
                available: payload.len() - cursor,
            });
        }
        let tlv = TlvHeader::read(payload, cursor);
        if !tlv.is_sane() {
            return DecodedPayload::aborted(PayloadFault::Corrupt {
                index,
                tlv_type: tlv.tlv_type,
                length: tlv.length,
            });
        }
        cursor += TLV_HEADER_LEN;

        let length = tlv.length as usize;
        let available = payload.len() - cursor;
        if length > available {
            return DecodedPayload::aborted(PayloadFault::Truncated {
                index,
                tlv_type: tlv.tlv_type,
                needed: length,
                available,
            });
        }
        let body = &payload[cursor..cursor + length];

        let decoded = match (tlv.tlv_type, layout) {
            (TLV_DETECTED_POINTS, PayloadLayout::Float) => {
                Some(decode_points(body, count, &mut objects))
            }
            (
                TLV_DETECTED_POINTS,
                PayloadLayout::QFormat {
                    num_doppler_bins,
                    doppler_resolution_mps,
                },
            ) => Some(decode_q_points(
                body,
                num_doppler_bins,
                doppler_resolution_mps,
                &mut objects,
            )),
            (TLV_SIDE_INFO, _) => Some(decode_side_info(body, count, &mut objects)),
            _ => None,
        };

        match decoded {
            Some(Ok(consumed)) if consumed != length => {
                fault.get_or_insert(PayloadFault::LengthMismatch {
                    tlv_type: tlv.tlv_type,
                    declared: tlv.length,
                    consumed,
                });
            }
            Some(Err(needed)) => {
                return DecodedPayload::aborted(PayloadFault::Truncated {
                    index,
                    tlv_type: tlv.tlv_type,
                    needed,
                    available: length,
                });
            }
            _ => {}
        }
        cursor += length;
    }

    DecodedPayload { objects, fault }
}

fn ensure_len(objects: &mut Vec<RawDetectedObject>, count: usize) {
    if objects.len() < count {
        objects.resize(count, RawDetectedObject::default());
    }
}

/// Returns bytes consumed, or the bytes required when `body` is too short.
fn decode_points(
    body: &[u8],
    count: usize,
    objects: &mut Vec<RawDetectedObject>,
) -> Result<usize, usize> {
    let needed = count.saturating_mul(POINT_RECORD_LEN);
    if needed > body.len() {
        return Err(needed);
    }
    ensure_len(objects, count);
    for (idx, obj) in objects.iter_mut().take(count).enumerate() {
        let offset = idx * POINT_RECORD_LEN;
        obj.x = read_f32(body, offset);
        obj.y = read_f32(body, offset + 4);
        obj.z = read_f32(body, offset + 8);
        obj.velocity = read_f32(body, offset + 12);
    }
    Ok(needed)
}

fn decode_side_info(
    body: &[u8],
    count: usize,
    objects: &mut Vec<RawDetectedObject>,
) -> Result<usize, usize> {
    let needed = count.saturating_mul(SIDE_INFO_RECORD_LEN);
    if needed > body.len() {
        return Err(needed);
    }
    ensure_len(objects, count);
    for (idx, obj) in objects.iter_mut().take(count).enumerate() {
        let offset = idx * SIDE_INFO_RECORD_LEN;
        obj.snr = read_u16(body, offset);
        obj.noise = read_u16(body, offset + 2);
    }
    Ok(needed)
}

fn decode_q_points(
    body: &[u8],
    num_doppler_bins: u32,
    doppler_resolution_mps: f64,
    objects: &mut Vec<RawDetectedObject>,
) -> Result<usize, usize> {
    if body.len() < Q_DESCRIPTOR_LEN {
        return Err(Q_DESCRIPTOR_LEN);
    }
    let count = read_u16(body, 0) as usize;
    let scale = 2f32.powi(i32::from(read_u16(body, 2)));
    let needed = Q_DESCRIPTOR_LEN + count * Q_POINT_RECORD_LEN;
    if needed > body.len() {
        return Err(needed);
    }

    let doppler_wrap = f64::from(num_doppler_bins) / 2.0 - 1.0;
    ensure_len(objects, count);
    for (idx, obj) in objects.iter_mut().take(count).enumerate() {
        let offset = Q_DESCRIPTOR_LEN + idx * Q_POINT_RECORD_LEN;
        // word layout: range idx, doppler idx, peak, x, y, z
        let mut doppler_idx = f64::from(read_u16(body, offset + 2));
        if doppler_idx > doppler_wrap {
            doppler_idx -= 65536.0;
        }
        obj.x = f32::from(read_u16(body, offset + 6) as i16) / scale;
        obj.y = f32::from(read_u16(body, offset + 8) as i16) / scale;
        obj.z = f32::from(read_u16(body, offset + 10) as i16) / scale;
        obj.velocity = (doppler_idx * doppler_resolution_mps) as f32;
    }
    Ok(needed)
}
