use crate::wire::header::{PacketHeader, HEADER_LEN, MAGIC};
use crate::wire::tlv::{RawDetectedObject, TLV_DETECTED_POINTS, TLV_HEADER_LEN, TLV_SIDE_INFO};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet of {0} bytes is shorter than the {HEADER_LEN}-byte header")]
    TooShort(usize),
}

/// One complete, immutable packet copied out of the byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    bytes: Vec<u8>,
}

impl Packet {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, PacketError> {
        if bytes.len() < HEADER_LEN {
            return Err(PacketError::TooShort(bytes.len()));
        }
        Ok(Self { bytes })
    }

    /// Caller has already checked the length against the header size.
    pub(crate) fn from_validated(bytes: Vec<u8>) -> Self {
        debug_assert!(bytes.len() >= HEADER_LEN);
        Self { bytes }
    }

    pub fn header(&self) -> PacketHeader {
        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&self.bytes[..HEADER_LEN]);
        PacketHeader::decode(&raw)
    }

    /// TLV region following the header.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encodes packets in the sensor's wire format.
#[derive(Debug, Clone)]
pub struct PacketWriter {
    version: u32,
    platform: u32,
    frame_number: u32,
    cpu_cycle_time: u32,
    sub_frame_number: u32,
    num_detected_objects: u32,
    tlvs: Vec<(u32, Vec<u8>)>,
}

impl PacketWriter {
    pub fn new(frame_number: u32) -> Self {
        Self {
            version: 0x0305_0004,
            platform: 0x000A_1642,
            frame_number,
            cpu_cycle_time: 0,
            sub_frame_number: 0,
            num_detected_objects: 0,
            tlvs: Vec::new(),
        }
    }

    pub fn cpu_cycle_time(mut self, cycles: u32) -> Self {
        self.cpu_cycle_time = cycles;
        self
    }

    pub fn num_detected_objects(mut self, count: u32) -> Self {
        self.num_detected_objects = count;
        self
    }

    /// Appends a detected-points TLV and sets the object count to match.
    pub fn points(mut self, points: &[[f32; 4]]) -> Self {
        let mut payload = Vec::with_capacity(points.len() * 16);
        for point in points {
            for value in point {
                payload.extend_from_slice(&value.to_le_bytes());
            }
        }
        self.num_detected_objects = points.len() as u32;
        self.tlvs.push((TLV_DETECTED_POINTS, payload));
        self
    }

    /// Appends a side-info TLV of `(snr, noise)` pairs.
    pub fn side_info(mut self, side: &[(u16, u16)]) -> Self {
        let mut payload = Vec::with_capacity(side.len() * 4);
        for (snr, noise) in side {
            payload.extend_from_slice(&snr.to_le_bytes());
            payload.extend_from_slice(&noise.to_le_bytes());
        }
        self.tlvs.push((TLV_SIDE_INFO, payload));
        self
    }

    /// Points and side info for a list of raw objects.
    pub fn objects(self, objects: &[RawDetectedObject]) -> Self {
        let points: Vec<[f32; 4]> = objects
            .iter()
            .map(|obj| [obj.x, obj.y, obj.z, obj.velocity])
            .collect();
        let side: Vec<(u16, u16)> = objects.iter().map(|obj| (obj.snr, obj.noise)).collect();
        self.points(&points).side_info(&side)
    }

    pub fn tlv(mut self, tlv_type: u32, payload: Vec<u8>) -> Self {
        self.tlvs.push((tlv_type, payload));
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let body_len: usize = self
            .tlvs
            .iter()
            .map(|(_, payload)| TLV_HEADER_LEN + payload.len())
            .sum();
        let total = HEADER_LEN + body_len;
        let header = PacketHeader {
            sync: MAGIC,
            version: self.version,
            total_packet_len: total as u32,
            platform: self.platform,
            frame_number: self.frame_number,
            cpu_cycle_time: self.cpu_cycle_time,
            num_detected_objects: self.num_detected_objects,
            num_tlvs: self.tlvs.len() as u32,
            sub_frame_number: self.sub_frame_number,
        };

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&header.encode());
        for (tlv_type, payload) in &self.tlvs {
            out.extend_from_slice(&tlv_type.to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(payload);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_sets_total_length_and_tlv_count() {
        let bytes = PacketWriter::new(7)
            .points(&[[1.0, 2.0, 3.0, 0.5]])
            .side_info(&[(50, 10)])
            .finish();
        let packet = Packet::from_bytes(bytes).unwrap();
        let header = packet.header();
        assert!(header.is_valid());
        assert_eq!(header.total_packet_len as usize, packet.len());
        assert_eq!(header.num_tlvs, 2);
        assert_eq!(header.num_detected_objects, 1);
        assert_eq!(header.frame_number, 7);
        assert_eq!(packet.payload().len(), 8 + 16 + 8 + 4);
    }

    #[test]
    fn short_packet_is_rejected() {
        assert_eq!(
            Packet::from_bytes(vec![0; 12]),
            Err(PacketError::TooShort(12))
        );
    }
}
