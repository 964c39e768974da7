use serde::{Deserialize, Serialize};

/// Magic word that opens every packet, as it appears on the wire.
pub const MAGIC_WORD: [u8; 8] = [0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07];

/// `MAGIC_WORD` read as a little-endian u64.
pub const MAGIC: u64 = 0x0708_0506_0304_0102;

/// Fixed header size in bytes.
pub const HEADER_LEN: usize = 40;

/// Offset of `total_packet_len` within the header.
pub const TOTAL_LEN_OFFSET: usize = 12;

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

pub(crate) fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32(bytes, offset))
}

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketHeader {
    pub sync: u64,
    pub version: u32,
    pub total_packet_len: u32,
    pub platform: u32,
    pub frame_number: u32,
    pub cpu_cycle_time: u32,
    pub num_detected_objects: u32,
    pub num_tlvs: u32,
    pub sub_frame_number: u32,
}

impl PacketHeader {
    /// Decode the fixed 40-byte header. Total over any input; use
    /// [`PacketHeader::is_valid`] to check the sync word and length.
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Self {
        let sync = u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]);
        Self {
            sync,
            version: read_u32(bytes, 8),
            total_packet_len: read_u32(bytes, 12),
            platform: read_u32(bytes, 16),
            frame_number: read_u32(bytes, 20),
            cpu_cycle_time: read_u32(bytes, 24),
            num_detected_objects: read_u32(bytes, 28),
            num_tlvs: read_u32(bytes, 32),
            sub_frame_number: read_u32(bytes, 36),
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..8].copy_from_slice(&self.sync.to_le_bytes());
        let words = [
            self.version,
            self.total_packet_len,
            self.platform,
            self.frame_number,
            self.cpu_cycle_time,
            self.num_detected_objects,
            self.num_tlvs,
            self.sub_frame_number,
        ];
        for (idx, word) in words.iter().enumerate() {
            let offset = 8 + idx * 4;
            out[offset..offset + 4].copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    pub fn is_valid(&self) -> bool {
        self.sync == MAGIC && self.total_packet_len as usize >= HEADER_LEN
    }
}
