//! Vendor wire format: packet header, TLV payload records and the packet encoder.

pub mod header;
pub mod packet;
pub mod tlv;

pub use header::{PacketHeader, HEADER_LEN, MAGIC, MAGIC_WORD};
pub use packet::{Packet, PacketError, PacketWriter};
pub use tlv::{
    decode_payload, DecodedPayload, PayloadFault, PayloadLayout, PointFormat, RawDetectedObject,
};
