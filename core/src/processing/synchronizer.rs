use crate::processing::byte_buffer::ByteBuffer;
use crate::telemetry::log::LogManager;
use crate::wire::header::{read_u32, HEADER_LEN, MAGIC_WORD, TOTAL_LEN_OFFSET};
use crate::wire::Packet;
use serde::{Deserialize, Serialize};

/// What to do when no sync candidate's stated length matches the distance
/// to the next candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// Start at the first candidate anyway (compatible with existing captures).
    #[default]
    BestEffort,
    /// Drop everything before the last candidate and keep resynchronizing.
    Strict,
}

/// Result of one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Packet(Packet),
    /// No usable sync word yet.
    Resynchronizing,
    /// A packet start is buffered but its bytes have not all arrived.
    Incomplete { buffered: usize, expected: usize },
}

/// Finds packet boundaries in a [`ByteBuffer`] by scanning for the magic word.
pub struct FrameSynchronizer {
    policy: SyncPolicy,
    logger: LogManager,
}

fn sync_offsets(bytes: &[u8]) -> Vec<usize> {
    bytes
        .windows(MAGIC_WORD.len())
        .enumerate()
        .filter_map(|(idx, window)| (window == &MAGIC_WORD[..]).then_some(idx))
        .collect()
}

fn stated_len(bytes: &[u8], offset: usize) -> Option<usize> {
    let field = offset + TOTAL_LEN_OFFSET;
    (field + 4 <= bytes.len()).then(|| read_u32(bytes, field) as usize)
}

impl FrameSynchronizer {
    pub fn new(policy: SyncPolicy) -> Self {
        Self {
            policy,
            logger: LogManager::new("mmwcore::sync"),
        }
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Extract at most one complete packet from the front of `buffer`.
    ///
    /// Bytes ahead of the chosen sync word are discarded. An incomplete packet
    /// is left in place for the next call.
    pub fn try_extract_packet(&self, buffer: &mut ByteBuffer) -> Extraction {
        let candidates = sync_offsets(buffer.as_slice());
        let Some(&first) = candidates.first() else {
            // keep a possible partial magic word at the tail
            let keep = MAGIC_WORD.len() - 1;
            if buffer.len() > keep {
                let dropped = buffer.len() - keep;
                self.logger
                    .detail(&format!("no sync word, dropping {} bytes", dropped));
                buffer.consume(dropped);
            }
            return Extraction::Resynchronizing;
        };

        let validated = candidates
            .windows(2)
            .find(|pair| stated_len(buffer.as_slice(), pair[0]) == Some(pair[1] - pair[0]))
            .map(|pair| pair[0]);

        let start = match (validated, self.policy) {
            (Some(start), _) => start,
            (None, SyncPolicy::BestEffort) => first,
            (None, SyncPolicy::Strict) if candidates.len() == 1 => first,
            (None, SyncPolicy::Strict) => {
                let last = candidates[candidates.len() - 1];
                self.logger.warn(&format!(
                    "{} sync candidates, none length-consistent; skipping {} bytes",
                    candidates.len(),
                    last
                ));
                buffer.consume(last);
                return Extraction::Resynchronizing;
            }
        };

        if start > 0 {
            self.logger
                .detail(&format!("resynchronized, discarded {} bytes", start));
            buffer.consume(start);
        }

        let bytes = buffer.as_slice();
        let Some(total) = stated_len(bytes, 0) else {
            return Extraction::Incomplete {
                buffered: bytes.len(),
                expected: HEADER_LEN,
            };
        };
        if total < HEADER_LEN || total > buffer.capacity() {
            self.logger.warn(&format!(
                "implausible packet length {}, skipping sync word",
                total
            ));
            buffer.consume(1);
            return Extraction::Resynchronizing;
        }
        if bytes.len() < total {
            return Extraction::Incomplete {
                buffered: bytes.len(),
                expected: total,
            };
        }

        let packet = Packet::from_validated(bytes[..total].to_vec());
        buffer.consume(total);
        Extraction::Packet(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::PacketWriter;

    fn packet(frame: u32) -> Vec<u8> {
        PacketWriter::new(frame)
            .points(&[[1.0, 2.0, 3.0, 0.5]])
            .side_info(&[(40, 2)])
            .finish()
    }

    /// Sync word followed by a header that claims `len` bytes.
    fn fake_start(len: u32) -> Vec<u8> {
        let mut bytes = MAGIC_WORD.to_vec();
        bytes.extend_from_slice(&[0; 4]);
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&[0xEE; 8]);
        bytes
    }

    fn buffer_with(chunks: &[&[u8]]) -> ByteBuffer {
        let mut buffer = ByteBuffer::with_capacity(1 << 16);
        for chunk in chunks {
            buffer.append(chunk).unwrap();
        }
        buffer
    }

    #[test]
    fn garbage_then_packet_extracts_exactly_one() {
        let pkt = packet(5);
        let garbage = [0x13u8, 0x02, 0x01, 0x99, 0x07, 0x00, 0x42];
        let tail = &MAGIC_WORD[..5];
        let mut buffer = buffer_with(&[&garbage, &pkt, tail]);
        let sync = FrameSynchronizer::new(SyncPolicy::BestEffort);

        match sync.try_extract_packet(&mut buffer) {
            Extraction::Packet(extracted) => assert_eq!(extracted.as_bytes(), &pkt[..]),
            other => panic!("expected packet, got {:?}", other),
        }
        assert_eq!(buffer.as_slice(), tail);
        assert_eq!(
            sync.try_extract_packet(&mut buffer),
            Extraction::Resynchronizing
        );
    }

    #[test]
    fn garbage_without_sync_is_trimmed() {
        let mut buffer = buffer_with(&[&[0xAB; 100]]);
        let sync = FrameSynchronizer::new(SyncPolicy::BestEffort);
        assert_eq!(
            sync.try_extract_packet(&mut buffer),
            Extraction::Resynchronizing
        );
        assert_eq!(buffer.len(), MAGIC_WORD.len() - 1);
    }

    #[test]
    fn partial_packet_waits_without_discarding() {
        let pkt = packet(1);
        let mut buffer = buffer_with(&[&pkt[..30]]);
        let sync = FrameSynchronizer::new(SyncPolicy::BestEffort);

        assert_eq!(
            sync.try_extract_packet(&mut buffer),
            Extraction::Incomplete {
                buffered: 30,
                expected: pkt.len()
            }
        );
        assert_eq!(buffer.len(), 30);

        buffer.append(&pkt[30..]).unwrap();
        assert!(matches!(
            sync.try_extract_packet(&mut buffer),
            Extraction::Packet(_)
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn header_prefix_shorter_than_length_field_is_incomplete() {
        let pkt = packet(1);
        let mut buffer = buffer_with(&[&pkt[..10]]);
        let sync = FrameSynchronizer::new(SyncPolicy::BestEffort);
        assert_eq!(
            sync.try_extract_packet(&mut buffer),
            Extraction::Incomplete {
                buffered: 10,
                expected: HEADER_LEN
            }
        );
    }

    #[test]
    fn length_consistent_candidate_wins() {
        let fake = fake_start(999);
        let first = packet(1);
        let second = packet(2);
        let mut buffer = buffer_with(&[&fake, &first, &second]);
        let sync = FrameSynchronizer::new(SyncPolicy::BestEffort);

        match sync.try_extract_packet(&mut buffer) {
            Extraction::Packet(extracted) => assert_eq!(extracted.header().frame_number, 1),
            other => panic!("expected packet, got {:?}", other),
        }
        match sync.try_extract_packet(&mut buffer) {
            Extraction::Packet(extracted) => assert_eq!(extracted.header().frame_number, 2),
            other => panic!("expected packet, got {:?}", other),
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn unvalidated_candidates_follow_policy() {
        let fake = fake_start(999);
        let real = packet(9);

        let mut lenient = buffer_with(&[&fake, &real]);
        let best_effort = FrameSynchronizer::new(SyncPolicy::BestEffort);
        assert_eq!(
            best_effort.try_extract_packet(&mut lenient),
            Extraction::Incomplete {
                buffered: fake.len() + real.len(),
                expected: 999
            }
        );

        let mut strict_buffer = buffer_with(&[&fake, &real]);
        let strict = FrameSynchronizer::new(SyncPolicy::Strict);
        assert_eq!(
            strict.try_extract_packet(&mut strict_buffer),
            Extraction::Resynchronizing
        );
        assert_eq!(strict_buffer.as_slice(), &real[..]);
        assert!(matches!(
            strict.try_extract_packet(&mut strict_buffer),
            Extraction::Packet(_)
        ));
    }

    #[test]
    fn implausible_length_skips_the_sync_word() {
        let mut buffer = buffer_with(&[&fake_start(12)]);
        let sync = FrameSynchronizer::new(SyncPolicy::BestEffort);
        assert_eq!(
            sync.try_extract_packet(&mut buffer),
            Extraction::Resynchronizing
        );
        assert_eq!(buffer.len(), fake_start(12).len() - 1);

        let mut oversized = buffer_with(&[&fake_start(1 << 20)]);
        assert_eq!(
            sync.try_extract_packet(&mut oversized),
            Extraction::Resynchronizing
        );
    }

    #[test]
    fn sync_word_split_across_appends_is_found() {
        let pkt = packet(3);
        let mut buffer = buffer_with(&[&[0x55; 20], &pkt[..4]]);
        let sync = FrameSynchronizer::new(SyncPolicy::BestEffort);
        assert_eq!(
            sync.try_extract_packet(&mut buffer),
            Extraction::Resynchronizing
        );
        buffer.append(&pkt[4..]).unwrap();
        assert!(matches!(
            sync.try_extract_packet(&mut buffer),
            Extraction::Packet(_)
        ));
    }
}
