use crate::prelude::{PipelineError, PipelineResult};

/// Accumulator for unframed bytes with a hard capacity.
///
/// Consumed bytes are skipped with a read cursor and reclaimed on the next
/// append, so extracting a packet never shifts the remainder.
#[derive(Debug, Clone)]
pub struct ByteBuffer {
    data: Vec<u8>,
    start: usize,
    capacity: usize,
}

impl ByteBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            start: 0,
            capacity,
        }
    }

    /// Appends `bytes`, or rejects all of them if the result would exceed capacity.
    pub fn append(&mut self, bytes: &[u8]) -> PipelineResult<()> {
        let buffered = self.len();
        if buffered + bytes.len() > self.capacity {
            return Err(PipelineError::CapacityExceeded {
                buffered,
                incoming: bytes.len(),
                capacity: self.capacity,
            });
        }
        if self.start > 0 {
            self.data.drain(..self.start);
            self.start = 0;
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Drops up to `count` bytes from the front.
    pub fn consume(&mut self, count: usize) {
        self.start += count.min(self.len());
        if self.start == self.data.len() {
            self.data.clear();
            self.start = 0;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.start..]
    }

    pub fn len(&self) -> usize {
        self.data.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.start = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_consume_track_logical_length() {
        let mut buffer = ByteBuffer::with_capacity(16);
        buffer.append(&[1, 2, 3, 4, 5]).unwrap();
        buffer.consume(2);
        assert_eq!(buffer.as_slice(), &[3, 4, 5]);
        buffer.append(&[6]).unwrap();
        assert_eq!(buffer.as_slice(), &[3, 4, 5, 6]);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn overflow_leaves_buffer_unchanged() {
        let mut buffer = ByteBuffer::with_capacity(8);
        buffer.append(&[9; 6]).unwrap();
        let err = buffer.append(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::CapacityExceeded {
                buffered: 6,
                incoming: 3,
                capacity: 8
            }
        ));
        assert_eq!(buffer.as_slice(), &[9; 6]);

        buffer.append(&[1, 2]).unwrap();
        assert_eq!(buffer.len(), buffer.capacity());
    }

    #[test]
    fn consumed_space_is_reusable() {
        let mut buffer = ByteBuffer::with_capacity(4);
        buffer.append(&[1, 2, 3, 4]).unwrap();
        buffer.consume(3);
        buffer.append(&[5, 6, 7]).unwrap();
        assert_eq!(buffer.as_slice(), &[4, 5, 6, 7]);
    }

    #[test]
    fn consume_past_end_empties_buffer() {
        let mut buffer = ByteBuffer::with_capacity(4);
        buffer.append(&[1, 2]).unwrap();
        buffer.consume(10);
        assert!(buffer.is_empty());
        buffer.append(&[3]).unwrap();
        assert_eq!(buffer.as_slice(), &[3]);
    }
}
