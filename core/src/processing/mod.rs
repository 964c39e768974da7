pub mod byte_buffer;
pub mod pipeline;
pub mod synchronizer;

pub use byte_buffer::ByteBuffer;
pub use pipeline::Pipeline;
pub use synchronizer::{Extraction, FrameSynchronizer, SyncPolicy};
