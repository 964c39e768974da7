use crate::prelude::PollOutcome;
use crate::processing::Pipeline;
use crate::source::{ByteSource, SourceError, SourceRead};
use crate::telemetry::LogManager;

#[derive(Debug, Clone)]
pub enum ReplayItem {
    Frame(PollOutcome),
    EndOfStream,
}

/// Pull-based cursor over the frames of a finite byte source.
///
/// Each call reads from the source only as far as needed to complete the
/// next packet. Intended for sources that eventually report end of stream;
/// a live transport should drive [`Pipeline`] directly.
pub struct Replay<S: ByteSource> {
    source: S,
    pipeline: Pipeline,
    exhausted: bool,
    logger: LogManager,
}

impl<S: ByteSource> Replay<S> {
    pub fn new(source: S, pipeline: Pipeline) -> Self {
        Self {
            source,
            pipeline,
            exhausted: false,
            logger: LogManager::new("mmwcore::replay"),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn next_frame(&mut self) -> Result<ReplayItem, SourceError> {
        loop {
            let before = self.pipeline.buffered_len();
            let outcome = self.pipeline.poll();
            if outcome.consumed_packet() {
                return Ok(ReplayItem::Frame(outcome));
            }
            if self.exhausted {
                // a resync step may have exposed a packet further in
                if self.pipeline.buffered_len() < before {
                    continue;
                }
                if self.pipeline.buffered_len() > 0 {
                    self.logger.detail(&format!(
                        "end of stream with {} unframed bytes",
                        self.pipeline.buffered_len()
                    ));
                }
                return Ok(ReplayItem::EndOfStream);
            }
            match self.source.read_available()? {
                SourceRead::Data(bytes) => {
                    if let Err(err) = self.pipeline.push_bytes(&bytes) {
                        self.logger.warn(&err.to_string());
                    }
                }
                SourceRead::EndOfStream => self.exhausted = true,
            }
        }
    }

    /// Rewind the source and start a fresh session.
    pub fn restart(&mut self) -> Result<(), SourceError> {
        self.source.rewind()?;
        self.pipeline.reset_session();
        self.exhausted = false;
        Ok(())
    }

    pub fn into_parts(self) -> (S, Pipeline) {
        (self.source, self.pipeline)
    }
}

impl<S: ByteSource> Iterator for Replay<S> {
    type Item = Result<PollOutcome, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_frame() {
            Ok(ReplayItem::Frame(outcome)) => Some(Ok(outcome)),
            Ok(ReplayItem::EndOfStream) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
