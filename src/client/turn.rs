//! One turn exchange as a cancellable event sequence

use super::TransportError;
use crate::protocol::DraftEmail;
use crate::stream::{classify, FrameDecoder, StreamEvent};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;

/// One event on a turn exchange.
///
/// `Ended` marks clean end-of-stream, distinct from an interrupt: an exchange
/// can end with a decision still pending.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    AssistantChunk { text: String },
    InterruptRequest { payload: String, draft: DraftEmail },
    Ended,
}

impl From<StreamEvent> for TurnEvent {
    fn from(event: StreamEvent) -> Self {
        match event {
            StreamEvent::AssistantChunk { text } => TurnEvent::AssistantChunk { text },
            StreamEvent::InterruptRequest { payload, draft } => {
                TurnEvent::InterruptRequest { payload, draft }
            }
        }
    }
}

/// The single ordered event channel for one network exchange.
///
/// Chains the frame decoder and classifier over the response body. Decoding
/// and classification happen synchronously between reads, so event order is
/// exactly record arrival order.
pub struct TurnStream {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: FrameDecoder,
    pending: VecDeque<StreamEvent>,
    cancel: CancellationToken,
    ended: bool,
}

impl std::fmt::Debug for TurnStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnStream").finish_non_exhaustive()
    }
}

impl TurnStream {
    pub(super) fn new(response: reqwest::Response, cancel: CancellationToken) -> Self {
        Self {
            body: response.bytes_stream().boxed(),
            decoder: FrameDecoder::new(),
            pending: VecDeque::new(),
            cancel,
            ended: false,
        }
    }

    /// Next event on the exchange.
    ///
    /// Yields `Ended` once the body closes and on every call thereafter.
    /// Cancellation is observed at the fragment-read boundary: after it, no
    /// further record is emitted, not even ones already decoded.
    pub async fn next_event(&mut self) -> Result<TurnEvent, TransportError> {
        loop {
            if self.ended {
                return Ok(TurnEvent::Ended);
            }
            if self.cancel.is_cancelled() {
                self.end_now();
                return Ok(TurnEvent::Ended);
            }
            if let Some(event) = self.pending.pop_front() {
                return Ok(event.into());
            }

            tokio::select! {
                () = self.cancel.cancelled() => {
                    self.end_now();
                    return Ok(TurnEvent::Ended);
                }
                fragment = self.body.next() => match fragment {
                    Some(Ok(bytes)) => {
                        for record in self.decoder.feed(&bytes) {
                            if let Some(event) = classify(&record) {
                                self.pending.push_back(event);
                            }
                        }
                    }
                    Some(Err(err)) => {
                        self.ended = true;
                        return Err(err.into());
                    }
                    None => {
                        self.ended = true;
                        return Ok(TurnEvent::Ended);
                    }
                },
            }
        }
    }

    fn end_now(&mut self) {
        self.ended = true;
        self.pending.clear();
    }
}
