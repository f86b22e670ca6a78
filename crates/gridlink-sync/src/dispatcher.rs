//! Routes inbound envelopes to the notifier or the mailbox.

use std::sync::Arc;

use gridlink_protocol::{Codec, Envelope, FrameCodec, ServerState, WireCodec};
use gridlink_transport::Frame;

use crate::{Offer, ResponseMailbox, StateNotifier};

/// Where [`Dispatcher::dispatch`] sent an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// A push update, offered to the notifier.
    Notifier(Offer),
    /// A move response, handed to the mailbox.
    Mailbox,
    /// Not valid inbound; logged and dropped.
    Dropped,
}

/// Pure routing by message kind. Holds no state of its own.
#[derive(Debug)]
pub struct Dispatcher<C = WireCodec> {
    codec: FrameCodec<C>,
    notifier: Arc<StateNotifier>,
    mailbox: Arc<ResponseMailbox<ServerState>>,
}

impl Dispatcher<WireCodec> {
    pub fn new(notifier: Arc<StateNotifier>, mailbox: Arc<ResponseMailbox<ServerState>>) -> Self {
        Self::with_codec(WireCodec::default(), notifier, mailbox)
    }
}

impl<C: Codec> Dispatcher<C> {
    pub fn with_codec(
        codec: C,
        notifier: Arc<StateNotifier>,
        mailbox: Arc<ResponseMailbox<ServerState>>,
    ) -> Self {
        Self {
            codec: FrameCodec::new(codec),
            notifier,
            mailbox,
        }
    }

    /// Routes one decoded envelope.
    pub fn dispatch(&self, envelope: Envelope) -> Route {
        match envelope {
            Envelope::StateUpdate(state) => Route::Notifier(self.notifier.offer(state)),
            Envelope::MoveResponse(state) => {
                tracing::debug!(time = state.time, "move response received");
                self.mailbox.deliver(state);
                Route::Mailbox
            }
            Envelope::MoveRequest(request) => {
                tracing::warn!(
                    grid_x = request.grid_x,
                    grid_y = request.grid_y,
                    "unexpected inbound move-request, dropping"
                );
                Route::Dropped
            }
        }
    }

    /// Decodes and routes one frame. Undecodable frames are dropped
    /// (with a single warning from the codec) and return `None`.
    pub fn handle_frame(&self, frame: Frame) -> Option<Route> {
        let envelope = self.codec.decode(&frame)?;
        Some(self.dispatch(envelope))
    }
}
