//! SSE body for one dashboard client.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::response::sse::Event as SseEvent;
use futures::stream::{self, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hud_core::Frame;
use hud_protocol::PRIMING_COMMENT;

use crate::hub::{HubHandle, Subscription};

/// Frames from one subscriber queue. Detaches from the hub when dropped,
/// which happens as soon as the client disconnects.
pub struct SubscriberStream {
    subscription: Subscription,
    hub: HubHandle,
}

impl SubscriberStream {
    pub fn new(subscription: Subscription, hub: HubHandle) -> Self {
        Self { subscription, hub }
    }
}

impl Stream for SubscriberStream {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        self.subscription.receiver_mut().poll_recv(cx)
    }
}

impl Drop for SubscriberStream {
    fn drop(&mut self) {
        debug!(subscriber = %self.subscription.id(), "Push stream closed");
        self.hub.detach(self.subscription.id());
    }
}

/// Renders a frame as an SSE event named after its kind.
pub fn frame_to_sse(frame: &Frame) -> SseEvent {
    SseEvent::default()
        .event(frame.kind().as_str())
        .data(frame.data())
}

/// The full response body: priming comment, then the subscriber's frames,
/// ending when the relay shuts down.
pub fn event_stream(
    frames: SubscriberStream,
    cancel_token: CancellationToken,
) -> impl Stream<Item = Result<SseEvent, Infallible>> + Send + 'static {
    let priming = stream::once(async { Ok(SseEvent::default().comment(PRIMING_COMMENT)) });
    let live = frames.map(|frame| Ok(frame_to_sse(&frame)));

    priming
        .chain(live)
        .take_until(cancel_token.cancelled_owned())
}
