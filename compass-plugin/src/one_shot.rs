//! Single heading reading with a deadline.

use std::time::Duration;

use compass_core::{
    CompassError, Decoded, HeadingDecoder, HeadingSource, OneShotState, OneShotTracker,
    RawHeading, SensorEvent, SubscriptionRequest,
};
use tokio::sync::mpsc;

/// How long a one-shot request waits for its first sample
pub const ONE_SHOT_TIMEOUT: Duration = Duration::from_secs(3);

/// Subscribe, wait for the first valid sample, unsubscribe.
///
/// The subscription is released on every path, including the timeout.
pub(crate) async fn read_once<S: HeadingSource + ?Sized>(
    source: &S,
    request: SubscriptionRequest,
    mut decoder: Box<dyn HeadingDecoder>,
    deadline: Duration,
) -> Result<RawHeading, CompassError> {
    let mut tracker = OneShotTracker::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = source.subscribe(
        request,
        Box::new(move |event: SensorEvent| tx.send(event).is_ok()),
    )?;
    tracker.awaiting();

    let result = match tokio::time::timeout(deadline, first_sample(&mut rx, decoder.as_mut())).await {
        Ok(Ok(raw)) => {
            tracker.resolved();
            Ok(raw)
        }
        Ok(Err(error)) => {
            tracker.failed();
            Err(error)
        }
        Err(_) => {
            tracker.timed_out();
            Err(CompassError::Timeout)
        }
    };

    if let Err(e) = source.unsubscribe(subscription) {
        log::warn!("One-shot: failed to release subscription: {}", e);
    }

    let outcome: OneShotState = tracker.released();
    log::debug!("One-shot: {}", outcome);
    result
}

async fn first_sample(
    events: &mut mpsc::UnboundedReceiver<SensorEvent>,
    decoder: &mut dyn HeadingDecoder,
) -> Result<RawHeading, CompassError> {
    loop {
        let Some(event) = events.recv().await else {
            return Err(CompassError::NativeFault("sensor subscription closed".into()));
        };
        match decoder.decode(event) {
            Decoded::Sample(raw) if raw.is_valid() => return Ok(raw),
            Decoded::Fault(error) => return Err(error),
            _ => {}
        }
    }
}
