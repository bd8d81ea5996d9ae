//! Needle animation for a UI that only understands a rotation angle.
//!
//! Headings come in through a channel, the [`NeedleInterpolator`] turns them
//! into an unbounded rotation, and every animation frame publishes that
//! rotation on a `watch` channel for the view layer.

use std::sync::Arc;
use std::time::Duration;

use compass_core::{CompassReading, NeedleInterpolator};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clock::SessionClock;
use crate::session::ReadingCallback;

/// Animation frame spacing (about 60 frames per second)
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

pub struct NeedleAnimator {
    interpolator: NeedleInterpolator,
    clock: SessionClock,
    headings: mpsc::UnboundedReceiver<f64>,
    rotation: watch::Sender<f64>,
}

impl NeedleAnimator {
    /// Needle at rest at `initial` degrees. Returns the animator and the
    /// sender that feeds it headings.
    pub fn new(initial: f64, clock: SessionClock) -> (Self, mpsc::UnboundedSender<f64>) {
        let (tx, headings) = mpsc::unbounded_channel();
        let (rotation, _) = watch::channel(initial);
        let animator = NeedleAnimator {
            interpolator: NeedleInterpolator::new(initial),
            clock,
            headings,
            rotation,
        };
        (animator, tx)
    }

    /// Rotation seen by the view, updated once per frame while moving.
    pub fn rotation(&self) -> watch::Receiver<f64> {
        self.rotation.subscribe()
    }

    /// Animate until cancelled or every heading sender is gone.
    pub async fn run(mut self, token: CancellationToken) {
        let mut frames = interval(FRAME_INTERVAL);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                heading = self.headings.recv() => match heading {
                    Some(heading) => {
                        let delta = self.interpolator.set_target(heading, self.clock.now_ms());
                        log::trace!(
                            "Needle: {:.1}° -> {:.1}° ({:+.1}°)",
                            self.interpolator.displayed(),
                            self.interpolator.target(),
                            delta
                        );
                        frames.reset();
                    }
                    None => break,
                },
                _ = frames.tick(), if self.interpolator.is_animating() => {
                    let angle = self.interpolator.sample(self.clock.now_ms());
                    self.rotation.send_replace(angle);
                }
            }
        }

        // Land on the final angle
        if self.interpolator.is_animating() {
            let target = self.interpolator.target();
            self.interpolator.reset(target);
            self.rotation.send_replace(target);
        }
        log::debug!("Needle: stopped at {:.1}°", self.interpolator.displayed());
    }
}

/// Reading callback that feeds headings to a [`NeedleAnimator`].
pub fn forward_headings(tx: mpsc::UnboundedSender<f64>) -> ReadingCallback {
    Arc::new(move |reading: CompassReading| {
        // A closed animator just stops receiving
        let _ = tx.send(reading.heading);
    })
}
