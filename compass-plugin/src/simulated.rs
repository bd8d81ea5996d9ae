//! Simulated native heading service.
//!
//! Stands in for the platform binding in tests and in the demo. Events are
//! stamped with a [`SessionClock`] so they line up with the adapter's timer.
//! Heading subscribers receive `Heading` events; motion subscribers receive
//! accelerometer and magnetometer vectors (and gyroscope rates when they
//! asked for them) for a flat device pointing at the requested heading.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use compass_core::{
    CompassError, HeadingSource, NativeHeading, Permission, SensorAccuracy, SensorCapabilities,
    SensorEvent, SensorSink, SubscriptionId, SubscriptionRequest,
};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clock::SessionClock;

/// Earth field used for the simulated magnetometer (µT, horizontal/vertical)
const FIELD_HORIZONTAL: f64 = 22.0;
const FIELD_VERTICAL: f64 = -40.0;
const GRAVITY: f64 = 9.81;

struct Subscription {
    request: SubscriptionRequest,
    sink: Box<dyn SensorSink>,
}

struct SimState {
    capabilities: Result<SensorCapabilities, CompassError>,
    permission: Permission,
    answer_on_request: Permission,
    permission_requests: usize,
    subscriptions: BTreeMap<u64, Subscription>,
    requests: Vec<SubscriptionRequest>,
    next_id: u64,
    fail_unsubscribe: bool,
}

#[derive(Clone)]
pub struct SimulatedSensor {
    state: Arc<Mutex<SimState>>,
    clock: SessionClock,
}

impl SimulatedSensor {
    pub fn new(capabilities: SensorCapabilities, clock: SessionClock) -> Self {
        SimulatedSensor {
            state: Arc::new(Mutex::new(SimState {
                capabilities: Ok(capabilities),
                permission: Permission::Granted,
                answer_on_request: Permission::Undetermined,
                permission_requests: 0,
                subscriptions: BTreeMap::new(),
                requests: Vec::new(),
                next_id: 1,
                fail_unsubscribe: false,
            })),
            clock,
        }
    }

    /// Device with every sensor present and permission granted.
    pub fn full(clock: SessionClock) -> Self {
        Self::new(SensorCapabilities::all(), clock)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clock(&self) -> SessionClock {
        self.clock
    }

    // -------------------------------------------------------------------------
    // Test controls
    // -------------------------------------------------------------------------

    pub fn set_capabilities(&self, capabilities: SensorCapabilities) {
        self.lock().capabilities = Ok(capabilities);
    }

    /// Make the capability query itself fail.
    pub fn fail_capabilities(&self, message: &str) {
        self.lock().capabilities = Err(CompassError::NativeFault(message.to_string()));
    }

    pub fn set_permission(&self, permission: Permission) {
        self.lock().permission = permission;
    }

    /// State the permission moves to when requested.
    pub fn answer_permission_with(&self, permission: Permission) {
        self.lock().answer_on_request = permission;
    }

    pub fn permission_requests(&self) -> usize {
        self.lock().permission_requests
    }

    pub fn fail_unsubscribe(&self, fail: bool) {
        self.lock().fail_unsubscribe = fail;
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    /// Every subscription request seen so far, oldest first.
    pub fn requests(&self) -> Vec<SubscriptionRequest> {
        self.lock().requests.clone()
    }

    /// Drop every subscription without telling the subscribers, as a
    /// platform does when its service dies.
    pub fn close_all(&self) {
        self.lock().subscriptions.clear();
    }

    // -------------------------------------------------------------------------
    // Event injection
    // -------------------------------------------------------------------------

    fn deliver(&self, mut event_for: impl FnMut(&SubscriptionRequest) -> Vec<SensorEvent>) {
        let mut state = self.lock();
        state.subscriptions.retain(|_, subscription| {
            event_for(&subscription.request)
                .into_iter()
                .all(|event| subscription.sink.deliver(event))
        });
    }

    /// Push a heading reading. `true_heading` negative means unknown.
    pub fn emit_heading(&self, magnetic: f64, true_heading: f64, accuracy: f64) {
        self.emit_reading(magnetic, true_heading, accuracy, 0.0);
    }

    /// Push a reading for a device lying flat and pointing at `heading`.
    pub fn emit(&self, heading: f64) {
        self.emit_heading(heading, -1.0, 5.0);
    }

    /// Push a reading for a flat device at `heading` turning clockwise at
    /// `degrees_per_second`. Motion subscribers see the turn on the gyroscope.
    pub fn emit_turning(&self, heading: f64, degrees_per_second: f64) {
        self.emit_reading(heading, -1.0, 5.0, degrees_per_second);
    }

    fn emit_reading(&self, magnetic: f64, true_heading: f64, accuracy: f64, turn_rate: f64) {
        let timestamp_ms = self.clock.now_ms();
        self.deliver(|request| match request {
            SubscriptionRequest::Heading { .. } => vec![SensorEvent::Heading(NativeHeading {
                magnetic_heading: magnetic,
                true_heading,
                accuracy,
                timestamp_ms,
            })],
            SubscriptionRequest::Motion { gyroscope, .. } => {
                let rate = (*gyroscope).then_some(turn_rate);
                motion_events(magnetic, rate, timestamp_ms)
            }
        });
    }

    pub fn emit_accuracy(&self, accuracy: SensorAccuracy) {
        self.deliver(|request| match request {
            SubscriptionRequest::Motion { .. } => vec![SensorEvent::AccuracyChanged(accuracy)],
            SubscriptionRequest::Heading { .. } => Vec::new(),
        });
    }

    pub fn emit_fault(&self, message: &str) {
        self.deliver(|_| vec![SensorEvent::Fault(message.to_string())]);
    }

    /// Revoke permission and notify subscribers.
    pub fn revoke_permission(&self) {
        self.set_permission(Permission::Denied);
        self.deliver(|_| vec![SensorEvent::PermissionChanged(Permission::Denied)]);
    }

    /// Rotate at `degrees_per_second`, emitting every `period`, until
    /// `token` is cancelled.
    pub async fn spin(&self, degrees_per_second: f64, period: Duration, token: CancellationToken) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let start = self.clock.now_ms();

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let elapsed = self.clock.now_ms().saturating_sub(start) as f64 / 1000.0;
                    let heading = (degrees_per_second * elapsed).rem_euclid(360.0);
                    self.emit_turning(heading, degrees_per_second);
                }
            }
        }
        log::debug!("SimulatedSensor: spin stopped");
    }
}

/// Accelerometer, magnetometer and, when `turn_rate` is given, a gyroscope
/// sample for a flat device pointing at `heading`.
///
/// A clockwise turn (heading increasing) is a negative rate about device z.
fn motion_events(heading: f64, turn_rate: Option<f64>, timestamp_ms: u64) -> Vec<SensorEvent> {
    let (sin, cos) = heading.to_radians().sin_cos();
    let mut events = vec![
        SensorEvent::Accelerometer {
            values: [0.0, 0.0, GRAVITY],
            timestamp_ms,
        },
        SensorEvent::Magnetometer {
            values: [-FIELD_HORIZONTAL * sin, FIELD_HORIZONTAL * cos, FIELD_VERTICAL],
            timestamp_ms,
        },
    ];
    if let Some(degrees_per_second) = turn_rate {
        events.push(SensorEvent::Gyroscope {
            values: [0.0, 0.0, -degrees_per_second.to_radians()],
            timestamp_ms,
        });
    }
    events
}

impl HeadingSource for SimulatedSensor {
    fn capabilities(&self) -> Result<SensorCapabilities, CompassError> {
        self.lock().capabilities.clone()
    }

    fn permission(&self) -> Permission {
        self.lock().permission
    }

    fn request_permission(&self) -> Permission {
        let mut state = self.lock();
        state.permission_requests += 1;
        state.permission = state.answer_on_request;
        state.permission
    }

    fn subscribe(
        &self,
        request: SubscriptionRequest,
        sink: Box<dyn SensorSink>,
    ) -> Result<SubscriptionId, CompassError> {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.requests.push(request);
        state.subscriptions.insert(id, Subscription { request, sink });
        log::trace!("SimulatedSensor: subscription {} ({:?})", id, request);
        Ok(SubscriptionId(id))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), CompassError> {
        let mut state = self.lock();
        if state.fail_unsubscribe {
            return Err(CompassError::NativeFault("unsubscribe rejected".into()));
        }
        state.subscriptions.remove(&id.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_sink(counter: Arc<AtomicUsize>) -> Box<dyn SensorSink> {
        Box::new(move |_event: SensorEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_heading_and_motion_subscribers() {
        let sensor = SimulatedSensor::full(SessionClock::with_epoch_ms(0));
        let headings = Arc::new(AtomicUsize::new(0));
        let motion = Arc::new(AtomicUsize::new(0));

        sensor
            .subscribe(
                SubscriptionRequest::Heading { heading_filter: 1.0 },
                counting_sink(headings.clone()),
            )
            .unwrap();
        sensor
            .subscribe(
                SubscriptionRequest::Motion {
                    sampling_period: Duration::ZERO,
                    gyroscope: true,
                },
                counting_sink(motion.clone()),
            )
            .unwrap();

        sensor.emit(90.0);
        assert_eq!(headings.load(Ordering::SeqCst), 1);
        // Accelerometer, magnetometer, gyroscope
        assert_eq!(motion.load(Ordering::SeqCst), 3);

        sensor.emit_accuracy(SensorAccuracy::High);
        assert_eq!(headings.load(Ordering::SeqCst), 1);
        assert_eq!(motion.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_sinks_are_dropped() {
        let sensor = SimulatedSensor::full(SessionClock::with_epoch_ms(0));
        sensor
            .subscribe(
                SubscriptionRequest::Heading { heading_filter: 1.0 },
                Box::new(|_event: SensorEvent| false),
            )
            .unwrap();
        assert_eq!(sensor.subscriber_count(), 1);
        sensor.emit(0.0);
        assert_eq!(sensor.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_turning_shows_on_gyroscope() {
        let sensor = SimulatedSensor::full(SessionClock::with_epoch_ms(0));
        let rates = Arc::new(Mutex::new(Vec::new()));
        let seen = rates.clone();
        sensor
            .subscribe(
                SubscriptionRequest::Motion {
                    sampling_period: Duration::ZERO,
                    gyroscope: true,
                },
                Box::new(move |event: SensorEvent| {
                    if let SensorEvent::Gyroscope { values, .. } = event {
                        seen.lock().unwrap().push(values);
                    }
                    true
                }),
            )
            .unwrap();

        sensor.emit(10.0);
        sensor.emit_turning(10.0, 30.0);
        let rates = rates.lock().unwrap();
        assert_eq!(rates[0], [0.0; 3]);
        assert_eq!(rates[1], [0.0, 0.0, -30.0_f64.to_radians()]);
    }

    #[test]
    fn test_permission_request() {
        let sensor = SimulatedSensor::full(SessionClock::with_epoch_ms(0));
        sensor.set_permission(Permission::Undetermined);
        assert_eq!(sensor.request_permission(), Permission::Undetermined);
        sensor.answer_permission_with(Permission::Granted);
        assert_eq!(sensor.request_permission(), Permission::Granted);
        assert_eq!(sensor.permission(), Permission::Granted);
        assert_eq!(sensor.permission_requests(), 2);
    }

    #[test]
    fn test_capability_failure() {
        let sensor = SimulatedSensor::full(SessionClock::with_epoch_ms(0));
        sensor.fail_capabilities("service down");
        assert!(sensor.capabilities().is_err());
    }
}
