use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use compass_core::{CompassError, CompassOptions, CompassReading};
use compass_plugin::{
    create_adapter, forward_headings, Cli, CompassAdapter, ErrorCallback, NeedleAnimator,
    ReadingCallback, SessionClock, SimulatedSensor, VERSION,
};
use miette::{IntoDiagnostic, Result};
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};

/// Spacing of simulated sensor events (half the magnetometer throttle)
const SPIN_PERIOD: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let options = args.compass_options().into_diagnostic()?;
    let platform = args.platform();
    log::info!("compass-demo {} using the {} platform", VERSION, platform);

    let clock = SessionClock::start();
    let sensor = Arc::new(SimulatedSensor::full(clock));
    let compass = create_adapter(platform, sensor.clone(), clock);

    if !compass.is_available() {
        return Err(CompassError::Unavailable).into_diagnostic();
    }

    if args.single {
        return single_reading(compass.as_ref(), &sensor, options, args.spin).await;
    }

    let spin = args.spin;
    let duration = Duration::from_secs(args.duration);
    let (animator, headings) = NeedleAnimator::new(0.0, clock);

    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("Sensor", move |subsys| {
            run_sensor(subsys, sensor, spin)
        }));
        s.start(SubsystemBuilder::new("Needle", move |subsys| {
            run_needle(subsys, animator)
        }));
        s.start(SubsystemBuilder::new("Compass", move |subsys| {
            run_compass(subsys, compass, options, headings, duration)
        }));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(2))
    .await
    .into_diagnostic()
}

async fn single_reading(
    compass: &dyn CompassAdapter,
    sensor: &Arc<SimulatedSensor>,
    options: CompassOptions,
    spin: f64,
) -> Result<()> {
    let token = tokio_util::sync::CancellationToken::new();
    let spinner = {
        let sensor = sensor.clone();
        let token = token.clone();
        tokio::spawn(async move { sensor.spin(spin, SPIN_PERIOD, token).await })
    };

    let result = compass.get_current_reading(options).await;
    token.cancel();
    let _ = spinner.await;

    let reading = result.into_diagnostic()?;
    println!("{}", serde_json::to_string_pretty(&reading).into_diagnostic()?);
    Ok(())
}

async fn run_sensor(
    subsys: SubsystemHandle,
    sensor: Arc<SimulatedSensor>,
    spin: f64,
) -> Result<(), CompassError> {
    log::info!("Sensor: spinning at {}°/s", spin);
    sensor
        .spin(spin, SPIN_PERIOD, subsys.create_cancellation_token())
        .await;
    Ok(())
}

async fn run_needle(subsys: SubsystemHandle, animator: NeedleAnimator) -> Result<(), CompassError> {
    let mut rotation = animator.rotation();
    let token = subsys.create_cancellation_token();
    let task = tokio::spawn(animator.run(token.clone()));

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            changed = rotation.changed() => {
                if changed.is_err() {
                    break;
                }
                log::trace!("Needle: rotation {:.1}°", *rotation.borrow_and_update());
            }
        }
    }

    let _ = task.await;
    Ok(())
}

async fn run_compass(
    subsys: SubsystemHandle,
    compass: Box<dyn CompassAdapter>,
    options: CompassOptions,
    headings: tokio::sync::mpsc::UnboundedSender<f64>,
    duration: Duration,
) -> Result<(), CompassError> {
    let needle = forward_headings(headings);
    let on_reading: ReadingCallback = Arc::new(move |reading: CompassReading| {
        log::info!(
            "Reading: {}",
            serde_json::to_string(&reading).unwrap_or_default()
        );
        needle(reading);
    });
    let on_error: ErrorCallback = Arc::new(|error: CompassError| {
        log::warn!("Compass: {}", error);
    });

    let mut handle = compass
        .start_updating(options, on_reading, Some(on_error))
        .await?;
    log::info!("Compass: session {} {}", handle.id(), handle.state());

    tokio::select! {
        _ = subsys.on_shutdown_requested() => {
            log::info!("Compass: shutdown requested");
        }
        _ = tokio::time::sleep(duration) => {
            log::info!("Compass: ran for {:?}, shutting down", duration);
            subsys.request_shutdown();
        }
        _ = handle.ended() => {
            log::warn!("Compass: session ended unexpectedly");
            subsys.request_shutdown();
        }
    }

    if !compass.stop_updating() {
        log::warn!("Compass: sensor subscription was not released cleanly");
    }
    Ok(())
}
