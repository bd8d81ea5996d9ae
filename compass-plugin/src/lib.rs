//! # Compass Plugin
//!
//! Async host for the compass pipeline in [`compass_core`].
//!
//! This crate turns the pure pipeline into something an application can
//! call: two platform adapters behind one async trait, a tokio task per
//! continuous session, a one-shot reading with a deadline, a needle animator
//! for the view layer, and a simulated native sensor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    compass-plugin                       │
//! │  ┌──────────────────┐   ┌──────────────────┐            │
//! │  │ LocationCompass  │   │ FusionCompass    │            │
//! │  └────────┬─────────┘   └────────┬─────────┘            │
//! │           └──────────┬───────────┘                      │
//! │                      ▼                                  │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │ CompassCore                                         ││
//! │  │  - validation, availability, permission             ││
//! │  │  - SessionTask (governor + throttle timer)          ││
//! │  │  - one-shot (3 s timeout)                           ││
//! │  └─────────────────────────────────────────────────────┘│
//! │                      │                                  │
//! │                      ▼                                  │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │ HeadingSource (native binding / SimulatedSensor)    ││
//! │  └─────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example: Following the heading
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use compass_core::{CompassOptions, CompassReading};
//! use compass_plugin::{create_adapter, Platform, SessionClock, SimulatedSensor};
//!
//! #[tokio::main]
//! async fn main() {
//!     let clock = SessionClock::start();
//!     let sensor = Arc::new(SimulatedSensor::full(clock));
//!     let compass = create_adapter(Platform::detect(), sensor, clock);
//!
//!     let handle = compass
//!         .start_updating(
//!             CompassOptions::default(),
//!             Arc::new(|reading: CompassReading| println!("heading {:.1}°", reading.heading)),
//!             None,
//!         )
//!         .await
//!         .unwrap();
//!     assert!(handle.is_active());
//!     compass.stop_updating();
//! }
//! ```
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for the `compass-demo` options. Key options:
//!
//! - `-p, --platform` - Heading service to drive (default: native to the target)
//! - `-o, --options` - JSON options file
//! - `-v` - Increase verbosity (use multiple times)
//! - `--single` - Take one reading and exit

use std::path::PathBuf;

use clap::Parser;
use compass_core::SensorDelay;

pub mod adapter;
pub mod clock;
pub mod config;
pub mod display;
pub mod one_shot;
pub mod platform;
pub mod session;
pub mod simulated;

pub use adapter::{CompassAdapter, CompassCore};
pub use clock::SessionClock;
pub use config::ConfigError;
pub use display::{forward_headings, NeedleAnimator};
pub use platform::{create_adapter, FusionCompass, LocationCompass, Platform};
pub use session::{ErrorCallback, ReadingCallback, SessionHandle};
pub use simulated::SimulatedSensor;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
#[command(name = "compass-demo", version, about = "Compass heading pipeline demo")]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Heading service to drive (default: native to this target)
    #[arg(short, long, value_enum)]
    pub platform: Option<Platform>,

    /// Options file in JSON (default: <config dir>/options.json)
    #[arg(short, long)]
    pub options: Option<PathBuf>,

    /// Minimum change in degrees before a reading is emitted
    #[arg(long)]
    pub min_change_threshold: Option<f64>,

    /// Minimum interval between readings in milliseconds
    #[arg(long)]
    pub update_throttle: Option<u64>,

    /// Smoothing: 0.0 = none, 1.0 = maximum
    #[arg(long)]
    pub filter: Option<f64>,

    /// Report true north (location platform)
    #[arg(long, default_value_t = false)]
    pub true_heading: bool,

    /// Do not fuse the gyroscope (fusion platform)
    #[arg(long, default_value_t = false)]
    pub no_fusion: bool,

    /// Sensor polling rate: fastest, game, ui or normal (fusion platform)
    #[arg(long)]
    pub sensor_delay: Option<SensorDelay>,

    /// Seconds to run before shutting down
    #[arg(short, long, default_value_t = 10)]
    pub duration: u64,

    /// Simulated rotation speed in degrees per second
    #[arg(long, default_value_t = 30.0, allow_negative_numbers = true)]
    pub spin: f64,

    /// Take a single reading and exit
    #[arg(long, default_value_t = false)]
    pub single: bool,
}

impl Cli {
    /// Requested platform, or the one native to this target.
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::detect)
    }
}
