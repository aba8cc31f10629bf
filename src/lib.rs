//! Real-time control and power core of a battery-powered MIDI controller.
//!
//! Two levers with centre pushes and a capacitive touch pad turn into MIDI
//! control changes through time-based ramps. Four LEDs give feedback. A tiered
//! sleep state machine keeps the battery alive between sessions.
//!
//! The crate is hardware-agnostic: every peripheral is reached through the
//! traits in [`hal`], and every time-dependent call takes `now` explicitly.
//!
//! ```ignore
//! static CTX: DeviceContext<16> = DeviceContext::new();
//! static BUS: SharedBus<Expanders> = SharedBus::new(Expanders::new());
//!
//! let config = DeviceConfig::default();
//! bring_up(&BUS, &config).unwrap_or_else(|error| halt(error));
//! CTX.load_settings(&mut nvs);
//! CTX.start(Instant::now());
//!
//! let mut input = InputTask::new(&CTX, &BUS, &config, touch_pad, keybed)
//!     .with_velocity_hook(config.velocity_cc, set_keybed_velocity);
//! let mut output = OutputTask::new(&CTX, &BUS, &config, ledc);
//! let mut power = PowerManager::new(config.power, &CTX.activity, &CTX.wake, Instant::now());
//! ```
#![no_std]

mod logging;

pub mod activity;
pub mod bus;
pub mod channel;
pub mod config;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod hal;
pub mod indicator;
pub mod led;
pub mod lever;
pub mod lever_push;
pub mod power;
pub mod ramp;
pub mod scheduler;
pub mod settings;
pub mod touch;

pub use activity::{ActivityClock, WakeSignal};
pub use bus::SharedBus;
pub use channel::{CommandQueue, LedQueue, LedReceiver, LedSender, QueueFull};
pub use config::{ConfigTarget, ConfigurationPort, WriteOutcome};
pub use coordinator::{InputReport, InputTask, OutputTask};
pub use device::{DeviceConfig, DeviceContext, LeverPins, bring_up};
pub use error::{ConfigError, InitError, halt};
pub use indicator::{IndicatorAnimator, IndicatorConfig};
pub use led::{LedCommand, LedId, LedOutput, LedRenderer};
pub use lever::{LeverController, LeverInput};
pub use lever_push::LeverPushController;
pub use power::{LightSleepOutcome, PowerConfig, PowerManager, SleepState};
pub use ramp::{Curve, RampedValue};
pub use scheduler::TaskPacer;
pub use settings::{
    LeverMode, LeverPushMode, LeverPushSettings, LeverSettings, Polarity, SettingsCell,
    SettingsRecord, TouchMode, TouchSettings,
};
pub use touch::{TouchCalibration, TouchSensor};

pub use embassy_time::{Duration, Instant};
