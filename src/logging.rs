//! Diagnostic output.
//!
//! Lines go to the ESP32 serial console when the `esp32-log` feature is
//! enabled. Without it the arguments are still type-checked but nothing is
//! emitted.

macro_rules! log {
    ($($arg:tt)*) => {{
        #[cfg(feature = "esp32-log")]
        esp_println::println!($($arg)*);
        #[cfg(not(feature = "esp32-log"))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}

pub(crate) use log;
