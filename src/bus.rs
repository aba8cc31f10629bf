//! The shared I/O expander bus.
//!
//! Both tasks reach the expanders: the input task to sample levers, the
//! output task to drive active-low LEDs. Every access takes the one bus lock
//! for a single read or write, which bounds how long the other task waits.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::hal::{ExpanderPin, GpioExpander, PinMode};

/// I/O expander shared by the input and output tasks.
pub struct SharedBus<E> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<E>>,
}

impl<E: GpioExpander> SharedBus<E> {
    /// Wrap an expander behind the bus lock.
    pub const fn new(expander: E) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(expander)),
        }
    }

    /// Probe the chip at `chip`, returning `false` if it does not answer.
    pub fn begin(&self, chip: u8) -> bool {
        self.inner.lock(|bus| bus.borrow_mut().begin(chip))
    }

    /// Configure the direction and pull of a pin.
    pub fn pin_mode(&self, pin: ExpanderPin, mode: PinMode) {
        self.inner.lock(|bus| bus.borrow_mut().pin_mode(pin, mode));
    }

    /// Read the level of a pin, `true` is high.
    pub fn read(&self, pin: ExpanderPin) -> bool {
        self.inner.lock(|bus| bus.borrow_mut().digital_read(pin))
    }

    /// Drive a pin high or low.
    pub fn write(&self, pin: ExpanderPin, high: bool) {
        self.inner.lock(|bus| bus.borrow_mut().digital_write(pin, high));
    }

    /// Read an active-low input: a pulled-up contact reads low when closed.
    pub fn is_pressed(&self, pin: ExpanderPin) -> bool {
        !self.read(pin)
    }

    /// Run `f` with exclusive access to the expander.
    pub fn with<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        self.inner.lock(|bus| f(&mut bus.borrow_mut()))
    }
}
