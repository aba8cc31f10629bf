//! Bounded command queue between the input task and the output task.
//!
//! Backed by a `heapless::Deque` behind a `critical-section` mutex, so both
//! ends may live on different cores or in interrupt context. The output task
//! is the only receiver; it drains the queue completely before rendering,
//! which collapses intermediate states of the same LED into the last write.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use crate::led::LedCommand;

/// The queue was full; the command is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull<T>(pub T);

/// Fixed-capacity FIFO shared between tasks.
pub struct CommandQueue<T, const SIZE: usize> {
    inner: Mutex<RefCell<Deque<T, SIZE>>>,
}

impl<T, const SIZE: usize> CommandQueue<T, SIZE> {
    /// Create a new empty queue.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Producer handle.
    pub const fn sender(&self) -> QueueSender<'_, T, SIZE> {
        QueueSender { queue: self }
    }

    /// Consumer handle.
    pub const fn receiver(&self) -> QueueReceiver<'_, T, SIZE> {
        QueueReceiver { queue: self }
    }

    /// Append a command, or return it if the queue is full.
    pub fn push(&self, command: T) -> Result<(), QueueFull<T>> {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .borrow_mut()
                .push_back(command)
                .map_err(QueueFull)
        })
    }

    /// Take the oldest command.
    pub fn pop(&self) -> Option<T> {
        critical_section::with(|cs| self.inner.borrow(cs).borrow_mut().pop_front())
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow(cs).borrow().len())
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, const SIZE: usize> Default for CommandQueue<T, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending end of a [`CommandQueue`].
#[derive(Clone, Copy)]
pub struct QueueSender<'a, T, const SIZE: usize> {
    queue: &'a CommandQueue<T, SIZE>,
}

impl<T, const SIZE: usize> QueueSender<'_, T, SIZE> {
    /// Try to queue a command, handing it back if the queue is full.
    pub fn try_send(&self, command: T) -> Result<(), QueueFull<T>> {
        self.queue.push(command)
    }
}

/// Receiving end of a [`CommandQueue`].
#[derive(Clone, Copy)]
pub struct QueueReceiver<'a, T, const SIZE: usize> {
    queue: &'a CommandQueue<T, SIZE>,
}

impl<T, const SIZE: usize> QueueReceiver<'_, T, SIZE> {
    /// Take the oldest command, if any.
    pub fn try_receive(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Iterate until the queue is empty.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        core::iter::from_fn(move || self.queue.pop())
    }
}

/// Queue of LED commands.
pub type LedQueue<const SIZE: usize> = CommandQueue<LedCommand, SIZE>;

/// Input task end of the LED queue.
pub type LedSender<'a, const SIZE: usize> = QueueSender<'a, LedCommand, SIZE>;

/// Output task end of the LED queue.
pub type LedReceiver<'a, const SIZE: usize> = QueueReceiver<'a, LedCommand, SIZE>;
