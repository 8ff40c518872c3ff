use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

type Sink<T> = Box<dyn FnOnce(T) + Send>;

/// Single-assignment cell: the first [`settle`](Self::settle) delivers its value
/// to the sink, every later one is discarded.
pub struct FinishedLatch<T> {
    finished: AtomicBool,
    sink: Mutex<Option<Sink<T>>>,
}

impl<T> FinishedLatch<T> {
    pub fn new(sink: impl FnOnce(T) + Send + 'static) -> Self {
        Self {
            finished: AtomicBool::new(false),
            sink: Mutex::new(Some(Box::new(sink))),
        }
    }

    /// Returns `true` if this call won and delivered `value`.
    pub fn settle(&self, value: T) -> bool {
        if self
            .finished
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        // Only the winner reaches this point. The sink runs unlocked.
        let sink = self.sink.lock().take();
        if let Some(sink) = sink {
            sink(value);
        }
        true
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl<T> fmt::Debug for FinishedLatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinishedLatch")
            .field("finished", &self.is_finished())
            .field("pending_sink", &self.sink.lock().is_some())
            .finish()
    }
}
