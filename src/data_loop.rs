use std::sync::Mutex;
use std::thread::{self, ThreadId};

use ringbuf::{Consumer, Producer, RingBuffer};

/// A unit of work posted to a [`DataLoop`]: real-time graph mutation
/// deferred off the calling (main-domain) thread.
pub type Invocation = Box<dyn FnOnce() + Send + 'static>;

/// The thread-confined executor that all `rt.*` mutation and graph topology
/// changes must run on.
///
/// `invoke` either runs `f` immediately, if the caller is already on the
/// loop's thread, or enqueues it to run the next time the owning thread
/// drains the loop. Implementations must not block the caller.
pub trait DataLoop: Send + Sync {
    fn invoke(&self, f: Invocation);
}

/// A minimal, single-threaded [`DataLoop`] built on the same SPSC
/// ring-buffer pattern the player's `sample_player` module uses to hand
/// messages to its audio thread.
///
/// Real embeddings bind this to whatever thread actually owns the audio
/// callback; this default is for tests and for hosts happy to dispatch
/// deferred work manually.
pub struct SerialDataLoop {
    owner: ThreadId,
    tx: Mutex<Producer<Invocation>>,
    rx: Mutex<Consumer<Invocation>>,
}

impl SerialDataLoop {
    pub fn new() -> Self {
        let (tx, rx) = RingBuffer::new(256).split();
        SerialDataLoop {
            owner: thread::current().id(),
            tx: Mutex::new(tx),
            rx: Mutex::new(rx),
        }
    }

    /// Run every invocation queued since the last call. Must be called from
    /// the loop's owning thread.
    pub fn dispatch_pending(&self) {
        debug_assert_eq!(thread::current().id(), self.owner);
        let mut rx = self.rx.lock().unwrap();
        while let Some(f) = rx.pop() {
            f();
        }
    }
}

impl Default for SerialDataLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoop for SerialDataLoop {
    fn invoke(&self, f: Invocation) {
        if thread::current().id() == self.owner {
            f();
            return;
        }
        if self.tx.lock().unwrap().push(f).is_err() {
            log::error!("data-loop invoke queue full, dropping deferred work");
        }
    }
}
