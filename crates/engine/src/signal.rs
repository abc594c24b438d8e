//! Current-value signals backed by `tokio::sync::watch`.
//!
//! A [`SignalCell`] is the single writer of a value; any number of
//! [`Signal`] readers observe it. Writes that leave the value unchanged do
//! not wake readers.

use tokio::sync::watch;

/// Read-only view of a continuously available value.
#[derive(Debug, Clone)]
pub struct Signal<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> Signal<T> {
    /// The current value.
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next change and return the new value.
    ///
    /// Returns `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Whether the value changed since this reader last looked.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Mark the current value as seen by this reader.
    pub fn mark_seen(&mut self) {
        self.rx.mark_unchanged();
    }

    /// A raw receiver for callers that want to drive `watch` directly.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.rx.clone()
    }
}

/// The writing half of a signal.
#[derive(Debug)]
pub struct SignalCell<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone + PartialEq> SignalCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn signal(&self) -> Signal<T> {
        Signal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Replace the value. Returns whether it changed.
    pub fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }

    /// Mutate in place; `f` returns whether it modified the value.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        self.tx.send_if_modified(f)
    }
}
