//! Ordered callback lists used for framer and session events.

use std::fmt;

type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// An ordered list of event callbacks.
///
/// Callbacks run synchronously, in registration order, every time
/// [`Listeners::notify`] is called.
pub struct Listeners<T: ?Sized> {
    callbacks: Vec<Callback<T>>,
}

impl<T: ?Sized> Listeners<T> {
    /// An empty list.
    pub fn new() -> Self {
        Listeners { callbacks: Vec::new() }
    }

    /// Register a callback. It runs after every callback registered before it.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Deliver an event to every callback.
    pub fn notify(&mut self, event: &T) {
        for callback in self.callbacks.iter_mut() {
            callback(event);
        }
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl<T: ?Sized> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
