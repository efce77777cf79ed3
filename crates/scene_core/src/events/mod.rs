//! Change notification
//!
//! A [`Delegate`] is a list of listeners invoked synchronously, in
//! registration order, every time a change is published. Registration returns
//! a [`DelegateHandle`] used to remove the listener again.

/// Identifies one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DelegateHandle(u64);

impl DelegateHandle {
    /// Raw handle value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

type Listener<T> = Box<dyn FnMut(&T)>;

/// Ordered listener list
pub struct Delegate<T: ?Sized> {
    next: u64,
    listeners: Vec<(DelegateHandle, Listener<T>)>,
}

impl<T: ?Sized> Default for Delegate<T> {
    fn default() -> Self {
        Self {
            next: 0,
            listeners: Vec::new(),
        }
    }
}

impl<T: ?Sized> Delegate<T> {
    /// Create an empty delegate
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener
    pub fn register<F>(&mut self, listener: F) -> DelegateHandle
    where
        F: FnMut(&T) + 'static,
    {
        let handle = DelegateHandle(self.next);
        self.next += 1;
        self.listeners.push((handle, Box::new(listener)));
        handle
    }

    /// Remove a listener; returns `false` if it was not registered
    pub fn unregister(&mut self, handle: DelegateHandle) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(registered, _)| *registered != handle);
        before != self.listeners.len()
    }

    /// Invoke every listener with `value`
    pub fn notify(&mut self, value: &T) {
        for (_, listener) in &mut self.listeners {
            listener(value);
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Remove every listener
    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl<T: ?Sized> std::fmt::Debug for Delegate<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delegate")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
