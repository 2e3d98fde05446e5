use std::fmt;

pub type Listener<E> = Box<dyn FnMut(&E) + Send>;

/// Fire-and-forget fan-out of plain data events.
pub struct Notifier<E> {
    listeners: Vec<Listener<E>>,
}

impl<E> Notifier<E> {
    pub fn new() -> Self {
        Self { listeners: Vec::new() }
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&mut self, event: E) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").field("listeners", &self.listeners.len()).finish()
    }
}
