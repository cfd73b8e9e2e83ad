use crate::frame::Frame;

/// An event stamped with the frame it was emitted in.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    pub frame_index: u64,
    pub payload: T,
}

/// Ordered outbox of typed events.
///
/// Producers `emit`; the consumer (usually the renderer) `drain`s once per frame.
#[derive(Debug)]
pub struct EventBus<T> {
    events: Vec<Event<T>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, frame: Frame, payload: T) {
        self.events.push(Event {
            frame_index: frame.index,
            payload,
        });
    }

    pub fn events(&self) -> &[Event<T>] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Event<T>> {
        std::mem::take(&mut self.events)
    }
}
