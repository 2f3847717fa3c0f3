//! Etales: the latest value of one topic

use bytes::Bytes;

use emyz_core::MicroTime;

/// Latest value of a topic as seen by a subscriber
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Etale {
    parts: Vec<Bytes>,
    publish_time: Option<MicroTime>,
    receive_time: Option<MicroTime>,
    paused: bool,
}

impl Etale {
    /// Data parts of the latest message
    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    /// Emission stamp set by the publisher; `None` until data arrives
    pub fn publish_time(&self) -> Option<MicroTime> {
        self.publish_time
    }

    /// Local receipt stamp; `None` until data arrives
    pub fn receive_time(&self) -> Option<MicroTime> {
        self.receive_time
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn has_data(&self) -> bool {
        self.receive_time.is_some()
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Replace the value as a whole. Receive stamps never go backwards.
    pub(crate) fn replace(&mut self, parts: Vec<Bytes>, publish_time: MicroTime, now: MicroTime) {
        self.parts = parts;
        self.publish_time = Some(publish_time);
        self.receive_time = Some(self.receive_time.map_or(now, |last| last.max(now)));
    }
}
