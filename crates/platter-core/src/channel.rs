use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use rtrb::RingBuffer;

use crate::event::MidiEvent;

pub const DEFAULT_EVENT_CAPACITY: usize = 2_048;

pub struct EventProducer {
    inner: rtrb::Producer<MidiEvent>,
    dropped: Arc<AtomicUsize>,
    capacity: usize,
}

pub struct EventConsumer {
    inner: rtrb::Consumer<MidiEvent>,
    dropped: Arc<AtomicUsize>,
    capacity: usize,
}

#[must_use]
pub fn event_channel(capacity: usize) -> (EventProducer, EventConsumer) {
    let capacity = capacity.max(2).next_power_of_two();
    // one slot stays free: `capacity - 1` undrained events fit
    let (producer, consumer) = RingBuffer::new(capacity - 1);
    let dropped = Arc::new(AtomicUsize::new(0));

    (
        EventProducer {
            inner: producer,
            dropped: Arc::clone(&dropped),
            capacity,
        },
        EventConsumer {
            inner: consumer,
            dropped,
            capacity,
        },
    )
}

impl EventProducer {
    pub fn push(&mut self, event: MidiEvent) -> bool {
        if self.inner.push(event).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_consumer_alive(&self) -> bool {
        !self.inner.is_abandoned()
    }
}

impl EventConsumer {
    pub fn drain(&mut self, out: &mut Vec<MidiEvent>) -> usize {
        let available = self.inner.slots();
        out.reserve(available);

        let mut drained = 0;
        while let Ok(event) = self.inner.pop() {
            out.push(event);
            drained += 1;
        }
        drained
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.slots()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn drop_count(&self) -> usize {
        self.dropped.load(Ordering::Acquire)
    }

    pub fn take_drop_count(&self) -> usize {
        self.dropped.swap(0, Ordering::AcqRel)
    }
}
