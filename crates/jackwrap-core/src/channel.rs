//! Lock-free queues between the audio thread and the control thread.
//!
//! Four single-producer/single-consumer byte rings form two duplex channels,
//! one for scalar control updates and one for event blobs. Every producer
//! and consumer half is a distinct, non-`Clone` type, so one thread owns one
//! end of one queue.
//!
//! Messages are written whole or not at all. A blob's length header and
//! payload are only consumed together: the reader checks that the complete
//! message is buffered before taking anything off the ring.

use crate::config::{WrapperConfig, CONTROL_MESSAGE_SIZE};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

/// Length prefix of an event blob.
pub const BLOB_HEADER_SIZE: usize = 4;

/// Producer end of a byte ring.
pub struct ByteProducer {
    producer: HeapProd<u8>,
}

impl ByteProducer {
    /// Append `msg` in full, or drop it and return `false` if it does not fit.
    #[inline]
    pub fn try_write(&mut self, msg: &[u8]) -> bool {
        if msg.len() > self.producer.vacant_len() {
            return false;
        }
        self.producer.push_slice(msg) == msg.len()
    }

    #[inline]
    pub fn write_space(&self) -> usize {
        self.producer.vacant_len()
    }

    /// Bytes written but not yet read.
    #[inline]
    pub fn pending(&self) -> usize {
        self.producer.occupied_len()
    }

    pub fn capacity(&self) -> usize {
        self.producer.capacity().get()
    }
}

/// Consumer end of a byte ring.
pub struct ByteConsumer {
    consumer: HeapCons<u8>,
}

impl ByteConsumer {
    /// Fill `buf` completely, or leave the ring untouched and return `false`.
    #[inline]
    pub fn try_read(&mut self, buf: &mut [u8]) -> bool {
        if buf.len() > self.consumer.occupied_len() {
            return false;
        }
        self.consumer.pop_slice(buf) == buf.len()
    }

    /// Copy the first `buf.len()` buffered bytes without consuming them.
    pub fn peek(&self, buf: &mut [u8]) -> bool {
        let (head, tail) = self.consumer.as_slices();
        if buf.len() > head.len() + tail.len() {
            return false;
        }
        let from_head = buf.len().min(head.len());
        buf[..from_head].copy_from_slice(&head[..from_head]);
        let rest = buf.len() - from_head;
        buf[from_head..].copy_from_slice(&tail[..rest]);
        true
    }

    /// Drop up to `count` bytes.
    pub fn skip(&mut self, count: usize) -> usize {
        self.consumer.skip(count)
    }

    #[inline]
    pub fn read_space(&self) -> usize {
        self.consumer.occupied_len()
    }
}

/// Create a byte ring of exactly `capacity` bytes (at least one).
pub fn byte_queue(capacity: usize) -> (ByteProducer, ByteConsumer) {
    let (producer, consumer) = HeapRb::<u8>::new(capacity.max(1)).split();
    (ByteProducer { producer }, ByteConsumer { consumer })
}

/// One control value, addressed by port or control index depending on the
/// direction of travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlUpdate {
    pub port: u32,
    pub value: f32,
}

impl ControlUpdate {
    pub fn new(port: u32, value: f32) -> Self {
        Self { port, value }
    }

    pub fn to_bytes(self) -> [u8; CONTROL_MESSAGE_SIZE] {
        let mut raw = [0u8; CONTROL_MESSAGE_SIZE];
        raw[..4].copy_from_slice(&self.port.to_ne_bytes());
        raw[4..].copy_from_slice(&self.value.to_ne_bytes());
        raw
    }

    pub fn from_bytes(raw: [u8; CONTROL_MESSAGE_SIZE]) -> Self {
        let [p0, p1, p2, p3, v0, v1, v2, v3] = raw;
        Self {
            port: u32::from_ne_bytes([p0, p1, p2, p3]),
            value: f32::from_ne_bytes([v0, v1, v2, v3]),
        }
    }
}

pub struct ControlSender {
    queue: ByteProducer,
}

impl ControlSender {
    #[inline]
    pub fn try_send(&mut self, update: ControlUpdate) -> bool {
        self.queue.try_write(&update.to_bytes())
    }

    /// Whether the consumer has anything left to read.
    #[inline]
    pub fn has_unread(&self) -> bool {
        self.queue.pending() > 0
    }
}

pub struct ControlReceiver {
    queue: ByteConsumer,
}

impl ControlReceiver {
    #[inline]
    pub fn try_recv(&mut self) -> Option<ControlUpdate> {
        let mut raw = [0u8; CONTROL_MESSAGE_SIZE];
        self.queue
            .try_read(&mut raw)
            .then(|| ControlUpdate::from_bytes(raw))
    }

    /// Number of complete updates buffered right now.
    #[inline]
    pub fn pending(&self) -> usize {
        self.queue.read_space() / CONTROL_MESSAGE_SIZE
    }
}

pub struct EventSender {
    queue: ByteProducer,
}

impl EventSender {
    /// Queue `payload` as one `{size, payload}` blob.
    #[inline]
    pub fn try_send(&mut self, payload: &[u8]) -> bool {
        let Ok(size) = u32::try_from(payload.len()) else {
            return false;
        };
        if BLOB_HEADER_SIZE + payload.len() > self.queue.write_space() {
            return false;
        }
        // Space was checked up front and only this thread adds data, so both
        // halves land.
        self.queue.try_write(&size.to_ne_bytes()) && self.queue.try_write(payload)
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[inline]
    pub fn has_unread(&self) -> bool {
        self.queue.pending() > 0
    }
}

pub struct EventReceiver {
    queue: ByteConsumer,
}

impl EventReceiver {
    /// Payload size of the next blob, once the whole blob is buffered.
    pub fn pending_len(&self) -> Option<usize> {
        let mut header = [0u8; BLOB_HEADER_SIZE];
        if !self.queue.peek(&mut header) {
            return None;
        }
        let size = u32::from_ne_bytes(header) as usize;
        (self.queue.read_space() >= BLOB_HEADER_SIZE + size).then_some(size)
    }

    /// Bytes buffered right now, headers included.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.queue.read_space()
    }

    /// Move the next blob's payload into `buf` and return its size.
    ///
    /// Leaves the queue untouched when no complete blob is buffered or when
    /// `buf` is too small for it.
    pub fn try_recv(&mut self, buf: &mut [u8]) -> Option<usize> {
        let size = self.pending_len()?;
        if size > buf.len() {
            return None;
        }
        self.queue.skip(BLOB_HEADER_SIZE);
        self.queue.try_read(&mut buf[..size]).then_some(size)
    }

    /// Drop the next complete blob.
    pub fn discard(&mut self) -> bool {
        match self.pending_len() {
            Some(size) => {
                self.queue.skip(BLOB_HEADER_SIZE + size);
                true
            }
            None => false,
        }
    }
}

/// Queue ends owned by the audio thread.
pub struct AudioEndpoint {
    pub controls_in: ControlReceiver,
    pub controls_out: ControlSender,
    pub events_in: EventReceiver,
    pub events_out: EventSender,
}

/// Queue ends owned by the control thread.
pub struct ControlEndpoint {
    pub controls_in: ControlReceiver,
    pub controls_out: ControlSender,
    pub events_in: EventReceiver,
    pub events_out: EventSender,
}

/// Build both channels, sized from `config` and the plugin's control count.
pub fn channel_pair(config: &WrapperConfig, n_controls: usize) -> (AudioEndpoint, ControlEndpoint) {
    let control_capacity = config.control_queue_capacity(n_controls);
    let event_capacity = config.event_queue_capacity();

    let (ui_ctrl_tx, dsp_ctrl_rx) = byte_queue(control_capacity);
    let (dsp_ctrl_tx, ui_ctrl_rx) = byte_queue(control_capacity);
    let (ui_event_tx, dsp_event_rx) = byte_queue(event_capacity);
    let (dsp_event_tx, ui_event_rx) = byte_queue(event_capacity);

    tracing::debug!(control_capacity, event_capacity, "allocated channel pair");

    (
        AudioEndpoint {
            controls_in: ControlReceiver { queue: dsp_ctrl_rx },
            controls_out: ControlSender { queue: dsp_ctrl_tx },
            events_in: EventReceiver { queue: dsp_event_rx },
            events_out: EventSender { queue: dsp_event_tx },
        },
        ControlEndpoint {
            controls_in: ControlReceiver { queue: ui_ctrl_rx },
            controls_out: ControlSender { queue: ui_ctrl_tx },
            events_in: EventReceiver { queue: ui_event_rx },
            events_out: EventSender { queue: ui_event_tx },
        },
    )
}

/// A lone event channel of `capacity` bytes.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = byte_queue(capacity);
    (EventSender { queue: tx }, EventReceiver { queue: rx })
}

/// A lone control channel of `capacity` bytes.
pub fn control_channel(capacity: usize) -> (ControlSender, ControlReceiver) {
    let (tx, rx) = byte_queue(capacity);
    (ControlSender { queue: tx }, ControlReceiver { queue: rx })
}
