//! LV2 atom sequences.
//!
//! Bit-exact with the C layout, native endian:
//!
//! ```text
//! LV2_Atom_Sequence   { atom: { size: u32, type: u32 }, body: { unit: u32, pad: u32 } }
//! LV2_Atom_Event      { frames: i64, body: { size: u32, type: u32 } }, payload, pad to 8
//! LV2_Atom_Object     { atom: { size, type }, body: { id: u32, otype: u32 } }, properties
//! LV2_Atom_Property   { key: u32, context: u32, value: { size, type } }, payload, pad to 8
//! ```
//!
//! `atom.size` of a sequence counts the 8-byte body header plus all padded
//! events. Every append checks the padded record size against what is left
//! and either writes the whole record or nothing.

use lv2_raw::{
    lv2_atom_pad_size, LV2Atom, LV2AtomEvent, LV2AtomObjectBody, LV2AtomPropertyBody,
    LV2AtomSequence, LV2AtomSequenceBody,
};
use std::ffi::c_void;
use std::mem::size_of;

/// `LV2_Atom` header: size + type.
pub const ATOM_HEADER_SIZE: usize = size_of::<LV2Atom>();
/// Atom header plus `LV2_Atom_Sequence_Body`.
pub const SEQUENCE_HEADER_SIZE: usize = size_of::<LV2AtomSequence>();
/// `LV2_Atom_Event` header: time stamp plus atom header.
pub const EVENT_HEADER_SIZE: usize = size_of::<LV2AtomEvent>();
/// `atom.size` of a sequence holding no events.
pub const EMPTY_SEQUENCE_SIZE: u32 = size_of::<LV2AtomSequenceBody>() as u32;
const OBJECT_BODY_SIZE: usize = size_of::<LV2AtomObjectBody>();
const PROPERTY_HEADER_SIZE: usize = size_of::<LV2AtomPropertyBody>();

/// Round `size` up to the 8-byte atom alignment.
#[inline]
pub fn pad_size(size: usize) -> usize {
    match u32::try_from(size) {
        Ok(size) if size <= u32::MAX - 7 => lv2_atom_pad_size(size) as usize,
        _ => usize::MAX,
    }
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    u32::from_ne_bytes(raw)
}

#[inline]
fn read_i64(bytes: &[u8], at: usize) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    i64::from_ne_bytes(raw)
}

#[inline]
fn write_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_ne_bytes());
}

#[inline]
fn write_i64(bytes: &mut [u8], at: usize, value: i64) {
    bytes[at..at + 8].copy_from_slice(&value.to_ne_bytes());
}

/// Fixed-capacity, 8-byte aligned buffer holding one atom sequence.
///
/// This is the memory a plugin's event port is connected to. It is allocated
/// once; every operation after construction is allocation-free.
pub struct SequenceBuffer {
    words: Box<[u64]>,
}

impl SequenceBuffer {
    /// `capacity` is in bytes and is rounded up to a multiple of 8.
    pub fn new(capacity: usize) -> Self {
        let words = pad_size(capacity.max(SEQUENCE_HEADER_SIZE)) / 8;
        Self {
            words: vec![0u64; words].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.words.len() * 8
    }

    pub fn bytes(&self) -> &[u8] {
        // SAFETY: u64 storage reinterpreted as bytes; u8 has no alignment or
        // validity requirements and the length covers exactly the allocation.
        unsafe { std::slice::from_raw_parts(self.words.as_ptr().cast::<u8>(), self.capacity()) }
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        let len = self.capacity();
        // SAFETY: as in `bytes`, with exclusive access through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.words.as_mut_ptr().cast::<u8>(), len) }
    }

    /// Pointer handed to the plugin's `connect_port`.
    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        self.words.as_mut_ptr().cast()
    }

    pub fn atom_size(&self) -> u32 {
        read_u32(self.bytes(), 0)
    }

    pub fn atom_type(&self) -> u32 {
        read_u32(self.bytes(), 4)
    }

    /// Start an empty input sequence of type `sequence_type`.
    pub fn reset_sequence(&mut self, sequence_type: u32) {
        let bytes = self.bytes_mut();
        write_u32(bytes, 0, EMPTY_SEQUENCE_SIZE);
        write_u32(bytes, 4, sequence_type);
        // body.unit (frames) and body.pad
        write_u32(bytes, 8, 0);
        write_u32(bytes, 12, 0);
    }

    /// Prepare an output port: an `atom:Chunk` spanning the whole body, which
    /// the plugin overwrites with the sequence it produces.
    pub fn reset_output(&mut self, chunk_type: u32) {
        let body_capacity = (self.capacity() - ATOM_HEADER_SIZE) as u32;
        let bytes = self.bytes_mut();
        write_u32(bytes, 0, body_capacity);
        write_u32(bytes, 4, chunk_type);
    }

    /// Bytes in use, headers included.
    pub fn used(&self) -> usize {
        ATOM_HEADER_SIZE + self.atom_size() as usize
    }

    pub fn remaining(&self) -> usize {
        self.capacity().saturating_sub(self.used())
    }

    /// Append one event; `false` (and no change at all) if it does not fit.
    pub fn append_event(&mut self, frames: i64, event_type: u32, payload: &[u8]) -> bool {
        if payload.len() > self.remaining() {
            return false;
        }
        let padded = pad_size(EVENT_HEADER_SIZE + payload.len());
        if padded > self.remaining() {
            return false;
        }
        let at = self.used();
        let new_size = self.atom_size() + padded as u32;
        let bytes = self.bytes_mut();
        write_i64(bytes, at, frames);
        write_u32(bytes, at + 8, payload.len() as u32);
        write_u32(bytes, at + 12, event_type);
        let body = at + EVENT_HEADER_SIZE;
        bytes[body..body + payload.len()].copy_from_slice(payload);
        bytes[body + payload.len()..at + padded].fill(0);
        write_u32(bytes, 0, new_size);
        true
    }

    /// Append a complete atom (header + body) as one event.
    ///
    /// Malformed atoms are rejected the same way as ones that do not fit.
    pub fn append_atom(&mut self, frames: i64, atom: &[u8]) -> bool {
        match split_atom(atom) {
            Some((atom_type, body)) => self.append_event(frames, atom_type, body),
            None => false,
        }
    }

    /// The encoded sequence, if the buffer holds a well-formed one of type
    /// `sequence_type`.
    pub fn sequence(&self, sequence_type: u32) -> Option<Sequence<'_>> {
        Sequence::parse(self.bytes()).filter(|seq| seq.sequence_type() == sequence_type)
    }
}

impl std::fmt::Debug for SequenceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceBuffer")
            .field("capacity", &self.capacity())
            .field("atom_size", &self.atom_size())
            .field("atom_type", &self.atom_type())
            .finish()
    }
}

/// Split a raw atom into its type and body, checking the declared size.
pub fn split_atom(atom: &[u8]) -> Option<(u32, &[u8])> {
    if atom.len() < ATOM_HEADER_SIZE {
        return None;
    }
    let size = read_u32(atom, 0) as usize;
    let end = ATOM_HEADER_SIZE.checked_add(size)?;
    if end > atom.len() {
        return None;
    }
    Some((read_u32(atom, 4), &atom[ATOM_HEADER_SIZE..end]))
}

/// Read-only view of an encoded sequence.
#[derive(Debug, Clone, Copy)]
pub struct Sequence<'a> {
    bytes: &'a [u8],
}

impl<'a> Sequence<'a> {
    /// Validate the header and trim `bytes` to the declared size.
    pub fn parse(bytes: &'a [u8]) -> Option<Self> {
        if bytes.len() < SEQUENCE_HEADER_SIZE {
            return None;
        }
        let size = read_u32(bytes, 0);
        if size < EMPTY_SEQUENCE_SIZE {
            return None;
        }
        let end = ATOM_HEADER_SIZE.checked_add(size as usize)?;
        if end > bytes.len() {
            return None;
        }
        Some(Self {
            bytes: &bytes[..end],
        })
    }

    pub fn sequence_type(&self) -> u32 {
        read_u32(self.bytes, 4)
    }

    /// The whole sequence, headers included.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.len() == SEQUENCE_HEADER_SIZE
    }

    pub fn events(&self) -> SequenceIter<'a> {
        SequenceIter {
            body: &self.bytes[SEQUENCE_HEADER_SIZE..],
        }
    }
}

/// One record of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomEvent<'a> {
    pub frames: i64,
    pub event_type: u32,
    pub payload: &'a [u8],
    /// The event's atom, header and payload, as handed to a UI.
    pub atom: &'a [u8],
}

/// Iterator over sequence records; stops at the first truncated record.
#[derive(Debug, Clone)]
pub struct SequenceIter<'a> {
    body: &'a [u8],
}

impl<'a> Iterator for SequenceIter<'a> {
    type Item = AtomEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.body.len() < EVENT_HEADER_SIZE {
            return None;
        }
        let frames = read_i64(self.body, 0);
        let size = read_u32(self.body, 8) as usize;
        let event_type = read_u32(self.body, 12);
        let end = EVENT_HEADER_SIZE.checked_add(size)?;
        if end > self.body.len() {
            self.body = &[];
            return None;
        }
        let event = AtomEvent {
            frames,
            event_type,
            payload: &self.body[EVENT_HEADER_SIZE..end],
            atom: &self.body[EVENT_HEADER_SIZE - ATOM_HEADER_SIZE..end],
        };
        let advance = pad_size(end).min(self.body.len());
        self.body = &self.body[advance..];
        Some(event)
    }
}

/// Writes an atom object body (`{id, otype}` then properties) into a
/// caller-provided buffer.
pub struct ObjectWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
    overflow: bool,
}

impl<'a> ObjectWriter<'a> {
    pub fn new(buf: &'a mut [u8], id: u32, otype: u32) -> Self {
        let mut writer = Self {
            buf,
            len: 0,
            overflow: false,
        };
        if writer.buf.len() < OBJECT_BODY_SIZE {
            writer.overflow = true;
        } else {
            write_u32(writer.buf, 0, id);
            write_u32(writer.buf, 4, otype);
            writer.len = OBJECT_BODY_SIZE;
        }
        writer
    }

    fn property(&mut self, key: u32, value_type: u32, value: &[u8]) {
        let padded = PROPERTY_HEADER_SIZE + pad_size(value.len());
        if self.overflow || self.len + padded > self.buf.len() {
            self.overflow = true;
            return;
        }
        let at = self.len;
        let body = at + PROPERTY_HEADER_SIZE;
        write_u32(self.buf, at, key);
        write_u32(self.buf, at + 4, 0);
        write_u32(self.buf, at + 8, value.len() as u32);
        write_u32(self.buf, at + 12, value_type);
        self.buf[body..body + value.len()].copy_from_slice(value);
        self.buf[body + value.len()..at + padded].fill(0);
        self.len += padded;
    }

    pub fn long(&mut self, key: u32, long_type: u32, value: i64) {
        self.property(key, long_type, &value.to_ne_bytes());
    }

    pub fn int(&mut self, key: u32, int_type: u32, value: i32) {
        self.property(key, int_type, &value.to_ne_bytes());
    }

    pub fn float(&mut self, key: u32, float_type: u32, value: f32) {
        self.property(key, float_type, &value.to_ne_bytes());
    }

    /// Finished object body, or `None` if any property did not fit.
    pub fn finish(self) -> Option<&'a [u8]> {
        let Self { buf, len, overflow } = self;
        if overflow {
            return None;
        }
        let buf: &'a [u8] = buf;
        Some(&buf[..len])
    }
}

/// One property of an object body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property<'a> {
    pub key: u32,
    pub value_type: u32,
    pub value: &'a [u8],
}

impl Property<'_> {
    pub fn as_f32(&self) -> Option<f32> {
        let raw: [u8; 4] = self.value.try_into().ok()?;
        Some(f32::from_ne_bytes(raw))
    }

    pub fn as_i32(&self) -> Option<i32> {
        let raw: [u8; 4] = self.value.try_into().ok()?;
        Some(i32::from_ne_bytes(raw))
    }

    pub fn as_i64(&self) -> Option<i64> {
        let raw: [u8; 8] = self.value.try_into().ok()?;
        Some(i64::from_ne_bytes(raw))
    }
}

/// Otype and properties of an object body.
pub fn object_properties(body: &[u8]) -> Option<(u32, impl Iterator<Item = Property<'_>>)> {
    if body.len() < OBJECT_BODY_SIZE {
        return None;
    }
    let otype = read_u32(body, 4);
    let mut rest = &body[OBJECT_BODY_SIZE..];
    let props = std::iter::from_fn(move || {
        if rest.len() < PROPERTY_HEADER_SIZE {
            return None;
        }
        let key = read_u32(rest, 0);
        let size = read_u32(rest, 8) as usize;
        let value_type = read_u32(rest, 12);
        let end = PROPERTY_HEADER_SIZE.checked_add(size)?;
        if end > rest.len() {
            rest = &[];
            return None;
        }
        let property = Property {
            key,
            value_type,
            value: &rest[PROPERTY_HEADER_SIZE..end],
        };
        rest = &rest[pad_size(end).min(rest.len())..];
        Some(property)
    });
    Some((otype, props))
}
