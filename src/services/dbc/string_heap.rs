//! String heap access and construction.

use std::borrow::Cow;
use std::collections::HashMap;

/// Bytes at `offset` up to the first NUL (or the end of the heap).
///
/// Out-of-range offsets yield an empty slice. No UTF-8 validation is done.
pub fn read_bytes(heap: &[u8], offset: u32) -> &[u8] {
    let start = offset as usize;
    if start >= heap.len() {
        return &[];
    }
    let tail = &heap[start..];
    let end = tail.iter().position(|b| *b == 0).unwrap_or(tail.len());
    &tail[..end]
}

/// Lossy UTF-8 view of the string at `offset`.
pub fn read_string(heap: &[u8], offset: u32) -> Cow<'_, str> {
    String::from_utf8_lossy(read_bytes(heap, offset))
}

/// Interning builder for a fresh string heap.
///
/// Offset 0 is always the empty string; identical strings share one offset.
#[derive(Debug, Clone)]
pub struct StringHeapBuilder {
    bytes: Vec<u8>,
    offsets: HashMap<Vec<u8>, u32>,
}

impl Default for StringHeapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StringHeapBuilder {
    pub fn new() -> Self {
        Self {
            bytes: vec![0],
            offsets: HashMap::new(),
        }
    }

    pub fn intern(&mut self, value: &[u8]) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(offset) = self.offsets.get(value) {
            return *offset;
        }
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(value);
        self.bytes.push(0);
        self.offsets.insert(value.to_vec(), offset);
        offset
    }

    pub fn intern_str(&mut self, value: &str) -> u32 {
        self.intern(value.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.len() <= 1
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
