// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::{marker::PhantomData, mem::size_of};

use arrow_buffer::{
    ArrowNativeType, BooleanBufferBuilder, Buffer, MutableBuffer, NullBuffer, ToByteSlice,
};

/// A growable byte buffer that supports writes at arbitrary positions.
///
/// Unlike a plain append-only builder, bytes can be written at any offset: the buffer is first
/// grown to cover the write, and any newly exposed bytes are filled with 0. Previously written
/// bytes are always preserved across growth.
///
/// `flush` hands the written prefix over as an immutable [`Buffer`] and leaves this builder empty,
/// so a flushed buffer is never mutated again.
#[derive(Debug)]
pub struct BufferBuilder {
    buffer: MutableBuffer,
}

impl Default for BufferBuilder {
    fn default() -> Self {
        Self::new(0)
    }
}

impl BufferBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: MutableBuffer::new(capacity),
        }
    }

    /// Returns the length (i.e., number of bytes) written so far, including zero-filled gaps.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the number of bytes allocated by this buffer.
    pub fn byte_length(&self) -> usize {
        self.buffer.capacity()
    }

    /// Grows this buffer to at least `len` bytes. For additional bytes, they are filled with 0. If
    /// `len` is less than the current length of this buffer, this is a no-op.
    #[inline]
    pub fn ensure_len(&mut self, len: usize) {
        if len > self.buffer.len() {
            self.buffer.resize(len, 0);
        }
    }

    /// Writes `src` starting at byte `offset`, growing the buffer if needed.
    #[inline]
    pub fn write_at(&mut self, offset: usize, src: &[u8]) {
        self.ensure_len(offset + src.len());
        self.buffer.as_slice_mut()[offset..offset + src.len()].copy_from_slice(src);
    }

    /// Appends `src` to the end of this buffer, returning the offset it was written at.
    #[inline]
    pub fn append(&mut self, src: &[u8]) -> usize {
        let offset = self.buffer.len();
        self.buffer.extend_from_slice(src);
        offset
    }

    pub fn as_slice(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Returns the first `len` bytes as an immutable buffer and resets this builder. If fewer than
    /// `len` bytes were written, the remainder is zero-filled.
    pub fn flush(&mut self, len: usize) -> Buffer {
        let mut buffer = std::mem::take(&mut self.buffer);
        if buffer.len() < len {
            buffer.resize(len, 0);
        } else {
            buffer.truncate(len);
        }
        buffer.into()
    }

    /// Drops all written bytes.
    pub fn clear(&mut self) {
        self.buffer = MutableBuffer::new(0);
    }
}

/// A [`BufferBuilder`] addressed in elements of `T` rather than bytes. Used for the offset and size
/// tables of list-view builders.
#[derive(Debug, Default)]
pub struct TypedBufferBuilder<T: ArrowNativeType> {
    inner: BufferBuilder,
    _phantom: PhantomData<T>,
}

impl<T: ArrowNativeType> TypedBufferBuilder<T> {
    pub fn new() -> Self {
        Self {
            inner: BufferBuilder::default(),
            _phantom: PhantomData,
        }
    }

    /// Number of elements covered by the buffer so far.
    pub fn len(&self) -> usize {
        self.inner.len() / size_of::<T>()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn byte_length(&self) -> usize {
        self.inner.byte_length()
    }

    /// Writes `value` at element `index`, zero-filling any gap before it.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        let width = size_of::<T>();
        self.inner.write_at(index * width, value.to_byte_slice());
    }

    /// Returns the first `len` elements as an immutable buffer and resets this builder.
    pub fn flush(&mut self, len: usize) -> Buffer {
        self.inner.flush(len * size_of::<T>())
    }

    pub fn clear(&mut self) {
        self.inner.clear()
    }
}

/// Tracks which rows of a builder are valid.
///
/// Rows can be marked in any order; marking row `i` extends the logical length to `i + 1`, and
/// any rows skipped over are null. The null count is derived from the number of valid rows seen.
#[derive(Debug)]
pub struct ValidityBuilder {
    bits: BooleanBufferBuilder,
    num_valid: usize,
}

impl Default for ValidityBuilder {
    fn default() -> Self {
        Self {
            bits: BooleanBufferBuilder::new(0),
            num_valid: 0,
        }
    }
}

impl ValidityBuilder {
    /// Logical length, i.e. one past the highest row marked so far.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.bits.len() - self.num_valid
    }

    pub fn byte_length(&self) -> usize {
        self.bits.capacity() / 8
    }

    pub fn is_valid(&self, index: usize) -> bool {
        index < self.bits.len() && self.bits.get_bit(index)
    }

    /// Marks row `index` valid or null and returns `valid`.
    pub fn set(&mut self, index: usize, valid: bool) -> bool {
        if index >= self.bits.len() {
            self.bits.resize(index + 1);
        }
        let was_valid = self.bits.get_bit(index);
        if was_valid != valid {
            self.bits.set_bit(index, valid);
            if valid {
                self.num_valid += 1;
            } else {
                self.num_valid -= 1;
            }
        }
        valid
    }

    /// Returns the validity of the first `len` rows, or `None` when none of them is null, and
    /// resets this builder.
    pub fn flush(&mut self, len: usize) -> Option<NullBuffer> {
        if self.bits.len() < len {
            self.bits.resize(len);
        }
        let has_nulls = self.null_count() > 0;
        let bits = self.bits.finish();
        self.num_valid = 0;
        has_nulls.then(|| NullBuffer::new(bits.slice(0, len)))
    }

    pub fn clear(&mut self) {
        self.bits = BooleanBufferBuilder::new(0);
        self.num_valid = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_at_zero_fills() {
        let mut buf = BufferBuilder::default();
        buf.write_at(4, b"abc");
        assert_eq!(buf.len(), 7);
        assert_eq!(buf.as_slice(), b"\0\0\0\0abc");

        // overwrite in place keeps surrounding bytes
        buf.write_at(0, b"xy");
        assert_eq!(buf.as_slice(), b"xy\0\0abc");

        let offset = buf.append(b"de");
        assert_eq!(offset, 7);
        assert_eq!(buf.as_slice(), b"xy\0\0abcde");
    }

    #[test]
    fn test_flush_resets() {
        let mut buf = BufferBuilder::default();
        buf.append(b"hello world");
        let flushed = buf.flush(5);
        assert_eq!(flushed.as_slice(), b"hello");
        assert!(buf.is_empty());

        buf.append(b"ab");
        let flushed = buf.flush(4);
        assert_eq!(flushed.as_slice(), b"ab\0\0");
    }

    #[test]
    fn test_typed_buffer() {
        let mut buf = TypedBufferBuilder::<i64>::new();
        buf.set(2, 1 << 40);
        assert_eq!(buf.len(), 3);
        buf.set(0, -1);

        let flushed = buf.flush(4);
        assert_eq!(flushed.typed_data::<i64>(), &[-1, 0, 1 << 40, 0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_validity() {
        let mut validity = ValidityBuilder::default();
        assert!(validity.set(0, true));
        assert!(!validity.set(3, false));
        assert_eq!(validity.len(), 4);
        // rows 1 and 2 were skipped and count as null
        assert_eq!(validity.null_count(), 3);

        validity.set(1, true);
        validity.set(1, true);
        assert_eq!(validity.null_count(), 2);
        validity.set(0, false);
        assert_eq!(validity.null_count(), 3);

        let nulls = validity.flush(4).unwrap();
        assert_eq!(nulls.null_count(), 3);
        assert!(nulls.is_valid(1));
        assert!(nulls.is_null(0));
        assert!(validity.is_empty());
    }

    #[test]
    fn test_validity_all_valid() {
        let mut validity = ValidityBuilder::default();
        validity.set(0, true);
        validity.set(1, true);
        assert!(validity.flush(2).is_none());
        assert_eq!(validity.null_count(), 0);
    }
}
