//! Reposition-and-restore cursor shared by every binary decoder.
//!
//! DIVA databases store most variable-length data (names, arrays, nested
//! records) behind absolute offsets. Decoders read the offset, jump to it with
//! [`OffsetCursor::push_and_seek`], read the payload and return with
//! [`OffsetCursor::pop`]. [`OffsetCursor::with_position`] wraps that pair so the
//! saved position is restored even when the nested read fails.

use crate::Error;
use byteorder::{ByteOrder, LittleEndian};

#[derive(Clone, Debug)]
pub struct OffsetCursor<'a> {
    bytes: &'a [u8],
    position: usize,
    saved: Vec<usize>,
}

impl<'a> OffsetCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            position: 0,
            saved: Vec::new(),
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.position)
    }

    /// Number of saved positions waiting for a matching [`pop`](Self::pop).
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn is_balanced(&self) -> bool {
        self.saved.is_empty()
    }

    pub fn seek(&mut self, offset: usize) -> Result<(), Error> {
        if offset > self.bytes.len() {
            return Err(Error::SeekOutOfBounds {
                offset,
                len: self.bytes.len(),
            });
        }
        self.position = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<(), Error> {
        self.seek(self.position.saturating_add(count))
    }

    /// Advances to the next multiple of `alignment` (no-op when already aligned).
    pub fn align(&mut self, alignment: usize) -> Result<(), Error> {
        if alignment == 0 {
            return Ok(());
        }
        let rem = self.position % alignment;
        if rem != 0 {
            self.skip(alignment - rem)?;
        }
        Ok(())
    }

    /// Saves the current position and moves to `offset`.
    ///
    /// On failure nothing is pushed and the position is unchanged.
    pub fn push_and_seek(&mut self, offset: usize) -> Result<(), Error> {
        let previous = self.position;
        self.seek(offset)?;
        self.saved.push(previous);
        Ok(())
    }

    /// Restores the most recently saved position.
    pub fn pop(&mut self) -> Result<(), Error> {
        let previous = self.saved.pop().ok_or(Error::CursorUnderflow)?;
        self.position = previous;
        Ok(())
    }

    /// Runs `f` at `offset`, then restores the current position whether or not `f` succeeded.
    pub fn with_position<T>(
        &mut self,
        offset: usize,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.push_and_seek(offset)?;
        let result = f(self);
        self.pop()?;
        result
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                offset: self.position,
                needed: count,
                len: self.bytes.len(),
            });
        }
        let out = &self.bytes[self.position..self.position + count];
        self.position += count;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_i16(&mut self) -> Result<i16, Error> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_i64(&mut self) -> Result<i64, Error> {
        Ok(LittleEndian::read_i64(self.take(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, Error> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Reads a u32 and widens it for use as an offset or count.
    pub fn read_offset(&mut self) -> Result<usize, Error> {
        Ok(self.read_u32()? as usize)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], Error> {
        self.take(count)
    }

    pub fn read_vec3(&mut self) -> Result<[f32; 3], Error> {
        Ok([self.read_f32()?, self.read_f32()?, self.read_f32()?])
    }

    pub fn read_vec4(&mut self) -> Result<[f32; 4], Error> {
        Ok([
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ])
    }

    /// Resolves the null-terminated string stored at `offset`.
    ///
    /// The cursor position is the same before and after the call.
    pub fn read_string_at(&mut self, offset: usize) -> Result<String, Error> {
        read_null_terminated_string(self, offset)
    }
}

/// Scans for the terminator in one round trip, then reads the text in a second one.
pub fn read_null_terminated_string(
    cursor: &mut OffsetCursor<'_>,
    offset: usize,
) -> Result<String, Error> {
    let length = cursor.with_position(offset, |c| {
        let mut length = 0usize;
        while c.remaining() > 0 && c.read_u8()? != 0 {
            length += 1;
        }
        Ok(length)
    })?;

    let bytes = cursor.with_position(offset, |c| c.read_bytes(length))?;
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            log::warn!("string at offset {offset:#x} is not valid UTF-8 ({e}); decoding lossily");
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
