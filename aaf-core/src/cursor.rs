//! Positioned, seekable access to a container file.
//!
//! The AAF container is a big-endian (GameCube-era) format, so the standard
//! accessors decode big-endian. The `_le` accessors exist for the patch step,
//! which has to reinterpret fields under the byte order of the x86 tooling
//! that corrupted them.
//!
//! Nested structures address their interiors with base-relative offsets, so
//! the cursor carries an explicit stack of absolute base offsets: `seek` and
//! `rel_to_abs` always resolve against the top of that stack. The bottom
//! entry is 0 and can never be popped, which makes `seek` absolute whenever
//! no base is in effect.

use std::io::{Read, Seek, SeekFrom, Write};

use anyhow::Result;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

#[derive(Debug)]
pub struct ByteCursor<S> {
    stream: S,
    bases: Vec<u64>,
}

impl<S> ByteCursor<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            bases: vec![0],
        }
    }

    /// Consume the cursor and hand back the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Current base offset (top of the base stack).
    pub fn base(&self) -> u64 {
        *self.bases.last().unwrap_or(&0)
    }

    /// Replace the current base with a new absolute offset.
    pub fn set_base(&mut self, abs: u64) {
        if let Some(top) = self.bases.last_mut() {
            *top = abs;
        }
    }

    /// Duplicate the current base so it can be restored with [`pop_base`].
    ///
    /// [`pop_base`]: ByteCursor::pop_base
    pub fn push_base(&mut self) {
        self.bases.push(self.base());
    }

    /// Restore the previously pushed base. The bottom entry stays put.
    pub fn pop_base(&mut self) {
        if self.bases.len() > 1 {
            self.bases.pop();
        }
    }

    /// Drop every pushed base and reset the bottom entry to 0.
    pub fn clear_base(&mut self) {
        self.bases.truncate(1);
        self.bases[0] = 0;
    }

    /// Resolve a structure-relative offset against the current base.
    pub fn rel_to_abs(&self, offset: i32) -> u64 {
        (self.base() as i64 + offset as i64) as u64
    }
}

impl<S: Seek> ByteCursor<S> {
    /// Seek to `offset` relative to the current base.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.stream.seek(SeekFrom::Start(self.base() + offset))?;
        Ok(())
    }

    /// Advance the position by `n` bytes.
    pub fn skip(&mut self, n: i64) -> Result<()> {
        self.stream.seek(SeekFrom::Current(n))?;
        Ok(())
    }

    /// Absolute position in the underlying stream.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.stream.stream_position()?)
    }
}

impl<S: Read> ByteCursor<S> {
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.stream.read_u32::<BigEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.stream.read_i32::<BigEndian>()?)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(self.stream.read_u64::<BigEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.stream.read_f32::<BigEndian>()?)
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(self.stream.read_u32::<LittleEndian>()?)
    }

    pub fn read_f32_le(&mut self) -> Result<f32> {
        Ok(self.stream.read_f32::<LittleEndian>()?)
    }

    /// Read exactly `n` bytes; fails with an I/O error at end of file.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl<S: Write> ByteCursor<S> {
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.stream.write_u32::<BigEndian>(value)?;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.stream.write_f32::<BigEndian>(value)?;
        Ok(())
    }

    /// Flush pending writes so a subsequent read observes them.
    pub fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }
}
