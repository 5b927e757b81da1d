//! Top-level chunk directory of the AAF container.
//!
//! The directory is a sequence of 32-bit chunk tags. The tag set is closed:
//! anything outside it means the file is not the container version this
//! tooling understands, and the walk aborts rather than guessing.

use std::io::{Read, Seek};

use anyhow::{bail, Result};

use crate::cursor::ByteCursor;

/// Chunks 1/4/5/6/7 carry a single fixed-size record; chunks 2 and 3 carry a
/// null-terminated list of (offset, record) pairs. Only chunk 2's offsets
/// point at IBNK structures.
const CHUNK_RECORD_LEN: i64 = 12;

/// Walk the directory from offset 0 and collect every IBNK offset, in
/// directory order. Duplicates are preserved.
pub fn collect_ibnk_offsets<S: Read + Seek>(cur: &mut ByteCursor<S>) -> Result<Vec<u32>> {
    let mut offsets = Vec::new();
    loop {
        let tag = cur.read_u32()?;
        match tag {
            0 => break,
            1 | 4 | 5 | 6 | 7 => cur.skip(CHUNK_RECORD_LEN)?,
            3 => loop {
                let offset = cur.read_i32()?;
                if offset == 0 {
                    break;
                }
                cur.skip(CHUNK_RECORD_LEN)?;
            },
            2 => loop {
                let offset = cur.read_i32()?;
                if offset == 0 {
                    break;
                }
                offsets.push(offset as u32);
                cur.skip(CHUNK_RECORD_LEN)?;
            },
            other => bail!(
                "unexpected chunk tag {:#x} at {:#x}",
                other,
                cur.position()?
            ),
        }
    }
    Ok(offsets)
}
