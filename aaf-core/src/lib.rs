//! aaf-core
//!
//! This crate implements the core of the SENS fixer: walking the AAF audio
//! container (chunk directory, then IBNK instrument banks, then each bank's
//! instrument slot table down to the SENS envelope records), fingerprinting
//! byte-swapped float fields, and rewriting them in place.
//!
//! The CLI crate owns everything user-facing (argument handling, the report,
//! confirmation, colors); this crate only takes an open stream and hands
//! back findings.

#![allow(clippy::uninlined_format_args)]

pub mod chunk;
pub mod cursor;
pub mod ibnk;
pub mod patch;
pub mod sens;

use std::io::{Read, Seek};

use anyhow::Result;

use cursor::ByteCursor;
use sens::SensRecord;

/// First 8 bytes of an unmodified Pikmin 2 AAF: a chunk-1 tag followed by
/// the known offset word `0xe8`, i.e. the two leading big-endian u32 words
/// composed low-word-first equal `0xe8_0000_0001`.
pub const AAF_MAGIC: u64 = 0xe8_0000_0001;

/// Check the container magic. Leaves the cursor rewound to offset 0.
pub fn check_magic<S: Read + Seek>(cur: &mut ByteCursor<S>) -> Result<bool> {
    cur.seek(0)?;
    let lo = cur.read_u32()? as u64;
    let hi = cur.read_u32()? as u64;
    cur.seek(0)?;
    Ok((hi << 32 | lo) == AAF_MAGIC)
}

/// Scan the whole container: every bank in directory order, every collected
/// SENS reference in scan order. Any format anomaly aborts the scan with an
/// error; there are no partial results.
pub fn scan<S: Read + Seek>(cur: &mut ByteCursor<S>) -> Result<Vec<SensRecord>> {
    cur.seek(0)?;
    let ibnk_offsets = chunk::collect_ibnk_offsets(cur)?;
    log::debug!("{} IBNK found", ibnk_offsets.len());

    let mut all_refs = Vec::new();
    for &offset in &ibnk_offsets {
        all_refs.extend(ibnk::collect_sens_refs(cur, offset)?);
    }
    cur.clear_base();

    let mut records = Vec::with_capacity(all_refs.len());
    for sens in all_refs {
        records.push(sens::inspect(cur, sens)?);
    }
    Ok(records)
}
