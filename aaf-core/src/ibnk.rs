//! IBNK instrument bank walker.
//!
//! An IBNK starts with its own signature, carries a `BANK` section at +0x20,
//! and is followed immediately by a table of 240 bank-relative instrument
//! slot offsets (0 = unused slot). Each `INST` record holds, past an interior
//! region this tool does not interpret (oscillators, random effects, pitch,
//! volume), two signed bank-relative offsets to its SENS envelope records.

use std::collections::HashMap;
use std::io::{Read, Seek};

use anyhow::{bail, Result};

use crate::cursor::ByteCursor;

pub const IBNK: u32 = 0x4942_4e4b;
pub const BANK: u32 = 0x4241_4e4b;
pub const INST: u32 = 0x494e_5354;
/// Secondary instrument type; carries no SENS records we care about.
pub const PER2: u32 = 0x5045_5232;

/// Offset of the `BANK` section signature inside an IBNK.
const BANK_SECTION_OFFSET: u64 = 0x20;
/// Number of entries in the instrument slot table.
const BANK_SLOT_COUNT: usize = 0xf0;
/// Interior of an INST record between its tag and the two envelope offsets.
const INST_ENVELOPE_SKIP: i64 = 0x1c;

/// One SENS envelope record address, with the number of instrument fields
/// that pointed at it. The count is diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensRef {
    pub addr: u64,
    pub refs: u32,
}

/// Collect the SENS record addresses reachable from one bank.
///
/// Addresses are deduplicated within the bank and returned in first-seen
/// order, so the later patch phase runs in scan order. Callers concatenate
/// the result across banks without further deduplication; a SENS record
/// shared between two banks is intentionally visited once per bank.
pub fn collect_sens_refs<S: Read + Seek>(
    cur: &mut ByteCursor<S>,
    bank_offset: u32,
) -> Result<Vec<SensRef>> {
    cur.set_base(bank_offset as u64);
    cur.seek(0)?;
    let sig = cur.read_u32()?;
    if sig != IBNK {
        bail!("no IBNK signature at {:#x} (found {:#010x})", bank_offset, sig);
    }
    cur.seek(BANK_SECTION_OFFSET)?;
    let sig = cur.read_u32()?;
    if sig != BANK {
        bail!("IBNK at {:#x} is corrupted: no BANK section", bank_offset);
    }

    let mut slots = [0u32; BANK_SLOT_COUNT];
    for slot in slots.iter_mut() {
        *slot = cur.read_u32()?;
    }

    let mut refs: Vec<SensRef> = Vec::new();
    let mut index: HashMap<u64, usize> = HashMap::new();
    for &slot in slots.iter().filter(|&&s| s != 0) {
        cur.push_base();
        cur.seek(slot as u64)?;
        let tag = cur.read_u32()?;
        if tag == PER2 {
            cur.pop_base();
            continue;
        }
        if tag != INST {
            bail!(
                "unrecognized instrument type {:#010x} at {:#x}",
                tag,
                cur.position()?
            );
        }
        cur.skip(INST_ENVELOPE_SKIP)?;
        let eff1 = cur.read_i32()?;
        let eff2 = cur.read_i32()?;
        for eff in [eff1, eff2] {
            if eff <= 0 {
                continue;
            }
            let addr = cur.rel_to_abs(eff);
            match index.get(&addr) {
                Some(&i) => refs[i].refs += 1,
                None => {
                    index.insert(addr, refs.len());
                    refs.push(SensRef { addr, refs: 1 });
                }
            }
        }
        cur.pop_base();
    }

    for r in &refs {
        log::debug!("SENS {:#x} referenced {} times", r.addr, r.refs);
    }
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const BANK_BASE: u32 = 0x40;
    const SLOT_TABLE: usize = 0x24;

    fn put_u32(buf: &mut [u8], pos: usize, v: u32) {
        buf[pos..pos + 4].copy_from_slice(&v.to_be_bytes());
    }

    /// Lay out a file with one IBNK at `BANK_BASE`. `slots` holds bank-relative
    /// instrument record offsets; records are written from `records` as
    /// (bank-relative offset, tag, eff1, eff2).
    fn bank_file(slots: &[u32], records: &[(u32, u32, i32, i32)]) -> Vec<u8> {
        let mut buf = vec![0u8; 0x4000];
        let base = BANK_BASE as usize;
        put_u32(&mut buf, base, IBNK);
        put_u32(&mut buf, base + 0x20, BANK);
        for (i, &slot) in slots.iter().enumerate() {
            put_u32(&mut buf, base + SLOT_TABLE + i * 4, slot);
        }
        for &(off, tag, eff1, eff2) in records {
            let rec = base + off as usize;
            put_u32(&mut buf, rec, tag);
            put_u32(&mut buf, rec + 4 + 0x1c, eff1 as u32);
            put_u32(&mut buf, rec + 4 + 0x1c + 4, eff2 as u32);
        }
        buf
    }

    fn walk(buf: Vec<u8>) -> Result<Vec<SensRef>> {
        let mut cur = ByteCursor::new(Cursor::new(buf));
        collect_sens_refs(&mut cur, BANK_BASE)
    }

    #[test]
    fn empty_slot_table_yields_no_refs() -> Result<()> {
        assert!(walk(bank_file(&[], &[]))?.is_empty());
        Ok(())
    }

    #[test]
    fn per2_slots_are_skipped_without_error() -> Result<()> {
        let buf = bank_file(&[0x400], &[(0x400, PER2, 0x800, 0x900)]);
        assert!(walk(buf)?.is_empty());
        Ok(())
    }

    #[test]
    fn unrecognized_instrument_type_is_fatal() {
        let buf = bank_file(&[0x400], &[(0x400, 0xdead_beef, 0x800, 0x900)]);
        let err = walk(buf).unwrap_err();
        assert!(err.to_string().contains("unrecognized instrument type"));
    }

    #[test]
    fn bad_ibnk_signature_is_fatal() {
        let mut buf = bank_file(&[], &[]);
        put_u32(&mut buf, BANK_BASE as usize, 0x1234_5678);
        assert!(walk(buf).is_err());
    }

    #[test]
    fn bad_bank_section_is_fatal() {
        let mut buf = bank_file(&[], &[]);
        put_u32(&mut buf, BANK_BASE as usize + 0x20, 0x1234_5678);
        let err = walk(buf).unwrap_err();
        assert!(err.to_string().contains("corrupted"));
    }

    #[test]
    fn shared_address_is_deduplicated_with_a_count() -> Result<()> {
        // Both envelope offsets of the first instrument and one of the second
        // point at the same record.
        let buf = bank_file(
            &[0x400, 0x500],
            &[(0x400, INST, 0x800, 0x800), (0x500, INST, 0x800, 0x900)],
        );
        let refs = walk(buf)?;
        let base = BANK_BASE as u64;
        assert_eq!(
            refs,
            vec![
                SensRef { addr: base + 0x800, refs: 3 },
                SensRef { addr: base + 0x900, refs: 1 },
            ]
        );
        Ok(())
    }

    #[test]
    fn nonpositive_envelope_offsets_are_ignored() -> Result<()> {
        let buf = bank_file(&[0x400], &[(0x400, INST, 0, -0x10)]);
        assert!(walk(buf)?.is_empty());
        Ok(())
    }
}
