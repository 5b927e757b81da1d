//! In-place restoration of byte-swapped SENS float fields.
//!
//! The fix deliberately mirrors the corruption instead of deriving a
//! "correct" value: the two fields at +4 are reinterpreted under the
//! alternate (little-endian) order, which recovers the value the upstream
//! tool meant to write, and rewritten big-endian. Nothing else in the
//! record is touched.

use std::io::{Read, Seek, Write};

use anyhow::{Context, Result};

use crate::cursor::ByteCursor;
use crate::sens::{SENS_DUMP_LEN, SENS_FLOAT_OFFSET};

/// Patch one flagged record and return its fresh 16-byte dump for display.
///
/// No rollback: an I/O failure here leaves the file partially patched, and
/// the caller is expected to have printed every completed record already.
pub fn patch_record<S: Read + Write + Seek>(
    cur: &mut ByteCursor<S>,
    addr: u64,
) -> Result<[u8; SENS_DUMP_LEN]> {
    cur.seek(addr + SENS_FLOAT_OFFSET)?;
    let floor = cur.read_f32_le()?;
    let ceil = cur.read_f32_le()?;

    cur.seek(addr + SENS_FLOAT_OFFSET)?;
    cur.write_f32(floor)?;
    cur.write_f32(ceil)?;
    cur.flush()
        .with_context(|| format!("flush patched SENS record at {:#x}", addr))?;

    cur.seek(addr)?;
    let dump = cur.read_bytes(SENS_DUMP_LEN)?;
    let mut bytes = [0u8; SENS_DUMP_LEN];
    bytes.copy_from_slice(&dump);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibnk::SensRef;
    use crate::sens::{inspect, is_corrupt_f32};
    use std::io::Cursor;

    fn record_with_swapped_fields(floor: f32, ceil: f32) -> Vec<u8> {
        let mut buf = vec![0u8; 0x40];
        buf[0x10..0x14].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        buf[0x14..0x18].copy_from_slice(&floor.to_le_bytes());
        buf[0x18..0x1c].copy_from_slice(&ceil.to_le_bytes());
        buf[0x1c..0x20].copy_from_slice(&[0xca, 0xfe, 0xba, 0xbe]);
        buf
    }

    #[test]
    fn patch_restores_big_endian_fields() -> Result<()> {
        let mut cur = ByteCursor::new(Cursor::new(record_with_swapped_fields(0.5, 0.125)));
        let dump = patch_record(&mut cur, 0x10)?;
        assert_eq!(&dump[4..8], &0.5f32.to_be_bytes());
        assert_eq!(&dump[8..12], &0.125f32.to_be_bytes());
        Ok(())
    }

    #[test]
    fn patch_leaves_surrounding_bytes_alone() -> Result<()> {
        let mut cur = ByteCursor::new(Cursor::new(record_with_swapped_fields(0.5, 0.125)));
        let dump = patch_record(&mut cur, 0x10)?;
        assert_eq!(&dump[..4], &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(&dump[12..16], &[0xca, 0xfe, 0xba, 0xbe]);
        Ok(())
    }

    #[test]
    fn patched_record_is_not_reflagged() -> Result<()> {
        let mut cur = ByteCursor::new(Cursor::new(record_with_swapped_fields(0.5, 0.125)));
        let before = inspect(&mut cur, SensRef { addr: 0x10, refs: 1 })?;
        assert!(before.corrupt);

        patch_record(&mut cur, 0x10)?;

        let after = inspect(&mut cur, SensRef { addr: 0x10, refs: 1 })?;
        assert!(!after.corrupt);
        assert_eq!(after.floor, 0.5);
        assert_eq!(after.ceil, 0.125);
        assert!(!is_corrupt_f32(after.floor, after.floor.to_bits()));
        Ok(())
    }
}
