//! SENS envelope records and the corruption fingerprint.
//!
//! A SENS record is 16 bytes; bytes 4..12 hold two big-endian f32 parameters
//! (floor and ceiling). Upstream tooling has been observed writing those two
//! fields in its native byte order instead, which turns an ordinary value
//! into a denormal once decoded big-endian. That bit pattern is the
//! detection fingerprint: a legitimate envelope parameter is never an
//! extreme denormal.

use std::io::{Read, Seek};

use anyhow::Result;

use crate::cursor::ByteCursor;
use crate::ibnk::SensRef;

/// Length of the dump region shown for each record.
pub const SENS_DUMP_LEN: usize = 16;
/// Offset of the two float fields inside a record.
pub const SENS_FLOAT_OFFSET: u64 = 4;

/// One inspected SENS record: the raw dump bytes, decoded parameters, and
/// the corruption verdict. This is what the report renders and what the
/// patch phase consumes.
#[derive(Debug, Clone)]
pub struct SensRecord {
    pub addr: u64,
    /// How many instrument fields referenced this address (diagnostic only).
    pub refs: u32,
    pub bytes: [u8; SENS_DUMP_LEN],
    pub floor: f32,
    pub ceil: f32,
    pub corrupt: bool,
}

/// Decide whether a 32-bit field is a byte-order casualty.
///
/// `value` is the field decoded as a big-endian f32, `bits` the same field as
/// raw big-endian u32. Corrupt means: biased exponent 0 (denormal range) with
/// a nonzero decoded value of magnitude below 0.4.
pub fn is_corrupt_f32(value: f32, bits: u32) -> bool {
    let exponent = ((bits >> 23) & 0xff) as i32 - 0x7f;
    exponent == -127 && value != 0.0 && value.abs() < 0.4
}

/// Read and classify the SENS record behind one collected reference.
pub fn inspect<S: Read + Seek>(cur: &mut ByteCursor<S>, sens: SensRef) -> Result<SensRecord> {
    cur.seek(sens.addr)?;
    let dump = cur.read_bytes(SENS_DUMP_LEN)?;
    let mut bytes = [0u8; SENS_DUMP_LEN];
    bytes.copy_from_slice(&dump);

    cur.seek(sens.addr + SENS_FLOAT_OFFSET)?;
    let floor = cur.read_f32()?;
    let ceil = cur.read_f32()?;
    cur.seek(sens.addr + SENS_FLOAT_OFFSET)?;
    let floor_bits = cur.read_u32()?;
    let ceil_bits = cur.read_u32()?;

    Ok(SensRecord {
        addr: sens.addr,
        refs: sens.refs,
        bytes,
        floor,
        ceil,
        corrupt: is_corrupt_f32(floor, floor_bits) || is_corrupt_f32(ceil, ceil_bits),
    })
}
