//! Fixed-width field helpers
//!
//! CMPP string fields are left-justified and zero padded on the right. They
//! are never NUL-terminated inside the field.

use super::{Error, Result};

/// Left-justify `value` in an `N`-byte field, zero padding the remainder.
///
/// Values longer than the field are rejected rather than truncated.
pub fn pad_to<const N: usize>(field: &'static str, value: &[u8]) -> Result<[u8; N]> {
    if value.len() > N {
        return Err(Error::FieldTooLong {
            field,
            len: value.len(),
            max: N,
        });
    }
    let mut out = [0u8; N];
    out[..value.len()].copy_from_slice(value);
    Ok(out)
}

/// Strip the zero padding from the end of a fixed-width field.
#[must_use]
pub fn trim_trailing_zeros(field: &[u8]) -> &[u8] {
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |idx| idx + 1);
    &field[..end]
}
