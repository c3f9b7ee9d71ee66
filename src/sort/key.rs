/// Order-preserving u64 key encoding for the sort subsystem.
///
/// The radix sort works on plain u64 keys whose unsigned order equals the
/// desired row order. Floats and short byte strings both map into that
/// space; direction is folded in by masking at construction time so the
/// sort itself only ever runs ascending.

/// Convert a finite f64 to a u64 whose unsigned ordering matches float
/// ordering: positive values get the sign bit flipped, negative values
/// get all bits flipped. This enables branchless u64::cmp instead of
/// f64::partial_cmp. NaN must never reach this function — callers detect
/// NaN up front and divert those rows to byte comparison.
#[inline]
pub fn encode_f64(f: f64) -> u64 {
    debug_assert!(!f.is_nan());
    let bits = f.to_bits();
    if (bits >> 63) == 0 {
        bits ^ 0x8000_0000_0000_0000
    } else {
        !bits
    }
}

/// Exact inverse of `encode_f64` for all finite non-NaN inputs.
#[inline]
pub fn decode_f64(k: u64) -> f64 {
    if (k >> 63) == 1 {
        f64::from_bits(k ^ 0x8000_0000_0000_0000)
    } else {
        f64::from_bits(!k)
    }
}

/// Pack the first up to eight bytes of a field big-endian into a u64,
/// zero-padded on the right. Big-endian byte order makes u64 comparison
/// match lexicographic order for the covered prefix; ties past the eighth
/// byte are resolved by the comparison path via the full field slice.
#[inline]
pub fn encode_prefix(bytes: &[u8]) -> u64 {
    let len = bytes.len();
    if len >= 8 {
        // Unaligned u64 load + bswap: single instruction on x86_64.
        // SAFETY: len >= 8 guarantees 8 readable bytes.
        u64::from_be_bytes(unsafe { *(bytes.as_ptr() as *const [u8; 8]) })
    } else {
        let mut buf = [0u8; 8];
        buf[..len].copy_from_slice(bytes);
        u64::from_be_bytes(buf)
    }
}

/// XOR mask applied to keys of descending sorts. Flipping every bit
/// reverses unsigned order, so the sort core stays ascending-only.
pub const DESC_MASK: u64 = !0u64;

/// Build the radix key for a sort field: the float encoding when the
/// field parsed as a number (`numeric` is the parsed value, NaN when the
/// parse failed), the big-endian prefix otherwise, masked for direction.
#[inline]
pub fn radix_key(field: &[u8], numeric: f64, descending: bool) -> u64 {
    let key = if numeric.is_nan() {
        encode_prefix(field)
    } else {
        encode_f64(numeric)
    };
    if descending { key ^ DESC_MASK } else { key }
}
