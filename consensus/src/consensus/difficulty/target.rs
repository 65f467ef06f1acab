//! Compact difficulty bits, targets and the work they represent

use consensus_core::BlueWorkType;
use primitive_types::U256;

const SIGN_BIT: u32 = 0x0080_0000;

/// Expands compact difficulty bits into a 256-bit target. Negative and
/// overflowing encodings expand to the saturated or zero value; header
/// validation rejects them before they reach here.
pub fn compact_to_target(bits: u32) -> U256 {
    let exponent = bits >> 24;
    let mantissa = U256::from(bits & 0x007f_ffff);
    if exponent <= 3 {
        mantissa >> (8 * (3 - exponent) as usize)
    } else {
        let shift = 8 * (exponent - 3) as usize;
        if shift >= 256 || (mantissa.bits() + shift) > 256 {
            return U256::MAX;
        }
        mantissa << shift
    }
}

/// Inverse of [`compact_to_target`], normalized so the sign bit is never set
pub fn target_to_compact(target: U256) -> u32 {
    let mut size = (target.bits() as u32 + 7) / 8;
    let mut mantissa = if size <= 3 {
        target.low_u32() << (8 * (3 - size))
    } else {
        (target >> (8 * (size - 3) as usize)).low_u32()
    };
    if mantissa & SIGN_BIT != 0 {
        mantissa >>= 8;
        size += 1;
    }
    (size << 24) | mantissa
}

/// Whether `bits` is an encoding a header may carry: positive, nonzero and at
/// most `max_target`
pub fn is_valid_bits(bits: u32, max_target: U256) -> bool {
    if bits & SIGN_BIT != 0 {
        return false;
    }
    let target = compact_to_target(bits);
    !target.is_zero() && target <= max_target
}

/// Expected number of hashes to find a block at `bits`: `2^256 / (target + 1)`.
/// Saturates at the top of the blue work range.
pub fn calc_work(bits: u32) -> BlueWorkType {
    let target = compact_to_target(bits);
    if target.is_zero() {
        return BlueWorkType::ZERO;
    }
    if target == U256::MAX {
        return 1u64.into();
    }
    let work = (!target / (target + U256::one())) + U256::one();
    if work.0[3] != 0 {
        return BlueWorkType::MAX;
    }
    BlueWorkType::from_u64_limbs([work.0[0], work.0[1], work.0[2]])
}
