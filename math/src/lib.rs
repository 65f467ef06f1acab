use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign};

/// 192-bit unsigned integer stored as 3 little-endian u64 limbs.
/// Used as the accumulated blue work of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[derive(Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Uint192([u64; 3]);

impl Uint192 {
    pub const ZERO: Self = Self([0; 3]);
    pub const MAX: Self = Self([u64::MAX; 3]);

    pub const fn from_u64_limbs(limbs: [u64; 3]) -> Self {
        Self(limbs)
    }

    pub const fn limbs(&self) -> [u64; 3] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 3]
    }

    /// Returns little-endian bytes (24 bytes)
    pub fn to_le_bytes(&self) -> [u8; 24] {
        let mut out = [0u8; 24];
        for (chunk, limb) in out.chunks_exact_mut(8).zip(self.0) {
            chunk.copy_from_slice(&limb.to_le_bytes());
        }
        out
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let mut out = [0u64; 3];
        let mut carry = false;
        for (i, slot) in out.iter_mut().enumerate() {
            let (sum, c1) = self.0[i].overflowing_add(rhs.0[i]);
            let (sum, c2) = sum.overflowing_add(carry as u64);
            *slot = sum;
            carry = c1 || c2;
        }
        (!carry).then_some(Self(out))
    }

    /// Adds, clamping at [`Uint192::MAX`]
    pub fn saturating_add(self, rhs: Self) -> Self {
        self.checked_add(rhs).unwrap_or(Self::MAX)
    }
}

impl From<u64> for Uint192 {
    fn from(v: u64) -> Self {
        Self([v, 0, 0])
    }
}

impl Ord for Uint192 {
    fn cmp(&self, other: &Self) -> Ordering {
        // Most significant limb first
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for Uint192 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AddAssign for Uint192 {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.saturating_add(rhs);
    }
}

impl Add for Uint192 {
    type Output = Uint192;

    fn add(self, rhs: Self) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl fmt::Display for Uint192 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.to_le_bytes().iter().rev() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
