//! Arithmetic/flag unit for subtract-based compare.

/// Operand pair supplied by the host at computation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct OperandState {
    /// First operand (`AX`).
    pub operand_a: u16,
    /// Second operand (`BX`).
    pub operand_b: u16,
}

impl OperandState {
    /// Creates an operand pair.
    #[must_use]
    pub const fn new(operand_a: u16, operand_b: u16) -> Self {
        Self {
            operand_a,
            operand_b,
        }
    }
}

impl Default for OperandState {
    fn default() -> Self {
        Self::new(10, 20)
    }
}

/// Carry, zero, and sign status bits produced by a compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FlagState {
    /// Borrow needed: `a < b` unsigned.
    pub carry: bool,
    /// `a - b == 0`.
    pub zero: bool,
    /// `a - b < 0` without 16-bit wrapping.
    pub sign: bool,
}

impl FlagState {
    /// Packs the flags into their 8086 FLAGS bit positions (CF=0, ZF=6, SF=7).
    #[must_use]
    pub fn bits(self) -> u16 {
        u16::from(self.carry) | (u16::from(self.zero) << 6) | (u16::from(self.sign) << 7)
    }
}

/// Unwrapped signed difference `a - b`.
#[must_use]
pub fn difference(operand_a: u16, operand_b: u16) -> i32 {
    i32::from(operand_a) - i32::from(operand_b)
}

/// Computes the flags of `CMP a, b`.
#[must_use]
pub fn compare(operand_a: u16, operand_b: u16) -> FlagState {
    let result = difference(operand_a, operand_b);
    FlagState {
        carry: operand_a < operand_b,
        zero: result == 0,
        sign: result < 0,
    }
}
