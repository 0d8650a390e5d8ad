//! Rational edit rates and position arithmetic.
//!
//! Every track carries its own edit rate - a positive rational in edit
//! units per second. Chain hops convert positions between rates with an
//! explicit rounding policy:
//!
//! ```text
//! source track 30/1            target track 30000/1001
//!   position 100    --->   100 * den_src * num_dst   3_000_000
//!                          ---------------------- = --------- = 99.9001
//!                            num_src * den_dst        30_030
//!                                                       |
//!                               Floor 99 / Ceiling 100 / Nearest 100
//! ```
//!
//! ## Rounding
//!
//! - [`Rounding::Floor`] - truncate. Converting into a finer rate this picks
//!   the sample containing the instant.
//! - [`Rounding::Ceiling`] - any remainder rounds up. Converting into a
//!   coarser rate this picks the smallest span fully containing the
//!   original.
//! - [`Rounding::Nearest`] - nearest sample, exact halves toward zero.
//!   Display math.
//!
//! Rounding applies to the magnitude; the sign is reapplied afterwards, so
//! negative positions behave symmetrically.
//!
//! The intermediate product is carried in i128: |pos| up to 2^63 times two
//! i32 rate fields stays well under 127 bits, so the multiply-then-divide
//! cannot overflow.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, ChainResult};

/// Position on a track, in edit units of that track's rate.
pub type Position = i64;

/// Span length in edit units. Non-negative once resolved.
pub type Length = i64;

/// Edit rate as a rational number of edit units per second.
///
/// Arithmetic assumes both fields are positive; the decode layer owns that
/// validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditRate {
    pub num: i32,
    pub den: i32,
}

impl EditRate {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Both fields positive.
    pub fn is_valid(&self) -> bool {
        self.num > 0 && self.den > 0
    }

    /// Rate as a float, for display and logging only.
    pub fn fps(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for EditRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Rounding policy for rate conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    Floor,
    Ceiling,
    Nearest,
}

impl Rounding {
    /// Validate a raw interchange code.
    pub fn from_raw(code: u32) -> ChainResult<Self> {
        match code {
            0 => Ok(Self::Floor),
            1 => Ok(Self::Ceiling),
            2 => Ok(Self::Nearest),
            _ => Err(ChainError::InvalidRounding { code }),
        }
    }
}

/// Convert a position between edit rates.
///
/// Identity when the rates are equal (no arithmetic, no rounding).
#[inline]
pub fn convert_position(
    pos: Position,
    from: EditRate,
    to: EditRate,
    rounding: Rounding,
) -> Position {
    if from == to {
        return pos;
    }
    debug_assert!(from.is_valid() && to.is_valid(), "edit rates must be positive");
    let numer = pos as i128 * from.den as i128 * to.num as i128;
    let denom = from.num as i128 * to.den as i128;
    let neg = numer < 0;
    let mag = numer.unsigned_abs();
    let div = denom.unsigned_abs();
    let q = mag / div;
    let rem = mag % div;
    let q = match rounding {
        Rounding::Floor => q,
        Rounding::Ceiling if rem > 0 => q + 1,
        Rounding::Nearest if rem * 2 > div => q + 1,
        _ => q,
    };
    let q = q as i64;
    if neg { -q } else { q }
}

/// Convert a span length between edit rates.
///
/// Same math as [`convert_position`]; hop lengths conventionally use
/// [`Rounding::Ceiling`] so the converted span still covers the original.
#[inline]
pub fn convert_length(len: Length, from: EditRate, to: EditRate, rounding: Rounding) -> Length {
    convert_position(len, from, to, rounding)
}
