//! Cadence (pulldown) patterns and offset mapping.
//!
//! A cadence describes how material recorded at one frame cadence was laid
//! onto a carrier running at another: a cyclic bit mask where a set bit
//! marks a position carrying a distinct source frame and a clear bit marks
//! a repeated "extra" frame the cadence introduced.
//!
//! ```text
//! TwoThree, phase 0:   bit   1 1 0 1 0   (cycle of 5, 3 distinct, 2 extra)
//!                      pos   0 1 2 3 4 | 5 6 7 8 9 | ...
//!                      src   0 1 1 2 2 | 3 4 4 5 5 | ...
//! ```
//!
//! [`map_offset`] walks the mask cyclically starting at the pattern phase:
//! contracting counts set bits (outer position -> source frame), expanding
//! produces positions until enough set bits have been seen (source frame ->
//! outer position). Whole cycles map to whole cycles, so one 5-bit cycle
//! expands 3 source frames to 5 positions and contracts 5 positions back to
//! 3 frames.

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, ChainResult};
use crate::rate::Position;

/// Cyclic cadence mask. Bit 0 is the first position of the cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CadencePattern {
    pub mask: u32,
    pub len: u32,
    pub ones_per_cycle: u32,
}

/// Classic 2:3-class pulldown: 5 positions per cycle, 2 extra frames.
pub static TWO_THREE: CadencePattern = CadencePattern {
    mask: 0b0_1011,
    len: 5,
    ones_per_cycle: 3,
};

/// 25-position breakdown cadence: 2 extra frames per cycle.
pub static PAL_BREAKDOWN: CadencePattern = CadencePattern {
    mask: 0x00FF_EFFF, // all 25 bits set except 12 and 24
    len: 25,
    ones_per_cycle: 23,
};

/// Identity cadence.
pub static ONE_TO_ONE: CadencePattern = CadencePattern {
    mask: 0b1,
    len: 1,
    ones_per_cycle: 1,
};

/// Which cadence a map applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceKind {
    TwoThree,
    PalBreakdown,
    OneToOne,
}

impl CadenceKind {
    /// The mask table entry for this kind.
    pub fn pattern(&self) -> &'static CadencePattern {
        match self {
            Self::TwoThree => &TWO_THREE,
            Self::PalBreakdown => &PAL_BREAKDOWN,
            Self::OneToOne => &ONE_TO_ONE,
        }
    }

    /// Validate a raw interchange code.
    pub fn from_raw(code: u32) -> ChainResult<Self> {
        match code {
            0 => Ok(Self::TwoThree),
            1 => Ok(Self::PalBreakdown),
            2 => Ok(Self::OneToOne),
            _ => Err(ChainError::UnsupportedCadenceKind { code }),
        }
    }
}

/// Which way the map reads when walking the chain forward.
///
/// `Contract`: the outer track carries the cadence (more positions than
/// source frames); mapping an outer offset yields the source frame.
/// `Expand`: the outer track is the source side; mapping yields the
/// position on the cadenced carrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceDirection {
    Expand,
    Contract,
}

impl CadenceDirection {
    pub fn opposite(&self) -> Self {
        match self {
            Self::Expand => Self::Contract,
            Self::Contract => Self::Expand,
        }
    }
}

/// Set bits in the window of `count` positions starting at `phase`.
/// `count` must be within one cycle.
fn ones_in_window(p: &CadencePattern, phase: u32, count: i64) -> i64 {
    let len = p.len as i64;
    let mut ones = 0;
    for i in 0..count {
        let bit = (phase as i64 + i).rem_euclid(len) as u32;
        if p.mask & (1 << bit) != 0 {
            ones += 1;
        }
    }
    ones
}

/// Map an offset through a cadence.
///
/// `reverse` swaps the direction; it is used when a chain is walked
/// backward (e.g. computing an outer length from an inner one).
/// Negative offsets walk the cycle backward symmetrically.
pub fn map_offset(
    kind: CadenceKind,
    offset: Position,
    phase: u32,
    reverse: bool,
    direction: CadenceDirection,
) -> Position {
    let dir = if reverse { direction.opposite() } else { direction };
    let p = kind.pattern();
    let len = p.len as i64;
    let ones = p.ones_per_cycle as i64;
    match dir {
        CadenceDirection::Contract => {
            let cycles = offset.div_euclid(len);
            let rem = offset.rem_euclid(len);
            cycles * ones + ones_in_window(p, phase, rem)
        }
        CadenceDirection::Expand => {
            let cycles = offset.div_euclid(ones);
            let rem = offset.rem_euclid(ones);
            let mut walked = 0i64;
            let mut seen = 0i64;
            while seen < rem {
                let bit = (phase as i64 + walked).rem_euclid(len) as u32;
                if p.mask & (1 << bit) != 0 {
                    seen += 1;
                }
                walked += 1;
            }
            cycles * len + walked
        }
    }
}
