//! Well-known edit rate constants.
//!
//! Avoid hand-typed rationals, enable IDE autocomplete.
//! Usage: `Track::new(1, MediaKind::Picture, RATE_NTSC, segment)`

use crate::rate::EditRate;

// === Picture rates ===
/// Film, 24 fps
pub const RATE_FILM: EditRate = EditRate::new(24, 1);
/// PAL video, 25 fps
pub const RATE_PAL: EditRate = EditRate::new(25, 1);
/// NTSC video, 30000/1001 fps (29.97)
pub const RATE_NTSC: EditRate = EditRate::new(30_000, 1001);
/// Whole-frame NTSC counting, 30 fps (timecode math)
pub const RATE_NTSC_WHOLE: EditRate = EditRate::new(30, 1);

// === Sound rates ===
/// Professional audio, 48 kHz
pub const RATE_AUDIO_48K: EditRate = EditRate::new(48_000, 1);
