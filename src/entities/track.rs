//! Tracks: the externally addressable timelines of a mob.
//!
//! ## Coordinates
//!
//! Public positions on a track are origin-relative: position 0 is the
//! track's origin mark, which can sit after material that was trimmed off
//! the head. Segment coordinates start at the physical head, so resolution
//! evaluates the segment at `origin + offset`.
//!
//! ```text
//! segment:   |--- head slate ---|--- program ---|
//! origin ----------------------^
//! public 0  ==  segment coord `origin`
//! ```

use serde::{Deserialize, Serialize};

use super::component::{Component, ComponentKind};
use crate::rate::{EditRate, Length, Position};

/// Track identifier, unique within a mob.
pub type TrackId = u32;

/// What a track carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Picture,
    Sound,
    Timecode,
    Edgecode,
    Other,
}

/// One timeline of a mob.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: MediaKind,
    pub edit_rate: EditRate,
    /// Segment coordinate of public position 0.
    #[serde(default)]
    pub origin: Position,
    pub segment: ComponentKind,
}

impl Track {
    pub fn new(
        id: TrackId,
        kind: MediaKind,
        edit_rate: EditRate,
        segment: impl Into<ComponentKind>,
    ) -> Self {
        Self {
            id,
            name: None,
            kind,
            edit_rate,
            origin: 0,
            segment: segment.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_origin(mut self, origin: Position) -> Self {
        self.origin = origin;
        self
    }

    /// Segment length in this track's edit units.
    pub fn length(&self) -> Length {
        self.segment.length()
    }
}
