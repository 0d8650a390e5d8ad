//! Mob store: the registry source chains are resolved against.
//!
//! Every inter-mob reference ([`SourceRef`](super::SourceRef)) is looked up
//! here by id. The store is the unit of serialization: interchange files are
//! saved and loaded via [`MobStore::to_json`] / [`MobStore::from_json`],
//! preserving mob order.
//!
//! ## Revisions
//!
//! Current-revision files address tracks by their stored id. Legacy files
//! predate stored ids and address tracks positionally, counting from 1;
//! [`MobStore::resolve_track`] hides the difference.
//!
//! ## Semantic checking
//!
//! Sequence scanning normally rejects malformed layouts (adjacent
//! transitions, leading transitions). Legacy track groups routinely contain
//! such layouts, so resolution pauses checking while inside one via
//! [`MobStore::pause_checking`]; the guard restores the previous state on
//! drop and nests safely.

use std::cell::Cell;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::component::{ComponentKind, MediaGroup};
use super::mob::{Mob, MobId};
use super::track::{Track, TrackId};
use crate::error::{ChainError, ChainResult};

/// Track addressing convention of an interchange file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Revision {
    /// Tracks addressed by stored id.
    #[default]
    Current,
    /// Tracks addressed positionally, counting from 1.
    Legacy,
}

/// What a caller wants optimized when picking among media renditions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCriteria {
    #[default]
    Any,
    FastestAccess,
    BestFidelity,
    SmallestFootprint,
}

/// Picks one rendition out of a media group.
pub trait MediaSelector: fmt::Debug + Send + Sync {
    fn choose<'a>(
        &self,
        group: &'a MediaGroup,
        criteria: MediaCriteria,
    ) -> ChainResult<&'a ComponentKind>;
}

/// Default selector: the first listed choice, whatever the criteria.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstChoiceSelector;

impl MediaSelector for FirstChoiceSelector {
    fn choose<'a>(
        &self,
        group: &'a MediaGroup,
        _criteria: MediaCriteria,
    ) -> ChainResult<&'a ComponentKind> {
        group
            .choices
            .first()
            .ok_or(ChainError::not_possible("media group has no choices"))
    }
}

/// All mobs of an interchange file, keyed by id in file order.
#[derive(Debug, Serialize, Deserialize)]
pub struct MobStore {
    pub mobs: IndexMap<MobId, Mob>,

    #[serde(default)]
    pub revision: Revision,

    /// Semantic checking toggle (runtime-only, see module docs)
    #[serde(skip)]
    #[serde(default = "MobStore::default_checking")]
    checking: Cell<bool>,

    /// Rendition picker for media groups (runtime-only)
    #[serde(skip)]
    #[serde(default = "MobStore::default_selector")]
    selector: Box<dyn MediaSelector>,
}

impl Default for MobStore {
    fn default() -> Self {
        Self {
            mobs: IndexMap::new(),
            revision: Revision::default(),
            checking: Self::default_checking(),
            selector: Self::default_selector(),
        }
    }
}

impl MobStore {
    fn default_checking() -> Cell<bool> {
        Cell::new(true)
    }

    fn default_selector() -> Box<dyn MediaSelector> {
        Box::new(FirstChoiceSelector)
    }

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.revision = revision;
        self
    }

    /// Insert a mob, returning its id.
    pub fn add(&mut self, mob: Mob) -> MobId {
        let id = mob.id;
        self.mobs.insert(id, mob);
        id
    }

    pub fn get(&self, id: MobId) -> Option<&Mob> {
        self.mobs.get(&id)
    }

    pub fn get_mut(&mut self, id: MobId) -> Option<&mut Mob> {
        self.mobs.get_mut(&id)
    }

    pub fn remove(&mut self, id: MobId) -> Option<Mob> {
        self.mobs.shift_remove(&id)
    }

    pub fn contains(&self, id: MobId) -> bool {
        self.mobs.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.mobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mob> {
        self.mobs.values()
    }

    /// Mob ids in file order.
    pub fn mob_ids(&self) -> impl Iterator<Item = MobId> + '_ {
        self.mobs.keys().copied()
    }

    /// Find a track under this store's revision convention.
    pub fn resolve_track<'a>(&self, mob: &'a Mob, track_id: TrackId) -> ChainResult<&'a Track> {
        let found = match self.revision {
            Revision::Current => mob.track(track_id),
            // positional, 1-based: track_id 0 never resolves
            Revision::Legacy => (track_id > 0)
                .then(|| mob.tracks.get(track_id as usize - 1))
                .flatten(),
        };
        found.ok_or(ChainError::TrackNotFound {
            mob_id: mob.id,
            track_id,
        })
    }

    // === Semantic checking ===

    pub fn checking_enabled(&self) -> bool {
        self.checking.get()
    }

    pub fn set_checking(&self, enabled: bool) {
        self.checking.set(enabled);
    }

    /// Pause semantic checking until the returned guard drops.
    pub fn pause_checking(&self) -> CheckingGuard<'_> {
        let prev = self.checking.replace(false);
        CheckingGuard { store: self, prev }
    }

    // === Media selection ===

    pub fn set_media_selector(&mut self, selector: Box<dyn MediaSelector>) {
        self.selector = selector;
    }

    pub fn media_selector(&self) -> &dyn MediaSelector {
        self.selector.as_ref()
    }

    // === Serialization ===

    /// Serialize the store to pretty JSON.
    pub fn to_json(&self) -> ChainResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a store from JSON; runtime-only state comes back at defaults.
    pub fn from_json(json: &str) -> ChainResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Restores the previous checking state on drop.
#[derive(Debug)]
pub struct CheckingGuard<'a> {
    store: &'a MobStore,
    prev: bool,
}

impl Drop for CheckingGuard<'_> {
    fn drop(&mut self) {
        self.store.checking.set(self.prev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::component::SourceClip;
    use crate::entities::track::MediaKind;
    use crate::rate::EditRate;

    fn mob_with_tracks() -> Mob {
        Mob::master("m")
            .with_track(Track::new(
                7,
                MediaKind::Picture,
                EditRate::new(25, 1),
                SourceClip::null(10),
            ))
            .with_track(Track::new(
                8,
                MediaKind::Sound,
                EditRate::new(48_000, 1),
                SourceClip::null(19_200),
            ))
    }

    #[test]
    fn test_add_get_remove() {
        let mut store = MobStore::new();
        let id = store.add(mob_with_tracks());
        assert!(store.contains(id));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().name.as_deref(), Some("m"));
        store.remove(id);
        assert!(store.is_empty());
    }

    #[test]
    fn test_resolve_track_by_revision() {
        let mob = mob_with_tracks();
        let current = MobStore::new();
        assert_eq!(current.resolve_track(&mob, 8).unwrap().id, 8);
        assert!(current.resolve_track(&mob, 1).is_err());

        let legacy = MobStore::new().with_revision(Revision::Legacy);
        // positional: 1 -> first track (stored id 7)
        assert_eq!(legacy.resolve_track(&mob, 1).unwrap().id, 7);
        assert_eq!(legacy.resolve_track(&mob, 2).unwrap().id, 8);
        assert!(matches!(
            legacy.resolve_track(&mob, 0),
            Err(ChainError::TrackNotFound { track_id: 0, .. })
        ));
    }

    #[test]
    fn test_pause_checking_nests_and_restores() {
        let store = MobStore::new();
        assert!(store.checking_enabled());
        {
            let _outer = store.pause_checking();
            assert!(!store.checking_enabled());
            {
                let _inner = store.pause_checking();
                assert!(!store.checking_enabled());
            }
            // inner guard must not re-enable early
            assert!(!store.checking_enabled());
        }
        assert!(store.checking_enabled());
    }

    #[test]
    fn test_json_round_trip_preserves_order() {
        let mut store = MobStore::new().with_revision(Revision::Legacy);
        let a = store.add(Mob::composition("a"));
        let b = store.add(Mob::master("b"));
        let json = store.to_json().unwrap();

        let back = MobStore::from_json(&json).unwrap();
        assert_eq!(back.revision, Revision::Legacy);
        let ids: Vec<_> = back.mob_ids().collect();
        assert_eq!(ids, vec![a, b]);
        // runtime-only state comes back at defaults
        assert!(back.checking_enabled());
    }

    #[test]
    fn test_default_selector_takes_first_choice() {
        let store = MobStore::new();
        let group = MediaGroup::new(vec![
            SourceClip::null(5).into(),
            SourceClip::null(5).into(),
        ]);
        let picked = store
            .media_selector()
            .choose(&group, MediaCriteria::BestFidelity)
            .unwrap();
        assert_eq!(picked, &group.choices[0]);

        let empty = MediaGroup::default();
        assert!(store
            .media_selector()
            .choose(&empty, MediaCriteria::Any)
            .is_err());
    }
}
