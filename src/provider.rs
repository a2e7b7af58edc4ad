use crate::clip::{Clip, ClipHandle, ClipId, ClipLoader};
use crate::error::ClipError;
use crate::source::ClipSource;

/// Hands out loaded clips by source index and takes them back when the deck
/// is done with them.
pub trait ClipProvider {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity of the instance `acquire(index)` would hand out, when the
    /// provider reuses instances. `None` means every acquire is a fresh load.
    fn identity_of(&self, index: usize) -> Option<ClipId>;

    fn acquire(&mut self, index: usize) -> Result<ClipHandle, ClipError>;

    /// Take a clip back. The handle must not be used afterwards.
    fn release(&mut self, handle: ClipHandle);
}

/// Loads a fresh clip for every selection and closes it on release.
pub struct OnDemandProvider<L: ClipLoader> {
    source: ClipSource,
    loader: L,
    next_id: u64,
}

impl<L: ClipLoader> OnDemandProvider<L> {
    pub fn new(source: ClipSource, loader: L) -> Self {
        Self {
            source,
            loader,
            next_id: 0,
        }
    }

    pub fn source(&self) -> &ClipSource {
        &self.source
    }
}

impl<L: ClipLoader> ClipProvider for OnDemandProvider<L> {
    fn len(&self) -> usize {
        self.source.len()
    }

    fn identity_of(&self, _index: usize) -> Option<ClipId> {
        None
    }

    fn acquire(&mut self, index: usize) -> Result<ClipHandle, ClipError> {
        let path = self.source.path(index).ok_or(ClipError::OutOfRange {
            index,
            len: self.source.len(),
        })?;
        tracing::debug!(index, path = %path.display(), "loading clip");
        let mut clip = self.loader.load(path)?;
        clip.set_paused(true);
        let id = ClipId(self.next_id);
        self.next_id += 1;
        Ok(ClipHandle::new(id, index, clip))
    }

    fn release(&mut self, handle: ClipHandle) {
        tracing::debug!(id = handle.id().0, index = handle.source_index(), "closing clip");
        let mut clip = handle.into_clip();
        clip.close();
    }
}

enum Slot {
    Parked(Box<dyn Clip>),
    OnDeck,
    Failed,
}

/// Loads every clip up front and recycles the same instances.
///
/// Released clips are rewound and paused for their next turn in the shuffle.
pub struct PoolProvider {
    slots: Vec<Slot>,
}

impl PoolProvider {
    pub fn preload(source: &ClipSource, loader: &mut dyn ClipLoader) -> Self {
        tracing::info!(count = source.len(), "preloading clips");
        let mut slots = Vec::with_capacity(source.len());
        for path in source.paths() {
            tracing::debug!(path = %path.display(), "loading clip");
            let slot = match loader.load(path) {
                Ok(mut clip) => {
                    clip.set_paused(true);
                    Slot::Parked(clip)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "clip failed to preload");
                    Slot::Failed
                }
            };
            slots.push(slot);
        }
        tracing::info!("preload done");
        Self { slots }
    }

    pub fn from_clips(clips: Vec<Box<dyn Clip>>) -> Self {
        Self {
            slots: clips.into_iter().map(Slot::Parked).collect(),
        }
    }

    pub fn parked(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Parked(_)))
            .count()
    }
}

impl ClipProvider for PoolProvider {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn identity_of(&self, index: usize) -> Option<ClipId> {
        (index < self.slots.len()).then_some(ClipId(index as u64))
    }

    fn acquire(&mut self, index: usize) -> Result<ClipHandle, ClipError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ClipError::OutOfRange { index, len })?;
        match std::mem::replace(slot, Slot::OnDeck) {
            Slot::Parked(clip) => Ok(ClipHandle::new(ClipId(index as u64), index, clip)),
            Slot::OnDeck => Err(ClipError::InUse(index)),
            Slot::Failed => {
                *slot = Slot::Failed;
                Err(ClipError::Unavailable(index))
            }
        }
    }

    fn release(&mut self, handle: ClipHandle) {
        let index = handle.source_index();
        let mut clip = handle.into_clip();
        clip.set_position(0.0);
        clip.set_paused(true);
        match self.slots.get_mut(index) {
            Some(slot) => *slot = Slot::Parked(clip),
            None => clip.close(),
        }
    }
}

impl Drop for PoolProvider {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            if let Slot::Parked(clip) = slot {
                clip.close();
            }
        }
    }
}

impl<P: ClipProvider + ?Sized> ClipProvider for Box<P> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn identity_of(&self, index: usize) -> Option<ClipId> {
        (**self).identity_of(index)
    }

    fn acquire(&mut self, index: usize) -> Result<ClipHandle, ClipError> {
        (**self).acquire(index)
    }

    fn release(&mut self, handle: ClipHandle) {
        (**self).release(handle)
    }
}
