use crate::canvas::Canvas;
use crate::error::ClipError;
use std::fmt;
use std::path::Path;

/// Playback capability for one loaded clip.
///
/// Clips never loop and never produce audio. `position` is a fraction of
/// `duration`; both may be unreliable near the end of some encodings, which is
/// why the player does not trust `is_playing` alone.
pub trait Clip {
    fn is_loaded(&self) -> bool;
    fn is_playing(&self) -> bool;
    fn set_paused(&mut self, paused: bool);
    fn is_paused(&self) -> bool;
    /// Playback position in `[0, 1]`.
    fn position(&self) -> f32;
    fn set_position(&mut self, frac: f32);
    /// Duration in seconds.
    fn duration(&self) -> f32;
    /// Advance internal playback state by `dt` seconds. Called once per tick.
    fn update(&mut self, dt: f32);
    /// Composite the current frame over the whole canvas with `alpha`.
    fn draw(&self, canvas: &mut Canvas, alpha: u8);
    /// Release decoder resources. Idempotent.
    fn close(&mut self);
}

pub trait ClipLoader {
    fn load(&mut self, path: &Path) -> Result<Box<dyn Clip>, ClipError>;
}

/// Instance identity of a loaded clip.
///
/// Pool providers reuse instances, so the id is stable per slot; on-demand
/// providers mint a fresh id for every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId(pub u64);

/// An owned, loaded clip on (or headed for) the deck.
pub struct ClipHandle {
    id: ClipId,
    source_index: usize,
    clip: Box<dyn Clip>,
}

impl ClipHandle {
    pub fn new(id: ClipId, source_index: usize, clip: Box<dyn Clip>) -> Self {
        Self {
            id,
            source_index,
            clip,
        }
    }

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn source_index(&self) -> usize {
        self.source_index
    }

    pub fn clip(&self) -> &dyn Clip {
        &*self.clip
    }

    pub fn clip_mut(&mut self) -> &mut dyn Clip {
        &mut *self.clip
    }

    /// Seconds left at the current position; non-finite if the clip reports
    /// a bogus position or duration.
    pub fn time_left(&self) -> f32 {
        self.clip.duration() * (1.0 - self.clip.position())
    }

    pub(crate) fn into_clip(self) -> Box<dyn Clip> {
        self.clip
    }
}

impl fmt::Debug for ClipHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipHandle")
            .field("id", &self.id)
            .field("source_index", &self.source_index)
            .field("position", &self.clip.position())
            .field("duration", &self.clip.duration())
            .finish()
    }
}
