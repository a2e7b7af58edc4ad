use crate::clip::ClipHandle;
use crate::config::{PlayOrder, RepeatPolicy};
use crate::error::{ClipError, SelectError};
use crate::provider::ClipProvider;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectorSettings {
    pub order: PlayOrder,
    pub repeat_policy: RepeatPolicy,
    /// Loaded clips shorter than this (seconds), or with no known duration,
    /// are skipped; 0 disables.
    pub min_duration: f32,
    pub seed: Option<u64>,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            order: PlayOrder::Random,
            repeat_policy: RepeatPolicy::Identity,
            min_duration: 0.0,
            seed: None,
        }
    }
}

/// Picks the next clip to play.
pub struct Selector {
    settings: SelectorSettings,
    rng: fastrand::Rng,
    cursor: usize,
    too_short: HashSet<usize>,
    unavailable: HashSet<usize>,
    load_attempts: u64,
}

impl Selector {
    pub fn new(settings: SelectorSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            settings,
            rng,
            cursor: 0,
            too_short: HashSet::new(),
            unavailable: HashSet::new(),
            load_attempts: 0,
        }
    }

    pub fn settings(&self) -> &SelectorSettings {
        &self.settings
    }

    pub fn load_attempts(&self) -> u64 {
        self.load_attempts
    }

    /// Source indices found too short (or of unknown length) to crossfade;
    /// never drawn again.
    pub fn too_short(&self) -> &HashSet<usize> {
        &self.too_short
    }

    /// Source indices the provider has taken out of rotation for good.
    pub fn unavailable(&self) -> &HashSet<usize> {
        &self.unavailable
    }

    fn draw_index(&mut self, len: usize) -> usize {
        match self.settings.order {
            PlayOrder::Random => self.rng.usize(..len),
            PlayOrder::Sequential => {
                let index = self.cursor % len;
                self.cursor = (index + 1) % len;
                index
            }
        }
    }

    fn is_repeat(&self, provider: &dyn ClipProvider, index: usize, excluding: &ClipHandle) -> bool {
        match self.settings.repeat_policy {
            RepeatPolicy::Identity => provider.identity_of(index) == Some(excluding.id()),
            RepeatPolicy::Content => index == excluding.source_index(),
        }
    }

    /// Draw, load and start a clip that is not `excluding`.
    ///
    /// Each index is tried at most once per call. Clips that are too short or
    /// out of rotation are skipped for good; failed loads are retried on the
    /// next call. When every index has been ruled out and something is still
    /// playing, `NothingAvailable` is returned so the caller can retry later.
    /// With nothing playing yet, failed loads are redrawn until one succeeds.
    pub fn select_next(
        &mut self,
        provider: &mut dyn ClipProvider,
        excluding: Option<&ClipHandle>,
    ) -> Result<ClipHandle, SelectError> {
        let len = provider.len();
        if len == 0 {
            return Err(SelectError::Empty);
        }
        // On deck or the clip being replaced.
        let mut skipped = HashSet::new();
        let mut failed = HashSet::new();

        loop {
            if self.too_short.len() >= len {
                return Err(SelectError::AllTooShort {
                    min_secs: self.settings.min_duration,
                });
            }
            let retired = self.too_short.len() + self.unavailable.len();
            if retired >= len {
                return Err(SelectError::NothingAvailable);
            }
            if retired + skipped.len() + failed.len() >= len {
                if excluding.is_some() || !skipped.is_empty() {
                    return Err(SelectError::NothingAvailable);
                }
                tracing::warn!(attempts = self.load_attempts, "no clip could be loaded; retrying");
                failed.clear();
            }

            let index = self.draw_index(len);
            if self.too_short.contains(&index)
                || self.unavailable.contains(&index)
                || skipped.contains(&index)
                || failed.contains(&index)
            {
                continue;
            }

            let eligible = len - retired;
            if let Some(excluding) = excluding {
                if eligible > 1 && self.is_repeat(&*provider, index, excluding) {
                    tracing::trace!(index, "skipping repeat of current clip");
                    skipped.insert(index);
                    continue;
                }
            }

            self.load_attempts += 1;
            let mut handle = match provider.acquire(index) {
                Ok(h) => h,
                Err(ClipError::InUse(i)) => {
                    skipped.insert(i);
                    continue;
                }
                Err(ClipError::Unavailable(i)) => {
                    tracing::warn!(index = i, "clip out of rotation");
                    self.unavailable.insert(i);
                    continue;
                }
                Err(err) => {
                    tracing::warn!(index, error = %err, "clip failed to load; drawing again");
                    failed.insert(index);
                    continue;
                }
            };

            if !handle.clip().is_loaded() {
                tracing::warn!(index, "clip reports not loaded; drawing again");
                provider.release(handle);
                failed.insert(index);
                continue;
            }

            let duration = handle.clip().duration();
            if self.settings.min_duration > 0.0
                && !(duration.is_finite() && duration >= self.settings.min_duration)
            {
                tracing::warn!(
                    index,
                    duration,
                    min = self.settings.min_duration,
                    "clip too short to crossfade; skipping it from now on"
                );
                self.too_short.insert(index);
                provider.release(handle);
                continue;
            }

            tracing::debug!(index, id = handle.id().0, duration, "selected clip");
            let clip = handle.clip_mut();
            clip.set_paused(false);
            clip.set_position(0.0);
            return Ok(handle);
        }
    }
}
