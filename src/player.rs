use crate::canvas::Canvas;
use crate::clip::ClipHandle;
use crate::error::SelectError;
use crate::playlist::Selector;
use crate::provider::ClipProvider;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSettings {
    /// Crossfade length in seconds.
    pub fade_time: f32,
    /// Remaining time (s) and smoothed progress below which a fading clip is done.
    pub epsilon: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            fade_time: 2.0,
            epsilon: 0.001,
        }
    }
}

/// Opacity of the incoming clip: 0 when `time_left == fade_time`, 255 once
/// `time_left` reaches 0.
pub fn fade_alpha(time_left: f32, fade_time: f32) -> u8 {
    if !time_left.is_finite() || fade_time <= 0.0 {
        return 255;
    }
    let a = (1.0 - time_left / fade_time) * 255.0;
    a.clamp(0.0, 255.0) as u8
}

/// Smoothed measure of how fast remaining time is shrinking.
///
/// Some encodings stop advancing their reported position near the end while
/// still claiming to play. The first delta seeds the average, later ones are
/// blended 50/50; the detector trips once at least two deltas have been seen
/// and the average sits in `[0, epsilon)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StallDetector {
    last_time_left: Option<f32>,
    stuck_progress: Option<f32>,
    deltas: u32,
}

impl StallDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, time_left: f32, epsilon: f32) -> bool {
        if !time_left.is_finite() {
            return false;
        }
        if let Some(last) = self.last_time_left {
            let delta = last - time_left;
            self.stuck_progress = Some(match self.stuck_progress {
                None => delta,
                Some(prev) => (prev + delta) * 0.5,
            });
            self.deltas = self.deltas.saturating_add(1);
        }
        self.last_time_left = Some(time_left);
        self.is_stalled(epsilon)
    }

    pub fn is_stalled(&self, epsilon: f32) -> bool {
        self.deltas >= 2 && matches!(self.stuck_progress, Some(p) if p >= 0.0 && p < epsilon)
    }

    pub fn stuck_progress(&self) -> Option<f32> {
        self.stuck_progress
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub enum Phase {
    Single,
    Fading { next: ClipHandle },
}

/// What the last `draw` decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Steady,
    FadeStarted,
    Swapped,
    SelectFailed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerStatus {
    pub time_left: f32,
    pub position: f32,
    pub duration: f32,
    pub stuck_progress: Option<f32>,
    pub fading: bool,
    pub current_index: usize,
    pub next_index: Option<usize>,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clip #{} left {:>6.2}s pos {:.3} dur {:>6.2}s stuck ",
            self.current_index, self.time_left, self.position, self.duration
        )?;
        match self.stuck_progress {
            Some(p) => write!(f, "{p:.4}")?,
            None => f.write_str("-")?,
        }
        match self.next_index {
            Some(next) => write!(f, " fading -> #{next}"),
            None => Ok(()),
        }
    }
}

/// Two-slot playback deck: always one current clip, optionally a next one
/// fading in over it.
pub struct Player<P: ClipProvider> {
    provider: P,
    selector: Selector,
    settings: PlayerSettings,
    current: ClipHandle,
    phase: Phase,
    stall: StallDetector,
    time_left: f32,
    select_failures: u32,
}

impl<P: ClipProvider> Player<P> {
    pub fn new(
        mut provider: P,
        mut selector: Selector,
        settings: PlayerSettings,
    ) -> Result<Self, SelectError> {
        let current = selector.select_next(&mut provider, None)?;
        tracing::info!(index = current.source_index(), "starting playback");
        let time_left = current.time_left();
        Ok(Self {
            provider,
            selector,
            settings,
            current,
            phase: Phase::Single,
            stall: StallDetector::new(),
            time_left,
            select_failures: 0,
        })
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn current(&self) -> &ClipHandle {
        &self.current
    }

    pub fn next(&self) -> Option<&ClipHandle> {
        match &self.phase {
            Phase::Single => None,
            Phase::Fading { next } => Some(next),
        }
    }

    pub fn is_fading(&self) -> bool {
        matches!(self.phase, Phase::Fading { .. })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn stall(&self) -> &StallDetector {
        &self.stall
    }

    /// Remaining time of the current clip as of the last decision.
    pub fn time_left(&self) -> f32 {
        self.time_left
    }

    /// Consecutive ticks on which no next clip could be picked.
    pub fn select_failures(&self) -> u32 {
        self.select_failures
    }

    /// Opacity the next clip is drawn with, if fading.
    pub fn next_alpha(&self) -> Option<u8> {
        self.next()
            .map(|_| fade_alpha(self.time_left, self.settings.fade_time))
    }

    /// Advance playback of both slots. Must run before `draw` every tick.
    pub fn update(&mut self, dt: f32) {
        self.current.clip_mut().update(dt);
        if let Phase::Fading { next } = &mut self.phase {
            next.clip_mut().update(dt);
        }
    }

    /// Decide whether to start a fade or swap clips, based on the current
    /// clip's remaining time.
    pub fn evaluate(&mut self) -> Transition {
        let time_left = self.current.time_left();
        self.time_left = time_left;

        match self.phase {
            Phase::Fading { .. } => {
                let stalled = self.stall.observe(time_left, self.settings.epsilon);
                let finished = !self.current.clip().is_playing()
                    || !time_left.is_finite()
                    || time_left < self.settings.epsilon
                    || stalled;
                if finished {
                    self.swap();
                    return Transition::Swapped;
                }
                Transition::Steady
            }
            // A clip with no usable length is handed over right away.
            Phase::Single if time_left < self.settings.fade_time || !time_left.is_finite() => {
                match self
                    .selector
                    .select_next(&mut self.provider, Some(&self.current))
                {
                    Ok(next) => {
                        tracing::debug!(
                            from = self.current.source_index(),
                            to = next.source_index(),
                            time_left,
                            "crossfade started"
                        );
                        self.phase = Phase::Fading { next };
                        self.stall.reset();
                        self.select_failures = 0;
                        Transition::FadeStarted
                    }
                    Err(err) => {
                        self.select_failures = self.select_failures.saturating_add(1);
                        if self.select_failures == 1 {
                            tracing::warn!(error = %err, "could not pick a next clip; retrying every tick");
                        } else {
                            tracing::trace!(error = %err, failures = self.select_failures, "still no next clip");
                        }
                        Transition::SelectFailed
                    }
                }
            }
            Phase::Single => Transition::Steady,
        }
    }

    fn swap(&mut self) {
        let Phase::Fading { next } = std::mem::replace(&mut self.phase, Phase::Single) else {
            return;
        };
        let outgoing = std::mem::replace(&mut self.current, next);
        tracing::info!(
            from = outgoing.source_index(),
            to = self.current.source_index(),
            stuck = ?self.stall.stuck_progress(),
            "clip finished"
        );
        self.provider.release(outgoing);
        self.stall.reset();
        self.time_left = self.current.time_left();
    }

    /// Run the transition decision, then composite the deck onto `canvas`.
    pub fn draw(&mut self, canvas: &mut Canvas) -> Transition {
        let transition = self.evaluate();
        self.current.clip().draw(canvas, 255);
        if let Phase::Fading { next } = &self.phase {
            let alpha = fade_alpha(self.time_left, self.settings.fade_time);
            next.clip().draw(canvas, alpha);
        }
        transition
    }

    /// Soft skip: seek the current clip to just inside the fade window so the
    /// next decision starts a crossfade. Ignored while already fading.
    pub fn advance(&mut self) -> bool {
        if self.is_fading() {
            return false;
        }
        let duration = self.current.clip().duration();
        let fade = self.settings.fade_time;
        let mut target = (1.0 - fade / duration).max(0.0);
        if !target.is_finite() {
            target = 0.0;
        }
        // Rounding can leave the remaining time a hair above the fade window.
        for _ in 0..4 {
            if duration * (1.0 - target) <= fade || target >= 1.0 {
                break;
            }
            target = (target + f32::EPSILON).min(1.0);
        }
        tracing::debug!(target, "skip requested");
        self.current.clip_mut().set_position(target);
        true
    }

    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            time_left: self.time_left,
            position: self.current.clip().position(),
            duration: self.current.clip().duration(),
            stuck_progress: self.stall.stuck_progress(),
            fading: self.is_fading(),
            current_index: self.current.source_index(),
            next_index: self.next().map(ClipHandle::source_index),
        }
    }
}
