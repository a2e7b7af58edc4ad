#![allow(dead_code)]

use pixelfade::canvas::{Canvas, Rgb};
use pixelfade::clip::{Clip, ClipLoader};
use pixelfade::error::ClipError;
use pixelfade::source::ClipSource;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct FakeState {
    pub position: f32,
    pub duration: f32,
    pub paused: bool,
    pub playing: bool,
    pub loaded: bool,
    pub closed: bool,
    /// Position stops advancing while still reporting `playing`.
    pub frozen: bool,
    pub color: Rgb,
}

impl FakeState {
    pub fn new(duration: f32, color: Rgb) -> Self {
        Self {
            position: 0.0,
            duration,
            paused: true,
            playing: true,
            loaded: true,
            closed: false,
            frozen: false,
            color,
        }
    }
}

/// In-memory clip whose state stays observable after it is handed over.
#[derive(Clone)]
pub struct FakeClip(pub Rc<RefCell<FakeState>>);

impl FakeClip {
    pub fn new(duration: f32, color: Rgb) -> Self {
        Self(Rc::new(RefCell::new(FakeState::new(duration, color))))
    }

    pub fn state(&self) -> std::cell::Ref<'_, FakeState> {
        self.0.borrow()
    }

    pub fn state_mut(&self) -> std::cell::RefMut<'_, FakeState> {
        self.0.borrow_mut()
    }
}

impl Clip for FakeClip {
    fn is_loaded(&self) -> bool {
        self.0.borrow().loaded
    }

    fn is_playing(&self) -> bool {
        self.0.borrow().playing
    }

    fn set_paused(&mut self, paused: bool) {
        self.0.borrow_mut().paused = paused;
    }

    fn is_paused(&self) -> bool {
        self.0.borrow().paused
    }

    fn position(&self) -> f32 {
        self.0.borrow().position
    }

    fn set_position(&mut self, frac: f32) {
        let mut s = self.0.borrow_mut();
        s.position = frac;
        // Seeking back from the end resumes playback, like a real decoder.
        if frac < 1.0 {
            s.playing = true;
        }
    }

    fn duration(&self) -> f32 {
        self.0.borrow().duration
    }

    fn update(&mut self, dt: f32) {
        let mut s = self.0.borrow_mut();
        if s.paused || s.frozen || s.closed || !s.playing {
            return;
        }
        s.position += dt / s.duration;
        if s.position >= 1.0 {
            s.position = 1.0;
            s.playing = false;
        }
    }

    fn draw(&self, canvas: &mut Canvas, alpha: u8) {
        let c = self.0.borrow().color;
        canvas.blit_scaled(&[c.r, c.g, c.b, 255], 1, 1, alpha);
    }

    fn close(&mut self) {
        self.0.borrow_mut().closed = true;
    }
}

pub enum FakeFile {
    Clip { duration: f32, color: Rgb },
    Broken,
    NotLoaded,
}

/// Loader that hands out `FakeClip`s by path and remembers every instance.
#[derive(Clone, Default)]
pub struct FakeLoader {
    files: Rc<HashMap<PathBuf, (f32, Rgb, u8)>>,
    pub loaded: Rc<RefCell<Vec<(PathBuf, FakeClip)>>>,
}

impl FakeLoader {
    /// Build a source plus loader; files are named `clip00.mp4`, `clip01.mp4`, ...
    pub fn with_files(files: Vec<FakeFile>) -> (ClipSource, Self) {
        let mut map = HashMap::new();
        let mut paths = Vec::new();
        for (i, f) in files.into_iter().enumerate() {
            let path = PathBuf::from(format!("clips/clip{i:02}.mp4"));
            let entry = match f {
                FakeFile::Clip { duration, color } => (duration, color, 0),
                FakeFile::Broken => (0.0, Rgb::BLACK, 1),
                FakeFile::NotLoaded => (10.0, Rgb::BLACK, 2),
            };
            map.insert(path.clone(), entry);
            paths.push(path);
        }
        let loader = Self {
            files: Rc::new(map),
            loaded: Rc::new(RefCell::new(Vec::new())),
        };
        (ClipSource::from_paths(paths), loader)
    }

    pub fn uniform(count: usize, duration: f32) -> (ClipSource, Self) {
        Self::with_files(
            (0..count)
                .map(|i| FakeFile::Clip {
                    duration,
                    color: color_for(i),
                })
                .collect(),
        )
    }

    pub fn instances(&self) -> Vec<FakeClip> {
        self.loaded.borrow().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn last(&self) -> Option<FakeClip> {
        self.loaded.borrow().last().map(|(_, c)| c.clone())
    }
}

impl ClipLoader for FakeLoader {
    fn load(&mut self, path: &Path) -> Result<Box<dyn Clip>, ClipError> {
        let Some(&(duration, color, kind)) = self.files.get(path) else {
            return Err(ClipError::probe(path, "no such file"));
        };
        if kind == 1 {
            return Err(ClipError::probe(path, "not a video"));
        }
        let clip = FakeClip::new(duration, color);
        if kind == 2 {
            clip.state_mut().loaded = false;
        }
        self.loaded
            .borrow_mut()
            .push((path.to_path_buf(), clip.clone()));
        Ok(Box::new(clip))
    }
}

pub fn color_for(i: usize) -> Rgb {
    Rgb::new((i * 40 % 256) as u8, 100, (255 - i * 40 % 256) as u8)
}
