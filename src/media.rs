//! Video clips decoded by an `ffmpeg` child process.
//!
//! `ffprobe` supplies size, frame rate and duration at load time. Decoding
//! runs on a reader thread that pushes scaled RGBA frames into a bounded ring
//! buffer; the tick thread pops frames as its playhead reaches them and never
//! waits on the decoder.

use crate::canvas::Canvas;
use crate::clip::{Clip, ClipLoader};
use crate::error::ClipError;
use ringbuf::traits::{Consumer as _, Observer as _, Producer as _, Split as _};
use ringbuf::{HeapCons, HeapRb};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const FALLBACK_FPS: f64 = 25.0;

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration: f32,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

pub fn probe(path: &Path) -> Result<VideoInfo, ClipError> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ClipError::probe(path, format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ClipError::probe(
            path,
            String::from_utf8_lossy(&out.stderr).trim().to_string(),
        ));
    }
    parse_probe(path, &out.stdout)
}

/// Read the first video stream out of `ffprobe -print_format json` output.
///
/// Frame rate falls back from `avg_frame_rate` to `r_frame_rate` to 25 fps.
/// A missing duration is reported as NaN so callers can reject the clip.
pub fn parse_probe(path: &Path, json: &[u8]) -> Result<VideoInfo, ClipError> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| ClipError::probe(path, format!("ffprobe json parse failed: {e}")))?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ClipError::probe(path, "no video stream"))?;
    let width = video
        .width
        .filter(|w| *w > 0)
        .ok_or_else(|| ClipError::probe(path, "missing video width"))?;
    let height = video
        .height
        .filter(|h| *h > 0)
        .ok_or_else(|| ClipError::probe(path, "missing video height"))?;

    let fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_ff_ratio)
        .or_else(|| video.r_frame_rate.as_deref().and_then(parse_ff_ratio))
        .unwrap_or(FALLBACK_FPS);
    let duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(f32::NAN);

    Ok(VideoInfo {
        width,
        height,
        fps,
        duration,
    })
}

/// Parse ffmpeg's `num/den` rates; zero or malformed rates yield `None`.
pub fn parse_ff_ratio(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/').unwrap_or((s, "1"));
    let num = num.trim().parse::<f64>().ok()?;
    let den = den.trim().parse::<f64>().ok()?;
    if num <= 0.0 || den <= 0.0 {
        return None;
    }
    Some(num / den)
}

/// Loads clips through ffprobe/ffmpeg, scaled to the canvas size.
#[derive(Debug, Clone)]
pub struct FfmpegLoader {
    pub frame_width: usize,
    pub frame_height: usize,
    /// Decoded frames buffered ahead of the playhead.
    pub buffered_frames: usize,
}

impl FfmpegLoader {
    pub fn new(frame_width: usize, frame_height: usize) -> Self {
        Self {
            frame_width: frame_width.max(1),
            frame_height: frame_height.max(1),
            buffered_frames: 8,
        }
    }
}

impl ClipLoader for FfmpegLoader {
    fn load(&mut self, path: &Path) -> Result<Box<dyn Clip>, ClipError> {
        let clip = FfmpegClip::open(
            path,
            self.frame_width,
            self.frame_height,
            self.buffered_frames,
        )?;
        Ok(Box::new(clip))
    }
}

struct Decoder {
    child: Child,
    stop: Arc<AtomicBool>,
    eof: Arc<AtomicBool>,
    frames: HeapCons<Vec<u8>>,
    reader: Option<thread::JoinHandle<()>>,
    start: f64,
    popped: u64,
}

impl Decoder {
    fn spawn(
        path: &Path,
        start: f64,
        width: usize,
        height: usize,
        capacity: usize,
    ) -> Result<Self, ClipError> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-ss", &format!("{start:.6}")])
            .arg("-i")
            .arg(path)
            .args([
                "-an",
                "-vf",
                &format!("scale={width}:{height}"),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ClipError::decode(path, format!("failed to spawn ffmpeg: {e}")))?;
        let Some(mut stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ClipError::decode(path, "ffmpeg stdout not captured"));
        };

        let (mut prod, cons) = HeapRb::<Vec<u8>>::new(capacity.max(1)).split();
        let stop = Arc::new(AtomicBool::new(false));
        let eof = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let eof_for_thread = Arc::clone(&eof);
        let frame_len = width * height * 4;

        let reader = thread::Builder::new()
            .name("clip-decode".to_string())
            .spawn(move || {
                loop {
                    let mut frame = vec![0u8; frame_len];
                    if stdout.read_exact(&mut frame).is_err() {
                        break;
                    }
                    loop {
                        if stop_for_thread.load(Ordering::Relaxed) {
                            return;
                        }
                        match prod.try_push(frame) {
                            Ok(()) => break,
                            Err(back) => {
                                frame = back;
                                thread::sleep(Duration::from_millis(2));
                            }
                        }
                    }
                }
                eof_for_thread.store(true, Ordering::Release);
            })
            .map_err(|e| ClipError::decode(path, format!("failed to start reader: {e}")))?;

        Ok(Self {
            child,
            stop,
            eof,
            frames: cons,
            reader: Some(reader),
            start,
            popped: 0,
        })
    }

    /// Reader finished and every decoded frame has been consumed.
    fn drained(&self) -> bool {
        self.eof.load(Ordering::Acquire) && self.frames.is_empty()
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

pub struct FfmpegClip {
    path: PathBuf,
    info: VideoInfo,
    frame_width: usize,
    frame_height: usize,
    capacity: usize,
    decoder: Option<Decoder>,
    playhead: f64,
    paused: bool,
    frame: Vec<u8>,
    closed: bool,
}

impl FfmpegClip {
    pub fn open(
        path: &Path,
        frame_width: usize,
        frame_height: usize,
        capacity: usize,
    ) -> Result<Self, ClipError> {
        let info = probe(path)?;
        let decoder = Decoder::spawn(path, 0.0, frame_width, frame_height, capacity)?;
        tracing::debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            duration = info.duration,
            "clip opened"
        );
        Ok(Self {
            path: path.to_path_buf(),
            info,
            frame_width,
            frame_height,
            capacity,
            decoder: Some(decoder),
            playhead: 0.0,
            paused: true,
            frame: Vec::new(),
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn restart(&mut self, at: f64) {
        // Old decoder must be gone before the new one starts reading.
        self.decoder = None;
        match Decoder::spawn(
            &self.path,
            at,
            self.frame_width,
            self.frame_height,
            self.capacity,
        ) {
            Ok(d) => self.decoder = Some(d),
            Err(err) => tracing::warn!(error = %err, "seek failed; clip will end"),
        }
    }

    fn pull_frames(&mut self) {
        let fps = self.info.fps;
        let Some(dec) = self.decoder.as_mut() else {
            return;
        };
        while dec.start + dec.popped as f64 / fps <= self.playhead {
            match dec.frames.try_pop() {
                Some(frame) => {
                    self.frame = frame;
                    dec.popped += 1;
                }
                None => break,
            }
        }
    }
}

impl Clip for FfmpegClip {
    fn is_loaded(&self) -> bool {
        !self.closed && self.decoder.is_some()
    }

    fn is_playing(&self) -> bool {
        match &self.decoder {
            Some(dec) => !self.closed && !dec.drained(),
            None => false,
        }
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn position(&self) -> f32 {
        let duration = self.info.duration as f64;
        if !(duration > 0.0) {
            return 0.0;
        }
        (self.playhead / duration).min(1.0) as f32
    }

    fn set_position(&mut self, frac: f32) {
        if self.closed {
            return;
        }
        let duration = self.info.duration as f64;
        let target = if duration > 0.0 && frac.is_finite() {
            (frac.clamp(0.0, 1.0) as f64) * duration
        } else {
            0.0
        };
        let unchanged = (target - self.playhead).abs() < 1e-3
            && self.decoder.as_ref().map(|d| d.popped == 0).unwrap_or(false);
        self.playhead = target;
        if !unchanged {
            self.restart(target);
        }
    }

    fn duration(&self) -> f32 {
        self.info.duration
    }

    fn update(&mut self, dt: f32) {
        if self.closed || self.paused {
            return;
        }
        self.playhead += dt.max(0.0) as f64;
        self.pull_frames();
    }

    fn draw(&self, canvas: &mut Canvas, alpha: u8) {
        if self.frame.is_empty() {
            return;
        }
        canvas.blit_scaled(&self.frame, self.frame_width, self.frame_height, alpha);
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.decoder = None;
        self.frame = Vec::new();
    }
}

impl Drop for FfmpegClip {
    fn drop(&mut self) {
        self.close();
    }
}
