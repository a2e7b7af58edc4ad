use crate::canvas::{Canvas, Rgb};
use crate::config::{ClipMode, Config};
use crate::media::FfmpegLoader;
use crate::opc::OpcClient;
use crate::player::{Player, Transition};
use crate::playlist::Selector;
use crate::provider::{ClipProvider, OnDemandProvider, PoolProvider};
use crate::render::{Frame, HalfBlockRenderer, Renderer};
use crate::source::ClipSource;
use crate::streamer::{StreamOutcome, Streamer};
use crate::terminal::TerminalGuard;
use anyhow::Context;
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use std::io::{BufWriter, Stdout};
use std::time::{Duration, Instant};

const HUD_ROWS: u16 = 2;

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let source = ClipSource::scan(&cfg.clips)
        .with_context(|| format!("scan clip directory {}", cfg.clips.display()))?;
    let mut loader = FfmpegLoader::new(cfg.canvas_width, cfg.canvas_height);
    let provider: Box<dyn ClipProvider> = match cfg.clip_mode {
        ClipMode::OnDemand => Box::new(OnDemandProvider::new(source, loader)),
        ClipMode::Pool => Box::new(PoolProvider::preload(&source, &mut loader)),
    };

    let selector = Selector::new(cfg.selector_settings());
    let mut player = Player::new(provider, selector, cfg.player_settings())
        .context("select first clip")?;

    let transport = OpcClient::connect(
        cfg.opc_host.clone(),
        cfg.opc_port,
        Duration::from_millis(cfg.opc_retry_ms),
    );
    let mut streamer = Streamer::new(transport, cfg.panel_layout());
    let mut canvas = Canvas::new(cfg.canvas_width, cfg.canvas_height);

    let mut preview = if cfg.headless {
        None
    } else {
        Some(Preview::new(cfg.sync_updates)?)
    };

    let mut pointer: Option<(f32, f32)> = None;
    let mut fps = FpsCounter::new();
    let mut hud = String::new();
    let mut tick: u64 = 0;
    let mut last_frame = Instant::now();
    let target = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);

    loop {
        let now = Instant::now();

        if let Some(preview) = preview.as_mut() {
            match preview.poll_input(&canvas)? {
                Input::Quit => return Ok(()),
                Input::Advance(at) => {
                    if at.is_some() {
                        pointer = at;
                    }
                    player.advance();
                }
                Input::Pointer(at) => pointer = Some(at),
                Input::None => {}
            }
        }

        let dt = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        player.update(dt);

        canvas.clear(Rgb::BLACK);
        match player.draw(&mut canvas) {
            Transition::FadeStarted | Transition::Swapped => {
                hud = status_hud(&player, &streamer, fps.fps());
            }
            Transition::Steady | Transition::SelectFailed => {}
        }

        if cfg.debug_cursor {
            if let Some((x, y)) = pointer {
                let (w, h) = (canvas.width() as f32, canvas.height() as f32);
                canvas.fill_ellipse(x, y, w / 10.0, h / 10.0, Rgb::WHITE);
            }
        }

        if let StreamOutcome::Sent { channels, .. } = streamer.push(&canvas) {
            tracing::trace!(channels, "frame streamed");
        }

        tick += 1;
        if cfg.status_every > 0 && tick % cfg.status_every == 0 {
            let status = player.status();
            tracing::info!(
                fps = fps.fps(),
                opc = streamer.is_connected(),
                "{status}"
            );
            hud = status_hud(&player, &streamer, fps.fps());
        }

        if let Some(preview) = preview.as_mut() {
            preview.draw(&canvas, &hud)?;
        }
        fps.tick();

        let elapsed = now.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }
}

fn status_hud<P: ClipProvider>(player: &Player<P>, streamer: &Streamer<OpcClient>, fps: f32) -> String {
    format!(
        "FPS {:>5.1} | {}\nOPC {} ({}) | space/click skip | q quit",
        fps,
        player.status(),
        streamer.transport().endpoint(),
        if streamer.is_connected() { "connected" } else { "retrying" },
    )
}

enum Input {
    None,
    Quit,
    /// Skip request, with the pointer position in canvas pixels if it came
    /// from the mouse.
    Advance(Option<(f32, f32)>),
    Pointer((f32, f32)),
}

struct Preview {
    _term: TerminalGuard,
    out: BufWriter<Stdout>,
    renderer: HalfBlockRenderer,
    size: (u16, u16),
    sync_updates: bool,
}

impl Preview {
    fn new(sync_updates: bool) -> anyhow::Result<Self> {
        let term = TerminalGuard::new()?;
        let size = crossterm::terminal::size().context("get terminal size")?;
        Ok(Self {
            _term: term,
            out: BufWriter::new(TerminalGuard::stdout()),
            renderer: HalfBlockRenderer::new(),
            size,
            sync_updates,
        })
    }

    fn visual_rows(&self) -> u16 {
        self.size.1.saturating_sub(HUD_ROWS).max(1)
    }

    /// Terminal cell to canvas pixel.
    fn to_canvas(&self, canvas: &Canvas, col: u16, row: u16) -> (f32, f32) {
        let cols = self.size.0.max(1) as f32;
        let rows = self.visual_rows() as f32;
        (
            (col as f32 + 0.5) * canvas.width() as f32 / cols,
            (row as f32 + 0.5) * canvas.height() as f32 / rows,
        )
    }

    /// Drain pending terminal events without blocking.
    fn poll_input(&mut self, canvas: &Canvas) -> anyhow::Result<Input> {
        let mut input = Input::None;
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    if k.modifiers.contains(KeyModifiers::CONTROL)
                        && matches!(k.code, KeyCode::Char('c'))
                    {
                        return Ok(Input::Quit);
                    }
                    match k.code {
                        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => {
                            return Ok(Input::Quit);
                        }
                        KeyCode::Char(' ') | KeyCode::Char('n') | KeyCode::Right => {
                            input = Input::Advance(None);
                        }
                        _ => {}
                    }
                }
                Event::Mouse(m) => {
                    let at = self.to_canvas(canvas, m.column, m.row);
                    match m.kind {
                        MouseEventKind::Down(MouseButton::Left) => input = Input::Advance(Some(at)),
                        MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                            if !matches!(input, Input::Advance(_)) {
                                input = Input::Pointer(at);
                            }
                        }
                        _ => {}
                    }
                }
                Event::Resize(c, r) => self.size = (c, r),
                _ => {}
            }
        }
        Ok(input)
    }

    fn draw(&mut self, canvas: &Canvas, hud: &str) -> anyhow::Result<()> {
        let frame = Frame {
            term_cols: self.size.0,
            visual_rows: self.visual_rows(),
            canvas,
            hud,
            hud_rows: HUD_ROWS.min(self.size.1.saturating_sub(1)),
            sync_updates: self.sync_updates,
        };
        self.renderer.render(&frame, &mut self.out)
    }
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = self.frames as f32 / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
