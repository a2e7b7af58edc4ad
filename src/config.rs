use crate::pixels::PanelLayout;
use crate::player::PlayerSettings;
use crate::playlist::SelectorSettings;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pixelfade",
    version,
    about = "Shuffled crossfading video loop streamed to an Open Pixel Control LED wall"
)]
pub struct Config {
    /// Directory scanned once at startup for clips.
    #[arg(long)]
    pub clips: PathBuf,

    #[arg(long, default_value_t = 2.0)]
    pub fade_secs: f32,

    /// Remaining-time threshold below which a fading clip counts as finished.
    #[arg(long, default_value_t = 0.001)]
    pub epsilon: f32,

    #[arg(long, value_enum, default_value_t = PlayOrder::Random)]
    pub order: PlayOrder,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = ClipMode::OnDemand)]
    pub clip_mode: ClipMode,

    #[arg(long, value_enum, default_value_t = RepeatPolicy::Identity)]
    pub repeat_policy: RepeatPolicy,

    /// Clips shorter than this are skipped. Defaults to twice the fade.
    #[arg(long)]
    pub min_clip_secs: Option<f32>,

    #[arg(long, default_value = "127.0.0.1")]
    pub opc_host: String,

    #[arg(long, default_value_t = 7890)]
    pub opc_port: u16,

    #[arg(long, default_value_t = 3000)]
    pub opc_retry_ms: u64,

    #[arg(long, default_value_t = 40)]
    pub canvas_width: usize,

    #[arg(long, default_value_t = 10)]
    pub canvas_height: usize,

    #[arg(long, default_value_t = 8)]
    pub panels: usize,

    #[arg(long, default_value_t = 5)]
    pub columns_per_panel: usize,

    #[arg(long, default_value_t = 10)]
    pub panel_rows: usize,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    #[arg(long, default_value_t = 10)]
    pub status_every: u64,

    #[arg(long, default_value_t = false)]
    pub headless: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub debug_cursor: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// tracing filter directive, e.g. `pixelfade=debug`. Falls back to RUST_LOG.
    #[arg(long)]
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlayOrder {
    #[value(alias = "shuffle")]
    Random,
    #[value(alias = "debug", alias = "seq")]
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClipMode {
    #[value(name = "on-demand", alias = "ondemand", alias = "lazy")]
    OnDemand,
    #[value(alias = "preload")]
    Pool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RepeatPolicy {
    Identity,
    #[value(alias = "file")]
    Content,
}

impl Config {
    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            fade_time: self.fade_secs.max(0.01),
            epsilon: self.epsilon.max(0.0),
        }
    }

    pub fn selector_settings(&self) -> SelectorSettings {
        SelectorSettings {
            order: self.order,
            repeat_policy: self.repeat_policy,
            min_duration: self
                .min_clip_secs
                .unwrap_or(self.fade_secs * 2.0)
                .max(0.0),
            seed: self.seed,
        }
    }

    pub fn panel_layout(&self) -> PanelLayout {
        PanelLayout {
            panels: self.panels,
            columns_per_panel: self.columns_per_panel,
            rows: self.panel_rows,
            channel_capacity: PanelLayout::OPC_CHANNEL_PIXELS,
        }
    }
}
