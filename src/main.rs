use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = pixelfade::config::Config::parse();
    pixelfade::logging::init(&cfg)?;
    pixelfade::app::run(cfg)
}
