mod app;
mod config;
mod input;
mod model;
mod render;
mod sim;
mod storage;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = config::Args::parse();
    config::init_logging(args.log_file.as_ref())?;
    let settings = config::Settings::from_args(&args);

    let res = app::run(&settings);

    // restore before anything is printed
    render::restore_terminal();
    if let Err(e) = &res {
        log::error!("fatal: {e:#}");
    }
    res
}
