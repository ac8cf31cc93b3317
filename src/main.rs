use crate::args::MinesArgs;
use clap::Parser;
use log::LevelFilter;
use simplelog::{Config, WriteLogger};
use std::fs::File;

mod action;
mod args;
mod board;
mod game_status;
mod tile;
mod tile_state;
mod tile_value;
mod ui;

fn main() -> color_eyre::Result<()> {
    let args = MinesArgs::parse();
    if let Some(path) = &args.log_file {
        WriteLogger::init(LevelFilter::Debug, Config::default(), File::create(path)?)?;
    }
    ui::main(args)
}
