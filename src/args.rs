use clap::Parser;
use std::path::PathBuf;

/// Command line minesweeper
#[derive(Parser, Clone, Default, Debug)]
#[command(version, about, long_about = None)]
pub struct MinesArgs {
    /// board rows
    #[arg(short, long, default_value_t = 20)]
    pub rows: u16,
    /// board columns
    #[arg(short, long, default_value_t = 20)]
    pub cols: u16,
    /// amount of mines, defaults to a seventh of the board
    #[arg(short, long)]
    pub mines: Option<u32>,
    /// append engine logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl MinesArgs {
    pub fn clamped(mut self) -> Self {
        self.rows = self.rows.clamp(2, 256);
        self.cols = self.cols.clamp(2, 256);
        if let Some(mines) = self.mines {
            let max_mines = self.rows as u32 * self.cols as u32 - 1;
            self.mines = Some(mines.clamp(1, max_mines));
        }
        self
    }
}
