use crate::action::Action;
use crate::action::Action::*;
use crate::args::MinesArgs;
use crate::board::Board;
use crate::game_status::GameStatus;
use crate::tile_state::TileState;
use crate::tile_state::TileState::*;
use crate::tile_value::TileValue;
use color_eyre::Result;
use crossterm::ExecutableCommand;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use ratatui::buffer::Cell;
use ratatui::layout::{Position, Rect};
use ratatui::style::Color;
use ratatui::style::Color::*;
use ratatui::{
    DefaultTerminal, Frame,
    style::Stylize,
    text::Line,
    widgets::{Block, Paragraph},
};
use std::cmp::min;

pub fn main(args: MinesArgs) -> Result<()> {
    color_eyre::install()?;
    let terminal = ratatui::init();
    let result = App::new(args).run(terminal);
    ratatui::restore();
    result
}

/// Terminal shell around [`Board`]: renders the grid and turns key and
/// mouse input into engine calls.
pub struct App {
    running: bool,
    args: MinesArgs,
    board: Board,
    // (row, col)
    cursor: (u16, u16),
    action: Option<Action>,
}

impl App {
    pub fn new(args: MinesArgs) -> Self {
        let args = args.clamped();
        Self {
            running: false,
            board: new_board(&args),
            args,
            cursor: (0, 0),
            action: None,
        }
    }

    /// Run the application's main loop.
    pub fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        std::io::stdout().execute(event::EnableMouseCapture)?;

        self.running = true;
        while self.running {
            terminal.draw(|frame| self.render(frame))?;
            self.handle_crossterm_events()?;
            self.update();
        }

        std::io::stdout().execute(event::DisableMouseCapture)?;
        Ok(())
    }

    fn update(&mut self) {
        let Some(action) = self.action.take() else {
            return;
        };
        let (row, col) = self.cursor;
        match action {
            Reveal => self.board.interact(row, col),
            Flag => self.board.flag(row, col),
            Restart => self.board = new_board(&self.args),
        }

        if self.board.game_status().is_over() {
            // final screen shows everything, flag verdicts included
            self.board.reveal_all();
            log::debug!("final board:\n{}", self.board);
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        let rows = self.board.rows();
        let cols = self.board.cols();
        let (row, col) = self.cursor;
        let flagged = self.board.tiles().filter(|t| t.is_flagged()).count();

        let (title, bottom) = match self.board.game_status() {
            GameStatus::Won => (
                Line::from("Win.").bold().light_green().centered(),
                Line::from("(R)estart (Q)uit").bold().light_green().centered(),
            ),
            GameStatus::Lost => (
                Line::from("Loss.").bold().light_red().centered(),
                Line::from("(R)estart (Q)uit").bold().light_red().centered(),
            ),
            GameStatus::Running => (
                Line::from("Minesweeper!").bold().light_blue().centered(),
                Line::from(format!(
                    "{}/{} ({},{})",
                    flagged,
                    self.board.mine_count(),
                    row,
                    col
                ))
                .centered(),
            ),
        };

        let area = frame.area().clamp(Rect::new(0, 0, cols + 2, rows + 2));

        frame.render_widget(
            Paragraph::new("").block(Block::bordered().title(title).title_bottom(bottom)),
            area,
        );

        if area.height == 0 && area.width == 0 {
            return;
        }

        for j in area.y + 1..area.y + area.height - 1 {
            for i in area.x + 1..area.x + area.width - 1 {
                let Some(tile) = self.board.tile(j - 1, i - 1) else {
                    continue;
                };
                let (char, bg, fg) = tile_glyph(tile.state(), tile.value());

                let w = frame.area().width;
                let mut c = Cell::new("");
                c.set_char(char).set_fg(fg).set_bg(bg);
                frame.buffer_mut().content[w as usize * j as usize + i as usize] = c;
            }
        }

        frame.set_cursor_position(Position {
            x: col + 1,
            y: row + 1,
        });
    }

    fn handle_crossterm_events(&mut self) -> Result<()> {
        match event::read()? {
            // it's important to check KeyEventKind::Press to avoid handling key release events
            Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key_event(key),
            Event::Mouse(m) => match m.kind {
                MouseEventKind::Down(button) => 'block: {
                    let rows = self.board.rows();
                    let cols = self.board.cols();
                    if !(1..cols + 1).contains(&m.column) || !(1..rows + 1).contains(&m.row) {
                        break 'block;
                    }
                    self.cursor = (m.row - 1, m.column - 1);
                    match button {
                        MouseButton::Left => self.action = Some(Reveal),
                        MouseButton::Right | MouseButton::Middle => self.action = Some(Flag),
                    };
                }
                _ => {}
            },
            Event::Resize(_, _) => {}
            _ => {}
        }
        Ok(())
    }

    /// Handles the key events and updates the state of [`App`].
    fn on_key_event(&mut self, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc | KeyCode::Char('q'))
            | (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('C')) => self.quit(),
            (_, KeyCode::Char('r')) => {
                self.action = Some(Restart);
            }
            (_, KeyCode::Char('x' | ' ')) => {
                self.action = Some(Reveal);
            }
            (_, KeyCode::Char('z' | 'f')) => {
                self.action = Some(Flag);
            }
            (_, key @ (KeyCode::Left | KeyCode::Right | KeyCode::Up | KeyCode::Down)) => {
                let (dr, dc) = match key {
                    KeyCode::Left => (0, -1),
                    KeyCode::Right => (0, 1),
                    KeyCode::Up => (-1, 0),
                    KeyCode::Down => (1, 0),
                    _ => unreachable!(),
                };
                self.move_cursor(dr, dc);
            }

            _ => {}
        }
    }

    fn move_cursor(&mut self, dr: i32, dc: i32) {
        let rows = self.board.rows();
        let cols = self.board.cols();
        let (row, col) = &mut self.cursor;
        *row = if dr < 0 {
            row.saturating_sub(-dr as u16)
        } else {
            min(rows - 1, *row + dr as u16)
        };

        *col = if dc < 0 {
            col.saturating_sub(-dc as u16)
        } else {
            min(cols - 1, *col + dc as u16)
        };
    }

    /// Set running to false to quit the application.
    fn quit(&mut self) {
        self.running = false;
    }
}

fn new_board(args: &MinesArgs) -> Board {
    let mut board = Board::new(args.rows, args.cols);
    if let Some(mines) = args.mines {
        board.set_mine_count(mines);
    }
    board.setup(&mut rand::rng());
    board
}

fn tile_glyph(state: TileState, value: TileValue) -> (char, Color, Color) {
    const NUM_COLOR: Color = Black;

    match state {
        Hidden => ('#', Reset, Reset),
        Flagged => ('F', LightGreen, Black),
        Revealed => match value {
            TileValue::Empty => (' ', Black, Reset),
            TileValue::Count(n) => {
                let bg = match n {
                    1 => LightBlue,
                    2 => LightCyan,
                    3 => LightGreen,
                    4 => LightYellow,
                    5 => LightMagenta,
                    6 => Gray,
                    7 => White,
                    _ => LightRed,
                };
                (
                    std::char::from_digit(n as u32, 10).unwrap_or('8'),
                    bg,
                    NUM_COLOR,
                )
            }
            TileValue::Mine => ('B', Black, LightRed),
            TileValue::WrongFlag => ('X', Black, LightRed),
            TileValue::FlaggedMine => ('*', Black, LightGreen),
        },
    }
}
