use crate::game_status::GameStatus;
use crate::game_status::GameStatus::*;
use crate::tile::Tile;
use crate::tile_value::TileValue::*;
use log::{debug, info};
use rand::Rng;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::fmt::{Display, Formatter};

const DIRS_8: [(i8, i8); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// A rectangular grid of tiles plus all the game rules: mine placement,
/// adjacency counts, reveal, flood-fill, chord reveal, flagging, and
/// win/loss tracking. The surrounding shell only reads tiles back through
/// [`Board::tile`] and [`Board::tiles`].
#[derive(Debug)]
pub struct Board {
    rows: u16,
    cols: u16,
    tiles: Vec<Tile>,
    total_mines: u32,
    // mines not yet correctly flagged; -1 marks a lost game
    flags_needed: i64,
}

impl Board {
    pub fn new(rows: u16, cols: u16) -> Self {
        let size = rows as usize * cols as usize;
        let mut tiles = Vec::with_capacity(size);
        for row in 0..rows {
            for col in 0..cols {
                tiles.push(Tile::new(row, col));
            }
        }
        let total_mines = (size / 7) as u32;

        Self {
            rows,
            cols,
            tiles,
            total_mines,
            flags_needed: total_mines as i64,
        }
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn mine_count(&self) -> u32 {
        self.total_mines
    }

    /// Overrides the default mine count. Only meaningful before `setup`.
    /// Clamped to the grid size so placement always terminates.
    pub fn set_mine_count(&mut self, mines: u32) {
        let mines = mines.min(self.tiles.len() as u32);
        self.total_mines = mines;
        self.flags_needed = mines as i64;
    }

    pub fn game_status(&self) -> GameStatus {
        match self.flags_needed {
            0 => Won,
            -1 => Lost,
            _ => Running,
        }
    }

    pub fn tile(&self, row: u16, col: u16) -> Option<&Tile> {
        self.index(row, col).map(|i| &self.tiles[i])
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Places `total_mines` mines at distinct random coordinates by
    /// rejection sampling, then fills in the neighbor counts for every
    /// safe tile. Call once per game, before any interaction.
    pub fn setup(&mut self, rng: &mut impl Rng) {
        let mut mines = self.total_mines;
        while mines > 0 {
            let row = rng.random_range(0..self.rows);
            let col = rng.random_range(0..self.cols);
            let i = self.flat(row, col);
            if self.tiles[i].is_mine() {
                continue;
            }
            self.tiles[i].set_value(Mine);
            mines -= 1;
        }
        self.assign_counts();
        info!(
            "{}x{} board ready, {} mines",
            self.rows, self.cols, self.total_mines
        );
    }

    /// Builds the given layout instead of a random one. Out-of-range and
    /// duplicate coordinates are ignored; the mine count is taken from what
    /// actually lands on the grid.
    pub fn setup_with_mines(&mut self, coords: &[(u16, u16)]) {
        for &(row, col) in coords {
            let Some(i) = self.index(row, col) else {
                continue;
            };
            self.tiles[i].set_value(Mine);
        }
        let placed = self.tiles.iter().filter(|t| t.is_mine()).count() as u32;
        self.total_mines = placed;
        self.flags_needed = placed as i64;
        self.assign_counts();
    }

    fn assign_counts(&mut self) {
        for i in 0..self.tiles.len() {
            let tile = self.tiles[i];
            if tile.is_mine() {
                continue;
            }
            let mines = self.count_adjacent_mines(tile.row(), tile.col());
            self.tiles[i].set_value(match mines {
                0 => Empty,
                n => Count(n),
            });
        }
    }

    fn count_adjacent_mines(&self, row: u16, col: u16) -> u8 {
        self.neighbors(row, col)
            .filter(|&(r, c)| self.tiles[self.flat(r, c)].is_mine())
            .count() as u8
    }

    /// Acts on the tile at `(row, col)`: chord-reveals a satisfied number,
    /// detonates a mine, or uncovers the tile, flooding outward from an
    /// empty one. Out-of-range coordinates and finished games are ignored.
    pub fn interact(&mut self, row: u16, col: u16) {
        if self.game_status() != Running {
            return;
        }
        let Some(i) = self.index(row, col) else {
            return;
        };

        let tile = self.tiles[i];
        match tile.value() {
            Count(_) if tile.is_revealed() => self.reveal_adjacent(row, col),
            Mine => self.detonate(row, col),
            Count(_) => self.tiles[i].reveal(),
            Empty => {
                self.tiles[i].reveal();
                self.expand_area(row, col);
            }
            WrongFlag | FlaggedMine => {}
        }
    }

    /// Toggles the flag at `(row, col)`. Correctly flagging every mine is
    /// what wins the game; flags on safe tiles change nothing but the view.
    pub fn flag(&mut self, row: u16, col: u16) {
        if self.game_status() != Running {
            return;
        }
        let Some(i) = self.index(row, col) else {
            return;
        };
        let tile = self.tiles[i];
        if tile.is_revealed() {
            return;
        }

        if tile.is_mine() {
            if tile.is_flagged() {
                self.flags_needed += 1;
            } else {
                self.flags_needed -= 1;
            }
        }
        self.tiles[i].toggle_flag();

        if self.game_status() == Won {
            info!("all {} mines flagged", self.total_mines);
        }
    }

    /// Uncovers every tile, resolving flags into their post-game markers.
    pub fn reveal_all(&mut self) {
        for tile in &mut self.tiles {
            tile.reveal();
        }
    }

    // A mine went off: the tile becomes the detonation marker and the
    // whole board is uncovered for the final screen.
    fn detonate(&mut self, row: u16, col: u16) {
        let i = self.flat(row, col);
        self.tiles[i].reveal();
        self.tiles[i].set_value(WrongFlag);
        self.flags_needed = -1;
        debug!("mine at ({row}, {col}) detonated");
        self.reveal_all();
    }

    /// Uncovers the contiguous empty region around an already revealed
    /// empty tile, plus the numbered tiles bordering it. Mines and flagged
    /// tiles are never uncovered by the flood.
    fn expand_area(&mut self, row: u16, col: u16) {
        let mut visited = BTreeSet::from([(row, col)]);
        self.flood_from(row, col, &mut visited);
    }

    fn flood_from(&mut self, row: u16, col: u16, visited: &mut BTreeSet<(u16, u16)>) {
        let mut worklist = VecDeque::from([(row, col)]);

        while let Some((r, c)) = worklist.pop_front() {
            for (nr, nc) in self.neighbors(r, c) {
                if !visited.insert((nr, nc)) {
                    continue;
                }
                let i = self.flat(nr, nc);
                if self.tiles[i].is_flagged() {
                    continue;
                }
                match self.tiles[i].value() {
                    Count(_) => self.tiles[i].reveal(),
                    Empty => {
                        self.tiles[i].reveal();
                        worklist.push_back((nr, nc));
                    }
                    _ => {}
                }
            }
        }
    }

    /// A revealed number qualifies for a chord reveal once at least that
    /// many of its neighbors are flagged mines.
    fn meets_requirements(&self, row: u16, col: u16) -> bool {
        let tile = &self.tiles[self.flat(row, col)];
        let required = match tile.value() {
            Empty => 0,
            Count(n) => n,
            _ => return false,
        };
        if !tile.is_revealed() {
            return false;
        }

        let flagged_mines = self
            .neighbors(row, col)
            .filter(|&(r, c)| {
                let t = &self.tiles[self.flat(r, c)];
                t.is_mine() && t.is_flagged()
            })
            .count();
        flagged_mines >= required as usize
    }

    /// Chord reveal: uncovers the unflagged neighbors of a satisfied
    /// number, flooding outward from empty ones. An unflagged mine ends
    /// the game on the spot and aborts the rest of the chord.
    fn reveal_adjacent(&mut self, row: u16, col: u16) {
        if !self.meets_requirements(row, col) {
            return;
        }

        let mut visited = BTreeSet::from([(row, col)]);
        for (nr, nc) in self.neighbors(row, col) {
            if !visited.insert((nr, nc)) {
                continue;
            }
            let i = self.flat(nr, nc);
            if self.tiles[i].is_flagged() {
                continue;
            }
            match self.tiles[i].value() {
                Count(_) => self.tiles[i].reveal(),
                Mine => {
                    self.detonate(nr, nc);
                    return;
                }
                Empty => {
                    self.tiles[i].reveal();
                    self.flood_from(nr, nc, &mut visited);
                }
                WrongFlag | FlaggedMine => {}
            }
        }
    }

    /// Up to eight in-bounds neighbors of a coordinate, each at most once,
    /// in a fixed order.
    fn neighbors(&self, row: u16, col: u16) -> impl Iterator<Item = (u16, u16)> + use<> {
        let (rows, cols) = (self.rows, self.cols);
        DIRS_8.into_iter().filter_map(move |(dr, dc)| {
            let r = row.checked_add_signed(dr as i16)?;
            let c = col.checked_add_signed(dc as i16)?;
            (r < rows && c < cols).then_some((r, c))
        })
    }

    fn in_bounds(&self, row: u16, col: u16) -> bool {
        row < self.rows && col < self.cols
    }

    fn index(&self, row: u16, col: u16) -> Option<usize> {
        if self.in_bounds(row, col) {
            Some(self.flat(row, col))
        } else {
            None
        }
    }

    fn flat(&self, row: u16, col: u16) -> usize {
        row as usize * self.cols as usize + col as usize
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for line in self.tiles.chunks_exact(self.cols.max(1) as usize) {
            for tile in line {
                write!(f, "{tile}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_state::TileState::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn default_mine_count_is_a_seventh_of_the_board() {
        let board = Board::new(20, 20);
        assert_eq!(board.mine_count(), 400 / 7);
        assert_eq!(board.game_status(), Running);
    }

    #[test]
    fn setup_places_the_configured_number_of_mines() {
        let mut board = Board::new(16, 16);
        board.set_mine_count(40);
        board.setup(&mut StdRng::seed_from_u64(7));

        let mines = board.tiles().filter(|t| t.is_mine()).count();
        assert_eq!(mines, 40);
    }

    #[test]
    fn counts_match_adjacent_mines_after_setup() {
        let mut board = Board::new(9, 9);
        board.setup(&mut StdRng::seed_from_u64(42));

        for row in 0..9 {
            for col in 0..9 {
                let tile = board.tile(row, col).unwrap();
                if tile.is_mine() {
                    continue;
                }
                let expected = board
                    .neighbors(row, col)
                    .filter(|&(r, c)| board.tile(r, c).unwrap().is_mine())
                    .count() as u8;
                let actual = match tile.value() {
                    Empty => 0,
                    Count(n) => n,
                    value => panic!("unexpected value {value:?} at ({row}, {col})"),
                };
                assert_eq!(actual, expected, "bad count at ({row}, {col})");
            }
        }
    }

    #[test]
    fn seeded_setup_is_reproducible() {
        let mut a = Board::new(8, 8);
        let mut b = Board::new(8, 8);
        a.setup(&mut StdRng::seed_from_u64(3));
        b.setup(&mut StdRng::seed_from_u64(3));

        for (ta, tb) in a.tiles().zip(b.tiles()) {
            assert_eq!(ta.value(), tb.value());
        }
    }

    #[test]
    fn neighbors_stay_in_bounds_without_duplicates() {
        let board = Board::new(3, 3);

        let corner: Vec<_> = board.neighbors(0, 0).collect();
        assert_eq!(corner, vec![(1, 0), (1, 1), (0, 1)]);

        assert_eq!(board.neighbors(1, 1).count(), 8);
    }

    #[test]
    fn revealing_a_mine_loses_and_uncovers_the_board() {
        // 1x2 board, mine in the left cell
        let mut board = Board::new(1, 2);
        board.setup_with_mines(&[(0, 0)]);
        assert_eq!(board.tile(0, 1).unwrap().value(), Count(1));

        board.interact(0, 0);

        assert_eq!(board.game_status(), Lost);
        assert_eq!(board.tile(0, 0).unwrap().value(), WrongFlag);
        assert!(board.tiles().all(|t| t.is_revealed()));
    }

    #[test]
    fn flood_fill_stops_at_numbers_and_never_uncovers_the_mine() {
        let mut board = Board::new(4, 4);
        board.setup_with_mines(&[(3, 3)]);

        board.interact(0, 0);

        assert_eq!(board.game_status(), Running);
        assert_eq!(board.tile(3, 3).unwrap().state(), Hidden);
        let revealed = board.tiles().filter(|t| t.is_revealed()).count();
        assert_eq!(revealed, 15);
    }

    #[test]
    fn flood_fill_skips_flagged_tiles() {
        let mut board = Board::new(4, 4);
        board.setup_with_mines(&[(3, 3)]);
        board.flag(0, 3);

        board.interact(0, 0);

        assert_eq!(board.tile(0, 3).unwrap().state(), Flagged);
        assert_eq!(board.game_status(), Running);
    }

    #[test]
    fn revealing_a_number_does_not_cascade() {
        let mut board = Board::new(4, 4);
        board.setup_with_mines(&[(3, 3)]);

        board.interact(2, 2);

        assert_eq!(board.tile(2, 2).unwrap().state(), Revealed);
        assert_eq!(board.tiles().filter(|t| t.is_revealed()).count(), 1);
    }

    #[test]
    fn repeated_interact_keeps_revealed_tiles_revealed() {
        let mut board = Board::new(4, 4);
        board.setup_with_mines(&[(3, 3)]);
        board.interact(0, 0);
        let before = board.tiles().filter(|t| t.is_revealed()).count();

        board.interact(0, 0);
        board.interact(2, 2);

        let after = board.tiles().filter(|t| t.is_revealed()).count();
        assert!(after >= before);
    }

    #[test]
    fn out_of_range_moves_are_ignored() {
        let mut board = Board::new(4, 4);
        board.setup_with_mines(&[(3, 3)]);

        board.interact(4, 0);
        board.interact(0, 7);
        board.flag(9, 9);

        assert_eq!(board.game_status(), Running);
        assert!(board.tiles().all(|t| t.state() == Hidden));
    }

    #[test]
    fn flagging_every_mine_wins() {
        let mut board = Board::new(3, 3);
        board.setup_with_mines(&[(0, 0), (2, 2)]);

        board.flag(0, 0);
        assert_eq!(board.game_status(), Running);
        board.flag(2, 2);
        assert_eq!(board.game_status(), Won);
    }

    #[test]
    fn unflagging_a_mine_takes_back_the_progress() {
        let mut board = Board::new(3, 3);
        board.setup_with_mines(&[(0, 0), (2, 2)]);

        board.flag(0, 0);
        board.flag(0, 0);
        board.flag(2, 2);

        assert_eq!(board.game_status(), Running);
    }

    #[test]
    fn flagging_safe_tiles_never_changes_the_status() {
        let mut board = Board::new(3, 3);
        board.setup_with_mines(&[(1, 1)]);

        for col in 0..3 {
            board.flag(0, col);
        }

        assert_eq!(board.game_status(), Running);
    }

    #[test]
    fn chord_reveal_needs_enough_flagged_mines() {
        let mut board = Board::new(3, 3);
        board.setup_with_mines(&[(1, 1)]);

        board.interact(0, 0);
        board.interact(0, 0); // chord with no flags placed: no-op

        assert_eq!(board.tiles().filter(|t| t.is_revealed()).count(), 1);
        assert_eq!(board.game_status(), Running);
    }

    #[test]
    fn chord_reveal_opens_the_unflagged_neighbors() {
        let mut board = Board::new(3, 3);
        board.setup_with_mines(&[(1, 1)]);

        board.interact(0, 0);
        board.flag(1, 1);
        board.interact(0, 0);

        assert_eq!(board.game_status(), Running);
        assert_eq!(board.tile(1, 1).unwrap().state(), Flagged);
        assert_eq!(board.tile(0, 1).unwrap().state(), Revealed);
        assert_eq!(board.tile(1, 0).unwrap().state(), Revealed);
    }

    #[test]
    fn chord_reveal_floods_through_empty_neighbors() {
        let mut board = Board::new(4, 4);
        board.setup_with_mines(&[(0, 0)]);

        board.interact(1, 1);
        board.flag(0, 0);
        board.interact(1, 1);

        assert_eq!(board.tiles().filter(|t| t.is_revealed()).count(), 15);
        assert_eq!(board.tile(0, 0).unwrap().state(), Flagged);
        assert_eq!(board.game_status(), Running);
    }

    #[test]
    fn chord_reveal_detonates_an_unflagged_mine() {
        let mut board = Board::new(3, 3);
        board.setup_with_mines(&[(0, 0), (2, 2)]);
        board.interact(1, 1);
        board.flag(0, 0);

        // a count aged below the real layout lets the chord qualify and
        // run into the unflagged mine
        let i = board.flat(1, 1);
        board.tiles[i].set_value(Count(1));
        board.interact(1, 1);

        assert_eq!(board.game_status(), Lost);
        assert_eq!(board.tile(2, 2).unwrap().value(), WrongFlag);
        assert!(board.tiles().all(|t| t.is_revealed()));
    }

    #[test]
    fn loss_marks_wrong_and_correct_flags() {
        let mut board = Board::new(2, 2);
        board.setup_with_mines(&[(0, 0), (0, 1)]);
        board.flag(0, 0);
        board.flag(1, 1);

        board.interact(0, 1);

        assert_eq!(board.game_status(), Lost);
        assert_eq!(board.tile(0, 0).unwrap().value(), FlaggedMine);
        assert_eq!(board.tile(1, 1).unwrap().value(), WrongFlag);
        assert_eq!(board.tile(0, 1).unwrap().value(), WrongFlag);
        assert_eq!(board.tile(1, 0).unwrap().value(), Count(2));
    }

    #[test]
    fn finished_games_ignore_further_moves() {
        let mut board = Board::new(1, 2);
        board.setup_with_mines(&[(0, 0)]);
        board.interact(0, 0);
        assert_eq!(board.game_status(), Lost);

        board.flag(0, 1);
        board.interact(0, 1);

        assert_eq!(board.game_status(), Lost);
        assert_eq!(board.tile(0, 1).unwrap().state(), Revealed);
    }

    #[test]
    fn display_uses_one_char_per_tile() {
        let mut board = Board::new(1, 2);
        board.setup_with_mines(&[(0, 0)]);
        assert_eq!(board.to_string(), "##\n");

        board.interact(0, 1);
        assert_eq!(board.to_string(), "#1\n");
    }
}
