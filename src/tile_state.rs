#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TileState {
    Hidden,
    Flagged,
    Revealed,
}

impl Default for TileState {
    fn default() -> Self {
        Self::Hidden
    }
}
