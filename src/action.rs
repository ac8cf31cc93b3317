#[derive(Copy, Clone, Debug)]
pub enum Action {
    Reveal,
    Flag,
    Restart,
}
