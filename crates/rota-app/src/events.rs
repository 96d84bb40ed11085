#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Toggle,
    Select(usize),
    Pause,
    Resume,
    SlicesReload,
}
