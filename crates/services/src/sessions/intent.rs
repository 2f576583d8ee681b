use lingo_core::model::MasteryStatus;
use serde::Serialize;

/// Direction of the most recent cursor move.
///
/// Only used by the presentation to pick an enter/exit transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationDirection {
    Backward,
    Forward,
}

/// Everything the presentation can ask a review session to do.
///
/// Card navigation and reveal progression are separate axes: `Navigate`
/// moves between cards, `AdvanceReveal` discloses more of the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionIntent {
    Navigate(NavigationDirection),
    AdvanceReveal,
    /// Explicit target status for the active card.
    SetStatus(MasteryStatus),
    /// Unseen → Learning → Mastered → Learning.
    CycleStatus,
    MasterDirectly,
    ResetCard,
    /// Reset every card in the deck. The confirmation prompt is the caller's job.
    ResetAll,
    SetFilter(bool),
    ToggleFilter,
    ShowHelp,
    HideHelp,
}
