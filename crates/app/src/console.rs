use std::fmt::Write as _;

use lingo_core::model::{Card, CardContent, MasteryStatus, RevealAction, StageFace};
use services::{FailureReason, NavigationDirection, SessionIntent, SessionSnapshot};

/// One line typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Intent(SessionIntent),
    /// Asks for confirmation before a `ResetAll` is dispatched.
    ResetAll,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let intent = match line.trim().to_ascii_lowercase().as_str() {
            "n" | "next" | "right" => SessionIntent::Navigate(NavigationDirection::Forward),
            "p" | "prev" | "left" => SessionIntent::Navigate(NavigationDirection::Backward),
            "" | "r" | "reveal" => SessionIntent::AdvanceReveal,
            "s" | "status" => SessionIntent::CycleStatus,
            "m" | "master" => SessionIntent::MasterDirectly,
            "u" | "unseen" | "reset" => SessionIntent::ResetCard,
            "l" | "learning" => SessionIntent::SetStatus(MasteryStatus::Learning),
            "f" | "filter" => SessionIntent::ToggleFilter,
            "h" | "?" | "help" => SessionIntent::ShowHelp,
            "esc" => SessionIntent::HideHelp,
            "reset-all" => return Some(Self::ResetAll),
            "q" | "quit" => return Some(Self::Quit),
            _ => return None,
        };
        Some(Self::Intent(intent))
    }
}

pub const HELP: &str = "\
  n / p        next / previous card
  r, <enter>   reveal more
  s            cycle status (unseen > learning > mastered)
  m            mark mastered
  l            mark learning
  u            reset card to unseen
  reset-all    reset every card (asks first)
  f            toggle only-unmastered filter
  h / esc      show / hide this help
  q            quit";

/// Plain-text view of a snapshot.
pub fn render(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();

    if snapshot.help_visible {
        let _ = writeln!(out, "{HELP}");
    }

    let counts = snapshot.counts;
    let _ = writeln!(
        out,
        "[unseen {} | learning {} | mastered {}/{}]{}",
        counts.unseen,
        counts.learning,
        counts.mastered,
        counts.total(),
        if snapshot.filter_enabled {
            " filter: only unmastered"
        } else {
            ""
        }
    );

    match (&snapshot.active_card, snapshot.position(), snapshot.stage_face) {
        (Some(card), Some((position, of)), Some(face)) => {
            let status = snapshot.status.unwrap_or_default();
            let _ = writeln!(out, "Card {position}/{of} ({})", status_label(status));
            let _ = writeln!(out, "{}", face_text(card, face));
            if let Some(action) = snapshot.reveal_action {
                let _ = writeln!(out, "> {}", action_label(action));
            }
        }
        _ => {
            let _ = writeln!(out, "Every card is mastered. Press f to show all cards.");
        }
    }

    if let Some(failure) = &snapshot.last_error {
        let reason = match failure.reason {
            FailureReason::Storage => "storage error",
            FailureReason::TimedOut => "timed out",
            FailureReason::Rejected => "store has a newer change",
            FailureReason::Aborted => "write aborted",
        };
        let _ = writeln!(out, "! progress not saved ({reason}): {}", failure.message);
    }
    if snapshot.pending_writes > 0 {
        let _ = writeln!(out, "  saving {} change(s)...", snapshot.pending_writes);
    }

    out
}

fn status_label(status: MasteryStatus) -> &'static str {
    match status {
        MasteryStatus::Unseen => "unseen",
        MasteryStatus::Learning => "learning",
        MasteryStatus::Mastered => "mastered",
    }
}

fn action_label(action: RevealAction) -> &'static str {
    match action {
        RevealAction::More => "r: more",
        RevealAction::Flip => "r: flip",
        RevealAction::Collapse => "r: back to front",
    }
}

fn face_text(card: &Card, face: StageFace) -> String {
    match (card.content(), face) {
        (CardContent::Vocabulary { word, examples, .. }, StageFace::Prompt) => {
            let mut text = word.clone();
            for example in examples {
                let _ = write!(text, "\n  - {example}");
            }
            text
        }
        (CardContent::Vocabulary { word, definition, .. }, StageFace::Definition) => {
            format!("{word}: {definition}")
        }
        (CardContent::Vocabulary { word, translation, .. }, StageFace::Translation) => {
            format!("{word} = {translation}")
        }
        (CardContent::Puzzle { keywords, .. }, StageFace::Keywords) => keywords.join(", "),
        (CardContent::Puzzle { riddle, .. }, StageFace::Riddle) => riddle.clone(),
        (CardContent::Puzzle { riddle, solution, .. }, StageFace::Solution) => {
            format!("{riddle}\n= {solution}")
        }
        (CardContent::Puzzle { translations, .. }, StageFace::Translations) => translations
            .iter()
            .map(|t| format!("[{}] {} = {}", t.language_id, t.riddle, t.solution))
            .collect::<Vec<_>>()
            .join("\n"),
        (CardContent::Image { image, .. }, StageFace::Picture) => {
            format!("(image) {}", String::from(image.clone()))
        }
        (CardContent::Image { translations, .. }, StageFace::Translations) => translations
            .iter()
            .map(|t| format!("[{}] {}", t.language_id, t.text))
            .collect::<Vec<_>>()
            .join("\n"),
        (content, _) => content.headline(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingo_core::model::{CardId, Deck, ExerciseKind, LanguageId};
    use services::ReviewSession;
    use std::collections::HashMap;

    fn session() -> ReviewSession {
        let card = Card::new(
            CardId::new(1),
            LanguageId::new(2),
            CardContent::Vocabulary {
                word: "chat".into(),
                examples: vec!["le chat dort".into()],
                definition: "small feline".into(),
                translation: "cat".into(),
            },
        )
        .unwrap();
        let deck = Deck::new(LanguageId::new(2), ExerciseKind::Vocabulary, vec![card]).unwrap();
        ReviewSession::initialize(deck, &HashMap::new()).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            Command::parse(" N "),
            Some(Command::Intent(SessionIntent::Navigate(
                NavigationDirection::Forward
            )))
        );
        assert_eq!(
            Command::parse(""),
            Some(Command::Intent(SessionIntent::AdvanceReveal))
        );
        assert_eq!(Command::parse("reset-all"), Some(Command::ResetAll));
        assert_eq!(Command::parse("dance"), None);
    }

    #[test]
    fn renders_position_and_face() {
        let mut session = session();
        let text = render(&session.snapshot());
        assert!(text.contains("Card 1/1 (unseen)"));
        assert!(text.contains("mastered 0/1"));
        assert!(text.contains("chat"));
        assert!(text.contains("r: more"));

        let text = render(&session.apply(SessionIntent::AdvanceReveal));
        assert!(text.contains("small feline"));
        assert!(!text.contains("le chat dort"));
    }

    #[test]
    fn examples_show_with_the_prompt_only() {
        let mut session = session();
        let prompt = render(&session.snapshot());
        assert!(prompt.contains("  - le chat dort"));

        for _ in 0..2 {
            let text = render(&session.apply(SessionIntent::AdvanceReveal));
            assert!(!text.contains("le chat dort"));
        }
    }

    #[test]
    fn renders_empty_filter_and_help() {
        let mut session = session();
        session.apply(SessionIntent::SetFilter(true));
        session.apply(SessionIntent::MasterDirectly);
        let text = render(&session.apply(SessionIntent::ShowHelp));
        assert!(text.contains("Every card is mastered"));
        assert!(text.contains("toggle only-unmastered filter"));
    }
}
