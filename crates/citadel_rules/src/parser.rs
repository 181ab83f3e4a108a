//! Decoder for free-text action commands.
//!
//! Text arrives from a language model or a keyboard and may carry code fences,
//! list markers, labels and prose around the command. The decoder is total: it
//! never panics and always returns a value.

use crate::action::{Action, ActionKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Longest snippet of rejected input kept in an error.
const SNIPPET_LEN: usize = 48;

/// Labels a model tends to put before the command.
const LABELS: [&str; 4] = ["action:", "command:", "answer:", "move:"];

/// A decoded command: a complete action, or a verb that still needs a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A complete action.
    Act(Action),
    /// A verb typed without its target.
    Choose(ActionKind),
}

/// Reason text could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ParseError {
    /// Nothing but whitespace or formatting.
    #[display("Empty response")]
    Empty,
    /// No line holds a known verb.
    #[display("Unrecognized response: {}", _0)]
    Unrecognized(String),
    /// A verb was found without a target.
    #[display("Missing target for {}", _0)]
    MissingTarget(ActionKind),
}

impl std::error::Error for ParseError {}

/// Decodes the first action in `raw`.
///
/// A bare verb such as `build` is reported as [`ParseError::MissingTarget`].
#[instrument(skip(raw), fields(len = raw.len()))]
pub fn parse(raw: &str) -> Result<Action, ParseError> {
    match parse_command(raw)? {
        Command::Act(action) => Ok(action),
        Command::Choose(kind) => Err(ParseError::MissingTarget(kind)),
    }
}

/// Decodes the first command in `raw`, allowing bare verbs.
#[instrument(skip(raw), fields(len = raw.len()))]
pub fn parse_command(raw: &str) -> Result<Command, ParseError> {
    let mut saw_content = false;

    for line in raw.lines() {
        let line = clean_line(line);
        if line.is_empty() {
            continue;
        }
        saw_content = true;

        if let Some(command) = decode_line(line) {
            debug!(?command, "Decoded command");
            return Ok(command);
        }
    }

    if saw_content {
        Err(ParseError::Unrecognized(snippet(raw)))
    } else {
        Err(ParseError::Empty)
    }
}

/// Strips fences, list markers, quoting, emphasis and labels from one line.
fn clean_line(line: &str) -> &str {
    let mut line = line.trim();

    if let Some(rest) = strip_fence(line) {
        // A word alone after an opening fence is a language tag, unless it is a
        // verb or a number.
        let tag = !rest.contains(char::is_whitespace)
            && verb(clean_token(rest)).is_none()
            && rest.parse::<usize>().is_err();
        if tag {
            return "";
        }
        line = rest;
    }

    loop {
        let before = line;
        line = line
            .trim_start_matches(['>', '-', '*', '+', '•', '`', '#', '"', '\''])
            .trim_start();
        line = strip_enumeration(line);
        line = strip_label(line);
        if line == before {
            break;
        }
    }

    line.trim_end_matches(['`', '~', '*', '"', '\'']).trim()
}

/// Removes the fence markers around a line that opens with ```` ``` ```` or `~~~`.
fn strip_fence(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix("```")
        .or_else(|| line.strip_prefix("~~~"))?;
    Some(
        rest.trim_start_matches(['`', '~'])
            .trim_end_matches(['`', '~'])
            .trim(),
    )
}

/// Removes a leading `1.`, `2)`, `(3)` or `a.` marker.
fn strip_enumeration(line: &str) -> &str {
    let rest = line.strip_prefix('(').unwrap_or(line);
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    let marker_len = if digits > 0 {
        digits
    } else if rest.len() > 1 && rest.as_bytes()[0].is_ascii_alphabetic() {
        1
    } else {
        return line;
    };

    match rest[marker_len..].chars().next() {
        Some('.') | Some(')') | Some(':') => rest[marker_len + 1..].trim_start(),
        _ => line,
    }
}

fn strip_label(line: &str) -> &str {
    for label in LABELS {
        if line.len() >= label.len()
            && line.is_char_boundary(label.len())
            && line[..label.len()].eq_ignore_ascii_case(label)
        {
            return line[label.len()..].trim_start();
        }
    }
    line
}

/// Finds the first verb on the line, skipping any prose before it.
fn decode_line(line: &str) -> Option<Command> {
    let words: Vec<&str> = line.split_whitespace().map(clean_token).collect();
    (0..words.len()).find_map(|idx| decode_at(&words[idx..], idx == 0))
}

fn decode_at(words: &[&str], leading: bool) -> Option<Command> {
    let kind = verb(words.first()?)?;
    let rest = &words[1..];

    if kind == ActionKind::EndTurn {
        // Mid-sentence "end" only counts as "end", "end turn" or "end my turn".
        let ends_turn = leading
            || rest.is_empty()
            || rest.iter().take(2).any(|w| w.eq_ignore_ascii_case("turn"));
        return ends_turn.then_some(Command::Act(Action::EndTurn));
    }

    Some(match rest.first().filter(|t| !t.is_empty()) {
        Some(target) => Command::Act(Action::with_target(kind, *target)),
        None => Command::Choose(kind),
    })
}

fn verb(word: &str) -> Option<ActionKind> {
    match word.to_ascii_lowercase().as_str() {
        "build" | "construct" => Some(ActionKind::Build),
        "hire" | "recruit" => Some(ActionKind::Hire),
        "attack" => Some(ActionKind::Attack),
        "end" | "endturn" | "end_turn" | "end-turn" | "pass" => Some(ActionKind::EndTurn),
        _ => None,
    }
}

fn clean_token(token: &str) -> &str {
    token.trim_matches(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
}

fn snippet(raw: &str) -> String {
    let flat: String = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    flat.chars().take(SNIPPET_LEN).collect()
}

/// A pending choice offered to a decision source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Popup {
    /// Short heading, e.g. `Build`.
    pub title: String,
    /// Question shown to the chooser.
    pub prompt: String,
    /// Options, presented numbered from 1.
    pub choices: Vec<String>,
}

impl Popup {
    /// Creates a popup.
    pub fn new(title: impl Into<String>, prompt: impl Into<String>, choices: Vec<String>) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            choices,
        }
    }

    /// Builds the target choice for a bare verb from the legal-action set.
    ///
    /// Returns `None` for `EndTurn` or when no legal action uses the verb.
    pub fn for_kind(kind: ActionKind, legal: &[Action]) -> Option<Self> {
        let (title, prompt) = match kind {
            ActionKind::Build => ("Build", "Choose building type:"),
            ActionKind::Hire => ("Hire", "Choose unit to hire:"),
            ActionKind::Attack => ("Attack", "Choose player to attack:"),
            ActionKind::EndTurn => return None,
        };
        let choices: Vec<String> = legal
            .iter()
            .filter(|action| action.kind() == kind)
            .filter_map(|action| action.target().map(str::to_string))
            .collect();
        (!choices.is_empty()).then(|| Self::new(title, prompt, choices))
    }

    /// The action a resolved choice stands for.
    pub fn action_for(&self, kind: ActionKind, index: usize) -> Option<Action> {
        self.choices
            .get(index)
            .map(|target| Action::with_target(kind, target.clone()))
    }

    /// Resolves a typed answer: a 1-based number or a case-insensitive name prefix.
    pub fn resolve(&self, input: &str) -> Option<usize> {
        let answer = clean_line(input.lines().find(|l| !clean_line(l).is_empty())?);
        let answer = clean_token(answer.split_whitespace().next()?);
        if answer.is_empty() {
            return None;
        }

        if let Ok(number) = answer.parse::<usize>() {
            return (1..=self.choices.len())
                .contains(&number)
                .then(|| number - 1);
        }

        let lowered = answer.to_lowercase();
        self.choices
            .iter()
            .position(|choice| choice.to_lowercase().starts_with(&lowered))
    }

    /// Renders the popup as a numbered list.
    pub fn render(&self) -> String {
        let mut text = format!("{}\n", self.prompt);
        for (idx, choice) in self.choices.iter().enumerate() {
            text.push_str(&format!("{}. {}\n", idx + 1, choice));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_commands() {
        assert_eq!(parse("build Farm"), Ok(Action::Build("Farm".into())));
        assert_eq!(parse("HIRE warrior"), Ok(Action::Hire("warrior".into())));
        assert_eq!(parse("  attack IA  "), Ok(Action::Attack("IA".into())));
        assert_eq!(parse("End"), Ok(Action::EndTurn));
        assert_eq!(parse("end turn"), Ok(Action::EndTurn));
    }

    #[test]
    fn test_strips_formatting() {
        assert_eq!(
            parse("```\nbuild Farm\n```"),
            Ok(Action::Build("Farm".into()))
        );
        assert_eq!(parse("1. hire Warrior"), Ok(Action::Hire("Warrior".into())));
        assert_eq!(parse("- **attack IA**"), Ok(Action::Attack("IA".into())));
        assert_eq!(parse("Action: `build Farm`."), Ok(Action::Build("Farm".into())));
        assert_eq!(
            parse("Let me think about this.\nbuild Farm.\nIt is cheap."),
            Ok(Action::Build("Farm".into()))
        );
    }

    #[test]
    fn test_single_line_fences() {
        assert_eq!(parse("```build Farm```"), Ok(Action::Build("Farm".into())));
        assert_eq!(parse("```end```"), Ok(Action::EndTurn));
        assert_eq!(parse("~~~hire Warrior~~~"), Ok(Action::Hire("Warrior".into())));
        assert_eq!(
            parse("```text\nattack IA\n```"),
            Ok(Action::Attack("IA".into()))
        );
    }

    #[test]
    fn test_verb_after_lead_in() {
        assert_eq!(parse("Sure, build Farm"), Ok(Action::Build("Farm".into())));
        assert_eq!(parse("My move: build Farm."), Ok(Action::Build("Farm".into())));
        assert_eq!(parse("I will attack IA!"), Ok(Action::Attack("IA".into())));
        assert_eq!(parse("Time to end my turn."), Ok(Action::EndTurn));
        assert_eq!(
            parse("In the end, hire Warrior"),
            Ok(Action::Hire("Warrior".into()))
        );
    }

    #[test]
    fn test_first_command_wins() {
        assert_eq!(parse("end\nbuild Farm"), Ok(Action::EndTurn));
    }

    #[test]
    fn test_failures_are_values() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("```\n```"), Err(ParseError::Empty));
        assert!(parse("```json {\"action\": \"build\"}```").is_err());
        assert_eq!(parse("```json\n```"), Err(ParseError::Empty));
        assert!(matches!(
            parse("I believe the wisest course is patience and careful thought."),
            Err(ParseError::Unrecognized(_))
        ));
        assert_eq!(parse("build"), Err(ParseError::MissingTarget(ActionKind::Build)));
    }

    #[test]
    fn test_bare_verb_is_a_choice() {
        assert_eq!(parse_command("attack"), Ok(Command::Choose(ActionKind::Attack)));
    }

    #[test]
    fn test_hostile_input_does_not_panic() {
        for input in ["(", "1.", "a", "é.", "((((", "`", "**", "1)\n2)", "Action:", "ü"] {
            let _ = parse(input);
        }
    }

    #[test]
    fn test_popup_resolution() {
        let popup = Popup::new("Build", "Choose building:", vec!["Farm".into(), "Barracks".into()]);
        assert_eq!(popup.resolve("2"), Some(1));
        assert_eq!(popup.resolve("bar"), Some(1));
        assert_eq!(popup.resolve("  Farm please"), Some(0));
        assert_eq!(popup.resolve("3"), None);
        assert_eq!(popup.resolve("0"), None);
        assert_eq!(popup.resolve(""), None);
        assert_eq!(popup.resolve("castle"), None);
        assert_eq!(popup.resolve("```2```"), Some(1));
    }

    #[test]
    fn test_popup_from_legal_actions() {
        let legal = vec![
            Action::Build("Farm".into()),
            Action::Hire("Warrior".into()),
            Action::Build("Barracks".into()),
            Action::EndTurn,
        ];
        let popup = Popup::for_kind(ActionKind::Build, &legal).unwrap();
        assert_eq!(popup.choices, vec!["Farm".to_string(), "Barracks".to_string()]);
        assert_eq!(
            popup.action_for(ActionKind::Build, 1),
            Some(Action::Build("Barracks".into()))
        );
        assert!(Popup::for_kind(ActionKind::Attack, &legal).is_none());
        assert!(Popup::for_kind(ActionKind::EndTurn, &legal).is_none());
    }
}
