//! Confirmation prompts for `prompt`-policy duplicates.
//!
//! # Overview
//!
//! Prompting is an injected capability so policy execution can run
//! unattended. [`ConsolePrompter`] talks to the user over stderr/stdin when
//! both are terminals and reports [`Confirmation::Unavailable`] otherwise;
//! `--yes` swaps in [`AssumeYes`]. [`ScriptedPrompter`] feeds pre-seeded
//! answers for tests and non-interactive embedding.

use std::collections::VecDeque;
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;

/// Answer to a confirmation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The user approved the action.
    Yes,
    /// The user declined the action.
    No,
    /// No answer could be obtained (non-interactive run, closed stdin).
    Unavailable,
}

/// Source of confirmation answers.
///
/// Implementations must be safe to call from multiple worker threads; a
/// pending prompt only suspends the task that asked.
pub trait Prompter: Send + Sync {
    /// Ask for confirmation of the described action.
    fn confirm(&self, description: &str) -> Confirmation;
}

/// Interactive prompter over stderr/stdin.
///
/// Reports [`Confirmation::Unavailable`] without blocking when either
/// stream is not a terminal.
#[derive(Debug, Default)]
pub struct ConsolePrompter {
    io: Mutex<()>,
}

impl ConsolePrompter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for ConsolePrompter {
    fn confirm(&self, description: &str) -> Confirmation {
        if !(io::stdin().is_terminal() && io::stderr().is_terminal()) {
            log::debug!("Prompt unavailable (not a terminal): {description}");
            return Confirmation::Unavailable;
        }

        // One conversation at a time; parallel workers wait their turn.
        let _guard = self.io.lock().unwrap();

        let mut stderr = io::stderr();
        let written = write!(stderr, "{description} [y/N] ").and_then(|()| stderr.flush());
        if written.is_err() {
            return Confirmation::Unavailable;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => Confirmation::Unavailable,
            Ok(_) => parse_answer(&line),
            Err(_) => Confirmation::Unavailable,
        }
    }
}

/// Constant-affirmative prompter used by `--yes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Prompter for AssumeYes {
    fn confirm(&self, description: &str) -> Confirmation {
        log::debug!("Auto-confirming: {description}");
        Confirmation::Yes
    }
}

/// Prompter that feeds pre-seeded answers in order.
///
/// Exhausted scripts report [`Confirmation::Unavailable`]. Every asked
/// description is recorded for inspection.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Confirmation>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    #[must_use]
    pub fn new(answers: Vec<Confirmation>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Descriptions asked so far, in order.
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, description: &str) -> Confirmation {
        self.asked.lock().unwrap().push(description.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Confirmation::Unavailable)
    }
}

/// Interpret a typed answer; only an explicit yes approves.
fn parse_answer(line: &str) -> Confirmation {
    let answer = line.trim();
    if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
        Confirmation::Yes
    } else {
        Confirmation::No
    }
}
