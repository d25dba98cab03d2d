// UI layer: line-input prompts via `dialoguer` and the interactive
// pagination loop that runs after list-style commands. All blocking
// reads go through the `Prompter` trait so the suspension points are an
// explicit, swappable collaborator.

use anyhow::Result;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::api::{self, ApiClient};
use crate::session::SessionStore;

/// Blocking line-input collaborator. The terminal implementation wraps
/// `dialoguer`; tests drive flows with a scripted implementation.
pub trait Prompter {
    /// Read one line of input. May return an empty string.
    fn read_line(&mut self, prompt: &str) -> Result<String>;
    /// Read a password without echoing it.
    fn read_password(&mut self, prompt: &str) -> Result<String>;
}

/// Prompter backed by the real terminal.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        let value: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(value)
    }

    fn read_password(&mut self, prompt: &str) -> Result<String> {
        let value = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?;
        Ok(value)
    }
}

/// Spinner shown while a request is in flight.
pub fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Offer further pages until both cursors are exhausted or the user
/// declines. Each accepted answer issues a GET against the stored
/// cursor URL (already absolute) and refreshes both cursors from the
/// returned envelope.
pub fn paginate(
    api: &ApiClient,
    store: &mut SessionStore,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    loop {
        let next = store.record().next_cursor.clone();
        let prev = store.record().prev_cursor.clone();
        let url = match choose_page(next, prev, prompter)? {
            Some(url) => url,
            None => break,
        };
        match api.get_absolute(&url) {
            Ok(page) => {
                println!("{}", api::pretty(&page));
                store.update_cursors(&page)?;
            }
            Err(e) => {
                println!("{:#}", e);
                break;
            }
        }
    }
    Ok(())
}

/// Decide which page to fetch, if any. The prompt wording depends on
/// which cursors are available:
/// - both: only the literal answers `next`/`prev` page;
/// - next only: only the literal answer `next` pages;
/// - prev only: any non-empty answer pages back, empty stops.
fn choose_page(
    next: Option<String>,
    prev: Option<String>,
    prompter: &mut dyn Prompter,
) -> Result<Option<String>> {
    let choice = match (next, prev) {
        (None, None) => None,
        (Some(next), Some(prev)) => {
            match prompter.read_line("Another page (next, prev)")?.trim() {
                "next" => Some(next),
                "prev" => Some(prev),
                _ => None,
            }
        }
        (Some(next), None) => match prompter.read_line("Another page (next)")?.trim() {
            "next" => Some(next),
            _ => None,
        },
        (None, Some(prev)) => {
            if prompter.read_line("Another page (prev)")?.trim().is_empty() {
                None
            } else {
                Some(prev)
            }
        }
    };
    Ok(choice)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedPrompter {
        lines: Vec<String>,
    }

    impl ScriptedPrompter {
        fn new(lines: &[&str]) -> Self {
            // Answers are popped front-to-back.
            ScriptedPrompter {
                lines: lines.iter().rev().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn read_line(&mut self, _prompt: &str) -> Result<String> {
            Ok(self.lines.pop().expect("unexpected prompt"))
        }

        fn read_password(&mut self, _prompt: &str) -> Result<String> {
            Ok(self.lines.pop().expect("unexpected prompt"))
        }
    }

    fn choose(next: Option<&str>, prev: Option<&str>, answers: &[&str]) -> Option<String> {
        let mut prompter = ScriptedPrompter::new(answers);
        choose_page(
            next.map(str::to_string),
            prev.map(str::to_string),
            &mut prompter,
        )
        .unwrap()
    }

    #[test]
    fn no_cursors_means_no_prompt() {
        assert_eq!(choose(None, None, &[]), None);
    }

    #[test]
    fn both_cursors_accept_only_literal_answers() {
        assert_eq!(choose(Some("n"), Some("p"), &["next"]), Some("n".into()));
        assert_eq!(choose(Some("n"), Some("p"), &["prev"]), Some("p".into()));
        assert_eq!(choose(Some("n"), Some("p"), &["forward"]), None);
        assert_eq!(choose(Some("n"), Some("p"), &[""]), None);
    }

    #[test]
    fn next_only_accepts_literal_next() {
        assert_eq!(choose(Some("n"), None, &["next"]), Some("n".into()));
        assert_eq!(choose(Some("n"), None, &["prev"]), None);
    }

    #[test]
    fn prev_only_pages_on_any_nonempty_answer() {
        assert_eq!(choose(None, Some("p"), &["y"]), Some("p".into()));
        assert_eq!(choose(None, Some("p"), &["prev"]), Some("p".into()));
        assert_eq!(choose(None, Some("p"), &[""]), None);
    }
}
