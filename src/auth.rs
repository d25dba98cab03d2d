// Authentication gate. Runs exactly once per invocation, before any
// command dispatch: verify the stored access token, fall back to a
// single refresh attempt, and only then ask for credentials.

use anyhow::{bail, Result};

use crate::api::ApiClient;
use crate::config::Config;
use crate::session::SessionStore;
use crate::ui::Prompter;

/// Make sure the client carries a token the backend accepts.
///
/// On interactive login failure this prints `Invalid username or
/// password` and returns an error; the caller terminates the process
/// with exit code 1.
pub fn ensure_authenticated(
    api: &mut ApiClient,
    config: &Config,
    store: &mut SessionStore,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let access = store.record().access_token.clone();
    if api.verify_token(&access) {
        api.set_token(&access);
        return Ok(());
    }

    if let Some(access) = api.refresh_access(&store.record().refresh_token) {
        store.set_access_token(&access)?;
        api.set_token(&access);
        return Ok(());
    }

    let (username, password) = collect_credentials(config, prompter)?;
    match api.obtain_tokens(&username, &password) {
        Ok((access, refresh)) => {
            store.set_access_token(&access)?;
            store.set_refresh_token(&refresh)?;
            api.set_token(&access);
            println!("Successfully authenticated");
            Ok(())
        }
        Err(_) => {
            println!("Invalid username or password");
            bail!("authentication failed")
        }
    }
}

/// Gather credentials, preferring the environment-supplied ones. Only
/// the fields the environment does not supply are prompted for, each
/// re-prompted until non-empty.
fn collect_credentials(config: &Config, prompter: &mut dyn Prompter) -> Result<(String, String)> {
    let username = match &config.username {
        Some(username) => username.clone(),
        None => loop {
            let value = prompter.read_line("Username")?;
            let value = value.trim();
            if !value.is_empty() {
                break value.to_string();
            }
        },
    };
    let password = match &config.password {
        Some(password) => password.clone(),
        None => loop {
            let value = prompter.read_password("Password")?;
            if !value.is_empty() {
                break value;
            }
        },
    };
    Ok((username, password))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedPrompter {
        lines: Vec<String>,
        prompts: Vec<String>,
    }

    impl ScriptedPrompter {
        fn new(lines: &[&str]) -> Self {
            ScriptedPrompter {
                lines: lines.iter().rev().map(|s| s.to_string()).collect(),
                prompts: Vec::new(),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn read_line(&mut self, prompt: &str) -> Result<String> {
            self.prompts.push(prompt.to_string());
            Ok(self.lines.pop().expect("unexpected prompt"))
        }

        fn read_password(&mut self, prompt: &str) -> Result<String> {
            self.prompts.push(prompt.to_string());
            Ok(self.lines.pop().expect("unexpected prompt"))
        }
    }

    fn config(username: Option<&str>, password: Option<&str>) -> Config {
        Config {
            endpoint: "http://localhost:8000".into(),
            username: username.map(str::to_string),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn environment_credentials_suppress_all_prompts() {
        let mut prompter = ScriptedPrompter::new(&[]);
        let (user, pass) =
            collect_credentials(&config(Some("alice"), Some("s3cret")), &mut prompter).unwrap();
        assert_eq!(user, "alice");
        assert_eq!(pass, "s3cret");
        assert!(prompter.prompts.is_empty());
    }

    #[test]
    fn only_missing_fields_are_prompted() {
        let mut prompter = ScriptedPrompter::new(&["s3cret"]);
        let (user, pass) =
            collect_credentials(&config(Some("alice"), None), &mut prompter).unwrap();
        assert_eq!(user, "alice");
        assert_eq!(pass, "s3cret");
        assert_eq!(prompter.prompts, vec!["Password"]);
    }

    #[test]
    fn empty_input_is_reprompted_until_satisfied() {
        let mut prompter = ScriptedPrompter::new(&["", "  ", "alice", "", "s3cret"]);
        let (user, pass) = collect_credentials(&config(None, None), &mut prompter).unwrap();
        assert_eq!(user, "alice");
        assert_eq!(pass, "s3cret");
        assert_eq!(
            prompter.prompts,
            vec!["Username", "Username", "Username", "Password", "Password"]
        );
    }
}
