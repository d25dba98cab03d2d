// Entrypoint for the CLI application.
// - Keeps `main` small: decode arguments, open the session store, run
//   the auth gate, then hand the command to the resolver.
// - Exit code is 1 on authentication failure, 0 otherwise.

use beagle_cli::{
    api::ApiClient, auth, cli::Cli, commands, config::Config, session::SessionStore,
    ui::TerminalPrompter,
};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env();
    let mut store = SessionStore::open()?;
    let mut api = ApiClient::new(&config)?;
    let mut prompter = TerminalPrompter;

    // The gate runs once per invocation, before any command dispatch.
    if auth::ensure_authenticated(&mut api, &config, &mut store, &mut prompter).is_err() {
        std::process::exit(1);
    }

    commands::run(cli.command, &api, &mut store, &mut prompter)
}
