// Library root
// -----------
// This crate exposes a small library surface for the `beagle` CLI. The
// binary (`main.rs`) wires these modules together for one invocation.
//
// Module responsibilities:
// - `cli`: Typed command grammar (clap derive) decoded from process
//   arguments.
// - `config`: Environment-derived configuration and the endpoint catalog.
// - `session`: The persisted session record (tokens + pagination cursors).
// - `auth`: The verify -> refresh -> interactive-login gate that runs
//   before any command.
// - `api`: Blocking HTTP dispatcher for authenticated backend calls.
// - `commands`: Maps each decoded command to one dispatcher call.
// - `access`: Local symlink farming over completed pipeline runs.
// - `ui`: Line-input collaborator (prompts) and the pagination loop.
//
// Keeping this separation makes it easier to test each piece in
// isolation: the prompting trait in `ui` is the only interactive seam.
pub mod access;
pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod session;
pub mod ui;
