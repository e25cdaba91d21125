//! The discovery-and-fetch engine behind `gitsalvage`: given a base URL serving an
//! inadvertently exposed `.git/` directory, reconstruct a usable working tree from it.
//!
//! The entry point is [`Engine`]: build one with a parallelism budget, then call
//! [`Engine::clone`] for a single target or [`Engine::clone_list`] to walk a newline
//! delimited file of targets. Everything else in this crate — the job tracker, the fetch
//! workers, the artifact parsers, the rate-limit gate, and the repair pass — is plumbing in
//! service of those two calls; the orchestrator module sequences them into the thirteen
//! phases described at the top of [`orchestrator`].
//!
//! Process-level concerns this crate deliberately leaves to its caller: CLI argument
//! parsing, enumerating a list file's targets before handing them over, configuring a
//! `tracing` subscriber, and the `git checkout` binary itself (invoked as a subprocess, not
//! reimplemented).

mod commitgraph;
mod dedup;
mod dirlisting;
mod gitconfig;
mod http;
mod ignored;
mod indexstore;
mod jobtracker;
mod lfs;
mod objectdecode;
mod objectset;
mod objectstore;
mod orchestrator;
mod paths;
mod ratelimit;
mod refparse;
mod repair;
mod workers;

pub use orchestrator::{Engine, Error};
