//! The four fetch-worker bodies plus the repair pass's object-creation worker.

pub mod createobject;
pub mod download;
pub mod findobjects;
pub mod findref;
pub mod recursive;

use std::path::PathBuf;
use std::sync::Arc;

use crate::ratelimit::Gate;

/// Immutable per-phase bundle handed to every worker in a tracker. Cheap to clone: the
/// expensive bits (`reqwest::blocking::Client`, the rate-limit gate) are themselves
/// internally reference-counted / atomics-backed.
#[derive(Clone)]
pub struct Context {
    pub client: reqwest::blocking::Client,
    pub gate: Arc<Gate>,
    pub base_url: String,
    pub base_dir: PathBuf,
    pub allow_html: bool,
    pub allow_empty: bool,
}

impl Context {
    pub fn strict(client: reqwest::blocking::Client, gate: Arc<Gate>, base_url: String, base_dir: PathBuf) -> Self {
        Self {
            client,
            gate,
            base_url,
            base_dir,
            allow_html: false,
            allow_empty: false,
        }
    }

    pub fn permissive(client: reqwest::blocking::Client, gate: Arc<Gate>, base_url: String, base_dir: PathBuf) -> Self {
        Self {
            client,
            gate,
            base_url,
            base_dir,
            allow_html: true,
            allow_empty: true,
        }
    }
}

/// Outcome of the shared fetch-and-acceptability-check prelude (§4.2 steps 1-8), common to
/// every worker that touches the network.
pub(crate) enum Fetched {
    /// The body was already on disk; re-read from there.
    Cached(Vec<u8>),
    /// A fresh download was written to `target`.
    Downloaded(Vec<u8>),
    /// Nothing to do: transport error, non-200 (handled), rejected body, or write failure.
    /// The caller should simply return.
    Skip,
    /// The job should be re-enqueued (a 429 was observed) — the caller must not proceed.
    Retry,
}

/// Implements §4.2 steps 1-8: cache check, `GET`, 429 handling, acceptability check,
/// parent-dir creation, and the write itself. Kind-specific post-processing (step 9) is
/// left to each worker.
pub(crate) fn fetch(ctx: &Context, path: &str) -> Fetched {
    ctx.gate.check();

    let target = crate::paths::join_path(&ctx.base_dir, path);
    if target.exists() {
        return match std::fs::read(&target) {
            Ok(body) => Fetched::Cached(body),
            Err(err) => {
                tracing::error!(file = %target.display(), error = %err, "couldn't read cached file");
                Fetched::Skip
            }
        };
    }

    let uri = crate::paths::join(&ctx.base_url, path);
    let response = match crate::http::get(&ctx.client, &uri) {
        Ok(resp) => resp,
        Err(err) => {
            tracing::error!(uri, error = %err, "couldn't fetch file");
            return Fetched::Skip;
        }
    };

    if response.status.as_u16() == 429 {
        ctx.gate.enter();
        return Fetched::Retry;
    }
    if !response.status.is_success() {
        tracing::warn!(uri, code = response.status.as_u16(), "couldn't fetch file");
        return Fetched::Skip;
    }

    if !ctx.allow_html && crate::paths::looks_like_html(&response.body) {
        tracing::warn!(uri, "file appears to be html, skipping");
        return Fetched::Skip;
    }
    if !ctx.allow_empty && crate::paths::is_blank(&response.body) {
        tracing::warn!(uri, "file appears to be empty, skipping");
        return Fetched::Skip;
    }

    if let Err(err) = crate::paths::create_parent_dirs(&target) {
        tracing::error!(file = %target.display(), error = %err, "couldn't create parent directories");
        return Fetched::Skip;
    }
    if let Err(err) = std::fs::write(&target, &response.body) {
        tracing::error!(file = %target.display(), error = %err, "couldn't write file");
        return Fetched::Skip;
    }

    tracing::info!(uri, file = %target.display(), "fetched file");
    Fetched::Downloaded(response.body)
}
