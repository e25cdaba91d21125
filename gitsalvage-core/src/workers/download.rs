//! The plain download worker: fetch one path, write it verbatim, no follow-up jobs.
//! Used for phase 3 (common files), pack members, commit-graph members, LFS objects, the
//! repair pass's missing-file fetch, and the ignored-files pass.

use super::{fetch, Context, Fetched};
use crate::jobtracker::Handle;

pub fn run(handle: &Handle<String>, path: String, ctx: &Context) {
    match fetch(ctx, &path) {
        Fetched::Cached(_) => {
            tracing::debug!(file = path, "already fetched, skipping redownload");
        }
        Fetched::Downloaded(_) | Fetched::Skip => {}
        Fetched::Retry => {
            handle.add_job(path);
        }
    }
}
