//! The object-discovery worker (§4.5): fetch (or read the cached copy of) a loose object,
//! decode it, and enqueue every hash it refers to. HTML/empty rejection is unconditional
//! here — these are always git-format bodies.

use std::sync::Arc;

use git_hash::ObjectId;

use crate::dedup::ObjectRegistry;
use crate::jobtracker::Handle;
use crate::objectstore::ObjectStore;

#[derive(Clone)]
pub struct ObjectContext {
    pub client: reqwest::blocking::Client,
    pub gate: Arc<crate::ratelimit::Gate>,
    pub base_url: String,
    pub base_dir: std::path::PathBuf,
    pub registry: Arc<ObjectRegistry>,
    pub store: Arc<ObjectStore>,
}

pub fn run(handle: &Handle<ObjectId>, id: ObjectId, ctx: &ObjectContext) {
    if !ctx.registry.insert_if_new(id) {
        return;
    }

    let hex = id.to_string();
    let rel_path = format!(".git/objects/{}/{}", &hex[0..2], &hex[2..]);
    let target = crate::paths::join_path(&ctx.base_dir, &rel_path);

    if target.exists() {
        tracing::debug!(obj = %id, "already fetched, skipping redownload");
        match ctx.store.read(&id) {
            Ok(Some((kind, data))) => expand(handle, kind, &data),
            Ok(None) => tracing::error!(obj = %id, "couldn't read object"),
            Err(err) => tracing::error!(obj = %id, error = %err, "couldn't read object"),
        }
        return;
    }

    ctx.gate.check();
    let uri = crate::paths::join(&ctx.base_url, &rel_path);
    let response = match crate::http::get(&ctx.client, &uri) {
        Ok(resp) => resp,
        Err(err) => {
            tracing::error!(obj = %id, error = %err, "failed to fetch object");
            return;
        }
    };

    if response.status.as_u16() == 429 {
        ctx.gate.enter();
        handle.add_job(id);
        return;
    }
    if !response.status.is_success() {
        tracing::warn!(obj = %id, code = response.status.as_u16(), "failed to fetch object");
        return;
    }
    if crate::paths::looks_like_html(&response.body) {
        tracing::warn!(uri, "file appears to be html, skipping");
        return;
    }
    if crate::paths::is_blank(&response.body) {
        tracing::warn!(uri, "file appears to be empty, skipping");
        return;
    }
    if let Err(err) = crate::paths::create_parent_dirs(&target) {
        tracing::error!(uri, file = %target.display(), error = %err, "couldn't create parent directories");
        return;
    }
    if let Err(err) = std::fs::write(&target, &response.body) {
        tracing::error!(uri, file = %target.display(), error = %err, "couldn't write file");
        return;
    }
    tracing::info!(obj = %id, "fetched object");

    match ctx.store.read(&id) {
        Ok(Some((kind, data))) => expand(handle, kind, &data),
        Ok(None) => tracing::error!(obj = %id, "couldn't read object"),
        Err(err) => tracing::error!(obj = %id, error = %err, "couldn't read object"),
    }
}

fn expand(handle: &Handle<ObjectId>, kind: git_object::Kind, data: &[u8]) {
    for referenced in crate::objectdecode::referenced_hashes(kind, data) {
        handle.add_job(referenced);
    }
}
