//! The recursive-download worker (§4.3): used only when the server exposes directory
//! listings. A job ending in `/` is a directory to be expanded; anything else is fetched
//! as a plain file.

use super::Context;
use crate::jobtracker::Handle;

pub fn run(handle: &Handle<String>, path: String, ctx: &Context) {
    ctx.gate.check();

    let is_dir = path.ends_with('/');
    let target = crate::paths::join_path(&ctx.base_dir, &path);
    if !is_dir && target.exists() {
        tracing::debug!(file = %target.display(), "already fetched, skipping redownload");
        return;
    }

    let uri = crate::paths::join(&ctx.base_url, &path);
    let response = match crate::http::get(&ctx.client, &uri) {
        Ok(resp) => resp,
        Err(err) => {
            tracing::error!(uri, error = %err, "couldn't fetch file");
            return;
        }
    };

    if response.status.as_u16() == 429 {
        ctx.gate.enter();
        handle.add_job(path);
        return;
    }
    if !response.status.is_success() {
        tracing::warn!(uri, code = response.status.as_u16(), "couldn't fetch file");
        return;
    }

    if is_dir {
        if !crate::paths::looks_like_html(&response.body) {
            tracing::warn!(uri, "not a directory index, skipping");
            return;
        }
        tracing::info!(uri, "fetched directory listing");
        for entry in crate::dirlisting::entries(&response.body) {
            handle.add_job(crate::paths::join(&path, &entry.href));
        }
        return;
    }

    if let Err(err) = crate::paths::create_parent_dirs(&target) {
        tracing::error!(file = %target.display(), error = %err, "couldn't create parent directories");
        return;
    }
    if let Err(err) = std::fs::write(&target, &response.body) {
        tracing::error!(file = %target.display(), error = %err, "couldn't write file");
        return;
    }
    tracing::info!(uri, file = %path, "fetched file");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::Gate;
    use std::sync::Arc;

    #[test]
    fn directory_job_enqueues_children_without_writing_a_file() {
        let server = httpmock::MockServer::start();
        let listing = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/.git/");
            then.status(200)
                .body(r#"<html><body><a href="HEAD">HEAD</a><a href="objects/">objects/</a></body></html>"#);
        });

        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::strict(
            reqwest::blocking::Client::new(),
            Arc::new(Gate::new()),
            server.base_url(),
            dir.path().to_path_buf(),
        );

        let tracker = crate::jobtracker::JobTracker::new(2);
        tracker.add_job(".git/".to_string());
        let collected = Arc::new(std::sync::Mutex::new(Vec::new()));
        let collected2 = collected.clone();
        tracker.start_and_wait(ctx, true, move |handle, job, ctx| {
            collected2.lock().unwrap().push(job.clone());
            run(handle, job, ctx);
        });

        listing.assert();
        let seen = collected.lock().unwrap();
        assert!(seen.contains(&".git/".to_string()));
        assert!(seen.contains(&".git/HEAD".to_string()));
        assert!(seen.contains(&".git/objects/".to_string()));
        assert!(!dir.path().join(".git").exists());
    }
}
