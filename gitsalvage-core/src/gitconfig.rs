//! Thin wrapper around `git-config` (the gitoxide project's own config/INI reader) for the
//! one thing the ref-discovery worker needs from `.git/config` and `.git/config.worktree`:
//! every `[branch "name"]` section's configured `remote`.

mod error {
    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("failed to parse git config file")]
        Parse(#[from] git_config::parser::Error),
    }
}
pub use error::Error;

/// A `[branch "name"]` section paired with its `remote` value, if any was set.
pub struct BranchRemote {
    pub branch: String,
    pub remote: String,
}

/// Parse `body` as a git config file and return the remote configured for every branch
/// section. A branch section without a `remote` key is skipped - there is nothing to
/// resolve a remote-tracking ref against.
pub fn branch_remotes(body: &[u8]) -> Result<Vec<BranchRemote>, Error> {
    let text = String::from_utf8_lossy(body);
    let config = git_config::File::try_from(text.as_ref())?;

    let mut out = Vec::new();
    if let Some(sections) = config.sections_by_name("branch") {
        for section in sections {
            let Some(branch) = section.header().subsection_name() else {
                continue;
            };
            let Some(remote) = section.value("remote") else {
                continue;
            };
            out.push(BranchRemote {
                branch: branch.to_string(),
                remote: remote.to_string(),
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_branch_remotes() {
        let body = br#"
[branch "main"]
	remote = origin
	merge = refs/heads/main
[branch "release/1.0"]
	remote = upstream
"#;
        let remotes = branch_remotes(body).unwrap();
        assert_eq!(remotes.len(), 2);
        assert_eq!(remotes[0].branch, "main");
        assert_eq!(remotes[0].remote, "origin");
        assert_eq!(remotes[1].branch, "release/1.0");
        assert_eq!(remotes[1].remote, "upstream");
    }

    #[test]
    fn branch_without_remote_is_skipped() {
        let body = br#"
[branch "main"]
	merge = refs/heads/main
"#;
        assert!(branch_remotes(body).unwrap().is_empty());
    }
}
