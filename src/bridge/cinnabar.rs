//! Talking to git-cinnabar through its `git cinnabar` subcommands.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, debug_span};

use crate::bridge::error::{BridgeError, BridgeResult};
use crate::bridge::mapping::ForeignId;
use crate::vcs::CommitId;

/// What the hash bridge needs from git-cinnabar.
pub trait ChangesetSource {
    /// The Mercurial changeset for `commit`, or `None` if cinnabar has not
    /// assigned one yet.
    fn git2hg(&self, commit: CommitId) -> BridgeResult<Option<ForeignId>>;

    /// Write a version 1 bundle covering `base..tip` to `dest`.
    fn write_bundle(&self, base: CommitId, tip: CommitId, dest: &Path) -> BridgeResult<()>;
}

/// Runs the `git cinnabar` subcommands in a working tree.
pub struct Cinnabar {
    workdir: PathBuf,
}

impl Cinnabar {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.workdir).arg("cinnabar");
        cmd.stdin(Stdio::null());
        cmd
    }

    fn run(&self, name: &str, mut cmd: Command) -> BridgeResult<Vec<u8>> {
        debug!("{cmd:?}");
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(BridgeError::Cinnabar {
                command: name.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

impl ChangesetSource for Cinnabar {
    fn git2hg(&self, commit: CommitId) -> BridgeResult<Option<ForeignId>> {
        let _span = debug_span!("git2hg", "{}", commit).entered();

        let mut cmd = self.git();
        cmd.arg("git2hg").arg(commit.to_string());
        let stdout = self.run("git2hg", cmd)?;

        let text = String::from_utf8_lossy(&stdout);
        let id = ForeignId::parse(&text).ok_or_else(|| BridgeError::BadOutput(text.to_string()))?;
        Ok((!id.is_null()).then_some(id))
    }

    fn write_bundle(&self, base: CommitId, tip: CommitId, dest: &Path) -> BridgeResult<()> {
        let _span = debug_span!("bundle", "{}..{}", base, tip).entered();

        let mut cmd = self.git();
        cmd.arg("bundle")
            .arg("--version")
            .arg("1")
            .arg(dest)
            .arg(format!("{base}..{tip}"));
        self.run("bundle", cmd)?;
        Ok(())
    }
}
