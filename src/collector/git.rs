use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use chrono::DateTime;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use walkdir::WalkDir;

use crate::{
    config::GitConfig,
    models::{CommitDetails, Item, ItemDetails},
    utils::time::TimeRange,
};

use super::{CollectError, Collector};

/// Directory that marks the root of a repository.
const GIT_MARKER: &str = ".git";
/// hash | author name | author email | author date | subject
const LOG_FORMAT: &str = "--pretty=format:%H|%an|%ae|%ai|%s";
const LOG_FIELDS: usize = 5;
/// Format of the window bounds handed to `--since` and `--until`.
const BOUND_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const COMMIT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
const GIT_PROGRAM: &str = "git";

/// Collects commits of the configured author from local repositories.
pub struct GitCollector {
    config: GitConfig,
    program: PathBuf,
}

impl GitCollector {
    pub fn new(config: GitConfig) -> Self {
        Self {
            config,
            program: GIT_PROGRAM.into(),
        }
    }

    /// Runs `program` instead of the `git` found on `PATH`.
    pub fn with_program(self, program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..self
        }
    }

    /// Explicit repositories plus every repository found under the scanned directories.
    pub fn discover_repositories(&self) -> Result<BTreeSet<PathBuf>, CollectError> {
        let mut repos = self.config.repos.iter().cloned().collect::<BTreeSet<_>>();
        for dir in &self.config.repo_dirs {
            let found = scan_directory(dir)?;
            debug!("Found {} repositories in {dir:?}", found.len());
            repos.extend(found);
        }
        Ok(repos)
    }

    async fn collect_from_repo(
        &self,
        repo: &Path,
        range: &TimeRange,
        cancel: &CancellationToken,
    ) -> Result<Vec<Item>, CollectError> {
        self.run_git(repo, range, ["rev-parse", "--git-dir"], cancel)
            .await
            .map_err(|e| match e {
                CollectError::RepositoryAccess { path, reason } => CollectError::RepositoryAccess {
                    path,
                    reason: format!("not a git repository ({reason})"),
                },
                e => e,
            })?;

        let mut args = vec!["log".to_string()];
        if !self.config.author.is_empty() {
            args.push(format!("--author={}", self.config.author));
        }
        args.push(format!("--since={}", range.start.format(BOUND_FORMAT)));
        args.push(format!("--until={}", range.end.format(BOUND_FORMAT)));
        args.push(LOG_FORMAT.to_string());

        let output = self.run_git(repo, range, &args, cancel).await?;
        let items = parse_commits(&output, repo);
        info!("Found {} commits in {repo:?}", items.len());
        Ok(items)
    }

    /// Runs `git -C <repo> <args>`. The bounds passed to git are local times of the report
    /// timezone, so git is told to use that timezone as well.
    async fn run_git<I, S>(
        &self,
        repo: &Path,
        range: &TimeRange,
        args: I,
        cancel: &CancellationToken,
    ) -> Result<String, CollectError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut command = Command::new(&self.program);
        command
            .arg("-C")
            .arg(repo)
            .args(args)
            .env("TZ", range.timezone().name())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        trace!("Running {command:?}");

        let run = command.output();
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CollectError::Cancelled),
            output = async {
                match self.config.timeout() {
                    Some(timeout) => tokio::time::timeout(timeout, run).await.map_err(|_| {
                        CollectError::Timeout {
                            command: format!("{} -C {}", self.program.display(), repo.display()),
                            timeout,
                        }
                    }),
                    None => Ok(run.await),
                }
            } => output?,
        };

        let output = output.map_err(|e| CollectError::RepositoryAccess {
            path: repo.to_path_buf(),
            reason: format!("failed to run git: {e}"),
        })?;
        if !output.status.success() {
            return Err(CollectError::RepositoryAccess {
                path: repo.to_path_buf(),
                reason: format!(
                    "git exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Collector for GitCollector {
    fn name(&self) -> &'static str {
        "git"
    }

    async fn collect(
        &self,
        range: TimeRange,
        cancel: &CancellationToken,
    ) -> Result<Vec<Item>, CollectError> {
        let repos = self.discover_repositories()?;
        if repos.is_empty() {
            return Err(CollectError::NoRepositoriesFound);
        }

        let mut items = vec![];
        for repo in &repos {
            items.extend(self.collect_from_repo(repo, &range, cancel).await?);
        }
        Ok(items)
    }
}

/// Walks `dir` looking for repositories. The marker directory itself is never entered.
fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>, CollectError> {
    let mut repos = vec![];
    let mut walker = WalkDir::new(dir).into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|source| CollectError::Discovery {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_dir() && entry.file_name() == GIT_MARKER {
            if let Some(repo) = entry.path().parent() {
                repos.push(repo.to_path_buf());
            }
            walker.skip_current_dir();
        }
    }
    Ok(repos)
}

/// Parses output of `git log` produced with [LOG_FORMAT]. Lines that have too few fields or an
/// unreadable date are skipped.
pub fn parse_commits(output: &str, repo: &Path) -> Vec<Item> {
    let repo_name = repo
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| repo.display().to_string());

    output
        .lines()
        .filter_map(|line| {
            let fields = line
                .trim_end_matches('\r')
                .splitn(LOG_FIELDS, '|')
                .collect::<Vec<_>>();
            let [hash, author, email, date, subject] = fields.as_slice() else {
                trace!("Skipping malformed log line {line:?}");
                return None;
            };
            let time = DateTime::parse_from_str(date, COMMIT_TIME_FORMAT)
                .inspect_err(|e| trace!("Skipping commit {hash} with date {date:?}: {e}"))
                .ok()?;

            Some(Item {
                title: subject.to_string(),
                time,
                link: Some(format!("{}/commit/{hash}", repo.display())),
                content: Some(format!("{author} <{email}>")),
                details: ItemDetails::Git(CommitDetails {
                    repo: repo_name.clone(),
                    hash: hash.to_string(),
                    author: author.to_string(),
                    email: email.to_string(),
                }),
            })
        })
        .collect()
}
