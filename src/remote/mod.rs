//! Client for the package-repository HTTP API.
//!
//! Two verbs, two base URLs: listings come from an HTML index page under the
//! list base, deletions go to the content base with basic-auth credentials.
//! The transport is a trait so command logic (protected-path guard,
//! recursion, pattern filtering) is testable without a server.

use std::io::{self, BufRead, Write};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub mod listing;

use self::listing::parse_entries;

/// Path segments that `rm` refuses to touch without a forced, confirmed
/// override.
pub const PROTECTED_SEGMENTS: [&str; 2] = ["master", "develop"];

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("'{path}' contains protected segment '{segment}'; pass -f and confirm to override")]
    ProtectedPath { path: String, segment: String },
    #[error("remote API rejected delete of '{path}': {message}")]
    Api { path: String, message: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    BadResponse(String),
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
    #[error("invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// The two HTTP operations the repository exposes.
pub trait RepoTransport {
    /// GET the index page for `path`; returns the raw HTML body.
    fn get_listing(&self, path: &str) -> Result<String, RemoteError>;

    /// DELETE `path`; returns the raw response body (JSON).
    fn delete(&self, path: &str) -> Result<String, RemoteError>;
}

/// Production transport over `reqwest::blocking`.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    list_base: String,
    content_base: String,
    user: String,
    password: String,
}

impl HttpTransport {
    /// Read endpoints and credentials from the environment (`.env`
    /// supported): `SXREPO_LIST_URL`, `SXREPO_CONTENT_URL`, `SXREPO_USER`,
    /// `SXREPO_PASSWORD`.
    pub fn from_env() -> Result<Self, RemoteError> {
        dotenvy::dotenv().ok();
        let var = |name: &'static str| {
            std::env::var(name).map_err(|_| RemoteError::MissingEnv(name))
        };
        Ok(Self {
            client: reqwest::blocking::Client::new(),
            list_base: var("SXREPO_LIST_URL")?,
            content_base: var("SXREPO_CONTENT_URL")?,
            user: var("SXREPO_USER")?,
            password: var("SXREPO_PASSWORD")?,
        })
    }

    fn url(base: &str, path: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

impl RepoTransport for HttpTransport {
    fn get_listing(&self, path: &str) -> Result<String, RemoteError> {
        let url = Self::url(&self.list_base, path);
        debug!(%url, "listing");
        let resp = self.client.get(&url).send()?;
        if !resp.status().is_success() {
            return Err(RemoteError::BadResponse(format!(
                "GET {url} returned {}",
                resp.status()
            )));
        }
        Ok(resp.text()?)
    }

    fn delete(&self, path: &str) -> Result<String, RemoteError> {
        let url = Self::url(&self.content_base, path);
        debug!(%url, "delete");
        let resp = self
            .client
            .delete(&url)
            .basic_auth(&self.user, Some(&self.password))
            .send()?;
        if !resp.status().is_success() {
            return Err(RemoteError::BadResponse(format!(
                "DELETE {url} returned {}",
                resp.status()
            )));
        }
        Ok(resp.text()?)
    }
}

/// Injected confirmation capability for destructive overrides.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Real prompt: asks on stderr, requires the literal answer `yes`.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        let mut err = io::stderr();
        let _ = write!(err, "{prompt} [type 'yes' to continue] ");
        let _ = err.flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        answer.trim() == "yes"
    }
}

/// One entry of a (possibly recursive) listing, path relative to the
/// requested root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub path: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
    pub recursive: bool,
    pub force: bool,
    pub pattern: Option<Regex>,
}

/// What a `remove` run actually did.
#[derive(Debug, Default)]
pub struct RemoveReport {
    pub deleted: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Deserialize)]
struct DeleteResponse {
    message: String,
}

pub struct RepoClient<T> {
    transport: T,
}

impl<T: RepoTransport> RepoClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// List `path`, depth-first through subdirectories when `recursive`.
    pub fn list(&self, path: &str, recursive: bool) -> Result<Vec<ListedEntry>, RemoteError> {
        let mut out = Vec::new();
        self.list_into(path, "", recursive, &mut out)?;
        Ok(out)
    }

    fn list_into(
        &self,
        root: &str,
        prefix: &str,
        recursive: bool,
        out: &mut Vec<ListedEntry>,
    ) -> Result<(), RemoteError> {
        let remote_path = join(root, prefix);
        let html = self.transport.get_listing(&remote_path)?;
        for entry in parse_entries(&html) {
            let rel = join(prefix, &entry.name);
            out.push(ListedEntry {
                path: rel.clone(),
                is_dir: entry.is_dir,
            });
            if entry.is_dir && recursive {
                self.list_into(root, &rel, recursive, out)?;
            }
        }
        Ok(())
    }

    /// Delete `path` (or, recursively, the files under it).
    ///
    /// The protected-segment guard covers the argument path (checked before
    /// any network traffic) and every file the recursive walk discovers: a
    /// path component named `master` or `develop` aborts the whole run, with
    /// nothing deleted, unless `force` is set and `confirm` approves that
    /// segment. With a pattern, only files whose name matches are deleted;
    /// the rest are reported as skipped. Directories themselves are left to
    /// the repository's own garbage collection.
    pub fn remove(
        &self,
        path: &str,
        opts: &RemoveOptions,
        confirm: &mut dyn Confirm,
    ) -> Result<RemoveReport, RemoteError> {
        let mut approved: Vec<&'static str> = Vec::new();
        self.ensure_allowed(path, opts, confirm, &mut approved)?;

        let mut report = RemoveReport::default();
        if opts.recursive {
            let entries = self.list(path, true)?;
            let mut doomed = Vec::new();
            for entry in entries.iter().filter(|e| !e.is_dir) {
                let full = join(path, &entry.path);
                if matches_pattern(&opts.pattern, &entry.path) {
                    doomed.push(full);
                } else {
                    report.skipped.push(full);
                }
            }
            // Guard the full candidate list before the first DELETE goes
            // out, so a protected file never leaves a half-finished run.
            for full in &doomed {
                self.ensure_allowed(full, opts, confirm, &mut approved)?;
            }
            for full in doomed {
                self.delete_one(&full)?;
                report.deleted.push(full);
            }
        } else if matches_pattern(&opts.pattern, path) {
            self.delete_one(path)?;
            report.deleted.push(path.to_string());
        } else {
            report.skipped.push(path.to_string());
        }
        Ok(report)
    }

    fn ensure_allowed(
        &self,
        path: &str,
        opts: &RemoveOptions,
        confirm: &mut dyn Confirm,
        approved: &mut Vec<&'static str>,
    ) -> Result<(), RemoteError> {
        let Some(segment) = protected_segment(path) else {
            return Ok(());
        };
        if approved.contains(&segment) {
            return Ok(());
        }
        let refused = RemoteError::ProtectedPath {
            path: path.to_string(),
            segment: segment.to_string(),
        };
        if !opts.force {
            return Err(refused);
        }
        let prompt = format!("'{path}' touches protected segment '{segment}'. Delete anyway?");
        if !confirm.confirm(&prompt) {
            return Err(refused);
        }
        approved.push(segment);
        Ok(())
    }

    fn delete_one(&self, path: &str) -> Result<(), RemoteError> {
        let body = self.transport.delete(path)?;
        let resp: DeleteResponse = serde_json::from_str(&body)
            .map_err(|_| RemoteError::BadResponse(body.clone()))?;
        if resp.message != "success" {
            warn!(path, message = %resp.message, "delete rejected");
            return Err(RemoteError::Api {
                path: path.to_string(),
                message: resp.message,
            });
        }
        debug!(path, "deleted");
        Ok(())
    }
}

fn matches_pattern(pattern: &Option<Regex>, path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    pattern.as_ref().map_or(true, |re| re.is_match(name))
}

/// Find the first protected component of a `/`-separated path.
fn protected_segment(path: &str) -> Option<&'static str> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .find_map(|s| PROTECTED_SEGMENTS.iter().copied().find(|p| *p == s))
}

fn join(base: &str, name: &str) -> String {
    let base = base.trim_matches('/');
    let name = name.trim_matches('/');
    match (base.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory repository with a call log.
    #[derive(Default)]
    struct FakeTransport {
        listings: HashMap<String, String>,
        delete_body: HashMap<String, String>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeTransport {
        fn with_listing(mut self, path: &str, html: &str) -> Self {
            self.listings.insert(path.to_string(), html.to_string());
            self
        }

        fn with_delete(mut self, path: &str, body: &str) -> Self {
            self.delete_body.insert(path.to_string(), body.to_string());
            self
        }
    }

    impl RepoTransport for FakeTransport {
        fn get_listing(&self, path: &str) -> Result<String, RemoteError> {
            self.calls.borrow_mut().push(format!("GET {path}"));
            self.listings
                .get(path)
                .cloned()
                .ok_or_else(|| RemoteError::BadResponse(format!("no listing for {path}")))
        }

        fn delete(&self, path: &str) -> Result<String, RemoteError> {
            self.calls.borrow_mut().push(format!("DELETE {path}"));
            Ok(self
                .delete_body
                .get(path)
                .cloned()
                .unwrap_or_else(|| r#"{"message": "success"}"#.to_string()))
        }
    }

    fn anchors(names: &[&str]) -> String {
        names
            .iter()
            .map(|n| format!("<a href=\"{n}\">{n}</a>"))
            .collect()
    }

    fn deny() -> impl FnMut(&str) -> bool {
        |_: &str| false
    }

    #[test]
    fn protected_path_fails_before_any_network_call() {
        let client = RepoClient::new(FakeTransport::default());
        let err = client
            .remove("master/foo.txt", &RemoveOptions::default(), &mut deny())
            .unwrap_err();
        assert!(matches!(err, RemoteError::ProtectedPath { ref segment, .. } if segment == "master"));
        assert!(client.transport.calls.borrow().is_empty());
    }

    #[test]
    fn forced_removal_still_needs_a_yes() {
        let client = RepoClient::new(FakeTransport::default());
        let opts = RemoveOptions { force: true, ..Default::default() };

        let err = client.remove("a/develop/b.txt", &opts, &mut deny()).unwrap_err();
        assert!(matches!(err, RemoteError::ProtectedPath { ref segment, .. } if segment == "develop"));
        assert!(client.transport.calls.borrow().is_empty());

        let mut seen_prompt = String::new();
        let mut accept = |prompt: &str| {
            seen_prompt = prompt.to_string();
            true
        };
        let report = client.remove("a/develop/b.txt", &opts, &mut accept).unwrap();
        assert_eq!(report.deleted, ["a/develop/b.txt"]);
        assert!(seen_prompt.contains("develop"));
        assert_eq!(*client.transport.calls.borrow(), ["DELETE a/develop/b.txt"]);
    }

    #[test]
    fn plain_removal_deletes_exactly_the_path() {
        let client = RepoClient::new(FakeTransport::default());
        let report = client
            .remove("pkgs/tool-1.0.tar.gz", &RemoveOptions::default(), &mut deny())
            .unwrap();
        assert_eq!(report.deleted, ["pkgs/tool-1.0.tar.gz"]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn api_error_message_is_surfaced() {
        let transport = FakeTransport::default()
            .with_delete("pkgs/gone.tar.gz", r#"{"message": "not found"}"#);
        let client = RepoClient::new(transport);
        let err = client
            .remove("pkgs/gone.tar.gz", &RemoveOptions::default(), &mut deny())
            .unwrap_err();
        assert!(matches!(err, RemoteError::Api { ref message, .. } if message == "not found"));
    }

    #[test]
    fn malformed_delete_response_is_a_bad_response() {
        let transport = FakeTransport::default().with_delete("pkgs/x", "<html>oops</html>");
        let client = RepoClient::new(transport);
        assert!(matches!(
            client
                .remove("pkgs/x", &RemoveOptions::default(), &mut deny())
                .unwrap_err(),
            RemoteError::BadResponse(_)
        ));
    }

    #[test]
    fn recursive_listing_walks_depth_first() {
        let transport = FakeTransport::default()
            .with_listing("pkgs", &anchors(&["docs/", "a.tar.gz"]))
            .with_listing("pkgs/docs", &anchors(&["readme.md"]));
        let client = RepoClient::new(transport);

        let entries = client.list("pkgs", true).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["docs", "docs/readme.md", "a.tar.gz"]);
        assert!(entries[0].is_dir);
    }

    #[test]
    fn flat_listing_does_not_descend() {
        let transport = FakeTransport::default()
            .with_listing("pkgs", &anchors(&["docs/", "a.tar.gz"]));
        let client = RepoClient::new(transport);
        let entries = client.list("pkgs", false).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(*client.transport.calls.borrow(), ["GET pkgs"]);
    }

    #[test]
    fn recursive_removal_honors_the_pattern() {
        let transport = FakeTransport::default()
            .with_listing("pkgs", &anchors(&["docs/", "a.tar.gz", "notes.txt"]))
            .with_listing("pkgs/docs", &anchors(&["b.tar.gz", "readme.md"]));
        let client = RepoClient::new(transport);

        let opts = RemoveOptions {
            recursive: true,
            force: false,
            pattern: Some(Regex::new(r"\.tar\.gz$").unwrap()),
        };
        let report = client.remove("pkgs", &opts, &mut deny()).unwrap();
        assert_eq!(report.deleted, ["pkgs/docs/b.tar.gz", "pkgs/a.tar.gz"]);
        assert_eq!(report.skipped, ["pkgs/docs/readme.md", "pkgs/notes.txt"]);
    }

    #[test]
    fn recursive_removal_refuses_protected_files_found_during_the_walk() {
        let transport = FakeTransport::default()
            .with_listing("pkgs", &anchors(&["master/", "a.tar.gz"]))
            .with_listing("pkgs/master", &anchors(&["release.tar.gz"]));
        let client = RepoClient::new(transport);

        let opts = RemoveOptions { recursive: true, ..Default::default() };
        let err = client.remove("pkgs", &opts, &mut deny()).unwrap_err();
        assert!(matches!(err, RemoteError::ProtectedPath { ref segment, .. } if segment == "master"));

        // Listing is fine, but nothing may have been deleted.
        let calls = client.transport.calls.borrow();
        assert!(calls.iter().all(|c| !c.starts_with("DELETE")), "{calls:?}");
    }

    #[test]
    fn forced_recursive_removal_confirms_each_protected_segment_once() {
        let transport = FakeTransport::default()
            .with_listing("pkgs", &anchors(&["master/", "a.tar.gz"]))
            .with_listing("pkgs/master", &anchors(&["r1.tar.gz", "r2.tar.gz"]));
        let client = RepoClient::new(transport);

        let opts = RemoveOptions { recursive: true, force: true, ..Default::default() };
        let mut prompts = Vec::new();
        let mut accept = |prompt: &str| {
            prompts.push(prompt.to_string());
            true
        };
        let report = client.remove("pkgs", &opts, &mut accept).unwrap();
        assert_eq!(
            report.deleted,
            ["pkgs/master/r1.tar.gz", "pkgs/master/r2.tar.gz", "pkgs/a.tar.gz"]
        );
        assert_eq!(prompts.len(), 1, "{prompts:?}");
        assert!(prompts[0].contains("master"));
    }

    #[test]
    fn declined_confirmation_mid_walk_deletes_nothing() {
        let transport = FakeTransport::default()
            .with_listing("pkgs", &anchors(&["a.tar.gz", "develop/"]))
            .with_listing("pkgs/develop", &anchors(&["b.tar.gz"]));
        let client = RepoClient::new(transport);

        let opts = RemoveOptions { recursive: true, force: true, ..Default::default() };
        let err = client.remove("pkgs", &opts, &mut deny()).unwrap_err();
        assert!(matches!(err, RemoteError::ProtectedPath { ref segment, .. } if segment == "develop"));
        let calls = client.transport.calls.borrow();
        assert!(calls.iter().all(|c| !c.starts_with("DELETE")), "{calls:?}");
    }

    #[test]
    fn pattern_applies_to_single_file_removal_too() {
        let client = RepoClient::new(FakeTransport::default());
        let opts = RemoveOptions {
            pattern: Some(Regex::new(r"\.tar\.gz$").unwrap()),
            ..Default::default()
        };
        let report = client.remove("pkgs/readme.md", &opts, &mut deny()).unwrap();
        assert!(report.deleted.is_empty());
        assert_eq!(report.skipped, ["pkgs/readme.md"]);
        assert!(client.transport.calls.borrow().is_empty());
    }
}
