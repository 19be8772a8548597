//! Connection context persisted between invocations
//!
//! A successful `connect` stores the API URL, the user's token and a working
//! directory in `<context_dir>/context.json`. Later commands read it back,
//! `cd` moves the working directory and `logout` removes the file.

use super::plugin_run::FeedLayout;
use crate::backend::{BackendError, HttpBackend};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const CONTEXT_FILE: &str = "context.json";

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Not connected. Run 'salsa connect' first")]
    NotConnected,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt context file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Login failed: {0}")]
    Login(#[from] BackendError),
}

/// Stored connection state
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub url: String,
    pub username: String,
    pub token: String,
    /// Working directory in the backend's file tree
    pub cwd: String,
    /// Feed the working directory is inside, if any
    #[serde(default)]
    pub feed_id: Option<u64>,
    pub updated_at: DateTime<Utc>,
}

/// Context without credentials, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSummary {
    pub url: String,
    pub username: String,
    pub cwd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_id: Option<u64>,
    pub updated_at: DateTime<Utc>,
}

impl Context {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        token: impl Into<String>,
        layout: &FeedLayout,
    ) -> Self {
        let username = username.into();
        Self {
            url: url.into(),
            cwd: layout.home_dir(&username),
            username,
            token: token.into(),
            feed_id: None,
            updated_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            url: self.url.clone(),
            username: self.username.clone(),
            cwd: self.cwd.clone(),
            feed_id: self.feed_id,
            updated_at: self.updated_at,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("cwd", &self.cwd)
            .field("feed_id", &self.feed_id)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// JSON file holding the current `Context`
#[derive(Debug, Clone)]
pub struct ContextStore {
    dir: PathBuf,
}

impl ContextStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<config_dir>/salsa`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("salsa"))
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CONTEXT_FILE)
    }

    /// Stored context, `None` before the first connect
    pub fn load(&self) -> Result<Option<Context>, ContextError> {
        let path = self.path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ContextError::Io { path, source }),
        };
        let context =
            serde_json::from_str(&raw).map_err(|source| ContextError::Parse { path, source })?;
        Ok(Some(context))
    }

    pub fn require(&self) -> Result<Context, ContextError> {
        self.load()?.ok_or(ContextError::NotConnected)
    }

    pub fn save(&self, context: &Context) -> Result<(), ContextError> {
        fs::create_dir_all(&self.dir).map_err(|source| ContextError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path();
        let raw = serde_json::to_string_pretty(context).map_err(|source| ContextError::Parse {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, raw).map_err(|source| ContextError::Io { path, source })?;
        debug!("Saved context to {}", self.dir.display());
        Ok(())
    }

    /// Removes the stored context; returns whether there was one
    pub fn clear(&self) -> Result<bool, ContextError> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ContextError::Io { path, source }),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Logs in and stores a fresh context rooted at the user's home
pub async fn connect(
    store: &ContextStore,
    http: &HttpBackend,
    layout: &FeedLayout,
    username: &str,
    password: &str,
) -> Result<Context, ContextError> {
    let token = http.fetch_token(username, password).await?;
    let context = Context::new(http.base_url(), username, token, layout);
    store.save(&context)?;
    info!("Connected to {} as {}", context.url, context.username);
    Ok(context)
}

pub fn logout(store: &ContextStore) -> Result<bool, ContextError> {
    let removed = store.clear()?;
    if removed {
        info!("Removed context {}", store.path().display());
    }
    Ok(removed)
}

/// Resolves `path` against `cwd`: `.` and `..` collapse, `~` is `home`.
/// The result is absolute and never climbs above `/`.
pub fn resolve_path(cwd: &str, home: &str, path: &str) -> String {
    let path = path.trim();
    let (base, rest) = if let Some(rest) = path.strip_prefix('~') {
        (home, rest)
    } else if path.starts_with('/') {
        ("", path)
    } else {
        (cwd, path)
    };

    let mut resolved: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(rest.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    format!("/{}", resolved.join("/"))
}

/// Moves the working directory and refreshes the feed it points into
pub fn change_dir(
    store: &ContextStore,
    layout: &FeedLayout,
    path: &str,
) -> Result<Context, ContextError> {
    let mut context = store.require()?;
    let home = layout.home_dir(&context.username);
    context.cwd = resolve_path(&context.cwd, &home, path);
    context.feed_id = layout.extract_feed_id(&context.cwd);
    context.updated_at = Utc::now();
    store.save(&context)?;
    debug!("cwd is now {} (feed {:?})", context.cwd, context.feed_id);
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use yare::parameterized;

    fn store() -> (TempDir, ContextStore) {
        let temp = TempDir::new().unwrap();
        let store = ContextStore::new(temp.path().join("salsa"));
        (temp, store)
    }

    fn context() -> Context {
        Context::new(
            "http://localhost:8000/api/v1/",
            "alice",
            "secret",
            &FeedLayout::default(),
        )
    }

    #[test]
    fn test_load_before_connect() {
        let (_temp, store) = store();
        assert!(store.load().unwrap().is_none());
        assert!(matches!(store.require(), Err(ContextError::NotConnected)));
    }

    #[test]
    fn test_save_load_clear() {
        let (_temp, store) = store();
        let context = context();
        store.save(&context).unwrap();

        assert_eq!(store.load().unwrap(), Some(context));
        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file() {
        let (_temp, store) = store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(ContextError::Parse { .. })));
    }

    #[test]
    fn test_new_context_starts_at_home() {
        let context = context();
        assert_eq!(context.cwd, "/home/alice");
        assert!(context.feed_id.is_none());
        assert!(!format!("{:?}", context).contains("secret"));
        assert!(!serde_json::to_string(&context.summary())
            .unwrap()
            .contains("secret"));
    }

    #[parameterized(
        relative = { "/home/alice", "uploads", "/home/alice/uploads" },
        absolute = { "/home/alice", "/home/bob", "/home/bob" },
        parent = { "/home/alice/uploads", "..", "/home/alice" },
        dot_and_parent = { "/home/alice", "./feeds/../uploads/.", "/home/alice/uploads" },
        above_root = { "/home", "../../..", "/" },
        home = { "/home/bob", "~", "/home/alice" },
        home_relative = { "/", "~/feeds", "/home/alice/feeds" },
        trailing_slash = { "/home/alice", "uploads//", "/home/alice/uploads" },
    )]
    fn test_resolve_path(cwd: &str, path: &str, expected: &str) {
        assert_eq!(resolve_path(cwd, "/home/alice", path), expected);
    }

    #[test]
    fn test_change_dir_tracks_feed() {
        let (_temp, store) = store();
        let layout = FeedLayout::default();
        store.save(&context()).unwrap();

        let moved = change_dir(&store, &layout, "feeds/feed_12/pl-dircopy_40").unwrap();
        assert_eq!(moved.cwd, "/home/alice/feeds/feed_12/pl-dircopy_40");
        assert_eq!(moved.feed_id, Some(12));

        let moved = change_dir(&store, &layout, "../..").unwrap();
        assert_eq!(moved.cwd, "/home/alice/feeds");
        assert!(moved.feed_id.is_none());
        assert_eq!(store.require().unwrap().cwd, "/home/alice/feeds");
    }

    #[test]
    fn test_change_dir_requires_context() {
        let (_temp, store) = store();
        let result = change_dir(&store, &FeedLayout::default(), "/");
        assert!(matches!(result, Err(ContextError::NotConnected)));
    }
}
