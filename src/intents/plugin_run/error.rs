use crate::backend::BackendError;
use std::fmt;
use thiserror::Error;

/// Path piece that could not be extracted from a working directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment {
    InstanceId,
    FeedId,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::InstanceId => write!(f, "previous instance id"),
            PathSegment::FeedId => write!(f, "feed id"),
        }
    }
}

/// Step of an in-place plugin run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStep {
    SelectDircopy,
    CreateFeed,
    ExtractPath,
    RunPlugin,
}

impl fmt::Display for RunStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStep::SelectDircopy => "select dircopy plugin",
            RunStep::CreateFeed => "create feed",
            RunStep::ExtractPath => "parse working directory",
            RunStep::RunPlugin => "run plugin",
        };
        write!(f, "{}", name)
    }
}

/// Errors of an in-place plugin run
#[derive(Debug, Clone, Error)]
pub enum PluginRunError {
    /// No directory-copy plugin among the available plugins
    #[error("feed bootstrap failed: no '{plugin}' plugin among {candidates} available plugin(s)")]
    DircopyNotFound { plugin: String, candidates: usize },

    /// The backend could not create the feed or answered without ids
    #[error("feed bootstrap failed: {reason}")]
    FeedCreation { reason: String },

    /// The working directory lacks an instance or feed segment
    #[error("cannot extract {missing} from '{cwd}'")]
    PathExtraction { cwd: String, missing: PathSegment },

    /// The backend refused or failed the plugin run
    #[error("plugin run failed for '{plugin}': {source}{}", orphan_note(.orphaned_feed))]
    RemoteRun {
        plugin: String,
        #[source]
        source: BackendError,
        /// Feed created by the bootstrap step and left in place
        orphaned_feed: Option<u64>,
    },
}

fn orphan_note(orphaned_feed: &Option<u64>) -> String {
    match orphaned_feed {
        Some(feed_id) => format!(" (feed {} was created and has not been removed)", feed_id),
        None => String::new(),
    }
}

impl PluginRunError {
    pub fn step(&self) -> RunStep {
        match self {
            PluginRunError::DircopyNotFound { .. } => RunStep::SelectDircopy,
            PluginRunError::FeedCreation { .. } => RunStep::CreateFeed,
            PluginRunError::PathExtraction { .. } => RunStep::ExtractPath,
            PluginRunError::RemoteRun { .. } => RunStep::RunPlugin,
        }
    }

    /// Feed left behind by a failed run, if any
    pub fn orphaned_feed(&self) -> Option<u64> {
        match self {
            PluginRunError::RemoteRun { orphaned_feed, .. } => *orphaned_feed,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = PluginRunError::DircopyNotFound {
            plugin: "pl-dircopy".to_string(),
            candidates: 0,
        };
        assert!(err.to_string().contains("no 'pl-dircopy' plugin"));
        assert_eq!(err.step(), RunStep::SelectDircopy);

        let err = PluginRunError::PathExtraction {
            cwd: "/home/alice/feeds/feed_1".to_string(),
            missing: PathSegment::InstanceId,
        };
        assert_eq!(
            err.to_string(),
            "cannot extract previous instance id from '/home/alice/feeds/feed_1'"
        );
    }

    #[test]
    fn test_remote_run_mentions_orphaned_feed() {
        let err = PluginRunError::RemoteRun {
            plugin: "pl-foo".to_string(),
            source: BackendError::TimeoutError { seconds: 30 },
            orphaned_feed: Some(12),
        };
        let message = err.to_string();
        assert!(message.contains("timed out"));
        assert!(message.contains("feed 12 was created"));
        assert_eq!(err.orphaned_feed(), Some(12));
        assert_eq!(err.step(), RunStep::RunPlugin);

        let err = PluginRunError::RemoteRun {
            plugin: "pl-foo".to_string(),
            source: BackendError::TimeoutError { seconds: 30 },
            orphaned_feed: None,
        };
        assert!(!err.to_string().contains("feed"));
    }
}
