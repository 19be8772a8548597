use super::paths::FeedLayout;

/// Where a working directory sits relative to the feed tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathContext {
    /// Outside any feed: a new feed has to be bootstrapped first
    FreshFeed { cwd: String },
    /// Inside a feed: the new instance chains onto an existing one
    ContinueFeed { cwd: String },
}

impl PathContext {
    pub fn in_feed(&self) -> bool {
        matches!(self, PathContext::ContinueFeed { .. })
    }

    pub fn cwd(&self) -> &str {
        match self {
            PathContext::FreshFeed { cwd } | PathContext::ContinueFeed { cwd } => cwd,
        }
    }
}

/// True when the path contains a `feeds/feed_<n>` segment pair
pub fn is_in_feed(cwd: &str, layout: &FeedLayout) -> bool {
    let segments: Vec<&str> = cwd.split('/').collect();
    layout.feed_segment_index(&segments).is_some()
}

pub fn classify(cwd: &str, layout: &FeedLayout) -> PathContext {
    let cwd = cwd.to_string();
    if is_in_feed(&cwd, layout) {
        PathContext::ContinueFeed { cwd }
    } else {
        PathContext::FreshFeed { cwd }
    }
}
