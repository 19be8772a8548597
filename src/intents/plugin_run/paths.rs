//! Feed directory layout and output-path prediction
//!
//! The backend stores the output of a plugin instance under
//! `/home/<user>/feeds/feed_<feedId>/<plugin>_<instanceId>/.../data/`, each
//! chained instance nesting inside its parent's directory. The run call does
//! not return that path, so it is predicted here from the naming convention.
//! Predictions are best-effort: every derivation returns a path, falling back
//! to a synthesized one when the working directory does not match.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use regex::Regex;

/// Naming convention of feed directories in the backend's file tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedLayout {
    /// Top-level directory holding user homes (`home`)
    pub home_root: String,
    /// Directory under a home holding feeds (`feeds`)
    pub feeds_dir: String,
    /// Prefix of a feed directory, followed by the feed id (`feed_`)
    pub feed_prefix: String,
    /// Output directory of a plugin instance (`data`)
    pub output_dir: String,
    /// Stand-in directory name used when a parent instance cannot be located
    pub fallback_prefix: String,
    /// User assumed when the working directory carries none
    pub default_user: String,
    /// Name of the directory-copy plugin that seeds feeds
    pub dircopy_plugin: String,
}

impl Default for FeedLayout {
    fn default() -> Self {
        Self {
            home_root: "home".to_string(),
            feeds_dir: "feeds".to_string(),
            feed_prefix: "feed_".to_string(),
            output_dir: "data".to_string(),
            fallback_prefix: "previous".to_string(),
            default_user: "chris".to_string(),
            dircopy_plugin: "pl-dircopy".to_string(),
        }
    }
}

fn instance_segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<name>.+)_(?P<id>\d+)$").expect("valid regex"))
}

/// Splits `<name>_<digits>` into its parts
pub fn parse_instance_segment(segment: &str) -> Option<(&str, u64)> {
    let caps = instance_segment_regex().captures(segment)?;
    let name = caps.name("name")?.as_str();
    let id = caps.name("id")?.as_str().parse().ok()?;
    Some((name, id))
}

impl FeedLayout {
    /// Feed id when `segment` is exactly `<feed_prefix><digits>`
    pub fn feed_segment_id(&self, segment: &str) -> Option<u64> {
        let digits = segment.strip_prefix(&self.feed_prefix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Index of the first `<feeds_dir>/<feed_prefix><n>` pair, pointing at the feed segment
    pub(crate) fn feed_segment_index(&self, segments: &[&str]) -> Option<usize> {
        segments
            .windows(2)
            .position(|pair| pair[0] == self.feeds_dir && self.feed_segment_id(pair[1]).is_some())
            .map(|i| i + 1)
    }

    /// User name taken from the third slash-delimited segment (`/home/<user>/...`)
    pub fn user_from_cwd(&self, cwd: &str) -> String {
        match cwd.split('/').nth(2) {
            Some(user) if !user.is_empty() => user.to_string(),
            _ => self.default_user.clone(),
        }
    }

    /// `/home/<user>` for a user
    pub fn home_dir(&self, user: &str) -> String {
        format!("/{}/{}", self.home_root, user)
    }

    /// `/home/<user>/feeds/feed_<id>`
    pub fn feed_root(&self, user: &str, feed_id: u64) -> String {
        format!(
            "{}/{}/{}{}",
            self.home_dir(user),
            self.feeds_dir,
            self.feed_prefix,
            feed_id
        )
    }

    /// Feed id from the first `<feeds_dir>/<feed_prefix><digits>` pair of the path
    pub fn extract_feed_id(&self, cwd: &str) -> Option<u64> {
        let segments: Vec<&str> = cwd.split('/').collect();
        let index = self.feed_segment_index(&segments)?;
        self.feed_segment_id(segments[index])
    }

    /// First segment below the feed directory, or 0 outside a feed
    fn instance_scan_start(&self, segments: &[&str]) -> usize {
        self.feed_segment_index(segments).map_or(0, |index| index + 1)
    }

    /// Id of the instance whose output directory `cwd` is inside.
    ///
    /// Takes the right-most `<name>_<digits>` segment. When the path contains
    /// a feed segment only the segments below it are considered, so neither
    /// the feed directory nor anything above it (a user named `joe_2`) is
    /// mistaken for an instance.
    pub fn extract_previous_instance_id(&self, cwd: &str) -> Option<u64> {
        let segments: Vec<&str> = cwd.split('/').collect();
        let start = self.instance_scan_start(&segments);

        segments[start..]
            .iter()
            .rev()
            .filter(|segment| self.feed_segment_id(segment).is_none())
            .find_map(|segment| parse_instance_segment(segment).map(|(_, id)| id))
    }

    /// Path of the directory of instance `previous_id` within `cwd`.
    ///
    /// Scans left to right, starting below the feed directory like
    /// [`Self::extract_previous_instance_id`], for the first segment ending in
    /// `_<previous_id>` and returns the path up to and including it. If no
    /// segment matches, synthesizes `/home/<user>/feeds/feed_<feedId>/previous_<id>`.
    pub fn locate_previous_instance_path(&self, cwd: &str, previous_id: u64, feed_id: u64) -> String {
        let segments: Vec<&str> = cwd.split('/').collect();
        let start = self.instance_scan_start(&segments);

        let found = segments[start..]
            .iter()
            .position(|segment| {
                self.feed_segment_id(segment).is_none()
                    && parse_instance_segment(segment).map(|(_, id)| id) == Some(previous_id)
            })
            .map(|offset| start + offset);

        match found {
            Some(index) => segments[..=index].join("/"),
            None => format!(
                "{}/{}_{}",
                self.feed_root(&self.user_from_cwd(cwd), feed_id),
                self.fallback_prefix,
                previous_id
            ),
        }
    }

    /// Output directory of a new instance chained onto a freshly created feed
    pub fn fresh_output_path(
        &self,
        cwd: &str,
        feed_id: u64,
        bootstrap_instance_id: u64,
        dircopy_name: &str,
        plugin_name: &str,
        instance_id: u64,
    ) -> String {
        format!(
            "{}/{}_{}/{}_{}/{}/",
            self.feed_root(&self.user_from_cwd(cwd), feed_id),
            dircopy_name,
            bootstrap_instance_id,
            plugin_name,
            instance_id,
            self.output_dir
        )
    }

    /// Output directory of a new instance nested under `previous_instance_path`
    pub fn continue_output_path(
        &self,
        previous_instance_path: &str,
        plugin_name: &str,
        instance_id: u64,
    ) -> String {
        format!(
            "{}/{}_{}/{}/",
            previous_instance_path.trim_end_matches('/'),
            plugin_name,
            instance_id,
            self.output_dir
        )
    }
}
