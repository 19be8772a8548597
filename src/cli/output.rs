//! Output formatting for multiple formats
//!
//! Every command result is rendered as JSON, YAML or human-readable text.
//! JSON and YAML share the serde representation of the result; the human
//! form is written per result type.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::backend::FolderRecord;
use crate::config::SalsaConfig;
use crate::intents::plugin_run::FeedBootstrap;
use crate::intents::table::render_cell;
use crate::intents::{ContextSummary, DeleteReport, PluginExecutionResult, ResourceTable};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Reachability of the API root
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub url: String,
    pub healthy: bool,
}

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Output formatter for command results
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn serialize<T: Serialize>(&self, value: &T, what: &str) -> Result<Option<String>> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)
                .map(Some)
                .with_context(|| format!("Failed to serialize {} to JSON", what)),
            OutputFormat::Yaml => serde_yaml::to_string(value)
                .map(Some)
                .with_context(|| format!("Failed to serialize {} to YAML", what)),
            OutputFormat::Human => Ok(None),
        }
    }

    pub fn format_table(&self, table: &ResourceTable) -> Result<String> {
        if let Some(out) = self.serialize(table, "table")? {
            return Ok(out);
        }
        Ok(human_table(table))
    }

    pub fn format_run(&self, result: &PluginExecutionResult) -> Result<String> {
        if let Some(out) = self.serialize(result, "plugin run result")? {
            return Ok(out);
        }

        let mut output = String::new();
        output.push_str("\u{2713} Plugin Scheduled\n");
        output.push_str(RULE);
        output.push_str("\n\n");
        output.push_str(&format!(
            "Plugin:    {} (instance {})\n",
            result.plugin_name, result.plugin_instance_id
        ));
        if let Some(feed_id) = result.feed_id {
            output.push_str(&format!("Feed:      {} (created)\n", feed_id));
        }
        if let Some(instance_id) = result.bootstrap_instance_id {
            output.push_str(&format!("Bootstrap: instance {}\n", instance_id));
        }
        output.push_str(&format!("Output:    {}\n", result.output_path));
        Ok(output)
    }

    pub fn format_feed(&self, feed: &FeedBootstrap) -> Result<String> {
        if let Some(out) = self.serialize(feed, "feed")? {
            return Ok(out);
        }
        Ok(format!(
            "\u{2713} Created feed {} ({} instance {})\n",
            feed.feed_id, feed.dircopy_name, feed.bootstrap_instance_id
        ))
    }

    pub fn format_folder(&self, folder: &FolderRecord) -> Result<String> {
        if let Some(out) = self.serialize(folder, "folder")? {
            return Ok(out);
        }
        Ok(format!("\u{2713} Created folder {} ({})\n", folder.path, folder.id))
    }

    pub fn format_delete(&self, report: &DeleteReport) -> Result<String> {
        if let Some(out) = self.serialize(report, "delete report")? {
            return Ok(out);
        }

        let mut output = String::new();
        for id in &report.deleted {
            output.push_str(&format!("\u{2713} Deleted {}\n", id));
        }
        for failure in &report.failed {
            output.push_str(&format!("\u{2717} {}: {}\n", failure.id, failure.error));
        }
        if report.deleted.is_empty() && report.failed.is_empty() {
            output.push_str("Nothing to delete\n");
        }
        Ok(output)
    }

    pub fn format_context(&self, context: &ContextSummary) -> Result<String> {
        if let Some(out) = self.serialize(context, "context")? {
            return Ok(out);
        }

        let mut output = String::new();
        output.push_str(&format!("URL:      {}\n", context.url));
        output.push_str(&format!("User:     {}\n", context.username));
        output.push_str(&format!("Cwd:      {}\n", context.cwd));
        if let Some(feed_id) = context.feed_id {
            output.push_str(&format!("Feed:     {}\n", feed_id));
        }
        output.push_str(&format!(
            "Updated:  {}\n",
            context.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        Ok(output)
    }

    pub fn format_health(&self, url: &str, healthy: bool) -> Result<String> {
        let status = HealthStatus {
            url: url.to_string(),
            healthy,
        };
        if let Some(out) = self.serialize(&status, "health status")? {
            return Ok(out);
        }
        Ok(if healthy {
            format!("\u{2713} {} is reachable\n", url)
        } else {
            format!("\u{2717} {} is not reachable\n", url)
        })
    }

    pub fn format_config(&self, config: &SalsaConfig) -> Result<String> {
        if let Some(out) = self.serialize(&config.to_display_map(), "config")? {
            return Ok(out);
        }
        Ok(config.to_string())
    }
}

/// Left-aligned columns separated by two spaces
fn human_table(table: &ResourceTable) -> String {
    if table.is_empty() {
        return "(no results)\n".to_string();
    }

    let columns: Vec<Vec<String>> = table.fields.iter().map(|f| table.column(f)).collect();
    let widths: Vec<usize> = table
        .fields
        .iter()
        .zip(&columns)
        .map(|(field, cells)| {
            cells
                .iter()
                .map(|c| c.chars().count())
                .chain(std::iter::once(field.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render_row = |cells: Vec<&str>| -> String {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ");
        format!("{}\n", line.trim_end())
    };

    let mut output = render_row(table.fields.iter().map(String::as_str).collect());
    for row in &table.rows {
        let cells: Vec<String> = table
            .fields
            .iter()
            .map(|f| row.get(f).map(render_cell).unwrap_or_default())
            .collect();
        output.push_str(&render_row(cells.iter().map(String::as_str).collect()));
    }

    if table.has_more {
        output.push_str(&format!(
            "\nShowing {} of {} (use --limit/--offset for more)\n",
            table.len(),
            table.total
        ));
    }
    output
}
