//! Command handlers
//!
//! Each handler loads configuration and context, calls one intent and prints
//! the formatted result. Handlers return the process exit code.

use anyhow::{anyhow, Context as _, Result};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::commands::{
    CdArgs, CliArgs, ConnectArgs, FeedsCommand, FilesCommand, ListArgs, PacsCommand,
    PluginsCommand, RunArgs,
};
use super::output::{OutputFormat, OutputFormatter};
use crate::backend::{ChrisBackend, ListQuery};
use crate::config::SalsaConfig;
use crate::intents::plugin_run::{classify, default_feed_title, ContextParams};
use crate::intents::{
    context, feeds, files, pacs, plugins, Context, ContextStore, DeleteReport, FileContent,
    IntentError, ListOptions, PluginRunRequest, PluginRunner,
};

/// Exit code of a successful command
pub const EXIT_OK: i32 = 0;
/// Exit code of a failed command
pub const EXIT_FAILURE: i32 = 1;
/// Exit code of a batch command where some items failed
pub const EXIT_PARTIAL: i32 = 2;

/// Loaded configuration plus the stored context
struct Session {
    config: SalsaConfig,
    store: ContextStore,
    context: Option<Context>,
    formatter: OutputFormatter,
}

impl Session {
    fn load(args: &CliArgs) -> Result<Self> {
        let mut config = SalsaConfig::default();
        if let Some(url) = &args.url {
            config.url = Some(url.clone());
        }
        if let Some(timeout) = args.timeout {
            config.request_timeout_secs = timeout;
        }
        config.validate()?;

        let store = config.context_store()?;
        let context = store.load()?;
        debug!("Loaded context: {:?}", context);

        Ok(Self {
            config,
            store,
            context,
            formatter: OutputFormatter::new(OutputFormat::from(args.format)),
        })
    }

    fn backend(&self) -> Result<Arc<dyn ChrisBackend>> {
        if self.context.is_none() && self.config.token.is_none() {
            return Err(anyhow!(context::ContextError::NotConnected));
        }
        Ok(self.config.create_backend(self.context.as_ref())?)
    }

    /// Working directory of the stored context, else the user's home
    fn cwd(&self) -> String {
        match &self.context {
            Some(context) => context.cwd.clone(),
            None => {
                let user = self
                    .config
                    .username
                    .clone()
                    .unwrap_or_else(|| self.config.layout.default_user.clone());
                self.config.layout.home_dir(&user)
            }
        }
    }
}

fn finish(result: Result<(String, i32)>) -> i32 {
    match result {
        Ok((output, code)) => {
            print!("{}", output);
            code
        }
        Err(e) => {
            match e.downcast_ref::<IntentError>() {
                Some(intent_error) => eprintln!("{}", intent_error.help_message()),
                None => eprintln!("Error: {:#}", e),
            }
            EXIT_FAILURE
        }
    }
}

fn list_options(list: &ListArgs) -> ListOptions {
    let mut query = ListQuery::new();
    query.limit = list.limit;
    query.offset = list.offset;
    for (key, value) in &list.filters {
        query = query.with_filter(key, value);
    }
    ListOptions::new()
        .with_query(query)
        .with_fields(list.fields.iter().cloned())
}

fn save_download(content: &FileContent, output: Option<&PathBuf>) -> Result<String> {
    let target = output
        .cloned()
        .unwrap_or_else(|| PathBuf::from(content.file_name()));
    std::fs::write(&target, &content.bytes)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    info!("Wrote {} byte(s) to {}", content.len(), target.display());
    Ok(format!(
        "\u{2713} Saved {} ({} bytes) to {}\n",
        content.path,
        content.len(),
        target.display()
    ))
}

/// Parameter values are sent as JSON: numbers and booleans keep their type
fn param_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

pub async fn handle_connect(args: &CliArgs, connect: &ConnectArgs) -> i32 {
    finish(connect_command(args, connect).await)
}

async fn connect_command(args: &CliArgs, connect: &ConnectArgs) -> Result<(String, i32)> {
    let mut session = Session::load(args)?;
    if let Some(address) = &connect.address {
        session.config.url = Some(address.clone());
        session.config.validate()?;
    }
    let http = session.config.login_client(session.context.as_ref())?;
    let context = context::connect(
        &session.store,
        &http,
        &session.config.layout,
        &connect.user,
        &connect.password,
    )
    .await?;
    Ok((session.formatter.format_context(&context.summary())?, EXIT_OK))
}

pub fn handle_logout(args: &CliArgs) -> i32 {
    finish(logout_command(args))
}

fn logout_command(args: &CliArgs) -> Result<(String, i32)> {
    let session = Session::load(args)?;
    let message = if context::logout(&session.store)? {
        "\u{2713} Logged out\n"
    } else {
        "Not connected\n"
    };
    Ok((message.to_string(), EXIT_OK))
}

pub fn handle_context(args: &CliArgs) -> i32 {
    finish(context_command(args))
}

fn context_command(args: &CliArgs) -> Result<(String, i32)> {
    let session = Session::load(args)?;
    let context = session.store.require()?;
    Ok((session.formatter.format_context(&context.summary())?, EXIT_OK))
}

pub fn handle_config(args: &CliArgs) -> i32 {
    finish(config_command(args))
}

fn config_command(args: &CliArgs) -> Result<(String, i32)> {
    let session = Session::load(args)?;
    Ok((session.formatter.format_config(&session.config)?, EXIT_OK))
}

pub async fn handle_health(args: &CliArgs) -> i32 {
    finish(health_command(args).await)
}

async fn health_command(args: &CliArgs) -> Result<(String, i32)> {
    let session = Session::load(args)?;
    let http = session.config.login_client(session.context.as_ref())?;
    let healthy = http.health_check().await?;
    let output = session.formatter.format_health(http.base_url(), healthy)?;
    Ok((output, if healthy { EXIT_OK } else { EXIT_FAILURE }))
}

pub fn handle_cd(args: &CliArgs, cd: &CdArgs) -> i32 {
    finish(cd_command(args, cd))
}

fn cd_command(args: &CliArgs, cd: &CdArgs) -> Result<(String, i32)> {
    let session = Session::load(args)?;
    let context = context::change_dir(&session.store, &session.config.layout, &cd.path)?;
    Ok((session.formatter.format_context(&context.summary())?, EXIT_OK))
}

fn delete_exit_code(report: &DeleteReport) -> i32 {
    if report.is_complete() {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    }
}

pub async fn handle_feeds(args: &CliArgs, command: &FeedsCommand) -> i32 {
    finish(feeds_command(args, command).await)
}

async fn feeds_command(args: &CliArgs, command: &FeedsCommand) -> Result<(String, i32)> {
    let session = Session::load(args)?;
    let backend = session.backend()?;
    match command {
        FeedsCommand::List(list) => {
            let table = feeds::list_feeds(backend.as_ref(), &list_options(list)).await?;
            Ok((session.formatter.format_table(&table)?, EXIT_OK))
        }
        FeedsCommand::Create { dirs, title } => {
            let title = match title {
                Some(title) => title.clone(),
                None => default_feed_title(dirs.last().map(String::as_str).unwrap_or("")),
            };
            let available = plugins::available_plugin_names(backend.as_ref()).await?;
            let feed = feeds::create_feed_from_dirs(
                backend.as_ref(),
                &session.config.layout,
                dirs,
                &title,
                &available,
            )
            .await?;
            Ok((session.formatter.format_feed(&feed)?, EXIT_OK))
        }
        FeedsCommand::Delete { ids } => {
            let report = feeds::delete_feeds(backend.as_ref(), ids).await;
            Ok((session.formatter.format_delete(&report)?, delete_exit_code(&report)))
        }
    }
}

pub async fn handle_files(args: &CliArgs, command: &FilesCommand) -> i32 {
    finish(files_command(args, command).await)
}

async fn files_command(args: &CliArgs, command: &FilesCommand) -> Result<(String, i32)> {
    let session = Session::load(args)?;
    let backend = session.backend()?;
    match command {
        FilesCommand::List { path, list } => {
            let path = path.clone().unwrap_or_else(|| session.cwd());
            let table = files::list_files(backend.as_ref(), &path, &list_options(list)).await?;
            Ok((session.formatter.format_table(&table)?, EXIT_OK))
        }
        FilesCommand::Mkdir { path } => {
            let folder = files::create_folder(backend.as_ref(), path).await?;
            Ok((session.formatter.format_folder(&folder)?, EXIT_OK))
        }
        FilesCommand::Rm { ids } => {
            let report = files::delete_files(backend.as_ref(), ids).await;
            Ok((session.formatter.format_delete(&report)?, delete_exit_code(&report)))
        }
        FilesCommand::Get { path, output } => {
            let content = files::download_file(backend.as_ref(), path).await?;
            Ok((save_download(&content, output.as_ref())?, EXIT_OK))
        }
    }
}

pub async fn handle_pacs(args: &CliArgs, command: &PacsCommand) -> i32 {
    finish(pacs_command(args, command).await)
}

async fn pacs_command(args: &CliArgs, command: &PacsCommand) -> Result<(String, i32)> {
    let session = Session::load(args)?;
    let backend = session.backend()?;
    match command {
        PacsCommand::List(list) => {
            let table = pacs::list_pacs_files(backend.as_ref(), &list_options(list)).await?;
            Ok((session.formatter.format_table(&table)?, EXIT_OK))
        }
        PacsCommand::Get { path, output } => {
            let content = pacs::resolve_pacs_file(backend.as_ref(), path).await?;
            Ok((save_download(&content, output.as_ref())?, EXIT_OK))
        }
    }
}

pub async fn handle_plugins(args: &CliArgs, command: &PluginsCommand) -> i32 {
    finish(plugins_command(args, command).await)
}

async fn plugins_command(args: &CliArgs, command: &PluginsCommand) -> Result<(String, i32)> {
    let session = Session::load(args)?;
    let backend = session.backend()?;
    match command {
        PluginsCommand::List { plugin, list } => {
            let mut options = list_options(list);
            if let Some(searchable) = plugin {
                let search = plugins::PluginSearch::parse(searchable);
                options.query.search.extend(search.params);
            }
            let table = plugins::list_plugins(backend.as_ref(), &options).await?;
            Ok((session.formatter.format_table(&table)?, EXIT_OK))
        }
    }
}

pub async fn handle_run(args: &CliArgs, run: &RunArgs) -> i32 {
    finish(run_command(args, run).await)
}

async fn run_command(args: &CliArgs, run: &RunArgs) -> Result<(String, i32)> {
    let session = Session::load(args)?;
    let backend = session.backend()?;
    let layout = session.config.layout.clone();

    let current = session.cwd();
    let cwd = match &run.cwd {
        Some(path) => {
            let home = layout.home_dir(&layout.user_from_cwd(&current));
            context::resolve_path(&current, &home, path)
        }
        None => current,
    };

    // Only a fresh feed needs the directory-copy plugin
    let available = if classify(&cwd, &layout).in_feed() {
        Vec::new()
    } else {
        plugins::available_plugin_names(backend.as_ref()).await?
    };

    let params: Map<String, Value> = run
        .params
        .iter()
        .map(|(k, v)| (k.clone(), param_value(v)))
        .collect();

    let request = PluginRunRequest::new(run.plugin.clone(), cwd)
        .with_params(params)
        .with_context(ContextParams {
            feed_title: run.feed_title.clone(),
            instance_title: run.instance_title.clone(),
        })
        .with_available_plugins(available);

    let runner = PluginRunner::with_layout(backend, layout);
    let result = runner
        .execute_in_place(&request)
        .await
        .map_err(IntentError::from)?;
    Ok((session.formatter.format_run(&result)?, EXIT_OK))
}
