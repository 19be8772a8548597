use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command-line client for a ChRIS-style medical compute backend
#[derive(Parser, Debug)]
#[command(
    name = "salsa",
    about = "Browse feeds and files and run plugins in place on a ChRIS backend",
    version,
    author,
    long_about = "salsa keeps a connection context (API URL, token, working directory) and \
                  runs plugins where you are: outside a feed it creates a new feed from the \
                  working directory, inside a feed it chains onto the instance whose output \
                  you are browsing."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Verbose logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only errors are logged"
    )]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "URL", help = "API base URL (overrides SALSA_URL)")]
    pub url: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "SECONDS",
        help = "Request timeout in seconds (overrides SALSA_REQUEST_TIMEOUT)"
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'f',
        long,
        global = true,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Log in and store the connection context",
        long_about = "Obtains an API token and stores it with the URL in the context file.\n\n\
                      Examples:\n  \
                      salsa connect --user chris --password chris1234\n  \
                      salsa connect --user alice --password secret https://cube.example.org/api/v1/"
    )]
    Connect(ConnectArgs),

    #[command(about = "Remove the stored connection context")]
    Logout,

    #[command(about = "Show the stored connection context")]
    Context,

    #[command(about = "Show the effective configuration")]
    Config,

    #[command(
        about = "Check that the API answers",
        long_about = "Requests the API root and reports whether it is reachable.\n\n\
                      Examples:\n  \
                      salsa health\n  \
                      salsa health --url https://cube.example.org/api/v1/"
    )]
    Health,

    #[command(
        about = "Change the working directory",
        long_about = "Moves the working directory used by 'run' and 'files list'. Accepts \
                      absolute paths, relative paths with '.' and '..', and '~' for your home.\n\n\
                      Examples:\n  \
                      salsa cd feeds/feed_12/pl-dircopy_40/data\n  \
                      salsa cd ..\n  \
                      salsa cd ~"
    )]
    Cd(CdArgs),

    #[command(subcommand, about = "List, create and delete feeds")]
    Feeds(FeedsCommand),

    #[command(subcommand, about = "Browse, create, delete and download files")]
    Files(FilesCommand),

    #[command(subcommand, about = "Browse and download PACS files")]
    Pacs(PacsCommand),

    #[command(subcommand, about = "List registered plugins")]
    Plugins(PluginsCommand),

    #[command(
        about = "Run a plugin in the working directory",
        long_about = "Outside a feed a new feed is created from the working directory and the \
                      plugin runs on top of its copy. Inside a feed the plugin is chained onto \
                      the instance whose output directory you are in.\n\n\
                      Examples:\n  \
                      salsa run pl-simpledsapp --param dummyFloat=3.5\n  \
                      salsa run pl-simpledsapp-v2.1.0 --instance-title smoothed\n  \
                      salsa run pl-simpledsapp --cwd /home/chris/uploads/study1 --feed-title study"
    )]
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    #[arg(value_name = "URL", help = "API base URL (defaults to --url, SALSA_URL or localhost)")]
    pub address: Option<String>,

    #[arg(short = 'u', long, help = "User name")]
    pub user: String,

    #[arg(short = 'p', long, env = "SALSA_PASSWORD", hide_env_values = true, help = "Password")]
    pub password: String,
}

#[derive(Args, Debug, Clone)]
pub struct CdArgs {
    #[arg(value_name = "PATH")]
    pub path: String,
}

/// Paging and field selection shared by listing commands
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(long, value_name = "N", help = "Maximum number of results")]
    pub limit: Option<u32>,

    #[arg(long, value_name = "N", help = "Number of results to skip")]
    pub offset: Option<u32>,

    #[arg(
        long,
        value_name = "FIELDS",
        value_delimiter = ',',
        help = "Comma-separated fields to show"
    )]
    pub fields: Vec<String>,

    #[arg(
        short = 's',
        long = "search",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help = "Search filter (repeatable)"
    )]
    pub filters: Vec<(String, String)>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FeedsCommand {
    #[command(about = "List feeds")]
    List(ListArgs),

    #[command(about = "Create a feed from remote directories")]
    Create {
        #[arg(value_name = "DIR", required = true, num_args = 1..)]
        dirs: Vec<String>,

        #[arg(short = 't', long, help = "Feed title (defaults to the last directory name)")]
        title: Option<String>,
    },

    #[command(about = "Delete feeds by id")]
    Delete {
        #[arg(value_name = "ID", required = true, num_args = 1..)]
        ids: Vec<u64>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum FilesCommand {
    #[command(about = "List files under a path (defaults to the working directory)")]
    List {
        #[arg(value_name = "PATH")]
        path: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },

    #[command(about = "Create a folder")]
    Mkdir {
        #[arg(value_name = "PATH")]
        path: String,
    },

    #[command(about = "Delete files by id")]
    Rm {
        #[arg(value_name = "ID", required = true, num_args = 1..)]
        ids: Vec<u64>,
    },

    #[command(about = "Download a file")]
    Get {
        #[arg(value_name = "PATH")]
        path: String,

        #[arg(short = 'o', long, value_name = "FILE", help = "Write to FILE instead of the file's name")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum PacsCommand {
    #[command(about = "List PACS files")]
    List(ListArgs),

    #[command(about = "Download a PACS file by path")]
    Get {
        #[arg(value_name = "PATH")]
        path: String,

        #[arg(short = 'o', long, value_name = "FILE", help = "Write to FILE instead of the file's name")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum PluginsCommand {
    #[command(about = "List plugins, optionally matching a search string")]
    List {
        #[arg(
            long = "plugin",
            value_name = "SEARCH",
            help = "Plugin name, name-vX.Y.Z or 'key: value, ...' search"
        )]
        plugin: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(value_name = "PLUGIN", help = "Plugin name, optionally with -v<version>")]
    pub plugin: String,

    #[arg(
        short = 'p',
        long = "param",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help = "Plugin parameter (repeatable)"
    )]
    pub params: Vec<(String, String)>,

    #[arg(long, value_name = "TITLE", help = "Title of the feed created outside a feed")]
    pub feed_title: Option<String>,

    #[arg(long, value_name = "TITLE", help = "Title of the new plugin instance")]
    pub instance_title: Option<String>,

    #[arg(long, value_name = "PATH", help = "Run in PATH instead of the stored working directory")]
    pub cwd: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Expected KEY=VALUE, got '{}'", s)),
    }
}
