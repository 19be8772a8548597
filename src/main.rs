use salsa::cli::commands::{CliArgs, Commands};
use salsa::cli::handlers::{
    handle_cd, handle_config, handle_connect, handle_context, handle_feeds, handle_files,
    handle_health, handle_logout, handle_pacs, handle_plugins, handle_run,
};
use salsa::util::logging::{config_from_env, init_logging, parse_level};
use salsa::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("salsa v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Connect(connect) => handle_connect(&args, connect).await,
        Commands::Logout => handle_logout(&args),
        Commands::Context => handle_context(&args),
        Commands::Config => handle_config(&args),
        Commands::Health => handle_health(&args).await,
        Commands::Cd(cd) => handle_cd(&args, cd),
        Commands::Feeds(command) => handle_feeds(&args, command).await,
        Commands::Files(command) => handle_files(&args, command).await,
        Commands::Pacs(command) => handle_pacs(&args, command).await,
        Commands::Plugins(command) => handle_plugins(&args, command).await,
        Commands::Run(run) => handle_run(&args, run).await,
    };

    std::process::exit(exit_code);
}

/// `--log-level` wins over `-v`/`-q`, which win over SALSA_LOG_LEVEL
fn init_logging_from_args(args: &CliArgs) {
    let mut config = config_from_env();

    if let Some(level_str) = &args.log_level {
        match parse_level(level_str) {
            Some(level) => config.level = level,
            None => eprintln!(
                "Invalid log level '{}', keeping {}. Valid levels: trace, debug, info, warn, error",
                level_str, config.level
            ),
        }
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }

    init_logging(config);
}
