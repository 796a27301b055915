//! f5-runtime command line.
//!
//! ```text
//! f5-runtime [--settings runtime.toml] [--config .secrets/index.json] <command>
//!
//!   check   resolve + validate config, materialize credentials, print a
//!           redacted summary
//!   sync    push secrets to the `repo_synced` repository (pre-push hook)
//!   cert    materialize the certificate and hold it until Ctrl+C
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use f5_runtime::config::loader::load_settings_or_default;
use f5_runtime::config::{ConfigResolver, ResolveOptions, RuntimeSettings};
use f5_runtime::lifecycle::{config_sources, shutdown_signal, sync_settings, ProjectContext};
use f5_runtime::observability::init_logging;
use f5_runtime::sync::{GithubSecretStore, SecretSyncer};

#[derive(Parser)]
#[command(name = "f5-runtime")]
#[command(about = "Runtime tooling for trading strategy projects", long_about = None)]
struct Cli {
    /// Runtime settings file (TOML)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Secrets file (JSON); overrides `resolver.config_path`
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Let environment variables override the secrets file per field
    #[arg(long, global = true)]
    env_override: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the config and prepare credentials, then clean up
    Check,
    /// Sync secrets to the configured repository
    Sync(SyncArgs),
    /// Materialize the certificate and print its path until interrupted
    Cert,
}

#[derive(Args)]
struct SyncArgs {
    /// Endpoint function name, synced as GCF_FUNCTION_TARGET
    #[arg(long)]
    function_target: Option<String>,

    /// Delete remote secrets that are not in the local config
    #[arg(long)]
    prune: bool,

    /// Upload every secret even if unchanged
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = load_settings_or_default(cli.settings.as_deref())?;
    init_logging(&settings.observability.log_level);

    tracing::info!("f5-runtime v{} starting", env!("CARGO_PKG_VERSION"));

    let sources = config_sources(&settings.resolver, cli.config.as_deref());
    let options = ResolveOptions {
        allow_env_override: settings.resolver.allow_env_override || cli.env_override,
    };

    match cli.command {
        Commands::Check => {
            let context = ProjectContext::initialize(&sources, options)?;
            println!("{:#?}", context.config());
            println!("certificate: {}", context.certificate_path().display());
            println!("sdk config:  {}", context.sdk_config_path().display());
            context.release()?;
            println!("config OK");
        }
        Commands::Sync(args) => {
            let config = ConfigResolver::new(options).resolve(&sources)?;
            let mut syncer = build_syncer(&settings, cli.config.as_deref(), &args)?;
            let report = syncer.sync(&config).await?;
            println!(
                "upserted {}, unchanged {}, deleted {}",
                report.upserted.len(),
                report.skipped.len(),
                report.deleted.len()
            );
        }
        Commands::Cert => {
            let context = ProjectContext::initialize(&sources, options)?;
            println!("{}", context.certificate_path().display());
            println!("{}", context.sdk_config_path().display());
            shutdown_signal().await;
            context.release()?;
        }
    }

    tracing::info!("Done");
    Ok(())
}

fn build_syncer(
    settings: &RuntimeSettings,
    config_path: Option<&Path>,
    args: &SyncArgs,
) -> Result<SecretSyncer<GithubSecretStore>, Box<dyn std::error::Error>> {
    let mut sync_settings = sync_settings(settings, config_path);
    if args.function_target.is_some() {
        sync_settings.function_target = args.function_target.clone();
    }
    sync_settings.prune_missing |= args.prune;
    // Digests are neither consulted nor written on a forced run.
    sync_settings.change_tracking &= !args.force;

    let store = GithubSecretStore::new(
        &sync_settings.api_base,
        Duration::from_secs(sync_settings.request_timeout_secs),
    )?;
    Ok(SecretSyncer::from_settings(store, &sync_settings)?)
}
