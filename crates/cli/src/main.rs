use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use gc_cli::cli::{Cli, Command, ConfigCommand, LogFormat, RunArgs};
use gc_cli::payloads;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    match cli.command {
        // Default to a simple run when no subcommand is given.
        None => run(RunArgs::default()).await,
        Some(Command::Run(args)) => run(args).await,
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = gc_cli::cli::load_config()?;
            let valid = gc_cli::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = gc_cli::cli::load_config()?;
            gc_cli::cli::config::show(&config)
        }
        Some(Command::Payloads { category, encodings }) => {
            for c in category.expand() {
                println!("# {}", c.as_str());
                for text in payloads::texts_for(c, encodings) {
                    println!("{text}");
                }
            }
            Ok(())
        }
        Some(Command::Presets) => {
            for p in gc_providers::presets::all() {
                println!("{:<10} {:<34} {:<32} {}", p.name, p.base_url, p.model, p.api_key_env);
            }
            Ok(())
        }
        Some(Command::Version) => {
            println!("gchat-probe {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let (mut config, config_path) = gc_cli::cli::load_config()?;
    args.apply_to(&mut config);

    let issues = config.validate();
    for issue in &issues {
        tracing::warn!(config = %config_path, "{issue}");
    }
    if issues
        .iter()
        .any(|i| i.severity == gc_domain::config::ConfigSeverity::Error)
    {
        anyhow::bail!("invalid configuration (see `gchat-probe config validate`)");
    }

    tracing::info!(
        base_url = %config.gateway.base_url,
        service = %config.gateway.service_name,
        mode = ?args.mode,
        "gchat-probe starting"
    );
    let summary = gc_cli::driver::run(&config, &args).await?;
    println!("{summary}");
    Ok(())
}

/// Install the global subscriber. Logs go to stderr so stdout stays free
/// for transcript and summary output.
fn init_tracing(verbose: bool, format: LogFormat) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,gc_webchat=info"))
    };

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
