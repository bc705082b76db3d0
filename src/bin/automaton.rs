use automaton::{
    config::{read_config_env, read_config_file},
    runner::Runner,
    util::get_log_level,
};
use clap::Parser;
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension). Falls back to
    /// AUTOMATON_CONFIG when omitted.
    #[arg(short)]
    file: Option<String>,
}

fn init(level: LevelFilter) {
    let filter = filter::Targets::new().with_target("automaton", level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init(get_log_level());

    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => read_config_env()?,
    };

    let runner = Runner::from_config(&config)?;
    info!("starting {} automaton(s)", runner.len());

    tokio::select! {
        result = runner.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
        }
    }

    Ok(())
}
