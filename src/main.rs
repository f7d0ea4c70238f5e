use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use secrecy::SecretString;

use network_health::backend::{self, MetricsClient};
use network_health::config::NetworkHealthConfig;
use network_health::platform::Platform;
use network_health::runner::SystemRunner;
use network_health::{logging, report, CheckPlan};

const EXIT_NO_TESTS: i32 = 1;
const EXIT_TESTS_FAILED: i32 = 2;
const EXIT_AUTH_FAILED: i32 = 3;
const EXIT_MISSING_API_KEY: i32 = 255;

#[derive(Parser)]
#[command(
    name = "network-health",
    about = "Measure latency, packet loss and bandwidth with ping and iperf, and report them to Datadog",
    long_about = "Measure ping (latency and packet loss) and iperf (bandwidth) metrics against \
                  local and remote hosts. Each test's results are posted to Datadog unless \
                  submission is disabled.\n\n\
                  Set DATADOG_API_KEY in the environment to authenticate with your Datadog account.",
    version
)]
struct Cli {
    /// Local host to run an iperf test against; skipped when unset
    #[arg(long)]
    iperf_host: Option<String>,

    /// Remote host to run an iperf test against; skipped when unset
    #[arg(long)]
    remote_iperf_host: Option<String>,

    /// Local host to run a ping test against; skipped when unset
    #[arg(long)]
    ping_host: Option<String>,

    /// Remote host to run a ping test against; skipped when unset
    #[arg(long)]
    remote_ping_host: Option<String>,

    /// Packets per ping test, shared by local and remote pings [default: 100]
    #[arg(long)]
    number_of_packets: Option<u32>,

    /// Port for the local iperf test
    #[arg(long)]
    local_iperf_port: Option<u16>,

    /// Port for the remote iperf test
    #[arg(long)]
    remote_iperf_port: Option<u16>,

    /// Skip submitting results to Datadog
    #[arg(long)]
    disable_datadog_submit: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the daily log file, overriding the configured one
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Datadog API key
    #[arg(long, env = "DATADOG_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_warnings) = NetworkHealthConfig::discover(cli.config.as_deref())?;
    if let Some(dir) = cli.log_dir {
        config.logging.directory = Some(dir);
    }
    logging::init(&config.logging)?;
    for warning in &config_warnings {
        tracing::warn!("{}", warning);
    }

    let plan = CheckPlan {
        ping_host: cli.ping_host,
        remote_ping_host: cli.remote_ping_host,
        iperf_host: cli.iperf_host,
        remote_iperf_host: cli.remote_iperf_host,
        packet_count: cli.number_of_packets.unwrap_or(config.ping.packet_count),
        local_iperf_port: cli.local_iperf_port,
        remote_iperf_port: cli.remote_iperf_port,
    };

    if !cli.disable_datadog_submit && cli.api_key.is_none() {
        tracing::error!("failed to find DATADOG_API_KEY environment variable, exiting");
        std::process::exit(EXIT_MISSING_API_KEY);
    }

    if plan.is_empty() {
        Cli::command().print_help()?;
        println!();
        std::process::exit(EXIT_NO_TESTS);
    }

    let client = match (cli.disable_datadog_submit, cli.api_key) {
        (false, Some(key)) => {
            let host = backend::resolve_host(config.backend.host.as_deref());
            let mut client = MetricsClient::new(SecretString::from(key), host, &config.backend)?;
            tracing::info!("validating provided credentials");
            if let Err(e) = client.validate_credentials().await {
                tracing::error!(error = %e, "could not validate the provided Datadog API key, exiting");
                eprintln!("Error: could not validate the provided Datadog API key: {}", e);
                std::process::exit(EXIT_AUTH_FAILED);
            }
            tracing::info!("validated provided Datadog credentials");
            Some(client)
        }
        _ => None,
    };

    let platform = Platform::current();
    tracing::info!(%platform, "operating system detected");
    let runner = SystemRunner::new(config.process.timeout());

    let run = network_health::run_checks(&plan, &runner, client.as_ref(), platform).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print!("{}", report::format_report(&run));
    }

    if !run.all_succeeded() {
        std::process::exit(EXIT_TESTS_FAILED);
    }
    Ok(())
}
