use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use hid_transport::HidHost;
use std::net::IpAddr;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use tripplite::DriverConfig;

mod server;

const DEFAULT_PORT: u16 = 6969;

#[derive(Parser, Debug)]
#[command(
    name = "tripplite",
    version,
    about = "Read TrippLite UPS status over USB HID"
)]
struct Cli {
    /// Verbose debug output
    #[arg(short, long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Print a JSON snapshot or serve Prometheus metrics
    #[arg(short, long, value_enum, default_value_t = Exporter::Json)]
    exporter: Exporter,

    /// Port to run the metrics webserver on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Only read the device at this HID path (json exporter)
    #[arg(long)]
    device: Option<String>,

    /// USB vendor id to enumerate (hex like 0x09AE or decimal)
    #[arg(long, value_parser = parse_vendor_id, default_value = "0x09AE")]
    vendor_id: u16,

    /// Extra attempts after an empty feature report
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Value of the `hostname` label (defaults to this host's name)
    #[arg(long)]
    hostname: Option<String>,

    /// Use an in-process simulated UPS instead of USB
    #[arg(long, action = ArgAction::SetTrue)]
    mock: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Exporter {
    Json,
    Metrics,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.debug);

    let config = DriverConfig {
        vendor_id: cli.vendor_id,
        retries: cli.retries,
    };
    if cli.mock {
        return run(&cli, &config, tripplite::demo_host());
    }
    run_native(&cli, &config)
}

#[cfg(feature = "hidapi")]
fn run_native(cli: &Cli, config: &DriverConfig) -> Result<()> {
    let host = hid_transport::HidapiHost::new().context("initialising hidapi")?;
    run(cli, config, host)
}

#[cfg(not(feature = "hidapi"))]
fn run_native(_cli: &Cli, _config: &DriverConfig) -> Result<()> {
    anyhow::bail!("built without USB HID support; rebuild with `--features hidapi` or pass --mock")
}

fn run<H>(cli: &Cli, config: &DriverConfig, host: H) -> Result<()>
where
    H: HidHost + Send + 'static,
    H::Device: Send,
{
    match cli.exporter {
        Exporter::Json => print_snapshot(host, config, cli.device.as_deref()),
        Exporter::Metrics => {
            let hostname = cli.hostname.clone().unwrap_or_else(local_hostname);
            server::serve(host, config.clone(), hostname, cli.port)
        }
    }
}

fn print_snapshot<H: HidHost>(
    mut host: H,
    config: &DriverConfig,
    device: Option<&str>,
) -> Result<()> {
    let snapshots = match device {
        Some(path) => vec![tripplite::read_path(&mut host, config, path)
            .with_context(|| format!("reading {path}"))?],
        None => tripplite::read_all(&mut host, config).context("reading TrippLite devices")?,
    };
    println!("{}", tripplite::to_json(&snapshots)?);
    Ok(())
}

fn setup_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Fully-qualified name of this host: the nodename, resolved and reverse-resolved.
fn local_hostname() -> String {
    let nodename = match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("unable to determine hostname: {e}");
            return "localhost".to_string();
        }
    };
    let names: Vec<String> = match dns_lookup::lookup_host(&nodename) {
        Ok(addrs) => addrs
            .into_iter()
            .filter_map(|addr| dns_lookup::lookup_addr(&addr).ok())
            .collect(),
        Err(e) => {
            debug!("unable to resolve {nodename}: {e}");
            Vec::new()
        }
    };
    pick_fqdn(&nodename, names)
}

/// First dotted name that is not a bare address, else `nodename` unchanged.
fn pick_fqdn(nodename: &str, names: impl IntoIterator<Item = String>) -> String {
    if nodename.contains('.') {
        return nodename.to_string();
    }
    names
        .into_iter()
        .find(|name| name.contains('.') && name.parse::<IpAddr>().is_err())
        .unwrap_or_else(|| nodename.to_string())
}

fn parse_vendor_id(s: &str) -> Result<u16, String> {
    let t = s.trim();
    let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => t.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid vendor id {s:?}: {e}"))
}
