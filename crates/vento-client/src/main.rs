//! `vento` - command-line control for Vento ventilation units.
//!
//! ```text
//! vento --ip 192.168.1.40 --device-id 003A0038 --password 1111 status
//! vento --config bedroom.yaml speed 66
//! vento decode "FD FD 02 08 ..."
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use vento_client::transport::{numbered_hex, spaced_hex};
use vento_client::{ConfigOverrides, DeviceConfig, Exchange, VentoClient};
use vento_protocol::{
    decode_packet, encode_packet, DecodedPacket, FanStatus, Function, ParameterList,
    VentilationMode, FUNC_READ,
};

#[derive(Parser, Debug)]
#[command(name = "vento")]
#[command(about = "Control Vento ventilation units over UDP")]
struct Cli {
    /// YAML device configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Unit IP address
    #[arg(long)]
    ip: Option<String>,

    /// Unit UDP port
    #[arg(long)]
    port: Option<u16>,

    /// Device id printed on the unit
    #[arg(long)]
    device_id: Option<String>,

    /// Device password
    #[arg(long)]
    password: Option<String>,

    /// Reply timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read power, speed and ventilation mode
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Switch the unit on
    On,

    /// Switch the unit off
    Off,

    /// Set the speed as a percentage (33, 66, 99 or anything 0-100)
    Speed {
        #[arg(value_parser = clap::value_parser!(u16).range(0..=100))]
        percentage: u16,
    },

    /// Set the ventilation mode (ventilation, heat-recovery, supply)
    Mode { mode: VentilationMode },

    /// Send an arbitrary function and parameter list
    Raw(RawArgs),

    /// Print the packet a raw command would send, without sending it
    Encode(RawArgs),

    /// Decode a captured reply given as hex
    Decode {
        /// Hex bytes; spaces and colons are ignored
        hex: String,
    },
}

#[derive(Args, Debug)]
struct RawArgs {
    /// Function code (1 = read, 3 = write)
    #[arg(long, default_value_t = FUNC_READ, value_parser = parse_byte)]
    func: u8,

    /// Parameter as id=value, repeatable (e.g. --param 0x01=1)
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(u8, u8)>,
}

/// Parse a byte given in decimal or `0x` hex.
fn parse_byte(s: &str) -> Result<u8, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid byte {:?}: {}", s, e))
}

fn parse_param(s: &str) -> Result<(u8, u8), String> {
    let (id, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected id=value, got {:?}", s))?;
    Ok((parse_byte(id)?, parse_byte(value)?))
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    let cleaned = cleaned
        .strip_prefix("0x")
        .unwrap_or(&cleaned);
    hex::decode(cleaned).context("invalid hex input")
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    name: &'a str,
    on: Option<bool>,
    percentage: Option<u16>,
    speed_level: Option<u16>,
    ventilation_mode: Option<String>,
    heat_recovery: Option<bool>,
}

impl<'a> StatusOutput<'a> {
    fn new(name: &'a str, status: &FanStatus) -> Self {
        Self {
            name,
            on: status.is_on,
            percentage: status.percentage,
            speed_level: status.speed_level(),
            ventilation_mode: status.ventilation_mode.map(|m| m.to_string()),
            heat_recovery: status.heat_recovery(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Decode { hex } => {
            let data = parse_hex(hex)?;
            print_decoded(&decode_packet(&data));
            return Ok(());
        }
        Commands::Encode(args) => {
            let config = load_config(&cli)?;
            let credentials = config.credentials()?;
            let packet = encode_packet(
                args.func,
                &to_params(&args.params),
                credentials.device_id(),
                credentials.password(),
            )?;
            println!("{}", spaced_hex(&packet));
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(&cli)?;
    config.validate()?;
    let client = VentoClient::from_config(&config)?;
    tracing::info!(device = %client.address(), name = %config.name, "Using unit");

    match cli.command {
        Commands::Status { json } => {
            let status = client.status().await?;
            if json {
                let output = StatusOutput::new(&config.name, &status);
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}: {}", config.name, status.summary());
            }
        }
        Commands::On => report(&client.turn_on().await?),
        Commands::Off => report(&client.turn_off().await?),
        Commands::Speed { percentage } => report(&client.set_percentage(percentage).await?),
        Commands::Mode { mode } => report(&client.set_ventilation_mode(mode).await?),
        Commands::Raw(args) => {
            let request = vento_protocol::CommandRequest::new(
                Function::from(args.func),
                to_params(&args.params),
            );
            let exchange = client.send_command(&request).await?;
            println!("{}", numbered_hex(&exchange.raw));
            print_decoded(&exchange.decoded);
        }
        Commands::Decode { .. } | Commands::Encode(_) => {}
    }

    Ok(())
}

/// Load the config file if given, then apply command-line overrides.
fn load_config(cli: &Cli) -> Result<DeviceConfig> {
    let mut config = match &cli.config {
        Some(path) => DeviceConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DeviceConfig::default(),
    };
    config.apply(ConfigOverrides {
        ip: cli.ip.clone(),
        port: cli.port,
        device_id: cli.device_id.clone(),
        password: cli.password.clone(),
        timeout_ms: cli.timeout_ms,
    });
    Ok(config)
}

fn to_params(pairs: &[(u8, u8)]) -> ParameterList {
    pairs.iter().copied().collect()
}

fn report(exchange: &Exchange) {
    println!("{}", reply_line(exchange));
}

fn reply_line(exchange: &Exchange) -> String {
    match exchange.error() {
        Some(error) if error.is_structural() => format!("Reply rejected: {}", error),
        Some(error) => format!(
            "Partial reply: {} ({})",
            exchange.status().summary(),
            error
        ),
        None => format!("Reply: {}", exchange.status().summary()),
    }
}

fn print_decoded(decoded: &DecodedPacket) {
    if let Some(header) = &decoded.header {
        println!(
            "Device id: {}, function: {}",
            String::from_utf8_lossy(&header.device_id),
            header.function
        );
    }
    let params = decoded.parameters();
    if !params.is_empty() {
        println!("Parameters: {}", params);
    }
    println!("{}", params.status().summary());
    if let Some(error) = &decoded.error {
        println!("Error: {}", error);
    }
}
