//! Task configuration command line interface
//!
//! Decode a driver configuration block against a registered schema, print the
//! canonical result and its diagnostics, or print the encoded wire bytes.
//!
//! # Usage
//!
//! ```bash
//! # Decode a task config against the docker schema
//! taskconf_cli decode --driver docker --config task.json --var NOMAD_ALLOC_INDEX=2
//!
//! # Same, reading a job document from stdin and taking its "Config" member
//! cat job.json | taskconf_cli decode --driver docker --envelope
//!
//! # Hex-encoded wire bytes
//! taskconf_cli encode --driver docker --config task.json
//!
//! # Registered drivers
//! taskconf_cli schemas
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use taskconf::{
    config_from_json_envelope, registry, telemetry, wire, Decoded, EscalationPolicy, Settings,
    Value, Variables,
};
use taskconf_core::coerce::{parse_bool, parse_number};
use taskconf_types::Scalar;

#[derive(Parser)]
#[command(name = "taskconf_cli")]
#[command(version = "0.1.0")]
#[command(about = "Decode and encode task driver configuration")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text", value_enum)]
    format: OutputFormat,

    /// Schema directory (overrides TASKCONF_SCHEMA_DIR)
    #[arg(long, global = true)]
    schema_dir: Option<PathBuf>,

    /// Escalation policy: any or never (overrides TASKCONF_ESCALATION)
    #[arg(long, global = true)]
    escalation: Option<EscalationPolicy>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a configuration block and print the canonical value
    Decode(DecodeArgs),

    /// Decode a configuration block and print its wire encoding as hex
    Encode(DecodeArgs),

    /// List registered driver schemas
    Schemas,
}

#[derive(Args)]
struct DecodeArgs {
    /// Driver whose schema to decode against
    #[arg(short, long)]
    driver: String,

    /// JSON or YAML config file (reads JSON from stdin if not provided)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input is a job document; decode its "Config" member
    #[arg(long)]
    envelope: bool,

    /// Interpolation variable, NAME=VALUE (repeatable)
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, Scalar)>,
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result = resolve_settings(&cli).and_then(|settings| {
        telemetry::init_tracing(&settings);
        match &cli.command {
            Commands::Decode(args) => cmd_decode(args, &settings, cli.format),
            Commands::Encode(args) => cmd_encode(args, &settings, cli.format),
            Commands::Schemas => cmd_schemas(&settings, cli.format),
        }
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
            } else {
                eprintln!("{}: {:#}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::from_env()?;
    if let Some(dir) = &cli.schema_dir {
        settings.schema_dir = dir.clone();
    }
    if let Some(policy) = cli.escalation {
        settings.escalation = policy;
    }
    Ok(settings)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

fn cmd_decode(args: &DecodeArgs, settings: &Settings, format: OutputFormat) -> Result<ExitCode> {
    let decoded = decode_input(args, settings)?;
    let rejected = settings.escalation == EscalationPolicy::AnyDiagnostic && decoded.has_errors();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "driver": args.driver,
                "valid": !decoded.has_errors(),
                "config": decoded.value,
                "diagnostics": decoded.diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            print_diagnostics(&decoded);
            if !rejected {
                println!("{}", serde_json::to_string_pretty(&decoded.value)?);
            }
        }
    }

    if rejected {
        if format == OutputFormat::Text {
            report_rejected(&args.driver, decoded.diagnostics.len());
        }
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_encode(args: &DecodeArgs, settings: &Settings, format: OutputFormat) -> Result<ExitCode> {
    let decoded = decode_input(args, settings)?;
    if format == OutputFormat::Text {
        print_diagnostics(&decoded);
    }
    let count = decoded.diagnostics.len();
    let diagnostics = decoded.diagnostics.clone();
    let canonical = match decoded.into_result(settings.escalation) {
        Ok(canonical) => canonical,
        Err(_) => {
            match format {
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "driver": args.driver,
                        "valid": false,
                        "diagnostics": diagnostics,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => report_rejected(&args.driver, count),
            }
            return Ok(ExitCode::FAILURE);
        }
    };
    let bytes = wire::encode(&canonical)?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "driver": args.driver,
                "bytes": bytes.len(),
                "hex": hex::encode(&bytes),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => println!("{}", hex::encode(&bytes)),
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_schemas(settings: &Settings, format: OutputFormat) -> Result<ExitCode> {
    let reg = load_registry(settings)?;
    let drivers = reg.drivers()?;

    match format {
        OutputFormat::Json => {
            let mut output = serde_json::Map::new();
            for driver in &drivers {
                if let Some(schema) = reg.get(driver)? {
                    output.insert(driver.clone(), serde_json::to_value(&*schema)?);
                }
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!(
                "{} driver schema(s) in {}",
                drivers.len(),
                settings.schema_dir.display()
            );
            for driver in &drivers {
                let fields = reg.get(driver)?.map(|s| s.len()).unwrap_or(0);
                println!("  {} ({} fields)", driver.cyan(), fields);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// HELPERS
// =============================================================================

fn load_registry(settings: &Settings) -> Result<&'static registry::SchemaRegistry> {
    let reg = registry::global();
    if reg.is_empty() {
        settings.load_schemas(reg)?;
    }
    Ok(reg)
}

fn decode_input(args: &DecodeArgs, settings: &Settings) -> Result<Decoded> {
    let reg = load_registry(settings)?;
    let schema = reg
        .get(&args.driver)?
        .ok_or_else(|| anyhow!("no schema registered for driver '{}'", args.driver))?;

    let source = read_input(args.config.as_deref())?;
    let config = if args.envelope {
        config_from_json_envelope(&source).context("Failed to parse job document")?
    } else {
        parse_config(&source, args.config.as_deref())?
    };

    let vars: Variables = args.vars.iter().cloned().collect();
    Ok(taskconf::decode(&config, &schema, &vars))
}

fn print_diagnostics(decoded: &Decoded) {
    if decoded.diagnostics.is_empty() {
        eprintln!("{} no diagnostics", "OK".green().bold());
        return;
    }
    for diag in &decoded.diagnostics {
        eprintln!(
            "{} {} [{}]: {}",
            "-->".yellow(),
            diag.path.to_string().bold(),
            diag.code.as_str(),
            diag.message
        );
    }
}

fn report_rejected(driver: &str, count: usize) {
    eprintln!(
        "{}: configuration for driver '{}' rejected with {} diagnostic(s)",
        "error".red().bold(),
        driver,
        count
    );
}

fn parse_config(source: &str, path: Option<&Path>) -> Result<Value> {
    let is_yaml = path
        .and_then(|p| p.extension())
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false);
    if is_yaml {
        serde_yaml::from_str(source).context("Failed to parse YAML config")
    } else {
        serde_json::from_str(source).context("Failed to parse JSON config")
    }
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display())),
        None => {
            if io::stdin().is_terminal() {
                bail!("No input provided. Use --config or pipe input via stdin.");
            }
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// `NAME=VALUE`; numeric and `true`/`false` values become typed scalars
fn parse_var(s: &str) -> Result<(String, Scalar), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    if name.is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    let scalar = parse_number(value)
        .map(Scalar::Number)
        .or_else(|| parse_bool(value).map(Scalar::Bool))
        .unwrap_or_else(|| Scalar::String(value.to_string()));
    Ok((name.to_string(), scalar))
}
