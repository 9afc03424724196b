use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gpu_tco_planner::optimizer::{
    PowerStatus, StorageRatioStatus, min_power_required_mw, min_storage_required_pb,
    power_utilization,
};
use gpu_tco_planner::{
    Configuration, OptimizerInput, ReferenceData, Result, TcoError, calculate_enhanced_tco,
    calculate_tco, optimize, roi_metrics,
};
use log::{LevelFilter, info};
use serde::Serialize;

/// Total cost of ownership planner for GPU datacenter clusters.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Reference tables replacing the built-in set (TOML).
    #[arg(long, global = true)]
    reference: Option<PathBuf>,

    /// Log level: error, warn, info, debug or trace.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Full TCO of a configured cluster.
    Tco {
        /// Cluster configuration file (TOML).
        #[arg(long)]
        config: PathBuf,

        /// Print the results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// TCO with storage and infrastructure derived from the service tiers.
    Enhanced {
        /// Cluster configuration file (TOML).
        #[arg(long)]
        config: PathBuf,

        /// Print the results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Recommend a tier mix for a GPU count and site budgets.
    Optimize {
        #[arg(long)]
        gpus: u64,

        /// Site power budget in MW.
        #[arg(long)]
        power_mw: f64,

        /// Storage budget in PB.
        #[arg(long)]
        storage_pb: f64,

        /// Catalogue GPU id; chosen from the power budget if omitted.
        #[arg(long)]
        gpu_model: Option<String>,

        /// roce-800, roce-400 or roce-200.
        #[arg(long)]
        networking: Option<String>,

        /// Print the results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Look up the electricity tariff for a location.
    Rate {
        #[arg(long)]
        location: String,

        /// Also show the price in this currency (e.g. EUR, GBP).
        #[arg(long)]
        currency: Option<String>,

        /// Print the results as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct RateReport {
    location: String,
    country: String,
    customer_class: String,
    period: String,
    usd_per_kwh: f64,
    currency: Option<String>,
    converted_per_kwh: Option<f64>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let data = match &cli.reference {
        Some(path) => ReferenceData::from_file(path)?,
        None => ReferenceData::builtin()?,
    };
    info!("reference data v{}", data.version);

    match cli.command {
        Command::Tco { config, json } => {
            let config = Configuration::from_file(&config)?;
            let results = calculate_tco(&config, &data)?;
            if json {
                print_json(&results)?;
            } else {
                println!("{results}");
            }
        }
        Command::Enhanced { config, json } => {
            let config = Configuration::from_file(&config)?;
            let results = calculate_enhanced_tco(&config, &data)?;
            let roi = roi_metrics(&results, &data)?;
            if json {
                print_json(&serde_json::json!({ "tco": results, "roi": roi }))?;
            } else {
                println!("{results}");
                println!("5-year ROI:         {:.1}%", roi.roi_percent);
                println!("NPV:                ${:.0}", roi.npv);
                match roi.break_even_months {
                    Some(m) => println!("Break-even:         {m:.1} months"),
                    None => println!("Break-even:         never"),
                }
            }
        }
        Command::Optimize {
            gpus,
            power_mw,
            storage_pb,
            gpu_model,
            networking,
            json,
        } => {
            let input = OptimizerInput {
                gpus,
                power_mw,
                storage_pb,
                gpu_model,
                networking: networking.as_deref().map(str::parse).transpose()?,
            };
            let result = optimize(&input, &data)?;
            if json {
                print_json(&result)?;
            } else {
                println!("{result}");
                let utilization = power_utilization(gpus, power_mw, &data);
                println!(
                    "Minimum power:      {} MW ({:.0}% of budget, {})",
                    min_power_required_mw(gpus, &data),
                    utilization,
                    PowerStatus::from_utilization(utilization).label()
                );
                println!(
                    "Minimum storage:    {} PB ({})",
                    min_storage_required_pb(gpus, &data),
                    StorageRatioStatus::from_tb_per_gpu(result.constraints.storage_per_gpu_tb)
                        .label()
                );
            }
        }
        Command::Rate {
            location,
            currency,
            json,
        } => {
            let rate = data.electricity_rate(&location)?;
            let usd = data.rate_usd(rate)?;
            let converted = currency
                .as_deref()
                .map(|c| data.convert_from_usd(usd, c))
                .transpose()?;
            let report = RateReport {
                location: rate.location.clone(),
                country: rate.country.clone(),
                customer_class: format!("{:?}", rate.customer_class).to_lowercase(),
                period: rate.period.clone(),
                usd_per_kwh: usd,
                currency,
                converted_per_kwh: converted,
            };
            if json {
                print_json(&report)?;
            } else {
                println!(
                    "{} ({}, {}, {}): ${:.4}/kWh",
                    report.location, report.country, report.customer_class, report.period, usd
                );
                if let (Some(c), Some(v)) = (&report.currency, converted) {
                    println!("  = {v:.4} {}/kWh", c.to_uppercase());
                }
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        other => {
            eprintln!("Error: {}", TcoError::Configuration(format!("invalid log level: {other}")));
            std::process::exit(2);
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }
}
