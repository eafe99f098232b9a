extern crate roofplan;

use anyhow::Context;
use clap::{Parser, Subcommand};
use roofplan::assessment::{RoofAssessmentRequest, RoofAssessor};
use roofplan::core::address::validate_address;
use roofplan::core::clustering::{PropertyClusterDetector, RoofSegment};
use roofplan::core::layout::planner::RoofDimensions;
use roofplan::core::layout::{HouseType, PanelOrientation, RoofGeometry};
use roofplan::core::panels::catalog::PanelCatalog;
use roofplan::EngineConfig;
use serde::Serialize;
use std::fs::File;
use std::io::{stdout, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct RoofplanArgs {
    /// JSON engine configuration; defaults apply to anything left out
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check an address is specific enough to identify one property
    ValidateAddress { address: String },
    /// Choose a panel from the bundled catalog
    Panels {
        /// maximum price in GBP per watt
        #[arg(long)]
        budget: Option<f64>,
        #[arg(long, default_value_t = false)]
        efficiency: bool,
        #[arg(long, default_value_t = false)]
        warranty: bool,
        /// list the whole catalog instead of choosing
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// Plan a panel layout for one roof face
    Plan {
        #[arg(long)]
        area: f64,
        #[arg(long, default_value_t = 0.)]
        width: f64,
        #[arg(long, default_value_t = 0.)]
        height: f64,
        #[arg(long, default_value_t = 180.)]
        orientation: f64,
        #[arg(long, default_value_t = 35.)]
        pitch: f64,
        #[arg(long)]
        house_type: HouseType,
        #[arg(long, default_value = "portrait")]
        panel_orientation: PanelOrientation,
    },
    /// Count the properties in a JSON list of roof segments
    Clusters { segments_file: PathBuf },
    /// Run a full roof assessment from a JSON request
    Assess { request_file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let args = RoofplanArgs::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = match &args.config {
        Some(path) => {
            info!("Reading configuration from {}", path.display());
            EngineConfig::from_json(BufReader::new(open(path)?))?
        }
        None => EngineConfig::default(),
    };

    match args.command {
        Command::ValidateAddress { address } => print_json(&validate_address(&address)),
        Command::Panels {
            budget,
            efficiency,
            warranty,
            all,
        } => {
            let catalog = PanelCatalog::bundled();
            if all {
                print_json(&catalog.list())
            } else {
                print_json(catalog.select_optimal(budget, efficiency, warranty))
            }
        }
        Command::Plan {
            area,
            width,
            height,
            orientation,
            pitch,
            house_type,
            panel_orientation,
        } => {
            let roof = RoofGeometry {
                area,
                width,
                height,
                orientation,
                pitch,
            };
            let assessor = RoofAssessor::bundled(&config);
            let layout = assessor
                .planner()
                .generate_realistic_layout(&roof, house_type);
            let realism = assessor.planner().validate_plan(&layout, area);
            let packing = assessor.planner().calculate_mcs_compliant_spacing(
                PanelCatalog::bundled().select_optimal(None, false, false),
                RoofDimensions::from(&roof),
                panel_orientation,
            );

            #[derive(Serialize)]
            struct PlanOutput<T, U, V> {
                layout: T,
                realism: U,
                packing: V,
            }
            print_json(&PlanOutput {
                layout,
                realism,
                packing,
            })
        }
        Command::Clusters { segments_file } => {
            let segments: Vec<RoofSegment> =
                serde_json::from_reader(BufReader::new(open(&segments_file)?))
                    .with_context(|| format!("reading segments from {}", segments_file.display()))?;
            let detection =
                PropertyClusterDetector::new(config.clustering).detect_multiple_properties(&segments);
            print_json(&detection)
        }
        Command::Assess { request_file } => {
            let request: RoofAssessmentRequest =
                serde_json::from_reader(BufReader::new(open(&request_file)?))
                    .with_context(|| format!("reading request from {}", request_file.display()))?;
            print_json(&RoofAssessor::bundled(&config).assess_roof(&request))
        }
    }
}

fn open(path: &Path) -> anyhow::Result<File> {
    File::open(path).with_context(|| format!("could not open {}", path.display()))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let mut out = stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
