use clap::{Parser, Subcommand};
use solarmatch_core::models::HeatmapScheme;
use std::path::PathBuf;

/// SolarMatch - Rooftop solar viability reports
#[derive(Parser, Debug)]
#[command(name = "solarmatch")]
#[command(about = "Rooftop solar viability reports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./solarmatch.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the solar analysis service
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Pricing tables (TOML) to use instead of the built-in ones
    #[arg(long, global = true, value_name = "FILE")]
    pub pricing: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch analysis and imagery for a location and write a PDF report
    Report(ReportArgs),

    /// Derive the financial summary from a saved analysis
    Finance(FinanceArgs),

    /// Render a PDF report from a saved analysis and local images
    Render(RenderArgs),

    /// Show the effective configuration and where each value comes from
    Config,
}

#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Output PDF path
    #[arg(long, short = 'o', default_value = "solar-report.pdf")]
    pub out: PathBuf,

    /// Skip the aerial image and heatmap
    #[arg(long)]
    pub no_imagery: bool,

    /// Imagery radius around the location, in meters
    #[arg(long)]
    pub radius: Option<f64>,

    /// Heatmap colour scheme (hot, viridis, plasma, inferno)
    #[arg(long)]
    pub scheme: Option<HeatmapScheme>,

    /// Property address to print on the cover
    #[arg(long)]
    pub address: Option<String>,
}

#[derive(Parser, Debug)]
pub struct FinanceArgs {
    /// Analysis record (JSON)
    #[arg(long, short = 'i')]
    pub input: PathBuf,
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Analysis record (JSON)
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    /// Aerial image file
    #[arg(long)]
    pub primary: Option<PathBuf>,

    /// Flux heatmap image file
    #[arg(long)]
    pub heatmap: Option<PathBuf>,

    /// Leave the imagery section out entirely
    #[arg(long, conflicts_with_all = ["primary", "heatmap"])]
    pub no_imagery: bool,

    /// Output PDF path
    #[arg(long, short = 'o', default_value = "solar-report.pdf")]
    pub out: PathBuf,

    /// Property address to print on the cover
    #[arg(long)]
    pub address: Option<String>,
}
