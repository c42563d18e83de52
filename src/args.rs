use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pdns-tld",
    about = "Gives data about TLDs and host names seen resolving to IOCs in passive DNS",
    version,
    long_about = None
)]
pub struct Args {
    /// IPs or domains to check; `@file` reads one IOC per line from file
    #[arg(required = true, num_args = 1..)]
    pub iocs: Vec<String>,

    /// Directory to save the spreadsheet in
    #[arg(short, long, default_value = "analysis")]
    pub path: PathBuf,

    /// Lookback periods in days, each checked separately
    #[arg(short = 'd', long, num_args = 1.., default_values_t = [7, 90])]
    pub periods: Vec<u32>,

    /// Number of top TLDs and domains to show in the spreadsheet
    #[arg(short, long, default_value_t = 10)]
    pub top: usize,

    /// Maximum number of results the API returns per lookup
    #[arg(short, long, default_value_t = 4_000_000)]
    pub limit: u64,

    /// Don't save a spreadsheet
    #[arg(short = 'e', long)]
    pub no_excel: bool,

    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
