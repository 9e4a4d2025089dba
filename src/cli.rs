//! CLI argument parsing for export-solution

use crate::config::DEFAULT_CONFIG_FILE;
use clap::Parser;
use std::path::PathBuf;

/// Usage line echoed with argument errors
pub const USAGE: &str = "Usage: export-solution <SolutionName> <outputFolder> <asManaged>";

#[derive(Parser, Debug)]
#[command(name = "export-solution")]
#[command(version)]
#[command(about = "Export a CRM solution package to a local folder", long_about = None)]
pub struct Cli {
    /// Unique name of the solution to export
    #[arg(value_name = "SOLUTION_NAME")]
    pub solution_name: String,

    /// Existing folder the package is written to
    #[arg(value_name = "OUTPUT_FOLDER")]
    pub output_folder: PathBuf,

    /// Export as a managed solution ("true"/"false"; anything else means false)
    #[arg(value_name = "AS_MANAGED")]
    pub as_managed: Option<String>,

    /// Configuration file holding the CRM connection string
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Include auto-numbering, calendar, email and the other settings groups
    #[arg(long = "include-settings")]
    pub include_settings: bool,

    /// Enable debug tracing on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Managed flag, parsed leniently
    pub fn managed(&self) -> bool {
        self.as_managed
            .as_deref()
            .map(parse_lenient_bool)
            .unwrap_or(false)
    }
}

/// `true` for a case-insensitive "true", `false` for anything else
pub fn parse_lenient_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
