use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover submitted forms across all semesters and download them.
    Run(HarvestArgs),
    /// Discovery only: print the deduplicated work list as JSON lines.
    Discover(HarvestArgs),
}

#[derive(Debug, Args)]
pub struct HarvestArgs {
    /// Portal username.
    #[arg(long, env = "FORMHARVEST_USERNAME")]
    pub username: String,

    /// Portal password.
    #[arg(long, env = "FORMHARVEST_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// WebDriver endpoint to attach to.
    #[arg(long, default_value = "http://localhost:9515")]
    pub webdriver_url: String,

    /// Portal login page.
    #[arg(
        long,
        default_value = "https://app.acadoinformatics.com/syllabus/department/login/"
    )]
    pub login_url: String,

    /// Listing view carrying the semester dropdown.
    #[arg(
        long,
        default_value = "https://app.acadoinformatics.com/syllabus/department/tools/ListLimitedEngagement"
    )]
    pub listing_url: String,

    /// URL substring that identifies the working listing view; anything
    /// else counts as navigation drift.
    #[arg(long, default_value = "department")]
    pub listing_marker: String,

    /// Directory that receives downloaded forms.
    #[arg(long, default_value = "downloads")]
    pub download_root: PathBuf,

    /// Wait after a semester selection for the table to re-render.
    #[arg(long, default_value_t = 6000)]
    pub settle_ms: u64,

    /// Wait after login and back/forward navigation.
    #[arg(long, default_value_t = 3000)]
    pub nav_settle_ms: u64,

    /// Failure report output path.
    #[arg(long, default_value = "missing_le_report.md")]
    pub report: PathBuf,
}
