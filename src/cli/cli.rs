use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;
use crate::sync::RearmDepth;

/// Mirror a watched subtree of an in-process coordination service and report changes.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Scenario file describing the ensemble, the namespace and the changes to play
    pub scenario: PathBuf,

    /// Watched root path, overrides the scenario
    #[clap(long)]
    pub root: Option<String>,

    /// How deep watches are re-armed below a changed node, overrides the scenario
    #[clap(long, value_enum)]
    pub rearm: Option<RearmDepth>,

    /// Print the mirrored tree after every count update
    #[clap(long, short = 't')]
    pub render_tree: bool,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,
}
