use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::Scenario;
use crate::sync::RearmDepth;

/// Settings after merging the command line over the scenario file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub scenario_path: PathBuf,
    pub ensemble: Vec<String>,
    pub root: String,
    pub rearm: RearmDepth,
    pub render_tree: bool,
}

impl RuntimeConfig {
    pub fn merge(cli: &Cli, scenario: &Scenario) -> Self {
        Self {
            scenario_path: cli.scenario.clone(),
            ensemble: scenario.ensemble.clone(),
            root: cli.root.clone().unwrap_or_else(|| scenario.root.clone()),
            rearm: cli.rearm.or(scenario.rearm).unwrap_or_default(),
            render_tree: cli.render_tree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn scenario() -> Scenario {
        "root: /services\nrearm: full".try_into().unwrap()
    }

    #[test]
    fn scenario_values_apply_without_overrides() {
        let cli = Cli::parse_from(["znode-mirror", "scenario.yaml"]);

        let config = RuntimeConfig::merge(&cli, &scenario());

        assert_eq!(config.root, "/services");
        assert_eq!(config.rearm, RearmDepth::Full);
        assert!(!config.render_tree);
    }

    #[test]
    fn command_line_overrides_scenario() {
        let cli = Cli::parse_from([
            "znode-mirror",
            "scenario.yaml",
            "--root",
            "/other",
            "--rearm",
            "shallow",
            "--render-tree",
        ]);

        let config = RuntimeConfig::merge(&cli, &scenario());

        assert_eq!(config.root, "/other");
        assert_eq!(config.rearm, RearmDepth::Shallow);
        assert!(config.render_tree);
    }

    #[test]
    fn rearm_defaults_to_shallow() {
        let cli = Cli::parse_from(["znode-mirror", "scenario.yaml"]);
        let scenario: Scenario = "root: /a".try_into().unwrap();

        assert_eq!(RuntimeConfig::merge(&cli, &scenario).rearm, RearmDepth::Shallow);
    }
}
