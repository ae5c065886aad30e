use std::{borrow::Cow, path::Path, string::FromUtf8Error, time::Duration};

use clap::ValueEnum;
use compio::fs;
use derive_more::Display;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::mirror::{is_valid_path, join_child};
use crate::sync::RearmDepth;

const DEFAULT_ROOT: &str = "/a";
const DEFAULT_ENSEMBLE: [&str; 3] = ["127.0.0.1:2181", "127.0.0.1:2182", "127.0.0.1:2183"];
const KNOWN_KEYS: [&str; 5] = ["ensemble", "root", "rearm", "tree", "steps"];

/// A namespace to serve and the changes to apply to it over time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub ensemble: Vec<String>,
    pub root: String,
    pub rearm: Option<RearmDepth>,
    /// Absolute paths, parents before children.
    pub tree: Vec<String>,
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioStep {
    pub delay: Duration,
    pub action: StepAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum StepAction {
    #[display("create {_0}")]
    Create(String),
    #[display("delete {_0}")]
    Delete(String),
    #[display("close session")]
    Close,
}

fn key(name: &'static str) -> Yaml<'static> {
    Yaml::Value(Scalar::String(Cow::Borrowed(name)))
}

impl Scenario {
    pub async fn from_path(path: &Path) -> Result<Self, ScenarioLoadError> {
        debug!("Reading scenario file: {}", path.display());
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.display().to_string(),
        })?;
        let contents = String::from_utf8(bytes).context(EncodingSnafu)?;
        debug!("Read scenario file: {} bytes", contents.len());

        contents.as_str().try_into()
    }

    fn parse_ensemble(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<Vec<String>, ScenarioLoadError> {
        let Some(ensemble) = top_level.get(&key("ensemble")) else {
            return Ok(DEFAULT_ENSEMBLE.iter().map(|s| s.to_string()).collect());
        };

        ensemble
            .as_sequence()
            .ok_or(ScenarioLoadError::EnsembleNotList)?
            .iter()
            .map(|server| {
                server
                    .as_str()
                    .map(str::to_string)
                    .ok_or(ScenarioLoadError::EnsembleNotList)
            })
            .collect()
    }

    fn parse_root(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<String, ScenarioLoadError> {
        let root = match top_level.get(&key("root")) {
            Some(value) => value.as_str().ok_or(ScenarioLoadError::InvalidRoot {
                root: format!("{value:?}"),
            })?,
            None => DEFAULT_ROOT,
        };

        ensure!(
            is_valid_path(root) && root != "/",
            InvalidRootSnafu { root }
        );
        Ok(root.to_string())
    }

    fn parse_rearm(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Option<RearmDepth>, ScenarioLoadError> {
        top_level
            .get(&key("rearm"))
            .map(|value| {
                let text = value.as_str().unwrap_or_default();
                RearmDepth::from_str(text, true).map_err(|_| ScenarioLoadError::InvalidRearm {
                    value: text.to_string(),
                })
            })
            .transpose()
    }

    fn parse_tree(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<Vec<String>, ScenarioLoadError> {
        let mut paths = Vec::new();
        if let Some(tree) = top_level.get(&key("tree")) {
            Self::collect_tree("/", tree, &mut paths)?;
        }
        Ok(paths)
    }

    fn collect_tree(
        parent: &str,
        node: &Yaml,
        paths: &mut Vec<String>,
    ) -> Result<(), ScenarioLoadError> {
        match node {
            Yaml::Value(Scalar::Null) => Ok(()),
            Yaml::Mapping(children) => {
                for (name, subtree) in children {
                    let name = name
                        .as_str()
                        .filter(|name| !name.is_empty() && !name.contains('/'))
                        .context(InvalidTreeSnafu { parent })?;
                    let path = join_child(parent, name);
                    paths.push(path.clone());
                    Self::collect_tree(&path, subtree, paths)?;
                }
                Ok(())
            }
            _ => InvalidTreeSnafu { parent }.fail(),
        }
    }

    fn parse_steps(
        top_level: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<Vec<ScenarioStep>, ScenarioLoadError> {
        let Some(steps) = top_level.get(&key("steps")) else {
            return Ok(Vec::new());
        };

        steps
            .as_sequence()
            .ok_or(ScenarioLoadError::StepsNotList)?
            .iter()
            .enumerate()
            .map(|(index, step)| Self::parse_step(step).context(InvalidStepSnafu { index }))
            .collect()
    }

    fn parse_step(step: &Yaml) -> Option<ScenarioStep> {
        if step.as_str() == Some("close") {
            return Some(ScenarioStep {
                delay: Duration::ZERO,
                action: StepAction::Close,
            });
        }

        let step = step.as_mapping()?;
        let delay = match step.get(&key("after_ms")) {
            Some(Yaml::Value(Scalar::Integer(ms))) => Duration::from_millis(u64::try_from(*ms).ok()?),
            Some(_) => return None,
            None => Duration::ZERO,
        };

        let create = step.get(&key("create")).map(|v| v.as_str());
        let delete = step.get(&key("delete")).map(|v| v.as_str());
        let close = step.get(&key("close"));
        let action = match (create, delete, close) {
            (Some(Some(path)), None, None) if is_valid_path(path) => {
                StepAction::Create(path.to_string())
            }
            (None, Some(Some(path)), None) if is_valid_path(path) => {
                StepAction::Delete(path.to_string())
            }
            (None, None, Some(Yaml::Value(Scalar::Boolean(true)))) => StepAction::Close,
            _ => return None,
        };

        Some(ScenarioStep { delay, action })
    }
}

impl TryFrom<&str> for Scenario {
    type Error = ScenarioLoadError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let document = documents
            .first()
            .ok_or(ScenarioLoadError::MalformedScenario)?;
        let top_level = document
            .as_mapping()
            .ok_or(ScenarioLoadError::TopLevelNotMap)?;

        for name in top_level.keys() {
            if !name.as_str().is_some_and(|name| KNOWN_KEYS.contains(&name)) {
                debug!("Ignoring unknown scenario key: {:?}", name);
            }
        }

        Ok(Scenario {
            ensemble: Self::parse_ensemble(top_level)?,
            root: Self::parse_root(top_level)?,
            rearm: Self::parse_rearm(top_level)?,
            tree: Self::parse_tree(top_level)?,
            steps: Self::parse_steps(top_level)?,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum ScenarioLoadError {
    #[snafu(display("Failed to read the scenario file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Scenario file is not valid UTF-8"))]
    EncodingError { source: FromUtf8Error },
    #[snafu(display("Failed to parse the scenario file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted scenario file"))]
    MalformedScenario,
    #[snafu(display("Top level of the scenario should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Ensemble should be a list of server addresses"))]
    EnsembleNotList,
    #[snafu(display("Watched root '{}' is not an absolute node path", root))]
    InvalidRoot { root: String },
    #[snafu(display("Unknown rearm depth '{}', expected 'shallow' or 'full'", value))]
    InvalidRearm { value: String },
    #[snafu(display("Tree below '{}' should only contain named maps or empty leaves", parent))]
    InvalidTree { parent: String },
    #[snafu(display("Steps section should be a list"))]
    StepsNotList,
    #[snafu(display("Step #{} should have one create, delete or close action", index))]
    InvalidStep { index: usize },
}
