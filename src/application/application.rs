use std::sync::Arc;

use futures_channel::mpsc;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::{RuntimeConfig, ScenarioPlayer};
use crate::cli::Cli;
use crate::client::{ClientError, EnsembleError, InMemoryEnsemble};
use crate::config::{Scenario, ScenarioLoadError};
use crate::mirror::{TreeMirror, is_valid_path};
use crate::presentation::ConsolePresenter;
use crate::sync::{SyncEngine, SyncError};

pub struct Application;

impl Application {
    pub async fn run(cli: Cli) -> Result<(), ApplicationError> {
        let scenario = Scenario::from_path(&cli.scenario)
            .await
            .context(ScenarioSnafu)?;
        let config = RuntimeConfig::merge(&cli, &scenario);
        debug!("Loaded config: {:?}", config);
        ensure!(
            is_valid_path(&config.root) && config.root != "/",
            InvalidRootSnafu {
                root: config.root.clone()
            }
        );

        let (ensemble, notifications) =
            InMemoryEnsemble::connect(&config.ensemble).context(ConnectSnafu)?;
        let player = ScenarioPlayer::new(ensemble.clone(), scenario.steps);
        player.seed(&scenario.tree).context(SeedSnafu)?;

        let mirror = Arc::new(TreeMirror::new(config.root.clone()));
        let (update_sender, update_receiver) = mpsc::unbounded();
        let engine = SyncEngine::new(ensemble, mirror.clone(), update_sender, config.rearm);
        engine.start().await.context(SyncStartupSnafu)?;

        let presenter = ConsolePresenter::new(mirror, config.render_tree);
        info!("Playing scenario {}", config.scenario_path.display());
        let reconcile = async move {
            engine.run(notifications).await;
            // Closes the update channel so the presenter can finish.
            drop(engine);
        };

        futures::join!(
            reconcile,
            player.play(),
            presenter.run(update_receiver)
        );
        info!("Mirror of '{}' stopped", config.root);

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while loading the scenario"))]
    ScenarioError { source: ScenarioLoadError },
    #[snafu(display("Watched root '{}' is not an absolute node path", root))]
    InvalidRootError { root: String },
    #[snafu(display("Failed to open a session to the ensemble"))]
    ConnectError { source: ClientError },
    #[snafu(display("Failed to create the initial namespace"))]
    SeedError { source: EnsembleError },
    #[snafu(display("Critical failure encountered while taking the initial snapshot"))]
    SyncStartupError { source: SyncError },
}
