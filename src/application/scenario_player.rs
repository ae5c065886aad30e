use compio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::{EnsembleError, InMemoryEnsemble};
use crate::config::{ScenarioStep, StepAction};

/// Applies scenario changes to the ensemble the engine is watching.
pub struct ScenarioPlayer {
    ensemble: InMemoryEnsemble,
    steps: Vec<ScenarioStep>,
}

impl ScenarioPlayer {
    pub fn new(ensemble: InMemoryEnsemble, steps: Vec<ScenarioStep>) -> Self {
        ScenarioPlayer { ensemble, steps }
    }

    /// Creates the initial namespace. Must run before the engine starts.
    pub fn seed(&self, tree: &[String]) -> Result<(), EnsembleError> {
        for path in tree {
            self.ensemble.create(path)?;
        }
        debug!("Seeded ensemble with {} nodes", tree.len());
        Ok(())
    }

    /// Plays every step in order, then closes the session.
    pub async fn play(self) {
        for (index, step) in self.steps.iter().enumerate() {
            if !step.delay.is_zero() {
                sleep(step.delay).await;
            }
            info!("Step #{}: {}", index, step.action);

            let result = match &step.action {
                StepAction::Create(path) => self.ensemble.create(path),
                StepAction::Delete(path) => self.ensemble.delete(path),
                StepAction::Close => break,
            };
            if let Err(error) = result {
                warn!("Step #{} failed: {}", index, error);
            }
        }

        self.ensemble.close();
    }
}
