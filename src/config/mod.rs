mod scenario;

pub use scenario::{Scenario, ScenarioLoadError, ScenarioStep, StepAction};
