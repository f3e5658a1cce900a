use super::{Feature, Scenario, Step};
use crate::{error::Error, scenario_context::ScenarioContext, steps};
use log::{error, info, warn};
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioResult {
    Passed,
    Failed {
        step: String,
        line: usize,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOutcome {
    pub name: String,
    pub result: ScenarioResult,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        self.result == ScenarioResult::Passed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureReport {
    pub feature: String,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl FeatureReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ScenarioOutcome::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.passed())
    }
}

impl Display for FeatureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Feature: {}", self.feature)?;
        for outcome in &self.outcomes {
            match &outcome.result {
                ScenarioResult::Passed => writeln!(f, "  passed  {}", outcome.name)?,
                ScenarioResult::Failed {
                    step,
                    line,
                    message,
                } => {
                    writeln!(f, "  FAILED  {}", outcome.name)?;
                    writeln!(f, "    line {}: {}", line, step)?;
                    for message_line in message.lines() {
                        writeln!(f, "      {}", message_line)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Runs every scenario of a feature in its own, freshly built context.
pub struct Runner<F> {
    context_factory: F,
}

impl<F> Runner<F>
where
    F: FnMut() -> Result<ScenarioContext, Error>,
{
    pub fn new(context_factory: F) -> Self {
        Self { context_factory }
    }

    /// Returns the report of every scenario, or the fatal error that aborted the run.
    pub fn run(&mut self, feature: &Feature) -> Result<FeatureReport, Error> {
        info!("Feature: {}", feature.name);
        let mut report = FeatureReport {
            feature: feature.name.clone(),
            outcomes: Vec::with_capacity(feature.scenarios.len()),
        };

        for scenario in &feature.scenarios {
            let outcome = self.run_scenario(&feature.background, scenario)?;
            report.outcomes.push(outcome);
        }

        info!(
            "Feature {}: {} of {} scenarios passed",
            feature.name,
            report.outcomes.iter().filter(|o| o.passed()).count(),
            report.outcomes.len()
        );

        Ok(report)
    }

    fn run_scenario(
        &mut self,
        background: &[Step],
        scenario: &Scenario,
    ) -> Result<ScenarioOutcome, Error> {
        info!("Scenario: {}", scenario.name);
        let mut context = (self.context_factory)()?;

        if let Err(e) = context.before_scenario() {
            error!("Aborting the run, scenario \"{}\" couldn't be set up: {}", scenario.name, e);
            return Err(e);
        }

        let mut result = ScenarioResult::Passed;
        for step in background.iter().chain(&scenario.steps) {
            if let Err(e) = steps::execute(&mut context, &step.text, step.doc_string.as_deref()) {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!(
                    "Scenario \"{}\" failed at line {}: {}",
                    scenario.name, step.line, e
                );
                result = ScenarioResult::Failed {
                    step: format!("{} {}", step.keyword, step.text),
                    line: step.line,
                    message: e.to_string(),
                };
                break;
            }
        }

        if let Err(e) = context.after_scenario() {
            error!("Aborting the run, scenario \"{}\" couldn't be torn down: {}", scenario.name, e);
            return Err(e);
        }

        Ok(ScenarioOutcome {
            name: scenario.name.clone(),
            result,
        })
    }
}
