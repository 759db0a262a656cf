//! Deployment pipeline: orchestrates an ordered list of named steps.
//!
//! A pipeline is a list of [`Step`] descriptors run strictly in declaration
//! order against one [`DeployConfig`] and one [`Toolchain`]. Each step runs a
//! single [`Task`]; nothing is retried, nothing runs concurrently and there is
//! no resume.
//!
//! # Failure handling
//! Every step carries a [`FailurePolicy`]:
//! - [`FailurePolicy::Abort`] (the default) ends the run with
//!   [`PipelineError::StepFailed`]; later steps never start.
//! - [`FailurePolicy::Continue`] logs the failure with its source chain,
//!   records the step as [`StepStatus::Tolerated`] and moves on.
//!
//! Serialized-item publishing ([`Task::PublishYml`]) defaults to `Continue`.
//! Any step can set its policy explicitly with `on_error`.
//!
//! # State
//! A run moves `NotStarted → Running(i) → Completed | Failed(i)`; see
//! [`PipelineState`].

use serde::{Deserialize, Serialize};
use std::error::Error as _;
use std::path::PathBuf;
use tracing::{debug, error, info, info_span, Instrument};

use crate::config::{DeployConfig, Layer};
use crate::contract::Toolchain;
use crate::error::{DeployError, PipelineError};
use crate::tasks::Task;

/// What a failing step does to the rest of the run.
///
/// The policy covers the whole step. A `publish_yml` that cannot create its
/// `yml` folder is tolerated like a failed copy; this is intentional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Abort,
    Continue,
}

impl FailurePolicy {
    pub fn default_for(task: &Task) -> Self {
        match task {
            Task::PublishYml => FailurePolicy::Continue,
            _ => FailurePolicy::Abort,
        }
    }
}

/// A typed step descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub task: Task,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<FailurePolicy>,
}

impl Step {
    pub fn new(task: Task) -> Self {
        Self {
            name: None,
            task,
            on_error: None,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_error = Some(policy);
        self
    }

    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.task.default_name())
    }

    pub fn policy(&self) -> FailurePolicy {
        self.on_error
            .unwrap_or_else(|| FailurePolicy::default_for(&self.task))
    }
}

/// Scripts the default pipeline hands to the script host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineScripts {
    pub unicorn_sync: PathBuf,
    pub packaging: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Running(usize),
    Completed,
    Failed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Succeeded,
    /// Failed under [`FailurePolicy::Continue`].
    Tolerated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub name: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub steps: Vec<StepOutcome>,
}

impl PipelineReport {
    pub fn tolerated(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Tolerated)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    pub steps: Vec<Step>,
}

fn error_chain(err: &DeployError) -> Vec<String> {
    let mut chain = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain
}

impl Pipeline {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// The standard deployment: publish every layer, copy assemblies and
    /// content, merge and apply transforms, sync remote items, then package
    /// the serialized items.
    pub fn default_for(scripts: &PipelineScripts) -> Self {
        let mut steps: Vec<Step> = Layer::ALL
            .into_iter()
            .map(|layer| {
                Step::new(Task::PublishSourceProjects {
                    layer,
                    project_parent_folder: "code".to_string(),
                })
            })
            .collect();
        steps.extend([
            Step::new(Task::CopyAssemblies),
            Step::new(Task::CopyContent),
            Step::new(Task::MergeAndCopyXmlTransform {
                project_parent_folder: "code".to_string(),
            }),
            Step::new(Task::ApplyXmlTransform {
                project_parent_folder: "code".to_string(),
            }),
            Step::new(Task::SyncUnicorn {
                script: scripts.unicorn_sync.clone(),
            }),
            Step::new(Task::PublishYml),
            Step::new(Task::CreateUpdatePackage {
                script: scripts.packaging.clone(),
            }),
        ]);
        Self { steps }
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(Step::name).collect()
    }

    pub fn find(&self, name: &str) -> Option<&Step> {
        self.steps
            .iter()
            .find(|s| s.name() == name || s.task.kind() == name)
    }

    /// Runs every step in order.
    pub async fn run(
        &self,
        config: &DeployConfig,
        tools: &Toolchain,
    ) -> Result<PipelineReport, PipelineError> {
        let mut state = PipelineState::NotStarted;
        info!(steps = self.steps.len(), ?state, "[PIPELINE] Starting deployment pipeline");

        let mut outcomes = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            state = PipelineState::Running(index);
            let name = step.name();
            let span = info_span!("step", index, name = %name);
            info!(?state, step = %name, "[STEP] Starting");

            match step.task.execute(config, tools).instrument(span).await {
                Ok(()) => {
                    info!(step = %name, "[STEP] Succeeded");
                    outcomes.push(StepOutcome {
                        name,
                        status: StepStatus::Succeeded,
                        error: None,
                    });
                }
                Err(e) if step.policy() == FailurePolicy::Continue => {
                    error!(step = %name, "ERROR: {e}");
                    info!(step = %name, chain = ?error_chain(&e), "[STEP] Failure tolerated, continuing");
                    outcomes.push(StepOutcome {
                        name,
                        status: StepStatus::Tolerated,
                        error: Some(e.to_string()),
                    });
                }
                Err(e) => {
                    state = PipelineState::Failed(index);
                    error!(?state, step = %name, error = %e, chain = ?error_chain(&e), "[PIPELINE][ERROR] Step failed, aborting run");
                    return Err(PipelineError::StepFailed {
                        index,
                        step: name,
                        source: e,
                    });
                }
            }
        }

        state = PipelineState::Completed;
        info!(?state, steps = outcomes.len(), "[PIPELINE] Deployment pipeline completed");
        let report = PipelineReport { steps: outcomes };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => debug!(json = %json, "[PIPELINE][DEBUG] Report as JSON"),
            Err(e) => error!(error = ?e, "[PIPELINE][DEBUG] Failed to serialize report as JSON"),
        }
        Ok(report)
    }

    /// Runs the single step called `name` (display name or task kind).
    pub async fn run_step(
        &self,
        name: &str,
        config: &DeployConfig,
        tools: &Toolchain,
    ) -> Result<PipelineReport, PipelineError> {
        let step = self
            .find(name)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownStep(name.to_string()))?;
        Pipeline::new(vec![step]).run(config, tools).await
    }
}
