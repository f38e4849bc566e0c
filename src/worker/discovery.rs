//! # Workflow and Activity Discovery
//!
//! Registrations are produced outside the assembler (code generation or
//! explicit calls) and collected in a [`DiscoveryRegistry`]. Assembly reads
//! the whole list once per worker and drains the registry afterwards so the
//! same definitions are never consumed twice.

use serde::Serialize;
use std::collections::BTreeSet;

/// Which workers a registration may be attached to
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", content = "workers", rename_all = "snake_case")]
pub enum Affinity {
    /// No declared worker; usable by every worker
    #[default]
    Any,
    Workers(BTreeSet<String>),
}

impl Affinity {
    /// An empty list means no affinity
    pub fn from_workers<I, S>(workers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let workers: BTreeSet<String> = workers.into_iter().map(Into::into).collect();
        if workers.is_empty() {
            Self::Any
        } else {
            Self::Workers(workers)
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    pub fn admits(&self, worker: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Workers(workers) => workers.contains(worker),
        }
    }

    /// Declared worker names; empty for [`Affinity::Any`]
    pub fn workers(&self) -> impl Iterator<Item = &str> {
        let workers = match self {
            Self::Any => None,
            Self::Workers(workers) => Some(workers),
        };
        workers.into_iter().flatten().map(String::as_str)
    }
}

/// A workflow implementation to register on workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRegistration {
    pub workflow_type: String,
    pub affinity: Affinity,
}

impl WorkflowRegistration {
    pub fn new(workflow_type: impl Into<String>) -> Self {
        Self {
            workflow_type: workflow_type.into(),
            affinity: Affinity::Any,
        }
    }

    pub fn with_workers<I, S>(mut self, workers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affinity = Affinity::from_workers(workers);
        self
    }
}

/// An activity implementation to register on workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRegistration {
    pub activity_type: String,
    /// Prepended to the activity type name at registration
    pub prefix: Option<String>,
    pub affinity: Affinity,
}

impl ActivityRegistration {
    pub fn new(activity_type: impl Into<String>) -> Self {
        Self {
            activity_type: activity_type.into(),
            prefix: None,
            affinity: Affinity::Any,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_workers<I, S>(mut self, workers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affinity = Affinity::from_workers(workers);
        self
    }

    /// Name the activity is registered under
    pub fn registered_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{}", self.activity_type),
            None => self.activity_type.clone(),
        }
    }
}

/// Pending registrations awaiting assembly
#[derive(Debug, Clone, Default)]
pub struct DiscoveryRegistry {
    workflows: Vec<WorkflowRegistration>,
    activities: Vec<ActivityRegistration>,
}

impl DiscoveryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_workflow(&mut self, workflow: WorkflowRegistration) -> &mut Self {
        self.workflows.push(workflow);
        self
    }

    pub fn register_activity(&mut self, activity: ActivityRegistration) -> &mut Self {
        self.activities.push(activity);
        self
    }

    pub fn workflows(&self) -> &[WorkflowRegistration] {
        &self.workflows
    }

    pub fn activities(&self) -> &[ActivityRegistration] {
        &self.activities
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty() && self.activities.is_empty()
    }

    /// Remove every registration once it has been assigned to workers
    pub fn drain(&mut self) -> (Vec<WorkflowRegistration>, Vec<ActivityRegistration>) {
        (
            std::mem::take(&mut self.workflows),
            std::mem::take(&mut self.activities),
        )
    }
}

/// Registrations without declared affinity, attached to every worker.
///
/// One entry per registration in discovery order, so two registrations
/// sharing a type name are both listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReport {
    pub workflows_without_workers: Vec<String>,
    pub activities_without_workers: Vec<String>,
}

impl RegistrationReport {
    pub fn unconstrained(discovery: &DiscoveryRegistry) -> Self {
        Self {
            workflows_without_workers: discovery
                .workflows()
                .iter()
                .filter(|w| w.affinity.is_any())
                .map(|w| w.workflow_type.clone())
                .collect(),
            activities_without_workers: discovery
                .activities()
                .iter()
                .filter(|a| a.affinity.is_any())
                .map(ActivityRegistration::registered_name)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.workflows_without_workers.is_empty() && self.activities_without_workers.is_empty()
    }
}
