//! Worker options and the key → builder method mapping.
//!
//! Configuration keys are applied one by one through [`WorkerOptions::apply`].
//! Keys this version does not know are skipped so newer configuration keeps
//! loading against an older engine.

use crate::config::{is_interval_key, parse_required_interval};
use crate::constants::defaults;
use crate::error::{AssemblyError, AssemblyResult};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;

fn serialize_millis<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
        None => serializer.serialize_none(),
    }
}

/// Tunables handed to the engine when creating a worker; zero means engine default
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerOptions {
    pub max_concurrent_activity_execution_size: u32,
    pub worker_activities_per_second: f64,
    pub max_concurrent_local_activity_execution_size: u32,
    pub worker_local_activities_per_second: f64,
    pub task_queue_activities_per_second: f64,
    pub max_concurrent_activity_task_pollers: u32,
    pub max_concurrent_workflow_task_execution_size: u32,
    pub max_concurrent_workflow_task_pollers: u32,
    pub enable_session_worker: bool,
    pub session_resource_id: Option<String>,
    pub max_concurrent_session_execution_size: u32,
    #[serde(rename = "stickyScheduleToStartTimeoutMs", serialize_with = "serialize_millis")]
    pub sticky_schedule_to_start_timeout: Option<Duration>,
    #[serde(rename = "workerStopTimeoutMs", serialize_with = "serialize_millis")]
    pub worker_stop_timeout: Option<Duration>,
    #[serde(rename = "deadlockDetectionTimeoutMs", serialize_with = "serialize_millis")]
    pub deadlock_detection_timeout: Option<Duration>,
    #[serde(rename = "maxHeartbeatThrottleIntervalMs", serialize_with = "serialize_millis")]
    pub max_heartbeat_throttle_interval: Option<Duration>,
    /// Builder methods applied, in call order
    pub applied: Vec<String>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            max_concurrent_activity_execution_size: 0,
            worker_activities_per_second: 0.0,
            max_concurrent_local_activity_execution_size: 0,
            worker_local_activities_per_second: 0.0,
            task_queue_activities_per_second: 0.0,
            max_concurrent_activity_task_pollers: 0,
            max_concurrent_workflow_task_execution_size: 0,
            max_concurrent_workflow_task_pollers: 0,
            enable_session_worker: false,
            session_resource_id: None,
            max_concurrent_session_execution_size: defaults::MAX_CONCURRENT_SESSION_EXECUTION_SIZE,
            sticky_schedule_to_start_timeout: None,
            worker_stop_timeout: None,
            deadlock_detection_timeout: None,
            max_heartbeat_throttle_interval: None,
            applied: Vec::new(),
        }
    }
}

impl WorkerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(mut self, method: &str) -> Self {
        self.applied.push(method.to_string());
        self
    }

    pub fn with_max_concurrent_activity_execution_size(mut self, size: u32) -> Self {
        self.max_concurrent_activity_execution_size = size;
        self.record("with_max_concurrent_activity_execution_size")
    }

    pub fn with_worker_activities_per_second(mut self, rate: f64) -> Self {
        self.worker_activities_per_second = rate;
        self.record("with_worker_activities_per_second")
    }

    pub fn with_max_concurrent_local_activity_execution_size(mut self, size: u32) -> Self {
        self.max_concurrent_local_activity_execution_size = size;
        self.record("with_max_concurrent_local_activity_execution_size")
    }

    pub fn with_worker_local_activities_per_second(mut self, rate: f64) -> Self {
        self.worker_local_activities_per_second = rate;
        self.record("with_worker_local_activities_per_second")
    }

    pub fn with_task_queue_activities_per_second(mut self, rate: f64) -> Self {
        self.task_queue_activities_per_second = rate;
        self.record("with_task_queue_activities_per_second")
    }

    pub fn with_max_concurrent_activity_task_pollers(mut self, pollers: u32) -> Self {
        self.max_concurrent_activity_task_pollers = pollers;
        self.record("with_max_concurrent_activity_task_pollers")
    }

    pub fn with_max_concurrent_workflow_task_execution_size(mut self, size: u32) -> Self {
        self.max_concurrent_workflow_task_execution_size = size;
        self.record("with_max_concurrent_workflow_task_execution_size")
    }

    pub fn with_max_concurrent_workflow_task_pollers(mut self, pollers: u32) -> Self {
        self.max_concurrent_workflow_task_pollers = pollers;
        self.record("with_max_concurrent_workflow_task_pollers")
    }

    pub fn with_enable_session_worker(mut self, enable: bool) -> Self {
        self.enable_session_worker = enable;
        self.record("with_enable_session_worker")
    }

    pub fn with_session_resource_id(mut self, id: impl Into<String>) -> Self {
        self.session_resource_id = Some(id.into());
        self.record("with_session_resource_id")
    }

    pub fn with_max_concurrent_session_execution_size(mut self, size: u32) -> Self {
        self.max_concurrent_session_execution_size = size;
        self.record("with_max_concurrent_session_execution_size")
    }

    pub fn with_sticky_schedule_to_start_timeout(mut self, timeout: Duration) -> Self {
        self.sticky_schedule_to_start_timeout = Some(timeout);
        self.record("with_sticky_schedule_to_start_timeout")
    }

    pub fn with_worker_stop_timeout(mut self, timeout: Duration) -> Self {
        self.worker_stop_timeout = Some(timeout);
        self.record("with_worker_stop_timeout")
    }

    pub fn with_deadlock_detection_timeout(mut self, timeout: Duration) -> Self {
        self.deadlock_detection_timeout = Some(timeout);
        self.record("with_deadlock_detection_timeout")
    }

    pub fn with_max_heartbeat_throttle_interval(mut self, interval: Duration) -> Self {
        self.max_heartbeat_throttle_interval = Some(interval);
        self.record("with_max_heartbeat_throttle_interval")
    }

    /// Apply one configuration key.
    ///
    /// Returns `Ok(false)` when the key is unknown, or when the value is null
    /// or is not a string for an interval key. `path` is only used in errors.
    pub fn apply(&mut self, path: &str, key: &str, value: &JsonValue) -> AssemblyResult<bool> {
        if value.is_null() {
            return Ok(false);
        }
        if is_interval_key(key) && !value.is_string() {
            return Ok(false);
        }

        let field = format!("{path}.{key}");
        let interval = || parse_required_interval(&field, value.as_str().unwrap_or_default());
        let current = self.clone();
        let updated = match key {
            "maxConcurrentActivityExecutionSize" => {
                current.with_max_concurrent_activity_execution_size(as_u32(&field, value)?)
            }
            "workerActivitiesPerSecond" => current.with_worker_activities_per_second(as_f64(&field, value)?),
            "maxConcurrentLocalActivityExecutionSize" => {
                current.with_max_concurrent_local_activity_execution_size(as_u32(&field, value)?)
            }
            "workerLocalActivitiesPerSecond" => {
                current.with_worker_local_activities_per_second(as_f64(&field, value)?)
            }
            "taskQueueActivitiesPerSecond" => {
                current.with_task_queue_activities_per_second(as_f64(&field, value)?)
            }
            "maxConcurrentActivityTaskPollers" => {
                current.with_max_concurrent_activity_task_pollers(as_u32(&field, value)?)
            }
            "maxConcurrentWorkflowTaskExecutionSize" => {
                current.with_max_concurrent_workflow_task_execution_size(as_u32(&field, value)?)
            }
            "maxConcurrentWorkflowTaskPollers" => {
                current.with_max_concurrent_workflow_task_pollers(as_u32(&field, value)?)
            }
            "enableSessionWorker" => current.with_enable_session_worker(as_bool(&field, value)?),
            "sessionResourceId" => current.with_session_resource_id(as_string(&field, value)?),
            "maxConcurrentSessionExecutionSize" => {
                current.with_max_concurrent_session_execution_size(as_u32(&field, value)?)
            }
            "stickyScheduleToStartTimeout" => current.with_sticky_schedule_to_start_timeout(interval()?),
            "workerStopTimeout" => current.with_worker_stop_timeout(interval()?),
            "deadlockDetectionTimeout" => current.with_deadlock_detection_timeout(interval()?),
            "maxHeartbeatThrottleInterval" => current.with_max_heartbeat_throttle_interval(interval()?),
            _ => {
                debug!(key = %key, "Ignoring unsupported worker option");
                return Ok(false);
            }
        };
        *self = updated;
        Ok(true)
    }

    /// Sessions need a resource id; generate one when none is configured
    pub fn ensure_session_resource_id(self) -> Self {
        if self.enable_session_worker && self.session_resource_id.is_none() {
            let id = uuid::Uuid::new_v4().to_string();
            debug!(session_resource_id = %id, "Generated session resource id");
            return self.with_session_resource_id(id);
        }
        self
    }
}

fn type_error(path: &str, expected: &str, value: &JsonValue) -> AssemblyError {
    AssemblyError::configuration(path, format!("expected {expected}, got {value}"))
}

fn as_u32(path: &str, value: &JsonValue) -> AssemblyResult<u32> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| type_error(path, "a non-negative integer", value))
}

fn as_f64(path: &str, value: &JsonValue) -> AssemblyResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| type_error(path, "a number", value))
}

fn as_bool(path: &str, value: &JsonValue) -> AssemblyResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| type_error(path, "a boolean", value))
}

fn as_string(path: &str, value: &JsonValue) -> AssemblyResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| type_error(path, "a string", value))
}
