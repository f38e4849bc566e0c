//! # Temporal Configuration Model
//!
//! Typed, validated representation of the declarative `temporal:` tree:
//! named workflow clients, schedule clients, workers and the shared pool
//! settings.
//!
//! ## Lifecycle
//!
//! 1. **Parse**: serde turns YAML into [`TemporalConfig`]; unknown keys on the
//!    root and client blocks are rejected, unknown worker keys are kept as
//!    forward-compatible tunables.
//! 2. **Resolve**: [`TemporalConfig::apply_defaults`] fills client addresses and
//!    data converters from the global settings.
//! 3. **Validate**: [`TemporalConfig::validate`] checks every rule (mandatory
//!    fields, repeated list entries, interval strings, TLS pairs) and fails the
//!    whole assembly on the first violation.
//!
//! ```rust
//! use temporal_assembly::config::TemporalConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TemporalConfig::parse(
//!     r#"
//! workers:
//!   default:
//!     taskQueue: default
//!     workerStopTimeout: 5 seconds
//! "#,
//! )?;
//!
//! assert_eq!(config.workers["default"].task_queue, "default");
//! assert_eq!(config.clients["default"].namespace, "default");
//! # Ok(())
//! # }
//! ```

pub mod interval;
pub mod loader;

use crate::constants::{defaults, services};
use crate::error::{AssemblyError, AssemblyResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

pub use interval::{parse_interval, IntervalFormat};
pub use loader::ConfigManager;

fn default_client_name() -> String {
    defaults::CLIENT_NAME.to_string()
}

fn default_worker_factory() -> String {
    services::WORKER_FACTORY.to_string()
}

fn default_data_converter() -> String {
    services::DATA_CONVERTER.to_string()
}

fn default_transport_rpc_address() -> String {
    defaults::TRANSPORT_RPC_ADDRESS.to_string()
}

fn default_exception_interceptor() -> String {
    services::EXCEPTION_INTERCEPTOR.to_string()
}

fn default_clients() -> BTreeMap<String, ClientConfig> {
    let mut clients = BTreeMap::new();
    clients.insert(
        defaults::CLIENT_NAME.to_string(),
        ClientConfig {
            namespace: defaults::NAMESPACE.to_string(),
            ..ClientConfig::default()
        },
    );
    clients
}

/// Root of the declarative configuration tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TemporalConfig {
    #[serde(default = "default_client_name")]
    pub default_client: String,
    #[serde(default = "default_client_name")]
    pub default_schedule_client: String,
    #[serde(default = "default_worker_factory")]
    pub worker_factory: String,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default = "default_clients")]
    pub clients: BTreeMap<String, ClientConfig>,
    #[serde(default = "default_clients")]
    pub schedule_clients: BTreeMap<String, ClientConfig>,
    #[serde(default)]
    pub workers: BTreeMap<String, WorkerConfig>,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            default_client: default_client_name(),
            default_schedule_client: default_client_name(),
            worker_factory: default_worker_factory(),
            pool: PoolConfig::default(),
            clients: default_clients(),
            schedule_clients: default_clients(),
            workers: BTreeMap::new(),
        }
    }
}

/// Settings shared by the worker pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PoolConfig {
    #[serde(default = "default_data_converter")]
    pub data_converter: String,
    #[serde(
        default = "default_transport_rpc_address",
        rename = "transportRPCAddress",
        alias = "roadrunnerRPC"
    )]
    pub transport_rpc_address: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            data_converter: default_data_converter(),
            transport_rpc_address: default_transport_rpc_address(),
        }
    }
}

/// One workflow client or schedule client entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientConfig {
    /// Map key of the entry, filled in by [`TemporalConfig::apply_defaults`]
    #[serde(skip)]
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub data_converter: String,
    #[serde(default)]
    pub client_key: Option<String>,
    #[serde(default)]
    pub client_pem: Option<String>,
    #[serde(default)]
    pub query_rejection_condition: Option<QueryRejectionCondition>,
    #[serde(default)]
    pub interceptors: Vec<String>,
    #[serde(default)]
    pub grpc_context: GrpcContextConfig,
}

impl ClientConfig {
    /// Key/certificate pair when both halves are configured
    pub fn tls_credentials(&self) -> Option<(&str, &str)> {
        match (self.client_key.as_deref(), self.client_pem.as_deref()) {
            (Some(key), Some(pem)) => Some((key, pem)),
            _ => None,
        }
    }

    fn apply_defaults(&mut self, name: &str, data_converter: &str, address: &str) {
        self.name = name.to_string();
        if self.address.trim().is_empty() {
            self.address = address.to_string();
        }
        if self.data_converter.trim().is_empty() {
            self.data_converter = data_converter.to_string();
        }
    }

    fn validate(&self, path: &str) -> AssemblyResult<()> {
        require_non_empty(&format!("{path}.namespace"), &self.namespace)?;
        require_non_empty(&format!("{path}.address"), &self.address)?;
        require_non_empty(&format!("{path}.dataConverter"), &self.data_converter)?;
        if let Some(identity) = &self.identity {
            require_non_empty(&format!("{path}.identity"), identity)?;
        }

        match (&self.client_key, &self.client_pem) {
            (Some(_), None) => {
                return Err(AssemblyError::configuration(
                    format!("{path}.clientPem"),
                    "clientKey is set but clientPem is missing",
                ))
            }
            (None, Some(_)) => {
                return Err(AssemblyError::configuration(
                    format!("{path}.clientKey"),
                    "clientPem is set but clientKey is missing",
                ))
            }
            _ => {}
        }

        ensure_unique(&format!("{path}.interceptors"), &self.interceptors)?;
        self.grpc_context.validate(&format!("{path}.grpcContext"))
    }
}

/// Query rejection condition accepted by workflow clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQueryRejectionCondition", rename_all = "snake_case")]
pub enum QueryRejectionCondition {
    Unspecified = 0,
    None = 1,
    NotOpen = 2,
    NotCompletedCleanly = 3,
}

impl QueryRejectionCondition {
    pub fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQueryRejectionCondition {
    Code(i64),
    Name(String),
}

impl TryFrom<RawQueryRejectionCondition> for QueryRejectionCondition {
    type Error = String;

    fn try_from(raw: RawQueryRejectionCondition) -> Result<Self, Self::Error> {
        let condition = match &raw {
            RawQueryRejectionCondition::Code(0) => Some(Self::Unspecified),
            RawQueryRejectionCondition::Code(1) => Some(Self::None),
            RawQueryRejectionCondition::Code(2) => Some(Self::NotOpen),
            RawQueryRejectionCondition::Code(3) => Some(Self::NotCompletedCleanly),
            RawQueryRejectionCondition::Code(_) => None,
            RawQueryRejectionCondition::Name(name) => {
                let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
                match normalized
                    .strip_prefix("query_reject_condition_")
                    .unwrap_or(&normalized)
                {
                    "unspecified" => Some(Self::Unspecified),
                    "none" => Some(Self::None),
                    "not_open" | "notopen" => Some(Self::NotOpen),
                    "not_completed_cleanly" | "notcompletedcleanly" => {
                        Some(Self::NotCompletedCleanly)
                    }
                    _ => None,
                }
            }
        };

        condition.ok_or_else(|| {
            let shown = match raw {
                RawQueryRejectionCondition::Code(code) => code.to_string(),
                RawQueryRejectionCondition::Name(name) => name,
            };
            format!(
                "\"queryRejectionCondition\" value {shown} is not one of: \
                 unspecified (0), none (1), not_open (2), not_completed_cleanly (3)"
            )
        })
    }
}

/// gRPC call context applied by a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GrpcContextConfig {
    #[serde(default)]
    pub timeout: GrpcTimeoutConfig,
    #[serde(default)]
    pub options: BTreeMap<String, JsonValue>,
    #[serde(default)]
    pub metadata: BTreeMap<String, JsonValue>,
    #[serde(default)]
    pub retry_options: Option<RetryOptionsConfig>,
}

impl GrpcContextConfig {
    fn validate(&self, path: &str) -> AssemblyResult<()> {
        if self.timeout.value == 0 {
            return Err(AssemblyError::configuration(
                format!("{path}.timeout.value"),
                "timeout must be a positive integer",
            ));
        }
        if let Some(retry) = &self.retry_options {
            retry.validate(&format!("{path}.retryOptions"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GrpcTimeoutConfig {
    #[serde(default = "default_grpc_timeout_value")]
    pub value: u64,
    #[serde(default)]
    pub format: IntervalFormat,
}

fn default_grpc_timeout_value() -> u64 {
    defaults::GRPC_TIMEOUT_VALUE
}

impl Default for GrpcTimeoutConfig {
    fn default() -> Self {
        Self {
            value: default_grpc_timeout_value(),
            format: IntervalFormat::default(),
        }
    }
}

impl GrpcTimeoutConfig {
    pub fn duration(&self) -> Duration {
        self.format.to_duration(self.value)
    }
}

/// Retry policy for client RPCs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RetryOptionsConfig {
    #[serde(default)]
    pub initial_interval: Option<String>,
    #[serde(default)]
    pub maximum_interval: Option<String>,
    #[serde(default, alias = "backoff_coefficient")]
    pub backoff_coefficient: Option<f64>,
    /// 0 means unlimited
    #[serde(default)]
    pub maximum_attempts: u32,
    #[serde(default)]
    pub non_retryable_exceptions: Vec<String>,
}

impl RetryOptionsConfig {
    pub fn initial_interval(&self, path: &str) -> AssemblyResult<Option<Duration>> {
        parse_optional_interval(&format!("{path}.initialInterval"), &self.initial_interval)
    }

    pub fn maximum_interval(&self, path: &str) -> AssemblyResult<Option<Duration>> {
        parse_optional_interval(&format!("{path}.maximumInterval"), &self.maximum_interval)
    }

    fn validate(&self, path: &str) -> AssemblyResult<()> {
        self.initial_interval(path)?;
        self.maximum_interval(path)?;
        if let Some(coefficient) = self.backoff_coefficient {
            if !(coefficient >= 1.0) {
                return Err(AssemblyError::configuration(
                    format!("{path}.backoffCoefficient"),
                    format!("backoff coefficient must be at least 1.0, got {coefficient}"),
                ));
            }
        }
        Ok(())
    }
}

/// One worker entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    /// Map key of the entry, filled in by [`TemporalConfig::apply_defaults`]
    #[serde(skip)]
    pub name: String,
    pub task_queue: String,
    #[serde(default = "default_exception_interceptor")]
    pub exception_interceptor: String,
    #[serde(default)]
    pub finalizers: Vec<String>,
    #[serde(default)]
    pub interceptors: Vec<String>,
    #[serde(flatten)]
    pub tunables: WorkerTunables,
    /// Keys this version does not model; applied by name and ignored when unsupported
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl WorkerConfig {
    pub fn new(task_queue: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            task_queue: task_queue.into(),
            exception_interceptor: default_exception_interceptor(),
            finalizers: Vec::new(),
            interceptors: Vec::new(),
            tunables: WorkerTunables::default(),
            extra: BTreeMap::new(),
        }
    }

    /// Every tunable as a `(key, value)` pair, modeled keys first
    pub fn option_entries(&self) -> AssemblyResult<Vec<(String, JsonValue)>> {
        let tunables = serde_json::to_value(&self.tunables).map_err(|e| {
            AssemblyError::configuration(
                format!("workers.{}", self.name),
                format!("Failed to read worker tunables: {e}"),
            )
        })?;

        let mut entries: Vec<(String, JsonValue)> = match tunables {
            JsonValue::Object(map) => map.into_iter().collect(),
            _ => Vec::new(),
        };
        entries.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(entries)
    }

    fn validate(&self, path: &str) -> AssemblyResult<()> {
        require_non_empty(&format!("{path}.taskQueue"), &self.task_queue)?;
        require_non_empty(
            &format!("{path}.exceptionInterceptor"),
            &self.exception_interceptor,
        )?;
        ensure_unique(&format!("{path}.finalizers"), &self.finalizers)?;
        ensure_unique(&format!("{path}.interceptors"), &self.interceptors)?;

        for (key, raw) in self.tunables.intervals() {
            if let Some(raw) = raw {
                parse_required_interval(&format!("{path}.{key}"), raw)?;
            }
        }
        Ok(())
    }
}

/// Worker tunables; zero/false/empty means "use the engine default"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerTunables {
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
    pub sticky_schedule_to_start_timeout: Option<String>,
    pub worker_stop_timeout: Option<String>,
    pub deadlock_detection_timeout: Option<String>,
    pub max_heartbeat_throttle_interval: Option<String>,
}

impl Default for WorkerTunables {
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
        }
    }
}

impl WorkerTunables {
    /// Interval tunables as `(key, raw value)`, keyed like [`INTERVAL_KEYS`]
    pub fn intervals(&self) -> [(&'static str, Option<&str>); 4] {
        [
            (INTERVAL_KEYS[0], self.sticky_schedule_to_start_timeout.as_deref()),
            (INTERVAL_KEYS[1], self.worker_stop_timeout.as_deref()),
            (INTERVAL_KEYS[2], self.deadlock_detection_timeout.as_deref()),
            (INTERVAL_KEYS[3], self.max_heartbeat_throttle_interval.as_deref()),
        ]
    }
}

impl TemporalConfig {
    /// Parse, resolve and validate a YAML document (bare tree, not `temporal:`-rooted)
    pub fn parse(yaml: &str) -> AssemblyResult<Self> {
        let mut config: TemporalConfig = serde_yaml::from_str(yaml)
            .map_err(|e| AssemblyError::configuration("temporal", e.to_string()))?;
        config.resolve()?;
        Ok(config)
    }

    /// Apply defaults using the environment address fallback, then validate
    pub fn resolve(&mut self) -> AssemblyResult<()> {
        let address = std::env::var(defaults::TEMPORAL_ADDRESS_ENV)
            .ok()
            .filter(|address| !address.trim().is_empty())
            .unwrap_or_else(|| defaults::TEMPORAL_ADDRESS.to_string());
        self.apply_defaults(&address);
        self.validate()
    }

    /// Fill entry names, client addresses and data converters
    pub fn apply_defaults(&mut self, address: &str) {
        let data_converter = self.pool.data_converter.clone();
        for (name, client) in self
            .clients
            .iter_mut()
            .chain(self.schedule_clients.iter_mut())
        {
            client.apply_defaults(name, &data_converter, address);
        }
        for (name, worker) in self.workers.iter_mut() {
            worker.name = name.clone();
        }
    }

    /// Check every load-time rule; the first violation fails the whole tree
    pub fn validate(&self) -> AssemblyResult<()> {
        require_non_empty("temporal.defaultClient", &self.default_client)?;
        require_non_empty("temporal.defaultScheduleClient", &self.default_schedule_client)?;
        require_non_empty("temporal.workerFactory", &self.worker_factory)?;
        require_non_empty("temporal.pool.dataConverter", &self.pool.data_converter)?;
        require_non_empty(
            "temporal.pool.transportRPCAddress",
            &self.pool.transport_rpc_address,
        )?;

        for (name, client) in &self.clients {
            require_non_empty("temporal.clients", name)?;
            client.validate(&format!("temporal.clients.{name}"))?;
        }
        for (name, client) in &self.schedule_clients {
            require_non_empty("temporal.scheduleClients", name)?;
            client.validate(&format!("temporal.scheduleClients.{name}"))?;
        }
        for (name, worker) in &self.workers {
            require_non_empty("temporal.workers", name)?;
            worker.validate(&format!("temporal.workers.{name}"))?;
        }
        Ok(())
    }
}

/// Modeled tunable keys carrying interval strings
pub const INTERVAL_KEYS: &[&str] = &[
    "stickyScheduleToStartTimeout",
    "workerStopTimeout",
    "deadlockDetectionTimeout",
    "maxHeartbeatThrottleInterval",
];

/// Whether `key` is a modeled interval tunable; unmodeled keys are never parsed
pub fn is_interval_key(key: &str) -> bool {
    INTERVAL_KEYS.contains(&key)
}

fn require_non_empty(path: &str, value: &str) -> AssemblyResult<()> {
    if value.trim().is_empty() {
        return Err(AssemblyError::configuration(path, "value cannot be empty"));
    }
    Ok(())
}

fn ensure_unique(path: &str, entries: &[String]) -> AssemblyResult<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        require_non_empty(path, entry)?;
        if !seen.insert(entry.as_str()) {
            return Err(AssemblyError::repeated_entry(path, entry));
        }
    }
    Ok(())
}

pub(crate) fn parse_required_interval(path: &str, raw: &str) -> AssemblyResult<Duration> {
    parse_interval(raw).ok_or_else(|| AssemblyError::invalid_interval(path, raw))
}

fn parse_optional_interval(path: &str, raw: &Option<String>) -> AssemblyResult<Option<Duration>> {
    raw.as_deref()
        .map(|value| parse_required_interval(path, value))
        .transpose()
}
