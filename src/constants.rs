//! # System Constants
//!
//! Well-known service ids, default names and tunable defaults shared by the
//! configuration model and the assemblers.
//!
//! Ids follow the `temporal.<name>.<kind>` convention so that every assembled
//! object can be referenced by a stable string from configuration and from the
//! debug tooling.

/// Default names and values applied when configuration omits them
pub mod defaults {
    pub const CLIENT_NAME: &str = "default";
    pub const NAMESPACE: &str = "default";
    pub const TEMPORAL_ADDRESS: &str = "localhost:7233";
    pub const TRANSPORT_RPC_ADDRESS: &str = "tcp://127.0.0.1:6001";
    pub const GRPC_TIMEOUT_VALUE: u64 = 5;
    pub const MAX_CONCURRENT_SESSION_EXECUTION_SIZE: u32 = 1000;

    /// Environment variable consulted for client addresses
    pub const TEMPORAL_ADDRESS_ENV: &str = "TEMPORAL_ADDRESS";
}

/// Ids of the collaborators registered by default
pub mod services {
    pub const DATA_CONVERTER: &str = "temporal.data_converter";
    pub const EXCEPTION_INTERCEPTOR: &str = "temporal.exception_interceptor";
    pub const WORKER_FACTORY: &str = "temporal.worker_factory";
    pub const CLEAR_CONNECTIONS_FINALIZER: &str = "temporal.clear_connections.finalizer";
    pub const REPORTING_ACTIVITY_INBOUND_INTERCEPTOR: &str =
        "temporal.reporting_activity_inbound.interceptor";
    pub const REPORTING_WORKFLOW_OUTBOUND_INTERCEPTOR: &str =
        "temporal.reporting_workflow_outbound.interceptor";
    pub const CONNECTION_HEALTH_ACTIVITY_INBOUND_INTERCEPTOR: &str =
        "temporal.connection_health_activity_inbound.interceptor";
    pub const CONNECTION_HEALTH_WORKFLOW_OUTBOUND_INTERCEPTOR: &str =
        "temporal.connection_health_workflow_outbound.interceptor";
}

/// Layer names reported by decorator chains
pub mod layers {
    pub const CONNECTION_HEALTH: &str = "connection_health";
    pub const REPORTING: &str = "reporting";
    pub const CHAIN: &str = "chain";
}

/// Builders for the ids of assembled objects
pub mod ids {
    pub fn workflow_client(name: &str) -> String {
        format!("temporal.{name}.client")
    }

    pub fn schedule_client(name: &str) -> String {
        format!("temporal.{name}.schedule_client")
    }

    /// Argument-style alias, e.g. `barWorkflowClient`
    pub fn workflow_client_alias(name: &str) -> String {
        format!("{name}WorkflowClient")
    }

    pub fn schedule_client_alias(name: &str) -> String {
        format!("{name}ScheduleClient")
    }

    pub fn worker(name: &str) -> String {
        format!("temporal.{name}.worker")
    }

    pub fn worker_finalizer(name: &str) -> String {
        format!("temporal.{name}.worker.finalizer")
    }

    /// Derived finalizer id for one named connection pool (pool name + purpose)
    pub fn ping_connection_finalizer(pool: &str) -> String {
        format!("temporal.ping_connection_{pool}.finalizer")
    }
}
