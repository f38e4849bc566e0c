//! Client options built through a `with_*` method chain.

use crate::config::QueryRejectionCondition;
use serde::Serialize;

/// Options applied to a workflow or schedule client
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOptions {
    pub namespace: String,
    pub identity: Option<String>,
    pub query_rejection_condition: Option<QueryRejectionCondition>,
    /// Builder methods applied, in call order
    pub applied: Vec<String>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self.applied.push("with_namespace".to_string());
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self.applied.push("with_identity".to_string());
        self
    }

    pub fn with_query_rejection_condition(mut self, condition: QueryRejectionCondition) -> Self {
        self.query_rejection_condition = Some(condition);
        self.applied.push("with_query_rejection_condition".to_string());
        self
    }
}
