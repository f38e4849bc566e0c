//! Finalizers derived from the connection-pool registry.

use super::Finalizer;
use crate::constants::{ids, services};
use crate::error::FinalizationError;
use crate::sdk::ConnectionPoolRegistry;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keeps one named pool usable: pings it, reconnects on failure and resets a
/// closed unit of work
pub struct PingConnectionFinalizer {
    id: String,
    pool_name: String,
    registry: Arc<dyn ConnectionPoolRegistry>,
}

impl PingConnectionFinalizer {
    pub fn new(registry: Arc<dyn ConnectionPoolRegistry>, pool_name: impl Into<String>) -> Self {
        let pool_name = pool_name.into();
        Self {
            id: ids::ping_connection_finalizer(&pool_name),
            pool_name,
            registry,
        }
    }

    pub fn pool_name(&self) -> &str {
        &self.pool_name
    }
}

impl Finalizer for PingConnectionFinalizer {
    fn finalize(&self) -> Result<(), FinalizationError> {
        let Some(pool) = self.registry.pool(&self.pool_name) else {
            debug!(pool = %self.pool_name, "Connection pool not available, nothing to ping");
            return Ok(());
        };

        if let Err(e) = pool.ping() {
            warn!(pool = %self.pool_name, error = %e, "Connection ping failed, reconnecting");
            pool.reconnect()
                .map_err(|e| FinalizationError::failed(&self.id, e.to_string()))?;
        }

        if !pool.is_open() {
            debug!(pool = %self.pool_name, "Unit of work closed, resetting");
            pool.reset()
                .map_err(|e| FinalizationError::failed(&self.id, e.to_string()))?;
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn checks_connection(&self) -> bool {
        true
    }
}

/// Clears the unit-of-work state of every registered pool
pub struct ClearConnectionsFinalizer {
    registry: Arc<dyn ConnectionPoolRegistry>,
}

impl ClearConnectionsFinalizer {
    pub fn new(registry: Arc<dyn ConnectionPoolRegistry>) -> Self {
        Self { registry }
    }
}

impl Finalizer for ClearConnectionsFinalizer {
    fn finalize(&self) -> Result<(), FinalizationError> {
        let mut failures = Vec::new();
        for name in self.registry.pool_names() {
            let Some(pool) = self.registry.pool(&name) else {
                continue;
            };
            if let Err(e) = pool.clear() {
                failures.push(format!("{name}: {e}"));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(FinalizationError::failed(
                services::CLEAR_CONNECTIONS_FINALIZER,
                failures.join("; "),
            ))
        }
    }

    fn name(&self) -> &str {
        services::CLEAR_CONNECTIONS_FINALIZER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PoolError;
    use crate::sdk::ConnectionPool;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct ScriptedPool {
        ping_fails: bool,
        reconnect_fails: bool,
        closed: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl ConnectionPool for ScriptedPool {
        fn ping(&self) -> Result<(), PoolError> {
            self.calls.lock().push("ping");
            if self.ping_fails {
                Err(PoolError::new("main", "server has gone away"))
            } else {
                Ok(())
            }
        }

        fn reconnect(&self) -> Result<(), PoolError> {
            self.calls.lock().push("reconnect");
            if self.reconnect_fails {
                Err(PoolError::new("main", "connection refused"))
            } else {
                Ok(())
            }
        }

        fn is_open(&self) -> bool {
            !self.closed
        }

        fn reset(&self) -> Result<(), PoolError> {
            self.calls.lock().push("reset");
            Ok(())
        }

        fn clear(&self) -> Result<(), PoolError> {
            self.calls.lock().push("clear");
            Ok(())
        }
    }

    struct Pools(BTreeMap<String, Arc<ScriptedPool>>);

    impl ConnectionPoolRegistry for Pools {
        fn pool_names(&self) -> Vec<String> {
            self.0.keys().cloned().collect()
        }

        fn pool(&self, name: &str) -> Option<Arc<dyn ConnectionPool>> {
            self.0.get(name).map(|pool| pool.clone() as Arc<dyn ConnectionPool>)
        }
    }

    fn registry(pool: ScriptedPool) -> (Arc<ScriptedPool>, Arc<Pools>) {
        let pool = Arc::new(pool);
        let mut pools = BTreeMap::new();
        pools.insert("main".to_string(), pool.clone());
        (pool, Arc::new(Pools(pools)))
    }

    #[test]
    fn test_healthy_pool_only_pinged() {
        let (pool, pools) = registry(ScriptedPool::default());
        let finalizer = PingConnectionFinalizer::new(pools, "main");

        assert_eq!(finalizer.name(), "temporal.ping_connection_main.finalizer");
        finalizer.finalize().unwrap();
        assert_eq!(pool.calls.lock().as_slice(), ["ping"]);
    }

    #[test]
    fn test_failed_ping_reconnects_and_closed_resets() {
        let (pool, pools) = registry(ScriptedPool {
            ping_fails: true,
            closed: true,
            ..ScriptedPool::default()
        });
        PingConnectionFinalizer::new(pools, "main").finalize().unwrap();
        assert_eq!(pool.calls.lock().as_slice(), ["ping", "reconnect", "reset"]);
    }

    #[test]
    fn test_reconnect_failure_is_reported() {
        let (_pool, pools) = registry(ScriptedPool {
            ping_fails: true,
            reconnect_fails: true,
            ..ScriptedPool::default()
        });
        let err = PingConnectionFinalizer::new(pools, "main")
            .finalize()
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_missing_pool_is_a_no_op() {
        let (_pool, pools) = registry(ScriptedPool::default());
        assert!(PingConnectionFinalizer::new(pools, "reporting").finalize().is_ok());
    }

    #[test]
    fn test_clear_connections_visits_every_pool() {
        let (pool, pools) = registry(ScriptedPool::default());
        ClearConnectionsFinalizer::new(pools).finalize().unwrap();
        assert_eq!(pool.calls.lock().as_slice(), ["clear"]);
    }
}
