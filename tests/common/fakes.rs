use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use temporal_assembly::error::{FinalizationError, PoolError, ReportingError};
use temporal_assembly::finalizer::Finalizer;
use temporal_assembly::interceptor::pipeline::{ActivityInput, ActivityNext, ActivityResult, Interceptor};
use temporal_assembly::sdk::{ConnectionPool, ConnectionPoolRegistry, ErrorReportingHub, ReportContext};

/// Hub recording every capture; can be switched to fail
#[derive(Default)]
pub struct RecordingHub {
    pub captured: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl RecordingHub {
    pub fn failing() -> Self {
        let hub = Self::default();
        hub.fail.store(true, Ordering::SeqCst);
        hub
    }

    pub fn scopes(&self) -> Vec<String> {
        self.captured.lock().iter().map(|(scope, _)| scope.clone()).collect()
    }
}

impl ErrorReportingHub for RecordingHub {
    fn capture_exception(
        &self,
        error: &(dyn std::error::Error + Send + Sync),
        context: &ReportContext,
    ) -> Result<(), ReportingError> {
        self.captured
            .lock()
            .push((context.scope.clone(), error.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReportingError::new("hub offline"));
        }
        Ok(())
    }
}

/// Finalizer appending its name to a shared log
pub struct LoggingFinalizer {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl LoggingFinalizer {
    pub fn new(name: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            log,
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Finalizer for LoggingFinalizer {
    fn finalize(&self) -> Result<(), FinalizationError> {
        self.log.lock().push(self.name.clone());
        if self.fail {
            return Err(FinalizationError::failed(&self.name, "cleanup failed"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Interceptor appending `name` to a shared log on the way in
pub struct LoggingInterceptor {
    name: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl LoggingInterceptor {
    pub fn new(name: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }
}

impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle_activity_inbound(&self, input: &ActivityInput, next: ActivityNext<'_>) -> ActivityResult {
        self.log.lock().push(self.name.clone());
        next.run(input)
    }
}

/// Pool with scripted ping and open state, counting every call
#[derive(Default)]
pub struct ScriptedPool {
    pub ping_fails: AtomicBool,
    pub closed: AtomicBool,
    pub pings: AtomicUsize,
    pub reconnects: AtomicUsize,
    pub resets: AtomicUsize,
    pub clears: AtomicUsize,
}

impl ConnectionPool for ScriptedPool {
    fn ping(&self) -> Result<(), PoolError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.ping_fails.load(Ordering::SeqCst) {
            return Err(PoolError::new("default", "server has gone away"));
        }
        Ok(())
    }

    fn reconnect(&self) -> Result<(), PoolError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        self.ping_fails.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    fn reset(&self) -> Result<(), PoolError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.closed.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<(), PoolError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct ScriptedPools {
    pub pools: BTreeMap<String, Arc<ScriptedPool>>,
}

impl ScriptedPools {
    pub fn with_pools(names: &[&str]) -> Self {
        Self {
            pools: names
                .iter()
                .map(|name| (name.to_string(), Arc::new(ScriptedPool::default())))
                .collect(),
        }
    }
}

impl ConnectionPoolRegistry for ScriptedPools {
    fn pool_names(&self) -> Vec<String> {
        self.pools.keys().cloned().collect()
    }

    fn pool(&self, name: &str) -> Option<Arc<dyn ConnectionPool>> {
        self.pools
            .get(name)
            .map(|pool| pool.clone() as Arc<dyn ConnectionPool>)
    }
}
