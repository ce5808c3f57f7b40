use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use drmdeploy::exec::{DeployContext, ResourceApi, ResourceOutcome};
use drmdeploy::template::Resource;
use drmdeploy::types::{BoxFuture, RequestCounters};

/// What the fake does for one resource.
#[derive(Debug, Clone)]
enum Script {
    Respond(ResourceOutcome),
    Panic,
}

/// A fake resource API that:
/// - records which resources were deployed, and with which token
/// - answers from a per-resource script (default: success with 1 request)
/// - tracks the highest number of concurrent `deploy` calls.
pub struct FakeResourceApi {
    scripts: HashMap<String, Script>,
    default: ResourceOutcome,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    tokens: Mutex<Vec<Option<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: AtomicUsize,
}

impl FakeResourceApi {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            default: ResourceOutcome::Success(RequestCounters::new(1, 0)),
            delay: Duration::from_millis(5),
            calls: Mutex::new(Vec::new()),
            tokens: Mutex::new(Vec::new()),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_default(mut self, outcome: ResourceOutcome) -> Self {
        self.default = outcome;
        self
    }

    pub fn with_outcome(mut self, name: &str, outcome: ResourceOutcome) -> Self {
        self.scripts.insert(name.to_string(), Script::Respond(outcome));
        self
    }

    pub fn with_counters(self, name: &str, requests: u64, internal: u64) -> Self {
        self.with_outcome(
            name,
            ResourceOutcome::Success(RequestCounters::new(requests, internal)),
        )
    }

    pub fn with_failure(self, name: &str, detail: &str) -> Self {
        self.with_outcome(name, ResourceOutcome::ApplicationFailure(detail.to_string()))
    }

    pub fn with_exception(self, name: &str, detail: &str) -> Self {
        self.with_outcome(
            name,
            ResourceOutcome::InfrastructureException(detail.to_string()),
        )
    }

    /// Make the deployment task of `name` panic.
    pub fn with_panic(mut self, name: &str) -> Self {
        self.scripts.insert(name.to_string(), Script::Panic);
        self
    }

    /// Time every `deploy` call takes.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Resource names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for FakeResourceApi {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter even if the call panics.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ResourceApi for FakeResourceApi {
    fn deploy<'a>(
        &'a self,
        resource: &'a Resource,
        context: &'a DeployContext,
    ) -> BoxFuture<'a, ResourceOutcome> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(resource.name.clone());
            self.tokens
                .lock()
                .unwrap()
                .push(context.access_token.clone());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            let _guard = InFlight(Arc::clone(&self.in_flight));
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;

            match self.scripts.get(&resource.name) {
                Some(Script::Panic) => panic!("scripted panic while deploying '{}'", resource.name),
                Some(Script::Respond(outcome)) => outcome.clone(),
                None => self.default.clone(),
            }
        })
    }
}
