//! Shared harness for runtime specs

pub use indexmap::IndexMap;
pub use serde_json::{json, Value};
pub use std::sync::Arc;
pub use std::time::Duration;

pub use loom_actor::{Actor, ActorCell, ActorError, ExecuteOutcome, Interrupt};
pub use loom_core::{
    ActorConfig, ActorId, ActorType, Clock, FakeClock, Message, QueueName, RetryPolicy, StreamId,
    TraceId, WorkflowId,
};
pub use loom_runtime::{
    ActorRegistry, ActorRuntime, MetricsCollector, QueueWorker, RuntimeStores,
};
pub use loom_store::{
    EnqueueOptions, IdempotencyStore, JournalStore, JobStatus, LockManager, MemoryDocs, MemoryKv,
    MemoryStreams, MessageQueue, SecretsStore, StateStore, TraceStore,
};
pub use loom_workflow::{
    compile, Action, ActionStatus, ActionType, LoopLimit, VersionBump, WorkflowDefinition,
    WorkflowError, WorkflowExecutor, WorkflowStore,
};

type Streams = MemoryStreams<FakeClock>;
type Runtime = ActorRuntime<Streams, MemoryKv, MemoryDocs<FakeClock>, FakeClock>;

/// One fully wired runtime over the in-memory capabilities.
pub struct Loom {
    pub clock: FakeClock,
    pub streams: Streams,
    pub kv: MemoryKv,
    pub docs: MemoryDocs<FakeClock>,
    pub runtime: Arc<Runtime>,
    pub queue: MessageQueue<MemoryKv, FakeClock>,
    pub idempotency: IdempotencyStore<MemoryKv, FakeClock>,
    pub metrics: Arc<MetricsCollector>,
}

impl Loom {
    pub fn new() -> Self {
        let clock = FakeClock::new();
        let streams = MemoryStreams::new(clock.clone());
        let kv = MemoryKv::new();
        let docs = MemoryDocs::new(clock.clone());
        let registry = Arc::new(ActorRegistry::new());
        let stores = RuntimeStores {
            journal: JournalStore::new(streams.clone(), kv.clone()),
            state: StateStore::new(kv.clone()),
            locks: LockManager::new(kv.clone(), clock.clone()),
            traces: TraceStore::new(docs.clone()),
            streams: streams.clone(),
        };
        let runtime = Arc::new(ActorRuntime::new(registry, stores, clock.clone()));
        Self {
            queue: MessageQueue::new(kv.clone(), clock.clone()),
            idempotency: IdempotencyStore::new(kv.clone(), clock.clone()),
            metrics: Arc::new(MetricsCollector::new()),
            clock,
            streams,
            kv,
            docs,
            runtime,
        }
    }

    pub fn register<A, F>(&self, actor_type: &str, config: ActorConfig, factory: F)
    where
        A: Actor + 'static,
        F: Fn() -> A + Send + Sync + 'static,
    {
        self.runtime
            .registry()
            .register(actor_type, config, move |_context| -> Arc<dyn Actor> {
                Arc::new(factory())
            });
    }

    pub fn worker(
        &self,
        queue_name: &str,
        actor_type: &str,
    ) -> QueueWorker<Streams, MemoryKv, MemoryDocs<FakeClock>, FakeClock> {
        QueueWorker::new(
            self.runtime.clone(),
            self.queue.clone(),
            self.idempotency.clone(),
            self.metrics.clone(),
            queue_name,
            actor_type,
            self.clock.clone(),
        )
    }

    pub fn secrets(&self) -> SecretsStore<MemoryDocs<FakeClock>, FakeClock> {
        SecretsStore::new(self.docs.clone(), self.clock.clone())
    }

    pub fn workflows(&self) -> WorkflowStore<MemoryDocs<FakeClock>, FakeClock> {
        WorkflowStore::new(self.docs.clone(), self.clock.clone())
    }

    pub fn executor(&self) -> WorkflowExecutor<FakeClock> {
        WorkflowExecutor::new(self.clock.clone())
    }

    pub async fn enqueue(&self, queue_name: &str, message: Message) -> String {
        self.queue
            .enqueue(&QueueName::new(queue_name), message, EnqueueOptions::default())
            .await
            .unwrap()
    }

    /// Drain one message through the worker path, if any is due.
    pub async fn pump(&self, queue_name: &str, actor_type: &str) -> bool {
        let delivered = self
            .queue
            .dequeue(&QueueName::new(queue_name), Duration::ZERO)
            .await
            .unwrap();
        match delivered {
            Some(delivery) => {
                self.worker(queue_name, actor_type).process(delivery).await;
                true
            }
            None => false,
        }
    }
}

impl Default for Loom {
    fn default() -> Self {
        Self::new()
    }
}

/// Manual trigger + one action, the smallest valid workflow.
pub fn single_action_workflow(name: &str, action: Action) -> WorkflowDefinition {
    WorkflowDefinition::new().with_manual_trigger().with_action(name, action)
}

pub fn compose(inputs: Value) -> Action {
    Action::new(ActionType::Compose, inputs)
}
