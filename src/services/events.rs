//! In-process publish/subscribe bus for domain events.
//!
//! Handlers are registered once through [`EventBusBuilder`]; the built bus is
//! immutable. `publish` never waits for handlers: each subscribed handler runs
//! in its own tokio task, and its errors or panics are logged there.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::runtime::Handle;

use crate::{
    error::AppResult,
    models::{DomainEvent, EventKind},
};

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent) -> AppResult<()>;

    /// Name used in logs
    fn name(&self) -> &'static str;
}

#[derive(Default)]
pub struct EventBusBuilder {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl EventBusBuilder {
    pub fn subscribe(mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.entry(kind).or_default().push(handler);
        self
    }

    pub fn build(self) -> EventBus {
        EventBus {
            handlers: Arc::new(self.handlers),
        }
    }
}

#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Fire-and-forget dispatch to every handler subscribed to the event's kind
    pub fn publish(&self, event: DomainEvent) {
        let Some(handlers) = self.handlers.get(&event.kind()) else {
            return;
        };
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!(kind = ?event.kind(), "No async runtime, dropping event");
                return;
            }
        };

        for handler in handlers {
            let handler = Arc::clone(handler);
            let event = event.clone();
            let name = handler.name();
            let task = runtime.spawn(async move {
                if let Err(e) = handler.handle(&event).await {
                    tracing::error!(handler = name, kind = ?event.kind(), error = %e, "Event handler failed");
                }
            });
            runtime.spawn(async move {
                if let Err(e) = task.await {
                    if e.is_panic() {
                        tracing::error!(handler = name, "Event handler panicked");
                    }
                }
            });
        }
    }
}
