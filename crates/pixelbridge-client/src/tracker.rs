use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use pixelbridge_core::{
    builder::build,
    config::TrackerConfig,
    event::{EventData, WireEvent},
    response::{map_response, EventResponse},
    validation::{validate, validate_batch_len},
    TrackerError,
};

use crate::{
    dispatch::Dispatcher,
    retry::with_retry,
    transport::{select_transport, Transport},
};

/// Configuration and the transport chosen for it, swapped as one unit.
#[derive(Clone)]
struct Snapshot {
    config: Arc<TrackerConfig>,
    transport: Arc<dyn Transport>,
}

/// Server-side conversion tracker.
///
/// Every call snapshots the current configuration on entry, so
/// [`ServerTracker::update_config`] never changes a request already in
/// flight. Calls are independent; nothing orders concurrent submissions.
pub struct ServerTracker {
    state: RwLock<Snapshot>,
    /// Set when the caller supplied the transport; it then survives config
    /// updates instead of being re-selected.
    pinned_transport: bool,
}

impl ServerTracker {
    /// Validate `config` and select a transport. Fails synchronously with
    /// `TrackerError::Config`.
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        config.validate(true)?;
        let transport = select_transport(&config.endpoint_url()?, config.timeout())?;
        info!(
            pixel_id = %config.pixel_id,
            transport = transport.name(),
            "server tracker ready"
        );
        Ok(Self {
            state: RwLock::new(Snapshot {
                config: Arc::new(config),
                transport,
            }),
            pinned_transport: false,
        })
    }

    pub fn with_transport(
        config: TrackerConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, TrackerError> {
        config.validate(true)?;
        Ok(Self {
            state: RwLock::new(Snapshot {
                config: Arc::new(config),
                transport,
            }),
            pinned_transport: true,
        })
    }

    pub fn config(&self) -> Arc<TrackerConfig> {
        self.snapshot().config
    }

    /// Replace the configuration wholesale.
    pub fn update_config(&self, config: TrackerConfig) -> Result<(), TrackerError> {
        config.validate(true)?;
        let transport = if self.pinned_transport {
            self.snapshot().transport
        } else {
            select_transport(&config.endpoint_url()?, config.timeout())?
        };
        let next = Snapshot {
            config: Arc::new(config),
            transport,
        };
        match self.state.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        Ok(())
    }

    /// Validate and build without sending.
    pub fn prepare(&self, events: &[EventData]) -> Result<Vec<WireEvent>, TrackerError> {
        let debug = self.snapshot().config.debug;
        validate_batch_len(events.len())?;
        events
            .iter()
            .map(|event| {
                validate(event, debug)?;
                Ok(build(event))
            })
            .collect()
    }

    #[tracing::instrument(skip(self, event), fields(event_name = %event.name))]
    pub async fn send_event(&self, event: EventData) -> Result<EventResponse, TrackerError> {
        self.send_batch(std::slice::from_ref(&event)).await
    }

    /// Validate, build and submit `events` in one request, retrying the
    /// whole batch on network/API failure.
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    pub async fn send_batch(&self, events: &[EventData]) -> Result<EventResponse, TrackerError> {
        let snapshot = self.snapshot();
        validate_batch_len(events.len())?;
        let mut wire = Vec::with_capacity(events.len());
        for event in events {
            validate(event, snapshot.config.debug)?;
            wire.push(build(event));
        }

        let dispatcher = Dispatcher::new(snapshot.transport, Arc::clone(&snapshot.config))?;
        let raw = with_retry(&snapshot.config.retry, || dispatcher.send(&wire)).await?;
        let response = map_response(&raw.body);
        debug!(
            events_received = response.events_received,
            trace_id = response.trace_id.as_deref().unwrap_or(""),
            "conversion batch accepted"
        );
        Ok(response)
    }

    fn snapshot(&self) -> Snapshot {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
