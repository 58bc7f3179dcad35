use std::sync::Arc;

use crate::{
    broadcast::{BroadcastRef, Hub, LocalSlot},
    core::Config,
    events::Bus,
};

use super::registry::Registry;

/// Builder for constructing a [`Registry`] together with its broadcaster.
///
/// The broadcaster is fixed at build time. Without an explicit choice the
/// registry delivers events to a [`LocalSlot`].
///
/// # Example
/// ```
/// use callhub::{Config, Registry};
///
/// let mut builder = Registry::builder(Config::default());
/// let slot = builder.local_slot();
/// let registry = builder.build();
/// assert!(!slot.has_listener());
/// assert!(registry.call_names().is_empty());
/// ```
pub struct RegistryBuilder {
    cfg: Config,
    bus: Bus,
    broadcaster: Option<BroadcastRef>,
}

impl RegistryBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        let bus = match cfg.diagnostics_limit() {
            Some(cap) => Bus::new(cap),
            None => Bus::disabled(),
        };
        Self {
            cfg,
            bus,
            broadcaster: None,
        }
    }

    /// Diagnostics bus the registry (and a hub built here) publishes to.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Installs a fresh multi-client [`Hub`] as the broadcaster and returns it.
    pub fn hub(&mut self) -> Arc<Hub> {
        let hub = Arc::new(Hub::new(&self.cfg, self.bus.clone()));
        self.broadcaster = Some(hub.clone());
        hub
    }

    /// Installs a fresh [`LocalSlot`] as the broadcaster and returns it.
    pub fn local_slot(&mut self) -> Arc<LocalSlot> {
        let slot = Arc::new(LocalSlot::new());
        self.broadcaster = Some(slot.clone());
        slot
    }

    /// Uses a custom broadcaster.
    pub fn with_broadcaster(mut self, broadcaster: BroadcastRef) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Builds and returns the registry.
    pub fn build(self) -> Arc<Registry> {
        let broadcaster = self
            .broadcaster
            .unwrap_or_else(|| Arc::new(LocalSlot::new()));
        Arc::new(Registry::new(self.cfg, self.bus, broadcaster))
    }
}

impl Registry {
    /// Returns a builder for a registry with the given configuration.
    pub fn builder(cfg: Config) -> RegistryBuilder {
        RegistryBuilder::new(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Broadcast;
    use crate::events::NamedEvent;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<String>>);

    impl Broadcast for Recorder {
        fn broadcast(&self, event: NamedEvent) {
            self.0.lock().unwrap().push(event.name().to_string());
        }
    }

    #[test]
    fn diagnostics_disabled_by_zero_capacity() {
        let cfg = Config {
            diagnostics_capacity: 0,
            ..Config::default()
        };
        assert!(!RegistryBuilder::new(cfg).bus().is_enabled());
        assert!(RegistryBuilder::new(Config::default()).bus().is_enabled());
    }

    #[test]
    fn custom_broadcaster_receives_events() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let registry = Registry::builder(Config::default())
            .with_broadcaster(recorder.clone())
            .build();
        registry.broadcaster().broadcast(NamedEvent::new("k", "x"));
        assert_eq!(*recorder.0.lock().unwrap(), ["k"]);
    }

    #[tokio::test]
    async fn hub_is_installed() {
        let mut builder = Registry::builder(Config::default());
        let hub = builder.hub();
        let registry = builder.build();
        let (_token, mut rx) = hub.attach_channel("test", 4);
        registry.broadcaster().broadcast(NamedEvent::new("k", "x"));
        assert_eq!(rx.recv().await.unwrap().name(), "k");
    }
}
