use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use super::{activation_engine, graph_builder};
use crate::domain::entities::{NodeModel, NodeSnapshot, Resource, StageRequest};
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{ActivationHandler, HostInterfaces, MetricsReporter};
use crate::domain::services::update_node_interfaces;
use crate::domain::value_objects::{ActivationState, NodeSettings, ResourceType};

/// Application service owning the node model.
///
/// Every operation runs under one write lock and, when it succeeds, is
/// announced to subscribers exactly once after the lock is released.
pub struct NodeService {
    model: Arc<RwLock<NodeModel>>,
    host: Arc<dyn HostInterfaces>,
    handler: Arc<dyn ActivationHandler>,
    metrics: Arc<dyn MetricsReporter>,
    changes: watch::Sender<u64>,
}

impl NodeService {
    pub fn new(
        settings: NodeSettings,
        host: Arc<dyn HostInterfaces>,
        handler: Arc<dyn ActivationHandler>,
        metrics: Arc<dyn MetricsReporter>,
    ) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            model: Arc::new(RwLock::new(NodeModel::new(settings))),
            host,
            handler,
            metrics,
            changes,
        }
    }

    fn notify(&self) {
        self.changes.send_modify(|generation| *generation += 1);
    }

    /// Reset the node to its node and device, then add the given senders and
    /// receivers. Either all of them are added or the node is left as it was.
    pub async fn init(&self, sender_sdps: &[String], receiver_sdps: &[String]) -> Result<()> {
        let host = self.host.host_interfaces();
        {
            let mut model = self.model.write().await;
            let mut fresh = NodeModel::new(model.settings().clone());
            update_node_interfaces(&mut fresh, &host);
            for sdp in sender_sdps {
                graph_builder::add_sender(&mut fresh, &host, sdp)?;
            }
            for sdp in receiver_sdps {
                graph_builder::add_receiver(&mut fresh, &host, sdp)?;
            }
            *model = fresh;

            tracing::info!(
                node_id = %model.node_id(),
                senders = sender_sdps.len(),
                receivers = receiver_sdps.len(),
                "Node initialised"
            );
        }

        for _ in sender_sdps {
            self.metrics.report_resource_added(ResourceType::Sender);
        }
        for _ in receiver_sdps {
            self.metrics.report_resource_added(ResourceType::Receiver);
        }
        self.notify();
        Ok(())
    }

    /// Add a sender from its session description; returns its internal id.
    pub async fn add_sender(&self, sdp: &str) -> Result<String> {
        let host = self.host.host_interfaces();
        let internal_id = {
            let mut model = self.model.write().await;
            graph_builder::add_sender(&mut model, &host, sdp)
        }
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to add sender");
            e
        })?;
        self.metrics.report_resource_added(ResourceType::Sender);
        self.notify();
        Ok(internal_id)
    }

    pub async fn remove_sender(&self, internal_id: &str) -> Result<()> {
        let host = self.host.host_interfaces();
        {
            let mut model = self.model.write().await;
            graph_builder::remove_sender(&mut model, &host, internal_id)?;
        }
        self.metrics.report_resource_removed(ResourceType::Sender);
        self.notify();
        Ok(())
    }

    /// Add a receiver from its session description; returns its internal id.
    pub async fn add_receiver(&self, sdp: &str) -> Result<String> {
        let host = self.host.host_interfaces();
        let internal_id = {
            let mut model = self.model.write().await;
            graph_builder::add_receiver(&mut model, &host, sdp)
        }
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to add receiver");
            e
        })?;
        self.metrics.report_resource_added(ResourceType::Receiver);
        self.notify();
        Ok(internal_id)
    }

    pub async fn remove_receiver(&self, internal_id: &str) -> Result<()> {
        let host = self.host.host_interfaces();
        {
            let mut model = self.model.write().await;
            graph_builder::remove_receiver(&mut model, &host, internal_id)?;
        }
        self.metrics.report_resource_removed(ResourceType::Receiver);
        self.notify();
        Ok(())
    }

    /// Activate a sender or receiver with the given session description, or
    /// deactivate it when there is none.
    pub async fn force_activate(&self, internal_id: &str, sdp: Option<&str>) -> Result<ActivationState> {
        let host = self.host.host_interfaces();
        let (kind, state) = {
            let mut model = self.model.write().await;
            activation_engine::force_activate(&mut model, &host, self.handler.as_ref(), internal_id, sdp)
        }
        .map_err(|e| {
            tracing::error!(internal_id = %internal_id, error = %e, "Failed to activate");
            e
        })?;
        self.metrics.report_activation(kind, state);
        self.notify();
        Ok(state)
    }

    /// Stage connection parameters for a later [`NodeService::activate_staged`].
    pub async fn stage(&self, internal_id: &str, request: StageRequest) -> Result<()> {
        {
            let mut model = self.model.write().await;
            activation_engine::stage(&mut model, internal_id, request)?;
        }
        self.notify();
        Ok(())
    }

    pub async fn activate_staged(&self, internal_id: &str) -> Result<ActivationState> {
        let host = self.host.host_interfaces();
        let (kind, state) = {
            let mut model = self.model.write().await;
            activation_engine::activate_staged(&mut model, &host, self.handler.as_ref(), internal_id)?
        };
        self.metrics.report_activation(kind, state);
        self.notify();
        Ok(state)
    }

    pub async fn snapshot(&self) -> NodeSnapshot {
        self.model.read().await.snapshot()
    }

    pub async fn node_id(&self) -> Uuid {
        self.model.read().await.node_id()
    }

    /// Number of live resources of `kind`.
    pub async fn resource_count(&self, kind: ResourceType) -> usize {
        self.model.read().await.resources.count(kind)
    }

    /// Resource id of the live sender or receiver with this internal id.
    pub async fn find_internal_id(&self, kind: ResourceType, internal_id: &str) -> Result<Uuid> {
        self.model
            .read()
            .await
            .find_internal_id(kind, internal_id)
            .ok_or_else(|| DomainError::NotFound(format!("{} {}", kind, internal_id)))
    }

    /// The resource of `kind` derived from `internal_id`, e.g. the flow of a sender.
    pub async fn find_resource(&self, kind: ResourceType, internal_id: &str) -> Result<Resource> {
        let model = self.model.read().await;
        let id = model.id_for(kind, internal_id);
        let found = model
            .resources
            .iter()
            .find(|r| r.id() == id && r.resource_type() == kind)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("{} {}", kind, internal_id)));
        found
    }

    /// Change notifications: the value counts completed operations.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::domain::value_objects::HostInterface;

    struct Host;

    impl HostInterfaces for Host {
        fn host_interfaces(&self) -> Vec<HostInterface> {
            vec![HostInterface::new("eth0", vec!["192.0.2.1".parse().unwrap()])]
        }
    }

    struct NoMetrics;

    impl MetricsReporter for NoMetrics {
        fn report_resource_added(&self, _kind: ResourceType) {}
        fn report_resource_removed(&self, _kind: ResourceType) {}
        fn report_activation(&self, _kind: ResourceType, _state: ActivationState) {}
    }

    const AUDIO: &str = "v=0\r\n\
o=- 1 1 IN IP4 192.0.2.1\r\n\
s=Audio\r\n\
t=0 0\r\n\
a=x-nvnmos-id:tx-audio\r\n\
m=audio 5004 RTP/AVP 97\r\n\
c=IN IP4 239.0.0.30/64\r\n\
a=source-filter: incl IN IP4 239.0.0.30 192.0.2.1\r\n\
a=rtpmap:97 L24/48000/2\r\n\
a=ptime:1\r\n";

    fn service(calls: Arc<Mutex<Vec<(String, Option<String>)>>>) -> NodeService {
        let handler = move |id: &str, sdp: Option<&str>| {
            calls.lock().unwrap().push((id.to_string(), sdp.map(str::to_string)));
        };
        NodeService::new(
            NodeSettings::new("seed", "node.local", 8080).unwrap(),
            Arc::new(Host),
            Arc::new(handler),
            Arc::new(NoMetrics),
        )
    }

    #[tokio::test]
    async fn test_notifies_once_per_operation() {
        let service = service(Arc::default());
        let changes = service.subscribe();

        service.add_sender(AUDIO).await.unwrap();
        assert_eq!(*changes.borrow(), 1);

        assert!(service.add_sender(AUDIO).await.is_err());
        assert_eq!(*changes.borrow(), 1);

        service.remove_sender("tx-audio").await.unwrap();
        assert_eq!(*changes.borrow(), 2);
    }

    #[tokio::test]
    async fn test_deactivation_invokes_handler_without_sdp() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let service = service(calls.clone());
        service.add_sender(AUDIO).await.unwrap();

        let state = service.force_activate("tx-audio", None).await.unwrap();
        assert_eq!(state, ActivationState::Inactive);
        assert_eq!(calls.lock().unwrap().as_slice(), &[("tx-audio".to_string(), None)]);
    }

    #[tokio::test]
    async fn test_init_is_all_or_nothing() {
        let service = service(Arc::default());
        let bad = AUDIO.replace("192.0.2.1", "203.0.113.1").replace("tx-audio", "tx-other");
        let result = service.init(&[AUDIO.to_string(), bad], &[]).await;
        assert!(matches!(result, Err(DomainError::NoMatchingInterface { .. })));
        assert_eq!(service.snapshot().await.resources.len(), 2);

        service.init(&[AUDIO.to_string()], &[]).await.unwrap();
        assert!(service.find_internal_id(ResourceType::Sender, "tx-audio").await.is_ok());
    }

    #[tokio::test]
    async fn test_resource_count_follows_graph() {
        let service = service(Arc::default());
        assert_eq!(service.resource_count(ResourceType::Node).await, 1);
        assert_eq!(service.resource_count(ResourceType::Sender).await, 0);

        service.add_sender(AUDIO).await.unwrap();
        for kind in [ResourceType::Sender, ResourceType::Flow, ResourceType::Source] {
            assert_eq!(service.resource_count(kind).await, 1);
        }
        assert_eq!(service.resource_count(ResourceType::Receiver).await, 0);

        service.remove_sender("tx-audio").await.unwrap();
        assert_eq!(service.resource_count(ResourceType::Sender).await, 0);
        assert_eq!(service.resource_count(ResourceType::Flow).await, 0);
    }
}
