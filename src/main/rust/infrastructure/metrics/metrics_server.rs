use std::convert::Infallible;
use std::sync::Arc;

use warp::{Filter, Rejection, Reply};

use super::PrometheusReporter;
use crate::application::services::NodeService;
use crate::domain::value_objects::ResourceType;

/// Node state reported by `/health` and `/readyz`.
#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
struct NodeHealth {
    status: String,
    service: String,
    version: String,
    node_id: String,
    senders: usize,
    receivers: usize,
}

async fn node_health(status: &str, service: &NodeService) -> NodeHealth {
    NodeHealth {
        status: status.to_string(),
        service: "nmos-node".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        node_id: service.node_id().await.to_string(),
        senders: service.resource_count(ResourceType::Sender).await,
        receivers: service.resource_count(ResourceType::Receiver).await,
    }
}

fn with_service(
    service: Arc<NodeService>,
) -> impl Filter<Extract = (Arc<NodeService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

fn routes(
    service: Arc<NodeService>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let metrics_route = warp::path("metrics").map(|| {
        let body = PrometheusReporter::gather_metrics();
        warp::reply::with_header(body, "content-type", "text/plain; version=0.0.4; charset=utf-8")
    });

    let health_route = warp::path("health")
        .and(with_service(service.clone()))
        .and_then(|service: Arc<NodeService>| async move {
            Ok::<_, Infallible>(warp::reply::json(&node_health("healthy", &service).await))
        });

    let liveness_route =
        warp::path("livez").map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    let readiness_route = warp::path("readyz")
        .and(with_service(service.clone()))
        .and_then(|service: Arc<NodeService>| async move {
            Ok::<_, Infallible>(warp::reply::json(&node_health("ready", &service).await))
        });

    // Current resource graph and connection state
    let resources_route = warp::path("resources")
        .and(with_service(service))
        .and_then(|service: Arc<NodeService>| async move {
            Ok::<_, Infallible>(warp::reply::json(&service.snapshot().await))
        });

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "OPTIONS"])
        .allow_headers(vec!["Content-Type"]);

    metrics_route
        .or(health_route)
        .or(liveness_route)
        .or(readiness_route)
        .or(resources_route)
        .with(cors)
}

pub async fn serve_metrics(port: u16, service: Arc<NodeService>) {
    tracing::info!("Metrics server starting on port {}", port);
    warp::serve(routes(service)).run(([0, 0, 0, 0], port)).await;
}
