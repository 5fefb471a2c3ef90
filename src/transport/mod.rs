//! gRPC transport layer for the locality twin.
//!
//! Payloads travel as JSON bytes; the JSON shapes are the crate's serde
//! types, so HTTP front ends and gRPC clients share one schema.

use std::sync::Arc;

use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::debug;

use crate::engine::{TwinJob, TwinOutput, TwinRuntime};
use crate::error::{ExecutionError, TwinError};
use crate::request::{ChatRequest, PredictionRequest};
use crate::storage::{require_baseline, LocalityStore};

/// Generated protobuf messages and service stubs.
#[allow(missing_docs)]
pub mod proto {
    tonic::include_proto!("localitytwin");
}

use proto::twin_service_server::{TwinService, TwinServiceServer};

// ----------------------------------------------------------------------------
// Limits (DoS protection)
// ----------------------------------------------------------------------------

/// Maximum size of an inbound JSON payload.
const MAX_REQUEST_JSON_BYTES: usize = 256 * 1024;

/// Maximum size of a response JSON payload.
const MAX_RESPONSE_JSON_BYTES: usize = 4 * 1024 * 1024; // 4 MiB

/// Maximum size of one streamed projection event.
const MAX_EVENT_JSON_BYTES: usize = 64 * 1024;

/// Maximum length of a city name in `GetBaseline`.
const MAX_CITY_NAME_LEN: usize = 256;

/// Buffered projection years per stream.
const STREAM_BUFFER: usize = 32;

/// gRPC service implementation.
pub struct TwinServiceImpl {
    runtime: Arc<TwinRuntime>,
    store: Arc<dyn LocalityStore>,
}

impl TwinServiceImpl {
    /// Serves jobs through `runtime` and catalog reads from `store`.
    #[must_use]
    pub fn new(runtime: Arc<TwinRuntime>, store: Arc<dyn LocalityStore>) -> Self {
        Self { runtime, store }
    }

    /// Wraps the service for `tonic::transport::Server`.
    #[must_use]
    pub fn into_server(self) -> TwinServiceServer<Self> {
        TwinServiceServer::new(self)
    }

    async fn run_job(&self, job: TwinJob) -> Result<TwinOutput, Status> {
        let runtime = Arc::clone(&self.runtime);
        tokio::task::spawn_blocking(move || runtime.execute(job))
            .await
            .map_err(|e| Status::internal(format!("worker task failed: {e}")))?
            .map_err(status_from_twin_error)
    }
}

fn invalid_argument(msg: impl Into<String>) -> Status {
    Status::invalid_argument(msg.into())
}

fn parse_json<T: serde::de::DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, Status> {
    if bytes.is_empty() {
        return Err(invalid_argument(format!("{what} is required")));
    }
    if bytes.len() > MAX_REQUEST_JSON_BYTES {
        return Err(invalid_argument(format!("{what} exceeds maximum size")));
    }
    serde_json::from_slice(bytes).map_err(|e| invalid_argument(format!("invalid {what}: {e}")))
}

fn encode_json<T: Serialize>(value: &T, max: usize) -> Result<Vec<u8>, Status> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| Status::internal(format!("failed to serialize response JSON: {e}")))?;
    if bytes.len() > max {
        return Err(Status::resource_exhausted("serialized JSON exceeds size limit"));
    }
    Ok(bytes)
}

/// Maps crate errors onto gRPC status codes.
#[must_use]
pub fn status_from_twin_error(err: TwinError) -> Status {
    match err {
        TwinError::Validation(v) => Status::invalid_argument(v.to_string()),
        TwinError::Internal { message } => Status::internal(message),
        TwinError::Execution(e) => match e {
            ExecutionError::LocalityNotFound { .. } => Status::not_found(e.to_string()),
            ExecutionError::Timeout { .. } => Status::deadline_exceeded(e.to_string()),
            ExecutionError::QueueFull { .. } => Status::resource_exhausted(e.to_string()),
            ExecutionError::DegenerateFit { .. }
            | ExecutionError::EmptyProjection { .. }
            | ExecutionError::Disconnected { .. }
            | ExecutionError::Catalog { .. } => Status::internal(e.to_string()),
        },
    }
}

#[tonic::async_trait]
impl TwinService for TwinServiceImpl {
    async fn list_localities(
        &self,
        _request: Request<proto::ListLocalitiesRequest>,
    ) -> Result<Response<proto::ListLocalitiesResponse>, Status> {
        let hierarchy = self
            .store
            .hierarchy()
            .map_err(|e| status_from_twin_error(e.into()))?;
        let hierarchy_json = encode_json(&hierarchy, MAX_RESPONSE_JSON_BYTES)?;
        Ok(Response::new(proto::ListLocalitiesResponse { hierarchy_json }))
    }

    async fn get_baseline(
        &self,
        request: Request<proto::GetBaselineRequest>,
    ) -> Result<Response<proto::GetBaselineResponse>, Status> {
        let req = request.into_inner();
        if req.city_name.is_empty() {
            return Err(invalid_argument("city_name is required"));
        }
        if req.city_name.len() > MAX_CITY_NAME_LEN {
            return Err(invalid_argument("city_name too long"));
        }

        let baseline =
            require_baseline(self.store.as_ref(), &req.city_name).map_err(status_from_twin_error)?;
        let baseline_json = encode_json(&baseline, MAX_RESPONSE_JSON_BYTES)?;
        Ok(Response::new(proto::GetBaselineResponse { baseline_json }))
    }

    async fn predict(
        &self,
        request: Request<proto::PredictRequest>,
    ) -> Result<Response<proto::PredictResponse>, Status> {
        let req = request.into_inner();
        let prediction: PredictionRequest = parse_json(&req.request_json, "request_json")?;

        let TwinOutput::Prediction(response) = self.run_job(TwinJob::Predict(prediction)).await?
        else {
            return Err(Status::internal("runtime returned non-prediction output"));
        };

        let response_json = encode_json(&response, MAX_RESPONSE_JSON_BYTES)?;
        Ok(Response::new(proto::PredictResponse { response_json }))
    }

    type StreamProjectionStream = ReceiverStream<Result<proto::ProjectionEvent, Status>>;

    async fn stream_projection(
        &self,
        request: Request<proto::PredictRequest>,
    ) -> Result<Response<Self::StreamProjectionStream>, Status> {
        let req = request.into_inner();
        let prediction: PredictionRequest = parse_json(&req.request_json, "request_json")?;

        let request_id = prediction.request_id;
        let projection = self
            .runtime
            .stream_projection(prediction)
            .map_err(status_from_twin_error)?;

        let (tx, rx) = tokio::sync::mpsc::channel::<Result<proto::ProjectionEvent, Status>>(STREAM_BUFFER);
        tokio::task::spawn_blocking(move || {
            for item in projection {
                let event = item.map_err(status_from_twin_error).and_then(|point| {
                    encode_json(&point, MAX_EVENT_JSON_BYTES)
                        .map(|event_json| proto::ProjectionEvent { event_json })
                });
                let failed = event.is_err();
                if tx.blocking_send(event).is_err() {
                    debug!(request_id = %request_id, "projection stream closed by client");
                    break;
                }
                if failed {
                    break;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn chat(
        &self,
        request: Request<proto::ChatRequest>,
    ) -> Result<Response<proto::ChatResponse>, Status> {
        let req = request.into_inner();
        let chat: ChatRequest = parse_json(&req.request_json, "request_json")?;

        let TwinOutput::Chat(response) = self.run_job(TwinJob::Chat(chat)).await? else {
            return Err(Status::internal("runtime returned non-chat output"));
        };
        Ok(Response::new(proto::ChatResponse { response }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio_stream::StreamExt;
    use tonic::{Code, Request};

    use crate::advisor::{ChatContext, CityAdvisor};
    use crate::config::EngineConfig;
    use crate::engine::{ExecutionPath, PredictionEngine, TwinRuntimeConfig};
    use crate::locality::BaselineStats;
    use crate::storage::InMemoryLocalityStore;
    use crate::timepoint::TimePoint;

    fn make_service() -> TwinServiceImpl {
        let engine = PredictionEngine::new(EngineConfig::default().with_noise_seed(5)).unwrap();
        let runtime =
            TwinRuntime::new(engine, CityAdvisor::new(), &TwinRuntimeConfig::default()).unwrap();
        TwinServiceImpl::new(
            Arc::new(runtime),
            Arc::new(InMemoryLocalityStore::with_builtin_catalog()),
        )
    }

    fn kochi_request(horizon: u32) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "locality": "Kochi",
            "baseline": {
                "aqi": 95.0,
                "water_quality": 50.0,
                "pollution_index": 80.0,
                "carbon_budget": 800.0,
                "population": 600000
            },
            "actions": { "factory_type": "Chemical", "trees_planted": 100, "add_solar": true },
            "time_horizon_years": horizon
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn list_localities_returns_catalog_json() {
        let svc = make_service();
        let resp = svc
            .list_localities(Request::new(proto::ListLocalitiesRequest {}))
            .await
            .unwrap()
            .into_inner();
        let v: serde_json::Value = serde_json::from_slice(&resp.hierarchy_json).unwrap();
        assert_eq!(v["India"]["Kerala"]["Ernakulam"]["Kochi"]["baseline"]["aqi"], 95.0);
    }

    #[tokio::test]
    async fn get_baseline_resolves_districts_and_reports_not_found() {
        let svc = make_service();
        let resp = svc
            .get_baseline(Request::new(proto::GetBaselineRequest {
                city_name: "Ernakulam".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        let baseline: BaselineStats = serde_json::from_slice(&resp.baseline_json).unwrap();
        assert_eq!(baseline.population, 600_000);

        let resp = svc
            .get_baseline(Request::new(proto::GetBaselineRequest {
                city_name: "Palakkad".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        let baseline: BaselineStats = serde_json::from_slice(&resp.baseline_json).unwrap();
        assert_eq!(baseline.population, 150_000);

        let err = svc
            .get_baseline(Request::new(proto::GetBaselineRequest {
                city_name: "Atlantis".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn predict_returns_response_json() {
        let svc = make_service();
        let resp = svc
            .predict(Request::new(proto::PredictRequest {
                request_json: kochi_request(20),
            }))
            .await
            .unwrap()
            .into_inner();
        let v: serde_json::Value = serde_json::from_slice(&resp.response_json).unwrap();
        assert_eq!(v["predictions"].as_array().unwrap().len(), 20);
        assert_eq!(v["explanations"].as_array().unwrap().len(), 3);
        assert_eq!(v["locality"], "Kochi");
    }

    #[tokio::test]
    async fn predict_rejects_bad_payloads() {
        let svc = make_service();
        let err = svc
            .predict(Request::new(proto::PredictRequest {
                request_json: Vec::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);

        let err = svc
            .predict(Request::new(proto::PredictRequest {
                request_json: kochi_request(0),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn stream_projection_emits_one_event_per_year() {
        let svc = make_service();
        let stream = svc
            .stream_projection(Request::new(proto::PredictRequest {
                request_json: kochi_request(6),
            }))
            .await
            .unwrap()
            .into_inner();

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 6);
        let years: Vec<i32> = events
            .into_iter()
            .map(|e| {
                let point: TimePoint = serde_json::from_slice(&e.unwrap().event_json).unwrap();
                point.year
            })
            .collect();
        assert_eq!(years, (2026..=2031).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn stream_projection_reports_full_queue_as_resource_exhausted() {
        let engine = PredictionEngine::default();
        let runtime = TwinRuntime::new(
            engine,
            CityAdvisor::new(),
            &TwinRuntimeConfig {
                projection_workers: 1,
                advisory_workers: 1,
                queue_capacity: 1,
            },
        )
        .unwrap();
        let busy = runtime
            .submit_sleep(ExecutionPath::Projection, Duration::from_millis(300))
            .unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let queued = runtime
            .submit_sleep(ExecutionPath::Projection, Duration::from_millis(1))
            .unwrap();

        let svc = TwinServiceImpl::new(
            Arc::new(runtime),
            Arc::new(InMemoryLocalityStore::with_builtin_catalog()),
        );
        let err = svc
            .stream_projection(Request::new(proto::PredictRequest {
                request_json: kochi_request(6),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::ResourceExhausted);

        busy.recv_timeout(Duration::from_secs(1)).unwrap();
        queued.recv_timeout(Duration::from_secs(1)).unwrap();
    }

    #[tokio::test]
    async fn chat_answers_through_the_advisory_pool() {
        let svc = make_service();
        let request = ChatRequest {
            message: "How many trees?".to_string(),
            context: ChatContext {
                trees_needed: 42,
                ..ChatContext::default()
            },
        };
        let resp = svc
            .chat(Request::new(proto::ChatRequest {
                request_json: serde_json::to_vec(&request).unwrap(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(resp.response.contains("about 42 trees"));
    }

    #[test]
    fn error_mapping_matches_status_codes() {
        let not_found = status_from_twin_error(
            ExecutionError::LocalityNotFound {
                name: "x".to_string(),
            }
            .into(),
        );
        assert_eq!(not_found.code(), Code::NotFound);

        let full = status_from_twin_error(
            ExecutionError::QueueFull {
                path: "projection".to_string(),
                capacity: 1,
            }
            .into(),
        );
        assert_eq!(full.code(), Code::ResourceExhausted);

        let timeout = status_from_twin_error(ExecutionError::Timeout { duration_ms: 5 }.into());
        assert_eq!(timeout.code(), Code::DeadlineExceeded);

        let internal = status_from_twin_error(TwinError::internal("boom"));
        assert_eq!(internal.code(), Code::Internal);
        assert_eq!(internal.message(), "boom");
    }
}

pub use proto::twin_service_client::TwinServiceClient;
