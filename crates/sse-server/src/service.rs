use crate::dispatch::Dispatcher;
use crate::registry::Registry;
use crate::script::Evaluator;
use futures::stream::BoxStream;
use futures::StreamExt;
use proto_sse::sse::{BundledRows, Capabilities, Empty};
use std::sync::Arc;

/// Plugin identity advertised through GetCapabilities.
const PLUGIN_IDENTIFIER: &str = "sse-server";
const PLUGIN_VERSION: &str = "v0.1.0";

/// Connector wires the registry, function dispatcher, and script evaluator
/// into the gRPC service surface. All of its state is populated at startup
/// and read-only across concurrent calls.
pub struct Connector {
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    evaluator: Evaluator,
}

impl Connector {
    pub fn new(registry: Arc<Registry>, dispatcher: Dispatcher, evaluator: Evaluator) -> Self {
        Self {
            registry,
            dispatcher,
            evaluator,
        }
    }
}

#[tonic::async_trait]
impl proto_grpc::sse::connector_server::Connector for Connector {
    async fn get_capabilities(
        &self,
        _request: tonic::Request<Empty>,
    ) -> Result<tonic::Response<Capabilities>, tonic::Status> {
        tracing::info!("GetCapabilities");
        Ok(tonic::Response::new(Capabilities {
            allow_script: self.evaluator.allow_script(),
            functions: self.registry.describe().cloned().collect(),
            plugin_identifier: PLUGIN_IDENTIFIER.to_string(),
            plugin_version: PLUGIN_VERSION.to_string(),
        }))
    }

    type ExecuteFunctionStream = BoxStream<'static, Result<BundledRows, tonic::Status>>;

    async fn execute_function(
        &self,
        request: tonic::Request<tonic::Streaming<BundledRows>>,
    ) -> Result<tonic::Response<Self::ExecuteFunctionStream>, tonic::Status> {
        let (metadata, _ext, inbound) = request.into_parts();

        let bundles = self.dispatcher.handle(&metadata, inbound).await?;
        let outbound = futures::stream::iter(bundles.into_iter().map(Ok)).boxed();

        // Results are computed over session-scoped streamed rows, so the
        // host must never serve them from cache.
        let mut response = tonic::Response::new(outbound);
        response.metadata_mut().insert(
            proto_sse::CACHE_CONTROL_KEY,
            tonic::metadata::MetadataValue::from_static(proto_sse::CACHE_CONTROL_NO_STORE),
        );
        Ok(response)
    }

    type EvaluateScriptStream = BoxStream<'static, Result<BundledRows, tonic::Status>>;

    async fn evaluate_script(
        &self,
        request: tonic::Request<tonic::Streaming<BundledRows>>,
    ) -> Result<tonic::Response<Self::EvaluateScriptStream>, tonic::Status> {
        let (metadata, _ext, inbound) = request.into_parts();

        let outbound = self.evaluator.handle(&metadata, inbound.boxed()).await?;

        let mut response = tonic::Response::new(outbound);
        response.metadata_mut().insert(
            proto_sse::CACHE_CONTROL_KEY,
            tonic::metadata::MetadataValue::from_static(proto_sse::CACHE_CONTROL_NO_STORE),
        );
        Ok(response)
    }
}
