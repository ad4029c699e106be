use crate::codec::{self, DecodeError, Table};
use prost::Message;
use proto_sse::sse::{BundledRows, FunctionRequestHeader};
use std::collections::HashMap;
use std::sync::Arc;

/// An analytic function bound to a manifest id. It consumes one call's
/// materialized table and produces one numeric result per data row, in the
/// same order. Implementations share no per-call state and are invoked
/// concurrently.
#[async_trait::async_trait]
pub trait Predictor: Send + Sync + 'static {
    async fn predict(&self, table: Table) -> Result<Vec<f64>, PredictError>;
}

/// A call-scoped failure raised by a Predictor. Surfaced to the caller,
/// never fatal to the server.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct PredictError(#[from] pub anyhow::Error);

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("call metadata is missing the {key} header", key = proto_sse::FUNCTION_REQUEST_HEADER)]
    MissingHeader,
    #[error("function request header is not valid binary metadata: {0}")]
    BadHeaderEncoding(#[source] tonic::metadata::errors::InvalidMetadataValueBytes),
    #[error("function request header is unparsable: {0}")]
    BadHeader(#[source] prost::DecodeError),
    #[error("function id {0} is not bound to a handler")]
    Unbound(i32),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("function evaluation failed: {0}")]
    Predict(#[from] PredictError),
}

impl From<DispatchError> for tonic::Status {
    fn from(err: DispatchError) -> Self {
        match err {
            // A mid-stream transport failure keeps its original status.
            DispatchError::Decode(DecodeError::Transport(status)) => status,
            DispatchError::Unbound(_) => tonic::Status::unimplemented(err.to_string()),
            err @ (DispatchError::MissingHeader
            | DispatchError::BadHeaderEncoding(_)
            | DispatchError::BadHeader(_)
            | DispatchError::Decode(_)) => tonic::Status::invalid_argument(err.to_string()),
            err @ DispatchError::Predict(_) => tonic::Status::internal(err.to_string()),
        }
    }
}

/// Dispatcher routes ExecuteFunction calls to the handler bound to the
/// function id carried in call metadata. Bindings are populated once at
/// startup; dispatch is an O(1) lookup over typed handler values.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<i32, Arc<dyn Predictor>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to a function id. A later bind replaces an earlier one.
    pub fn bind(&mut self, id: i32, handler: Arc<dyn Predictor>) -> &mut Self {
        self.handlers.insert(id, handler);
        self
    }

    pub fn is_bound(&self, id: i32) -> bool {
        self.handlers.contains_key(&id)
    }

    /// Decode the function request header, resolve its handler, materialize
    /// the inbound stream, and evaluate. Outbound bundles begin only after
    /// the inbound stream is fully drained: the wire format carries no
    /// advance row count and the handler requires the complete table.
    pub async fn handle<S>(
        &self,
        metadata: &tonic::metadata::MetadataMap,
        inbound: S,
    ) -> Result<Vec<BundledRows>, DispatchError>
    where
        S: futures::Stream<Item = Result<BundledRows, tonic::Status>>,
    {
        let header = function_header(metadata)?;
        tracing::info!(function_id = header.function_id, "ExecuteFunction");

        let handler = self
            .handlers
            .get(&header.function_id)
            .ok_or(DispatchError::Unbound(header.function_id))?;

        let table = codec::decode(inbound).await?;
        tracing::debug!(
            function_id = header.function_id,
            table = %table.name,
            columns = table.columns.len(),
            rows = table.rows.len(),
            "evaluating function over materialized table"
        );

        let results = handler.predict(table).await?;
        Ok(codec::encode(results))
    }
}

/// Extract and decode the FunctionRequestHeader from call metadata.
pub fn function_header(
    metadata: &tonic::metadata::MetadataMap,
) -> Result<FunctionRequestHeader, DispatchError> {
    let value = metadata
        .get_bin(proto_sse::FUNCTION_REQUEST_HEADER)
        .ok_or(DispatchError::MissingHeader)?
        .to_bytes()
        .map_err(DispatchError::BadHeaderEncoding)?;
    FunctionRequestHeader::decode(value).map_err(DispatchError::BadHeader)
}
