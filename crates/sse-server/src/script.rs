use futures::stream::BoxStream;
use prost::Message;
use proto_sse::sse::{BundledRows, FunctionType, ScriptRequestHeader};
use std::sync::Arc;

/// The result stream type shared by the evaluator and its engine.
pub type RowStream = BoxStream<'static, Result<BundledRows, tonic::Status>>;

/// Classification of a script call, derived purely from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Scalar,
    Aggregation,
    Tensor,
    /// A function type tag this plugin doesn't know about.
    Unknown(i32),
}

impl std::fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptKind::Scalar => f.write_str("scalar"),
            ScriptKind::Aggregation => f.write_str("aggregation"),
            ScriptKind::Tensor => f.write_str("tensor"),
            ScriptKind::Unknown(tag) => write!(f, "unknown({tag})"),
        }
    }
}

/// Classify a script request header into its kind.
pub fn classify(header: &ScriptRequestHeader) -> ScriptKind {
    match FunctionType::try_from(header.function_type) {
        Ok(FunctionType::Scalar) => ScriptKind::Scalar,
        Ok(FunctionType::Aggregation) => ScriptKind::Aggregation,
        Ok(FunctionType::Tensor) => ScriptKind::Tensor,
        Err(_) => ScriptKind::Unknown(header.function_type),
    }
}

/// The external script execution collaborator. It receives the parsed
/// header, the classified kind, and the inbound request stream, and its
/// result stream is returned to the host unmodified.
#[async_trait::async_trait]
pub trait ScriptEngine: Send + Sync + 'static {
    async fn evaluate(
        &self,
        header: ScriptRequestHeader,
        kind: ScriptKind,
        requests: RowStream,
    ) -> Result<RowStream, tonic::Status>;
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("call metadata is missing the {key} header", key = proto_sse::SCRIPT_REQUEST_HEADER)]
    MissingHeader,
    #[error("script request header is not valid binary metadata: {0}")]
    BadHeaderEncoding(#[source] tonic::metadata::errors::InvalidMetadataValueBytes),
    #[error("script request header is unparsable: {0}")]
    BadHeader(#[source] prost::DecodeError),
    #[error("script function type {0} is not supported in this plugin")]
    UnsupportedKind(ScriptKind),
    #[error("script evaluation is disabled in this plugin")]
    Disabled,
}

impl From<ScriptError> for tonic::Status {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::UnsupportedKind(_) | ScriptError::Disabled => {
                tonic::Status::unimplemented(err.to_string())
            }
            err => tonic::Status::invalid_argument(err.to_string()),
        }
    }
}

/// Evaluator routes EvaluateScript calls: {aggregation, tensor} pass through
/// to the engine, every other kind is rejected outright. This is a closed
/// capability set, not a general dispatch table; supporting a new kind is an
/// explicit decision, never a silent fallthrough.
pub struct Evaluator {
    engine: Option<Arc<dyn ScriptEngine>>,
}

impl Evaluator {
    pub fn new(engine: Option<Arc<dyn ScriptEngine>>) -> Self {
        Self { engine }
    }

    /// Whether script evaluation is advertised through GetCapabilities.
    pub fn allow_script(&self) -> bool {
        self.engine.is_some()
    }

    pub async fn handle(
        &self,
        metadata: &tonic::metadata::MetadataMap,
        requests: RowStream,
    ) -> Result<RowStream, tonic::Status> {
        let header = script_header(metadata)?;
        let kind = classify(&header);
        tracing::info!(%kind, "EvaluateScript");

        match kind {
            ScriptKind::Aggregation | ScriptKind::Tensor => (),
            kind => return Err(ScriptError::UnsupportedKind(kind).into()),
        }
        let Some(engine) = &self.engine else {
            return Err(ScriptError::Disabled.into());
        };
        engine.evaluate(header, kind, requests).await
    }
}

/// Extract and decode the ScriptRequestHeader from call metadata.
fn script_header(
    metadata: &tonic::metadata::MetadataMap,
) -> Result<ScriptRequestHeader, ScriptError> {
    let value = metadata
        .get_bin(proto_sse::SCRIPT_REQUEST_HEADER)
        .ok_or(ScriptError::MissingHeader)?
        .to_bytes()
        .map_err(ScriptError::BadHeaderEncoding)?;
    ScriptRequestHeader::decode(value).map_err(ScriptError::BadHeader)
}
