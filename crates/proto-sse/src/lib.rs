pub mod sse;

/// Metadata key under which the host encodes a binary FunctionRequestHeader
/// on every ExecuteFunction call.
pub const FUNCTION_REQUEST_HEADER: &str = "qlik-functionrequestheader-bin";

/// Metadata key under which the host encodes a binary ScriptRequestHeader
/// on every EvaluateScript call.
pub const SCRIPT_REQUEST_HEADER: &str = "qlik-scriptrequestheader-bin";

/// Metadata key under which the host encodes a binary CommonRequestHeader
/// on both call kinds.
pub const COMMON_REQUEST_HEADER: &str = "qlik-commonrequestheader-bin";

/// Response metadata key and value which tell the host not to cache the
/// results of a call.
pub const CACHE_CONTROL_KEY: &str = "qlik-cache";
pub const CACHE_CONTROL_NO_STORE: &str = "no-store";
