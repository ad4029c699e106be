use futures::StreamExt;
use prost::Message;
use proto_grpc::sse::connector_client::ConnectorClient;
use proto_grpc::sse::connector_server::ConnectorServer;
use proto_sse::sse::{BundledRows, Dual, Empty, FunctionRequestHeader, Row, ScriptRequestHeader};
use sse_server::codec::Table;
use sse_server::config::{FunctionDef, Manifest};
use sse_server::dispatch::{Dispatcher, PredictError, Predictor};
use sse_server::registry::Registry;
use sse_server::script::{Evaluator, RowStream, ScriptEngine, ScriptKind};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_stream::wrappers::TcpListenerStream;

/// A predictor which doubles the first field of every data row.
struct Double;

#[async_trait::async_trait]
impl Predictor for Double {
    async fn predict(&self, table: Table) -> Result<Vec<f64>, PredictError> {
        table
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                row[0]
                    .parse::<f64>()
                    .map(|v| v * 2.0)
                    .map_err(|_| PredictError(anyhow::anyhow!("row {index} is not numeric")))
            })
            .collect()
    }
}

/// An engine which hands its request stream straight back.
struct Echo;

#[async_trait::async_trait]
impl ScriptEngine for Echo {
    async fn evaluate(
        &self,
        _header: ScriptRequestHeader,
        _kind: ScriptKind,
        requests: RowStream,
    ) -> Result<RowStream, tonic::Status> {
        Ok(requests)
    }
}

/// Serve a connector over a loopback listener and connect a client to it.
async fn start_server(engine: Option<Arc<dyn ScriptEngine>>) -> ConnectorClient<tonic::transport::Channel> {
    let manifest = Manifest {
        functions: vec![FunctionDef {
            name: "Predict".to_string(),
            id: 0,
            function_type: 2,
            return_type: 1,
            params: BTreeMap::from([("b".to_string(), 1), ("a".to_string(), 1)]),
        }],
    };
    let registry = Arc::new(Registry::from_manifest(manifest).unwrap());

    let mut dispatcher = Dispatcher::new();
    dispatcher.bind(0, Arc::new(Double));

    let connector =
        sse_server::service::Connector::new(registry, dispatcher, Evaluator::new(engine));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(
        tonic::transport::Server::builder()
            .add_service(ConnectorServer::new(connector))
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );

    ConnectorClient::connect(format!("http://{addr}"))
        .await
        .unwrap()
}

/// Build one inbound bundle from (selector, columns, fields) row cells.
fn bundle(rows: &[(&str, &str, &str)]) -> BundledRows {
    BundledRows {
        rows: rows
            .iter()
            .map(|(selector, columns, fields)| Row {
                duals: [selector, columns, fields]
                    .iter()
                    .map(|cell| Dual {
                        num_data: 0.0,
                        str_data: cell.to_string(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn function_request(
    function_id: i32,
    bundles: Vec<BundledRows>,
) -> tonic::Request<futures::stream::Iter<std::vec::IntoIter<BundledRows>>> {
    let header = FunctionRequestHeader {
        function_id,
        version: String::new(),
    };
    let mut request = tonic::Request::new(futures::stream::iter(bundles));
    request.metadata_mut().insert_bin(
        proto_sse::FUNCTION_REQUEST_HEADER,
        tonic::metadata::MetadataValue::from_bytes(&header.encode_to_vec()),
    );
    request
}

fn script_request(
    function_type: i32,
    bundles: Vec<BundledRows>,
) -> tonic::Request<futures::stream::Iter<std::vec::IntoIter<BundledRows>>> {
    let header = ScriptRequestHeader {
        script: "Script.Eval".to_string(),
        function_type,
        return_type: 1,
        params: vec![],
    };
    let mut request = tonic::Request::new(futures::stream::iter(bundles));
    request.metadata_mut().insert_bin(
        proto_sse::SCRIPT_REQUEST_HEADER,
        tonic::metadata::MetadataValue::from_bytes(&header.encode_to_vec()),
    );
    request
}

async fn collect_results(streaming: tonic::codec::Streaming<BundledRows>) -> Vec<f64> {
    streaming
        .map(Result::unwrap)
        .flat_map(|bundle| futures::stream::iter(bundle.rows))
        .map(|row| row.duals[0].num_data)
        .collect()
        .await
}

#[tokio::test]
async fn test_get_capabilities_publishes_the_manifest() {
    let mut client = start_server(None).await;

    let capabilities = client
        .get_capabilities(Empty {})
        .await
        .unwrap()
        .into_inner();

    assert_eq!(capabilities.plugin_identifier, "sse-server");
    assert_eq!(capabilities.plugin_version, "v0.1.0");
    assert!(!capabilities.allow_script);

    assert_eq!(capabilities.functions.len(), 1);
    let function = &capabilities.functions[0];
    assert_eq!(function.function_id, 0);
    assert_eq!(function.name, "Predict");
    // Parameters are ordered by name regardless of manifest order.
    let params: Vec<_> = function.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(params, vec!["a", "b"]);
}

#[tokio::test]
async fn test_execute_function_round_trip() {
    let mut client = start_server(None).await;

    let response = client
        .execute_function(function_request(
            0,
            vec![
                bundle(&[("churn", "[x|y]", "1|10"), ("", "", "2|20")]),
                bundle(&[("", "", "3|30")]),
            ],
        ))
        .await
        .unwrap();

    // Results computed over streamed rows must not be cached by the host.
    assert_eq!(response.metadata().get("qlik-cache").unwrap(), "no-store");
    assert_eq!(
        collect_results(response.into_inner()).await,
        vec![2.0, 4.0, 6.0]
    );
}

#[tokio::test]
async fn test_unbound_function_fails_without_stopping_the_server() {
    let mut client = start_server(None).await;
    let rows = vec![bundle(&[("churn", "[x]", "1")])];

    let status = client
        .execute_function(function_request(7, rows.clone()))
        .await
        .unwrap_err();
    assert_eq!(status.code(), tonic::Code::Unimplemented);
    assert!(status.message().contains("7"), "{}", status.message());

    // The failure is scoped to its call.
    let response = client
        .execute_function(function_request(0, rows))
        .await
        .unwrap();
    assert_eq!(collect_results(response.into_inner()).await, vec![2.0]);
}

#[tokio::test]
async fn test_execute_function_requires_the_header() {
    let mut client = start_server(None).await;

    let request = tonic::Request::new(futures::stream::iter(vec![bundle(&[("c", "[x]", "1")])]));
    let status = client.execute_function(request).await.unwrap_err();

    assert_eq!(status.code(), tonic::Code::InvalidArgument);
    assert!(
        status.message().contains("qlik-functionrequestheader-bin"),
        "{}",
        status.message()
    );
}

#[tokio::test]
async fn test_execute_function_rejects_a_malformed_table() {
    let mut client = start_server(None).await;

    let status = client
        .execute_function(function_request(
            0,
            vec![bundle(&[("churn", "[x|y]", "1|10"), ("", "", "2")])],
        ))
        .await
        .unwrap_err();

    assert_eq!(status.code(), tonic::Code::InvalidArgument);
    assert!(
        status.message().contains("column header names 2"),
        "{}",
        status.message()
    );
}

#[tokio::test]
async fn test_evaluate_script_rejects_scalar_calls() {
    let mut client = start_server(Some(Arc::new(Echo))).await;

    let status = client
        .evaluate_script(script_request(0, vec![]))
        .await
        .unwrap_err();

    assert_eq!(status.code(), tonic::Code::Unimplemented);
    assert!(status.message().contains("scalar"), "{}", status.message());
}

#[tokio::test]
async fn test_evaluate_script_tensor_delegates_to_the_engine() {
    let mut client = start_server(Some(Arc::new(Echo))).await;

    let bundles = vec![BundledRows {
        rows: vec![Row {
            duals: vec![Dual {
                num_data: 42.0,
                str_data: String::new(),
            }],
        }],
    }];

    let response = client
        .evaluate_script(script_request(2, bundles))
        .await
        .unwrap();
    assert_eq!(response.metadata().get("qlik-cache").unwrap(), "no-store");
    assert_eq!(collect_results(response.into_inner()).await, vec![42.0]);
}

#[tokio::test]
async fn test_evaluate_script_without_an_engine_is_unimplemented() {
    let mut client = start_server(None).await;

    let status = client
        .evaluate_script(script_request(2, vec![]))
        .await
        .unwrap_err();

    assert_eq!(status.code(), tonic::Code::Unimplemented);
    assert!(status.message().contains("disabled"), "{}", status.message());
}
