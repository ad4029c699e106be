use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Manifest is the JSON document declaring the functions this plugin serves.
/// It's read once at startup; a declaration the registry can't validate
/// refuses startup rather than serving a partial capability list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    pub functions: Vec<FunctionDef>,
}

/// A single function declaration of the manifest.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionDef {
    pub name: String,
    pub id: i32,
    #[serde(rename = "Type")]
    pub function_type: i32,
    pub return_type: i32,
    /// Parameter name to data type tag. A BTreeMap orders parameters by
    /// name, which fixes the ordering published through GetCapabilities
    /// regardless of their order in the document.
    pub params: BTreeMap<String, i32>,
}

impl Manifest {
    pub fn parse_from_json_file(path: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_slice(&std::fs::read(path)?)?)
    }
}

/// PEM certificate material enabling the mutually authenticated listener.
#[derive(Debug)]
pub struct TlsMaterial {
    pub private_key: Vec<u8>,
    pub cert_chain: Vec<u8>,
    pub root_cert: Vec<u8>,
}

impl TlsMaterial {
    /// Read the three PEM artifacts the host provisions into `pem_dir`.
    pub fn load(pem_dir: &str) -> anyhow::Result<Self> {
        let read = |name: &str| {
            let path = std::path::Path::new(pem_dir).join(name);
            std::fs::read(&path).with_context(|| format!("reading {}", path.display()))
        };
        Ok(Self {
            private_key: read("sse_server_key.pem")?,
            cert_chain: read("sse_server_cert.pem")?,
            root_cert: read("root_cert.pem")?,
        })
    }

    /// Build a tonic listener configuration which presents our identity and
    /// requires clients to authenticate against the root certificate.
    pub fn into_server_config(self) -> tonic::transport::ServerTlsConfig {
        let identity = tonic::transport::Identity::from_pem(self.cert_chain, self.private_key);
        let root = tonic::transport::Certificate::from_pem(self.root_cert);
        tonic::transport::ServerTlsConfig::new()
            .identity(identity)
            .client_ca_root(root)
    }
}
