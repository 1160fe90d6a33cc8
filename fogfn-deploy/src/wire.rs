use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// The body of a `POST /upload` deploy call to a peer's management endpoint.
pub struct UploadPayload {
    pub name: String,
    pub env: String,
    pub threads: usize,
    /// The base64 encoding of the packaged (zipped) function source.
    pub zip: String,
    /// Environment variables as `K=V` pairs.
    ///
    /// An empty map is transmitted as an explicit `null`: the receiving
    /// deploy endpoint distinguishes empty from absent.
    pub envs: Option<Vec<String>>,
}

impl UploadPayload {
    pub fn new(
        name: impl Into<String>,
        env: impl Into<String>,
        threads: usize,
        zip: impl Into<String>,
        envs: &HashMap<String, String>,
    ) -> Self {
        let envs = if envs.is_empty() {
            None
        } else {
            let mut pairs: Vec<String> = envs.iter().map(|(k, v)| format!("{k}={v}")).collect();
            pairs.sort();
            Some(pairs)
        };

        Self {
            name: name.into(),
            env: env.into(),
            threads,
            zip: zip.into(),
            envs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// The body of a `POST /delete` call to a peer's management endpoint.
pub struct DeletePayload {
    pub name: String,
}
