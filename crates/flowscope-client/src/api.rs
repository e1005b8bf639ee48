//! Request construction for the remote computation endpoints.
//!
//! Requests are plain GETs: an endpoint path under a base URL plus a flat
//! key/value parameter set, URL-encoded into the query string.

use reqwest::Url;

use crate::error::ClientError;

/// Builds the request URL for `endpoint` under `base`, URL-encoding the
/// parameter set into the query string.
pub fn request_url(
    base: &str,
    endpoint: &str,
    parameters: &[(String, String)],
) -> Result<Url, ClientError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined).map_err(|err| ClientError::InvalidUrl {
        message: err.to_string(),
    })?;

    if !parameters.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in parameters {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

/// Parameters of the DFM discovery task for one event log.
#[derive(Debug, Clone)]
pub struct DfmQuery {
    /// Name of the event log to discover the multigraph for.
    pub ocel: String,
}

impl DfmQuery {
    pub const ENDPOINT: &'static str = "/pm/dfm";

    pub fn new(ocel: impl Into<String>) -> Self {
        DfmQuery { ocel: ocel.into() }
    }

    fn parameters(&self) -> Vec<(String, String)> {
        vec![("ocel".to_string(), self.ocel.clone())]
    }

    /// The full polling URL for this query under `base`.
    pub fn url(&self, base: &str) -> Result<Url, ClientError> {
        request_url(base, Self::ENDPOINT, &self.parameters())
    }
}
