use std::fmt;

use tracking::snapshot::{Snapshot, SnapshotError};

#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    Status(u16),
    Snapshot(SnapshotError),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(err) => write!(f, "request failed: {err}"),
            FetchError::Status(code) => write!(f, "feed returned HTTP {code}"),
            FetchError::Snapshot(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(err) => Some(err),
            FetchError::Status(_) => None,
            FetchError::Snapshot(err) => Some(err),
        }
    }
}

/// One GET of the feed. Any failure leaves the caller's state untouched.
pub async fn fetch_snapshot(client: &reqwest::Client, url: &str) -> Result<Snapshot, FetchError> {
    let resp = client.get(url).send().await.map_err(FetchError::Http)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let body = resp.text().await.map_err(FetchError::Http)?;
    decode_snapshot(&body)
}

pub fn decode_snapshot(body: &str) -> Result<Snapshot, FetchError> {
    Snapshot::parse_json(body).map_err(FetchError::Snapshot)
}
