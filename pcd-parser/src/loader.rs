//! Fetching PCD bytes from a source, then handing them to [`parse`].

use std::path::Path;

use log::debug;
use pcd_core::pointcloud::point::PointCloud;

use crate::{error::Result, parsers::parse};

/// Reads `source` and parses it.
///
/// `source` is a filesystem path, optionally prefixed with `file://`. With the
/// `http` feature, `http://` and `https://` URLs are fetched over the network.
/// Reading is the only await point; fetch and parse errors are returned as-is.
pub async fn load(source: &str) -> Result<PointCloud> {
    let bytes = fetch(source).await?;
    debug!("Fetched {} bytes from {}", bytes.len(), source);
    parse(&bytes)
}

/// Blocking counterpart of [`load`] for local files.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
    let bytes = std::fs::read(path.as_ref())?;
    debug!("Read {} bytes from {:?}", bytes.len(), path.as_ref());
    parse(&bytes)
}

async fn read_local(source: &str) -> Result<Vec<u8>> {
    let path = source.strip_prefix("file://").unwrap_or(source);
    Ok(tokio::fs::read(path).await?)
}

#[cfg(feature = "http")]
async fn fetch(source: &str) -> Result<Vec<u8>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::get(source).await?.error_for_status()?;
        return Ok(response.bytes().await?.to_vec());
    }
    read_local(source).await
}

#[cfg(not(feature = "http"))]
async fn fetch(source: &str) -> Result<Vec<u8>> {
    read_local(source).await
}
