use anyhow::{Error, anyhow};
use bytes::Bytes;
use tokio::fs::read as tokio_fs_read;
use tokio_stream::{Stream, once};
use url::Url;

/// Creates a byte stream from a URL.
///
/// Supported URL schemes:
/// - `file`: Read from the local filesystem (emitted as a single chunk)
///
/// # Errors
///
/// - Returns `Err` if the URL scheme is unsupported
/// - Returns `Err` if the file path is invalid or the file cannot be read
pub async fn stream_url(
    url: &Url,
) -> Result<Box<dyn Stream<Item = Result<Bytes, Error>> + Send + Unpin>, Error> {
    match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| anyhow!("Invalid file path for file url: {url}"))?;
            let data = tokio_fs_read(&path)
                .await
                .map(Bytes::from)
                .map_err(|err| anyhow!("Failed to read {}: {err}", path.display()))?;
            Ok(Box::new(once(Ok::<Bytes, Error>(data))))
        }
        scheme => Err(anyhow!("Unsupported url scheme {scheme}")),
    }
}
