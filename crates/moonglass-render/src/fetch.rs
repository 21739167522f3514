//! Background acquisition of network and file-backed images.
//!
//! A [`FetchTask`] runs the fetch and decode on a named worker thread and
//! hands the decoded image back through a oneshot channel. Dropping the task
//! abandons the result; the worker's send simply fails.

use std::future::Future;
use std::io::Read;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use image::RgbaImage;
use tokio::sync::oneshot;

use crate::texture::ResolutionError;

/// Upper bound on a downloaded image body. Longer bodies fail with
/// [`ResolutionError::TooLarge`].
pub const MAX_IMAGE_BYTES: u64 = 64 * 1024 * 1024;

/// Pending result of an image fetch.
pub struct FetchTask {
    location: String,
    receiver: oneshot::Receiver<Result<RgbaImage, ResolutionError>>,
}

impl FetchTask {
    /// Start fetching `location` on a background thread.
    pub fn spawn(location: impl Into<String>) -> Self {
        let location = location.into();
        let (sender, receiver) = oneshot::channel();
        let worker_location = location.clone();

        let spawned = std::thread::Builder::new()
            .name("texture-fetch".to_owned())
            .spawn(move || {
                let result = load_image(&worker_location);
                if sender.send(result).is_err() {
                    log::debug!("Fetch of '{worker_location}' finished after it was abandoned");
                }
            });

        if let Err(err) = spawned {
            log::error!("Failed to spawn fetch worker for '{location}': {err}");
        }

        Self { location, receiver }
    }

    /// The URL or path being fetched.
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl Future for FetchTask {
    type Output = Result<RgbaImage, ResolutionError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let polled = Pin::new(&mut self.receiver).poll(cx);
        match polled {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // The worker went away without sending (spawn failure or panic).
            Poll::Ready(Err(_)) => Poll::Ready(Err(ResolutionError::Abandoned {
                location: self.location.clone(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Fetch and decode an image synchronously.
///
/// `http://` and `https://` locations are downloaded; `file://` locations
/// and bare paths are read from disk.
pub fn load_image(location: &str) -> Result<RgbaImage, ResolutionError> {
    let bytes = read_bytes(location)?;
    let decoded = image::load_from_memory(&bytes).map_err(|source| ResolutionError::Decode {
        location: location.to_owned(),
        source,
    })?;
    log::debug!(
        "Decoded '{location}' ({}x{})",
        decoded.width(),
        decoded.height()
    );
    Ok(decoded.to_rgba8())
}

fn read_bytes(location: &str) -> Result<Vec<u8>, ResolutionError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return download(location);
    }

    let path = PathBuf::from(location.strip_prefix("file://").unwrap_or(location));
    std::fs::read(&path).map_err(|source| ResolutionError::Io { path, source })
}

fn download(url: &str) -> Result<Vec<u8>, ResolutionError> {
    let fetch_error = |message: String| ResolutionError::Fetch {
        url: url.to_owned(),
        message,
    };

    let response = ureq::get(url)
        .call()
        .map_err(|err| fetch_error(err.to_string()))?;

    let bytes = read_limited(response.into_reader(), MAX_IMAGE_BYTES, url)
        .map_err(|err| match err {
            ReadError::Io(err) => fetch_error(err.to_string()),
            ReadError::TooLarge(err) => err,
        })?;

    log::info!("Downloaded {} bytes from {url}", bytes.len());
    Ok(bytes)
}

#[derive(Debug)]
enum ReadError {
    Io(std::io::Error),
    TooLarge(ResolutionError),
}

/// Read at most `limit` bytes, failing rather than truncating a longer body.
fn read_limited(reader: impl Read, limit: u64, location: &str) -> Result<Vec<u8>, ReadError> {
    let mut bytes = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(ReadError::Io)?;

    if bytes.len() as u64 > limit {
        return Err(ReadError::TooLarge(ResolutionError::TooLarge {
            location: location.to_owned(),
            limit,
        }));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &std::path::Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_load_image_from_bare_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "moon.png", 4, 2);

        let image = load_image(path.to_str().unwrap()).unwrap();
        assert_eq!(image.dimensions(), (4, 2));
        assert_eq!(image.get_pixel(0, 0).0, [200, 100, 50, 255]);
    }

    #[test]
    fn test_load_image_from_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "moon.png", 3, 3);
        let url = format!("file://{}", path.display());

        assert_eq!(load_image(&url).unwrap().dimensions(), (3, 3));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_image("/definitely/not/here/moon.jpg");
        assert!(matches!(result, Err(ResolutionError::Io { .. })));
    }

    #[test]
    fn test_garbage_bytes_are_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let result = load_image(path.to_str().unwrap());
        assert!(matches!(result, Err(ResolutionError::Decode { .. })));
    }

    #[test]
    fn test_body_at_limit_is_kept() {
        let body = std::io::Cursor::new(vec![7u8; 16]);
        let bytes = read_limited(body, 16, "http://host/moon.png").unwrap();
        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn test_body_over_limit_is_rejected() {
        let body = std::io::Cursor::new(vec![7u8; 17]);
        let result = read_limited(body, 16, "http://host/moon.png");
        assert!(matches!(
            result,
            Err(ReadError::TooLarge(ResolutionError::TooLarge { limit: 16, .. }))
        ));
    }

    #[test]
    fn test_fetch_task_resolves_on_background_thread() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "moon.png", 8, 4);

        let task = FetchTask::spawn(path.to_str().unwrap());
        assert!(task.location().ends_with("moon.png"));
        let image = pollster::block_on(task).unwrap();
        assert_eq!(image.dimensions(), (8, 4));
    }

    #[test]
    fn test_dropped_fetch_task_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "moon.png", 2, 2);

        drop(FetchTask::spawn(path.to_str().unwrap()));
    }
}
