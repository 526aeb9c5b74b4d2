//! Image pull and build.
//!
//! Both operations stream the engine's progress to stdout, prefixed with the
//! image name. The engine reports build failures in-band, as a JSON line
//! carrying an `error` field, so every build line is inspected. bollard may
//! already have lifted such a line into `DockerStreamError`; both shapes
//! end the operation the same way.

use crate::container::context::build_context;
use crate::container::engine::{BuildRequest, Engine};
use crate::container::options::BuildOptions;
use crate::container::{ContainerError, Result};
use futures::stream::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// A pulled or built image, referenced by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Image reference (`repo[:tag]`)
    pub name: String,
}

impl Image {
    /// Refer to an image that already exists locally.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}

/// Image operations over a shared engine handle.
#[derive(Clone)]
pub struct ImageOperations {
    engine: Arc<dyn Engine>,
}

impl ImageOperations {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Pull an image from a registry.
    ///
    /// # Errors
    ///
    /// Returns error if the engine rejects the pull or reports an error in
    /// the progress stream.
    pub async fn pull(&self, reference: &str) -> Result<Image> {
        info!("Pulling image: {}", reference);

        let mut stream = self.engine.pull_image(reference);
        while let Some(progress) = stream.next().await {
            let error = match progress {
                Ok(progress) => {
                    if let Some(status) = progress.status.as_deref() {
                        match progress.id.as_deref() {
                            Some(layer) => println!("[{}]: {}: {}", reference, layer, status),
                            None => println!("[{}]: {}", reference, status),
                        }
                    }
                    progress
                        .error
                        .or_else(|| progress.error_detail.and_then(|d| d.message))
                }
                Err(e) => Some(e.stream_error().map(str::to_string).ok_or(e)?),
            };
            if let Some(error) = error {
                println!("[{}]: {}", reference, error);
                return Err(ContainerError::Other(format!(
                    "Failed to pull {}: {}",
                    reference, error
                )));
            }
        }

        info!("Successfully pulled image: {}", reference);
        Ok(Image::new(reference))
    }

    /// Build the directory at `path` into an image tagged `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::BuildError`] with the engine's message when
    /// the build output reports an error, or the underlying error when the
    /// context cannot be archived or the engine call fails.
    pub async fn build(&self, name: &str, path: &str, options: &BuildOptions) -> Result<Image> {
        info!("Building image {} from {}", name, path);

        let dir = PathBuf::from(path);
        let context = tokio::task::spawn_blocking(move || build_context(&dir))
            .await
            .map_err(|e| ContainerError::Other(format!("Build context task failed: {}", e)))??;

        let request = BuildRequest {
            tag: name.to_string(),
            dockerfile: options.dockerfile().to_string(),
            platform: options.platform().map(str::to_string),
            context,
        };
        debug!(
            "Submitting build of {} (dockerfile {}, {} bytes of context)",
            name,
            request.dockerfile,
            request.context.len()
        );

        let mut stream = self.engine.build_image(request);
        while let Some(line) = stream.next().await {
            let message = match line {
                Ok(line) => {
                    println!("[{}]: {}", name, line);
                    inspect_build_line(&line)
                }
                Err(e) => Some(e.stream_error().map(str::to_string).ok_or(e)?),
            };
            if let Some(message) = message {
                println!("[{}]: failed to build image: {}", name, message);
                return Err(ContainerError::BuildError(message));
            }
        }

        info!("Successfully built image: {}", name);
        Ok(Image::new(name))
    }
}

/// Extract the in-band error message from one line of build output.
///
/// Lines that are not JSON objects, or carry no `error` field, yield `None`.
pub fn inspect_build_line(line: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    match value.as_object()?.get("error")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}
