//! Docker/Podman client wrapper.
//!
//! Thin layer over the bollard API: connects with fallbacks, sends
//! normalized create requests, and reads back container attributes.

use crate::container::{ContainerAttrs, ContainerError, Result};
use crate::env;
use crate::normalize::CreateRequest;
use bollard::Docker;
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Container client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerClientConfig {
    /// Engine socket URI, e.g. `unix:///run/podman/podman.sock`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,
    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Number of connection retries
    #[serde(default = "default_retries")]
    pub retries: u32,
}

/// Delay before the second ping; doubles per attempt up to `MAX_RETRY_DELAY`.
const BASE_RETRY_DELAY: Duration = Duration::from_millis(250);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(4);

/// Backoff before retrying after the given failed attempt (1-based).
fn retry_delay(attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    BASE_RETRY_DELAY.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

fn default_timeout() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}

impl Default for ContainerClientConfig {
    fn default() -> Self {
        Self {
            socket: None,
            timeout: default_timeout(),
            retries: default_retries(),
        }
    }
}

/// Docker/Podman API client wrapper.
#[derive(Clone)]
pub struct ContainerClient {
    docker: Arc<Docker>,
    config: ContainerClientConfig,
}

impl ContainerClient {
    /// Connect with default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if neither Docker nor Podman is reachable.
    pub async fn new() -> Result<Self> {
        Self::with_config(ContainerClientConfig::default()).await
    }

    /// Connect with custom configuration, retrying the ping up to
    /// `config.retries` times with exponential backoff between attempts.
    ///
    /// # Errors
    ///
    /// Returns error if connection to the container runtime fails.
    pub async fn with_config(config: ContainerClientConfig) -> Result<Self> {
        let docker = Self::connect(&config)?;

        let client = Self {
            docker: Arc::new(docker),
            config,
        };

        let attempts = client.config.retries.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match client.ping().await {
                Ok(()) => return Ok(client),
                Err(e) => {
                    debug!("Ping attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(retry_delay(attempt)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ContainerError::Other("container runtime did not answer".to_string())
        }))
    }

    /// Connect to Docker or Podman.
    ///
    /// Tries, in order:
    /// 1. `CONTAINER_HOST`, then the configured socket
    /// 2. Local defaults (Unix socket or Windows named pipe, honours `DOCKER_HOST`)
    /// 3. Rootless, then system Podman sockets
    fn connect(config: &ContainerClientConfig) -> Result<Docker> {
        debug!("Attempting to connect to container runtime...");

        let configured = std::env::var(env::CONTAINER_HOST_VAR)
            .ok()
            .filter(|socket| !socket.is_empty())
            .or_else(|| config.socket.clone());
        if let Some(socket) = configured {
            debug!("Using configured socket: {}", socket);
            return Docker::connect_with_socket(&socket, config.timeout, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    ContainerError::ConfigError(format!("cannot use socket {}: {}", socket, e))
                });
        }

        match Docker::connect_with_local_defaults() {
            Ok(docker) => {
                info!("Connected to container runtime via local defaults");
                return Ok(docker);
            }
            Err(e) => {
                debug!("Local defaults failed: {}", e);
            }
        }

        #[cfg(unix)]
        {
            let mut sockets = Vec::new();
            if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
                sockets.push(format!("unix://{}/podman/podman.sock", runtime_dir));
            }
            sockets.push(env::PODMAN_SYSTEM_SOCKET.to_string());

            for socket in sockets {
                debug!("Trying Podman socket: {}", socket);
                match Docker::connect_with_socket(&socket, config.timeout, bollard::API_DEFAULT_VERSION)
                {
                    Ok(docker) => {
                        info!("Connected to Podman via {}", socket);
                        return Ok(docker);
                    }
                    Err(e) => {
                        debug!("Podman socket {} failed: {}", socket, e);
                    }
                }
            }
        }

        Err(ContainerError::Other(
            "Failed to connect to Docker or Podman. Please ensure Docker or Podman is installed and running.".to_string()
        ))
    }

    /// Ping the container runtime to verify connectivity.
    ///
    /// # Errors
    ///
    /// Returns error if ping fails.
    pub async fn ping(&self) -> Result<()> {
        self.docker.ping().await.map_err(|e| {
            ContainerError::Other(format!("Failed to ping container runtime: {}", e))
        })?;
        debug!("Container runtime ping successful");
        Ok(())
    }

    /// Check if the runtime is Docker or Podman.
    ///
    /// # Errors
    ///
    /// Returns error if the version query fails.
    pub async fn runtime_type(&self) -> Result<RuntimeType> {
        let version = self
            .docker
            .version()
            .await
            .map_err(|e| ContainerError::Other(format!("Failed to get version: {}", e)))?;

        let is_podman = version
            .components
            .unwrap_or_default()
            .iter()
            .any(|c| c.name.to_lowercase().contains("podman"));

        Ok(if is_podman {
            RuntimeType::Podman
        } else {
            RuntimeType::Docker
        })
    }

    /// Get the underlying Docker client.
    pub fn docker(&self) -> &Docker {
        &self.docker
    }

    /// Create a container from a normalized request.
    ///
    /// When the request carries no name one is generated with the
    /// [`env::CONTAINER_NAME_PREFIX`] prefix.
    ///
    /// # Errors
    ///
    /// Returns error if the engine rejects the request.
    pub async fn create_container(&self, request: &CreateRequest) -> Result<String> {
        let name = request.name.clone().unwrap_or_else(|| {
            format!("{}-{}", env::CONTAINER_NAME_PREFIX, uuid::Uuid::new_v4())
        });

        debug!("Creating container: {}", name);

        let options = bollard::query_parameters::CreateContainerOptions {
            name: Some(name.clone()),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(Some(options), request.body.clone())
            .await?;

        for warning in &response.warnings {
            warn!("Container {} created with warning: {}", name, warning);
        }

        info!("Created container: {} ({})", name, response.id);
        Ok(response.id)
    }

    /// Read back the attributes the engine recorded for a container.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NotFound`] for unknown containers.
    pub async fn inspect_attrs(&self, name_or_id: &str) -> Result<ContainerAttrs> {
        let inspect = self
            .docker
            .inspect_container(
                name_or_id,
                None::<bollard::query_parameters::InspectContainerOptions>,
            )
            .await
            .map_err(|e| match e {
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => ContainerError::NotFound(name_or_id.to_string()),
                e => ContainerError::ApiError(e),
            })?;

        Ok(ContainerAttrs::from(inspect))
    }

    /// Start a container, wait for it to exit, and collect its output.
    ///
    /// # Errors
    ///
    /// Returns error if the container cannot be started or its logs read.
    pub async fn run_to_completion(&self, container_id: &str) -> Result<RunOutput> {
        debug!("Starting container: {}", container_id);

        self.docker
            .start_container(
                container_id,
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await?;

        let mut exit_code = 0;
        let mut wait = self.docker.wait_container(
            container_id,
            None::<bollard::query_parameters::WaitContainerOptions>,
        );
        while let Some(result) = wait.next().await {
            match result {
                Ok(response) => exit_code = response.status_code,
                // bollard reports non-zero exits as errors
                Err(bollard::errors::Error::DockerContainerWaitError { code, .. }) => {
                    exit_code = code;
                }
                Err(e) => return Err(ContainerError::ApiError(e)),
            }
        }
        info!("Container {} exited with code {}", container_id, exit_code);

        let logs = self.logs(container_id).await?;
        Ok(RunOutput { exit_code, logs })
    }

    /// Get all container output, stdout and stderr interleaved.
    ///
    /// # Errors
    ///
    /// Returns error if log retrieval fails.
    pub async fn logs(&self, container_id: &str) -> Result<String> {
        let mut stream = self.docker.logs(
            container_id,
            Some(bollard::query_parameters::LogsOptions {
                stdout: true,
                stderr: true,
                tail: "all".to_string(),
                ..Default::default()
            }),
        );
        let mut output = String::new();

        while let Some(result) = stream.next().await {
            match result {
                Ok(log) => output.push_str(&log.to_string()),
                Err(e) => return Err(ContainerError::ApiError(e)),
            }
        }

        Ok(output)
    }

    /// Remove a container and its anonymous volumes.
    ///
    /// # Errors
    ///
    /// Returns error if removal fails.
    pub async fn remove_container(&self, name_or_id: &str, force: bool) -> Result<()> {
        debug!("Removing container: {}", name_or_id);

        self.docker
            .remove_container(
                name_or_id,
                Some(bollard::query_parameters::RemoveContainerOptions {
                    force,
                    v: true,
                    ..Default::default()
                }),
            )
            .await?;

        info!("Removed container: {}", name_or_id);
        Ok(())
    }
}

/// Output of a container that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub exit_code: i64,
    pub logs: String,
}

/// Type of container runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeType {
    /// Docker runtime
    Docker,
    /// Podman runtime
    Podman,
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeType::Docker => write!(f, "Docker"),
            RuntimeType::Podman => write!(f, "Podman"),
        }
    }
}
