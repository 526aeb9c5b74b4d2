//! Recording in-memory engine for unit tests.
//!
//! Simulates just enough daemon behaviour (naming, auto-removal on stop,
//! "404" for vanished containers) to exercise the lifecycle ordering, and
//! records every call as `"<op>:<target>"`.

use crate::container::engine::{
    BuildRequest, ContainerSnapshot, CreateRequest, Engine, EngineStream, NetworkSummary,
};
use crate::container::{ContainerError, Result};
use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::models::{ContainerStateStatusEnum, ContainerSummary, CreateImageInfo};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct FakeContainer {
    id: String,
    name: String,
    status: ContainerStateStatusEnum,
    auto_remove: bool,
    logs: Vec<LogOutput>,
}

#[derive(Debug, Default)]
struct FakeState {
    containers: Vec<FakeContainer>,
    networks: Vec<NetworkSummary>,
    build_lines: Vec<String>,
    pull_progress: Vec<CreateImageInfo>,
    stream_errors: Vec<(&'static str, String)>,
    created: Vec<CreateRequest>,
    builds: Vec<BuildRequest>,
    next_id: usize,
}

#[derive(Debug, Default)]
pub(crate) struct FakeEngine {
    calls: Mutex<Vec<String>>,
    state: Mutex<FakeState>,
    failing: Mutex<HashSet<&'static str>>,
}

impl FakeEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A running, auto-removing container.
    pub(crate) fn with_container(self, id: &str, name: &str) -> Self {
        self.push_container(id, name, ContainerStateStatusEnum::RUNNING, true);
        self
    }

    /// An exited container that was not created with auto-removal.
    pub(crate) fn with_exited_container(self, id: &str, name: &str) -> Self {
        self.push_container(id, name, ContainerStateStatusEnum::EXITED, false);
        self
    }

    /// A container the engine is already tearing down.
    pub(crate) fn with_removing_container(self, id: &str, name: &str) -> Self {
        self.push_container(id, name, ContainerStateStatusEnum::REMOVING, true);
        self
    }

    pub(crate) fn with_logs(self, id: &str, logs: Vec<LogOutput>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(c) = state.containers.iter_mut().find(|c| c.id == id) {
                c.logs = logs;
            }
        }
        self
    }

    pub(crate) fn with_network(self, id: &str, name: &str) -> Self {
        self.state.lock().unwrap().networks.push(NetworkSummary {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub(crate) fn with_build_output(self, lines: &[&str]) -> Self {
        self.state.lock().unwrap().build_lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    pub(crate) fn with_pull_progress(self, progress: Vec<CreateImageInfo>) -> Self {
        self.state.lock().unwrap().pull_progress = progress;
        self
    }

    /// End the `build` or `pull` stream with the error bollard produces for
    /// an in-band `error` message.
    pub(crate) fn with_stream_error(self, op: &'static str, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .stream_errors
            .push((op, message.to_string()));
        self
    }

    /// Make every call to `op` fail with a 500 from the engine.
    pub(crate) fn failing(self, op: &'static str) -> Self {
        self.failing.lock().unwrap().insert(op);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose operation is one of the container-mutating ones.
    pub(crate) fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                ["create:", "start:", "stop:", "remove:"]
                    .iter()
                    .any(|op| c.starts_with(op))
            })
            .collect()
    }

    pub(crate) fn created(&self) -> Vec<CreateRequest> {
        self.state.lock().unwrap().created.clone()
    }

    pub(crate) fn builds(&self) -> Vec<BuildRequest> {
        self.state.lock().unwrap().builds.clone()
    }

    pub(crate) fn container_ids_named(&self, name: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .containers
            .iter()
            .filter(|c| c.name == name)
            .map(|c| c.id.clone())
            .collect()
    }

    pub(crate) fn network_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .networks
            .iter()
            .map(|n| n.name.clone())
            .collect()
    }

    fn push_container(&self, id: &str, name: &str, status: ContainerStateStatusEnum, auto_remove: bool) {
        self.state.lock().unwrap().containers.push(FakeContainer {
            id: id.to_string(),
            name: name.to_string(),
            status,
            auto_remove,
            logs: Vec::new(),
        });
    }

    fn record(&self, op: &'static str, target: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{}:{}", op, target));
        if self.failing.lock().unwrap().contains(op) {
            return Err(ContainerError::ApiError(
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 500,
                    message: format!("{} failed", op),
                },
            ));
        }
        Ok(())
    }

    fn stream_error(&self, op: &str) -> Option<Result<()>> {
        self.state
            .lock()
            .unwrap()
            .stream_errors
            .iter()
            .find(|(failing, _)| *failing == op)
            .map(|(_, message)| {
                Err(ContainerError::ApiError(
                    bollard::errors::Error::DockerStreamError {
                        error: message.clone(),
                    },
                ))
            })
    }

    fn missing(id: &str) -> ContainerError {
        ContainerError::NotFound(id.to_string())
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        self.record("list", "all")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .iter()
            .map(|c| ContainerSummary {
                id: Some(c.id.clone()),
                names: Some(vec![format!("/{}", c.name)]),
                ..Default::default()
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerSnapshot> {
        self.record("inspect", id)?;
        let state = self.state.lock().unwrap();
        let c = state
            .containers
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| Self::missing(id))?;
        Ok(ContainerSnapshot {
            id: c.id.clone(),
            status: Some(c.status),
            running: c.status == ContainerStateStatusEnum::RUNNING,
        })
    }

    fn container_logs<'a>(&'a self, id: &'a str) -> EngineStream<'a, LogOutput> {
        if let Err(e) = self.record("logs", id) {
            return stream::iter(vec![Err(e)]).boxed();
        }
        let state = self.state.lock().unwrap();
        let logs: Vec<Result<LogOutput>> = match state.containers.iter().find(|c| c.id == id) {
            Some(c) => c.logs.iter().cloned().map(Ok).collect(),
            None => vec![Err(Self::missing(id))],
        };
        stream::iter(logs).boxed()
    }

    async fn create_container(&self, request: CreateRequest) -> Result<String> {
        self.record("create", request.name.as_deref().unwrap_or("<engine-assigned>"))?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("new-{}", state.next_id);
        let name = request.name.clone().unwrap_or_else(|| format!("anonymous-{}", state.next_id));
        if state.containers.iter().any(|c| c.name == name) {
            return Err(ContainerError::ApiError(
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 409,
                    message: format!("name {} is already in use", name),
                },
            ));
        }
        let auto_remove = request
            .body
            .host_config
            .as_ref()
            .and_then(|h| h.auto_remove)
            .unwrap_or(false);
        state.containers.push(FakeContainer {
            id: id.clone(),
            name,
            status: ContainerStateStatusEnum::CREATED,
            auto_remove,
            logs: Vec::new(),
        });
        state.created.push(request);
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.record("start", id)?;
        let mut state = self.state.lock().unwrap();
        let c = state
            .containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Self::missing(id))?;
        c.status = ContainerStateStatusEnum::RUNNING;
        Ok(())
    }

    async fn stop_container(&self, id: &str, timeout: Option<i32>) -> Result<()> {
        let target = match timeout {
            Some(t) => format!("{}@{}", id, t),
            None => id.to_string(),
        };
        self.record("stop", &target)?;
        let mut state = self.state.lock().unwrap();
        let index = state
            .containers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Self::missing(id))?;
        if state.containers[index].auto_remove {
            state.containers.remove(index);
        } else {
            state.containers[index].status = ContainerStateStatusEnum::EXITED;
        }
        Ok(())
    }

    async fn wait_container(&self, id: &str) -> Result<i64> {
        self.record("wait", id)?;
        let state = self.state.lock().unwrap();
        match state.containers.iter().find(|c| c.id == id) {
            Some(c) if c.status == ContainerStateStatusEnum::RUNNING => Err(ContainerError::Other(
                format!("container {} is still running", id),
            )),
            Some(_) => Ok(0),
            None => Err(Self::missing(id)),
        }
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        self.record("remove", id)?;
        let mut state = self.state.lock().unwrap();
        let index = state
            .containers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Self::missing(id))?;
        state.containers.remove(index);
        Ok(())
    }

    fn pull_image<'a>(&'a self, reference: &'a str) -> EngineStream<'a, CreateImageInfo> {
        if let Err(e) = self.record("pull", reference) {
            return stream::iter(vec![Err(e)]).boxed();
        }
        let progress = self.state.lock().unwrap().pull_progress.clone();
        let error = self.stream_error("pull").map(|e| e.map(|()| CreateImageInfo::default()));
        stream::iter(progress.into_iter().map(Ok).chain(error)).boxed()
    }

    fn build_image<'a>(&'a self, request: BuildRequest) -> EngineStream<'a, String> {
        if let Err(e) = self.record("build", &request.tag) {
            return stream::iter(vec![Err(e)]).boxed();
        }
        let error = self.stream_error("build").map(|e| e.map(|()| String::new()));
        let mut state = self.state.lock().unwrap();
        state.builds.push(request);
        stream::iter(state.build_lines.clone().into_iter().map(Ok).chain(error)).boxed()
    }

    async fn list_networks(&self) -> Result<Vec<NetworkSummary>> {
        self.record("list_networks", "all")?;
        Ok(self.state.lock().unwrap().networks.clone())
    }

    async fn create_network(&self, name: &str) -> Result<String> {
        self.record("create_network", name)?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("net-{}", state.next_id);
        state.networks.push(NetworkSummary {
            id: id.clone(),
            name: name.to_string(),
        });
        Ok(id)
    }
}
