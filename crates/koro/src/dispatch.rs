//! Runs one command from text to kernel.
//!
//! Dispatch is a straight line through these states:
//!
//! ```text
//! Idle -> Parsed -> NamespaceResolved -> DescriptorBuilt -> Applied -> Succeeded
//! ```
//!
//! Any step may fail, which ends the run in `Failed`. The mutation is
//! attempted at most once, and a namespace opened for the run is released
//! on every path.

use std::fmt;

use crate::command::{Command, Operation};
use crate::config::Config;
use crate::descriptor::{self, AddressDescriptor, RouteDescriptor};
use crate::error::{Error, Result};
use crate::namespace::{ContainerRuntime, DockerCli, NamespaceHandle, NamespaceResolver};
use crate::netlink::Connection;
use crate::ops::NetworkOps;

/// Progress of a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Parsed,
    NamespaceResolved,
    DescriptorBuilt,
    Applied,
    Succeeded,
    Failed,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Parsed => "parsed",
            Self::NamespaceResolved => "namespace resolved",
            Self::DescriptorBuilt => "descriptor built",
            Self::Applied => "applied",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        })
    }
}

/// A failed dispatch and the last state it reached.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct DispatchError {
    pub state: DispatchState,
    #[source]
    pub error: Error,
}

impl DispatchError {
    fn at(state: DispatchState) -> impl FnOnce(Error) -> Self {
        move |error| Self { state, error }
    }
}

/// What a successful dispatch changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Route(Operation, RouteDescriptor),
    Address(Operation, AddressDescriptor),
}

impl fmt::Display for Applied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Route(op, route) => write!(f, "{op} {route}"),
            Self::Address(op, addr) => write!(f, "{op} {addr}"),
        }
    }
}

/// Opens the network seam inside a resolved namespace.
pub trait Connector {
    type Ops: NetworkOps;

    fn connect(&self, namespace: &NamespaceHandle) -> Result<Self::Ops>;
}

/// Connects over rtnetlink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetlinkConnector;

impl Connector for NetlinkConnector {
    type Ops = Connection;

    fn connect(&self, namespace: &NamespaceHandle) -> Result<Connection> {
        let conn = match namespace.fd() {
            None => Connection::new()?,
            Some(fd) => Connection::new_in_namespace(fd)?,
        };
        Ok(conn)
    }
}

/// Parses, resolves and applies commands.
///
/// # Example
///
/// ```ignore
/// use koro::{Config, Dispatcher};
///
/// let dispatcher = Dispatcher::new(&Config::default());
/// dispatcher.dispatch("docker web route add 10.1.1.0/24 via 10.1.1.1").await?;
/// ```
#[derive(Debug)]
pub struct Dispatcher<R = DockerCli, C = NetlinkConnector> {
    resolver: NamespaceResolver<R>,
    connector: C,
}

impl Dispatcher {
    /// A dispatcher using the Docker CLI and rtnetlink.
    pub fn new(config: &Config) -> Self {
        Self::with_parts(
            NamespaceResolver::new(DockerCli::new(config), config),
            NetlinkConnector,
        )
    }
}

impl<R: ContainerRuntime, C: Connector> Dispatcher<R, C> {
    pub fn with_parts(resolver: NamespaceResolver<R>, connector: C) -> Self {
        Self {
            resolver,
            connector,
        }
    }

    /// Parse `input` and run it.
    pub async fn dispatch(&self, input: &str) -> std::result::Result<Applied, DispatchError> {
        tracing::debug!(state = %DispatchState::Idle, input, "dispatching");
        let command = Command::parse(input)
            .map_err(|e| DispatchError {
                state: DispatchState::Idle,
                error: e.into(),
            })
            .inspect_err(fail)?;
        self.execute(&command).await
    }

    /// Run an already parsed command.
    pub async fn execute(&self, command: &Command) -> std::result::Result<Applied, DispatchError> {
        tracing::debug!(state = %DispatchState::Parsed, %command);

        let namespace = self
            .resolver
            .resolve(command.target())
            .map_err(DispatchError::at(DispatchState::Parsed))
            .inspect_err(fail)?;
        tracing::debug!(state = %DispatchState::NamespaceResolved, path = ?namespace.path());

        let result = self.run(command, &namespace).await;
        namespace.release();

        let applied = result.inspect_err(fail)?;
        tracing::debug!(state = %DispatchState::Succeeded, %applied);
        Ok(applied)
    }

    async fn run(
        &self,
        command: &Command,
        namespace: &NamespaceHandle,
    ) -> std::result::Result<Applied, DispatchError> {
        let ops = self
            .connector
            .connect(namespace)
            .map_err(DispatchError::at(DispatchState::NamespaceResolved))?;

        let op = command.operation();
        if op.is_route() {
            let route = descriptor::build_route(command, &ops)
                .await
                .map_err(DispatchError::at(DispatchState::NamespaceResolved))?;
            tracing::debug!(state = %DispatchState::DescriptorBuilt, %route);

            let outcome = if op.is_add() {
                ops.route_add(&route).await
            } else {
                ops.route_del(&route).await
            };
            outcome.map_err(DispatchError::at(DispatchState::DescriptorBuilt))?;
            tracing::debug!(state = %DispatchState::Applied, operation = %op);
            Ok(Applied::Route(op, route))
        } else {
            let addr = descriptor::build_address(command, &ops)
                .await
                .map_err(DispatchError::at(DispatchState::NamespaceResolved))?;
            tracing::debug!(state = %DispatchState::DescriptorBuilt, %addr);

            let outcome = if op.is_add() {
                ops.addr_add(&addr).await
            } else {
                ops.addr_del(&addr).await
            };
            outcome.map_err(DispatchError::at(DispatchState::DescriptorBuilt))?;
            tracing::debug!(state = %DispatchState::Applied, operation = %op);
            Ok(Applied::Address(op, addr))
        }
    }
}

fn fail(e: &DispatchError) {
    tracing::debug!(state = %DispatchState::Failed, after = %e.state, error = %e.error);
}
