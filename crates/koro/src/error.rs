//! Error types for command dispatch.

use std::io;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::command::{ParseError, ParseErrorKind};
use crate::netlink;

/// Result type for koro operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a command from being applied.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The command text does not match the grammar.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A `pid` target that names no possible process.
    #[error("invalid pid: {pid}")]
    InvalidPid { pid: String },

    /// The container runtime could not produce a namespace for the container.
    #[error("container not found: {name}: {reason}")]
    ContainerNotFound { name: String, reason: String },

    /// The namespace file could not be opened.
    #[error("namespace not found: {}", .path.display())]
    NamespaceNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The `dev` option names no interface in the target namespace.
    #[error("interface not found: {name}")]
    InterfaceNotFound { name: String },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    /// The kernel has no route to the gateway, so no interface could be chosen.
    #[error("no route to gateway {gateway}")]
    NoRouteToGateway { gateway: IpAddr },

    /// Neither `dev` nor `via` was given, or `dev` is required and missing.
    #[error("cannot determine the interface: give dev or via")]
    AmbiguousInterface,

    /// An option the operation does not accept.
    #[error("unsupported combination: {0}")]
    UnsupportedCombination(String),

    /// The kernel refused the mutation.
    #[error("{operation} failed")]
    ApplyFailed {
        operation: String,
        #[source]
        source: netlink::Error,
    },

    /// A netlink failure outside of the mutation itself.
    #[error(transparent)]
    Netlink(#[from] netlink::Error),
}

impl Error {
    /// Whether this is a malformed `pid` target.
    pub fn is_invalid_pid(&self) -> bool {
        match self {
            Self::InvalidPid { .. } => true,
            Self::Parse(e) => e.kind() == ParseErrorKind::InvalidPid,
            _ => false,
        }
    }

    /// Whether the command combines options that do not go together.
    pub fn is_unsupported_combination(&self) -> bool {
        match self {
            Self::UnsupportedCombination(_) => true,
            Self::Parse(e) => e.kind() == ParseErrorKind::UnsupportedCombination,
            _ => false,
        }
    }

    /// Whether a named container, namespace or interface does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ContainerNotFound { .. }
                | Self::NamespaceNotFound { .. }
                | Self::InterfaceNotFound { .. }
        )
    }

    /// Whether the command text failed to parse.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}
