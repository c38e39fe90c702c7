//! The parsed command.
//!
//! A [`Command`] is produced once per input line by [`Command::parse`] and is
//! never modified afterwards. Its textual parts (network, gateway, device)
//! are kept exactly as written; turning them into addresses and interface
//! indexes is the job of [`crate::descriptor`].
//!
//! # Example
//!
//! ```
//! use koro::command::{Command, Network, Operation, Target};
//!
//! let cmd: Command = "docker web route add 10.1.1.0/24 via 10.1.1.1".parse()?;
//! assert_eq!(cmd.operation(), Operation::RouteAdd);
//! assert_eq!(cmd.target(), &Target::Docker("web".into()));
//! assert_eq!(cmd.network(), &Network::cidr("10.1.1.0", "24"));
//! assert_eq!(cmd.via(), Some("10.1.1.1"));
//! # Ok::<(), koro::command::ParseError>(())
//! ```

mod diagnostic;
mod parser;

use std::fmt;
use std::str::FromStr;

pub use diagnostic::{GENERIC_MESSAGE, ParseError, ParseErrorKind};

/// The requested mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    RouteAdd,
    RouteDel,
    AddrAdd,
    AddrDel,
}

impl Operation {
    /// Whether this operation changes the routing table.
    pub fn is_route(self) -> bool {
        matches!(self, Self::RouteAdd | Self::RouteDel)
    }

    /// Whether this operation changes interface addresses.
    pub fn is_address(self) -> bool {
        !self.is_route()
    }

    /// Whether this operation adds rather than deletes.
    pub fn is_add(self) -> bool {
        matches!(self, Self::RouteAdd | Self::AddrAdd)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RouteAdd => "route add",
            Self::RouteDel => "route del",
            Self::AddrAdd => "address add",
            Self::AddrDel => "address del",
        })
    }
}

/// How the target namespace is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    Docker,
    NetNs,
    Pid,
    /// The caller's own namespace.
    None,
}

/// The namespace a command runs in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// The caller's current namespace.
    Current,
    /// A container, by name or ID.
    Docker(String),
    /// A named namespace under the netns directory, or a namespace file path.
    NetNs(String),
    /// The namespace of a process.
    Pid(u32),
}

impl Target {
    /// The selector kind.
    pub fn kind(&self) -> TargetType {
        match self {
            Self::Current => TargetType::None,
            Self::Docker(_) => TargetType::Docker,
            Self::NetNs(_) => TargetType::NetNs,
            Self::Pid(_) => TargetType::Pid,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => Ok(()),
            Self::Docker(name) => write!(f, "docker {name}"),
            Self::NetNs(name) => write!(f, "netns {name}"),
            Self::Pid(pid) => write!(f, "pid {pid}"),
        }
    }
}

/// The network term of a command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Network {
    /// `default`: the match-all route.
    Default,
    /// `address/length`, both kept as written.
    Cidr { address: String, length: String },
}

impl Network {
    /// Build a CIDR network term.
    pub fn cidr(address: impl Into<String>, length: impl Into<String>) -> Self {
        Self::Cidr {
            address: address.into(),
            length: length.into(),
        }
    }

    /// Whether this is `default`.
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    /// The address half of a CIDR, `None` for `default`.
    pub fn address(&self) -> Option<&str> {
        match self {
            Self::Default => None,
            Self::Cidr { address, .. } => Some(address),
        }
    }

    /// The length half of a CIDR, `None` for `default`.
    pub fn length(&self) -> Option<&str> {
        match self {
            Self::Default => None,
            Self::Cidr { length, .. } => Some(length),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Cidr { address, length } => write!(f, "{address}/{length}"),
        }
    }
}

/// A validated command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    operation: Operation,
    target: Target,
    network: Network,
    via: Option<String>,
    dev: Option<String>,
}

impl Command {
    /// Create a command without options.
    pub fn new(operation: Operation, target: Target, network: Network) -> Self {
        Self {
            operation,
            target,
            network,
            via: None,
            dev: None,
        }
    }

    /// Set the gateway option.
    pub fn with_via(mut self, via: impl Into<String>) -> Self {
        self.via = Some(via.into());
        self
    }

    /// Set the device option.
    pub fn with_dev(mut self, dev: impl Into<String>) -> Self {
        self.dev = Some(dev.into());
        self
    }

    /// Parse one command line.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        parser::parse(input)
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The `via` option as written.
    pub fn via(&self) -> Option<&str> {
        self.via.as_deref()
    }

    /// The `dev` option as written.
    pub fn dev(&self) -> Option<&str> {
        self.dev.as_deref()
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical single-spaced form; parsing it yields an equal `Command`.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.target != Target::Current {
            write!(f, "{} ", self.target)?;
        }
        write!(f, "{} {}", self.operation, self.network)?;
        if let Some(via) = &self.via {
            write!(f, " via {via}")?;
        }
        if let Some(dev) = &self.dev {
            write!(f, " dev {dev}")?;
        }
        Ok(())
    }
}
