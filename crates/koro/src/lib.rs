//! Route and address configuration inside container network namespaces.
//!
//! koro takes one line of text, such as
//!
//! ```text
//! docker web route add 10.1.1.0/24 via 10.1.1.1
//! ```
//!
//! and applies it to the network namespace it names: a Docker container,
//! a named namespace under `/var/run/netns`, a process, or the caller's own
//! namespace when no target is given.
//!
//! # Modules
//!
//! - [`command`]: grammar, parsed [`Command`]s and parse diagnostics
//! - [`namespace`]: target to namespace file resolution
//! - [`descriptor`]: commands resolved to interface indexes and addresses
//! - [`ops`]: the link/route/address seam over [`netlink`]
//! - [`dispatch`]: the parse, resolve, build and apply sequence
//!
//! # Example
//!
//! ```ignore
//! use koro::{Config, Dispatcher};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), koro::DispatchError> {
//!     let dispatcher = Dispatcher::new(&Config::default());
//!     let applied = dispatcher
//!         .dispatch("netns blue address add 10.0.0.2/24 dev eth0")
//!         .await?;
//!     println!("{applied}");
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod namespace;
pub mod netlink;
pub mod ops;

pub use command::{Command, Network, Operation, ParseError, Target, TargetType};
pub use config::Config;
pub use descriptor::{AddressDescriptor, Prefix, RouteDescriptor};
pub use dispatch::{Applied, DispatchError, DispatchState, Dispatcher};
pub use error::{Error, Result};
pub use ops::NetworkOps;
