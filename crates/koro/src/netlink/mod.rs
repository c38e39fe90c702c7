//! A small async rtnetlink client.
//!
//! Covers exactly what koro needs: link lookup by name, route lookup to a
//! destination, and route/address add and delete, each on a socket bound
//! to one network namespace.

pub mod addr;
pub mod attr;
pub mod builder;
pub mod connection;
pub mod error;
pub mod link;
pub mod message;
pub mod messages;
pub mod route;
pub mod socket;
pub mod types;

pub use builder::MessageBuilder;
pub use connection::Connection;
pub use error::{Error, Result};
pub use messages::{FromNetlink, LinkMessage, RouteMessage};
pub use socket::NetlinkSocket;
