//! Strongly-typed rtnetlink replies.
//!
//! Only the fields koro consults are kept: the outgoing interface of a
//! looked-up route and the index of a looked-up link.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use winnow::binary::le_u16;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;

use super::attr::NLA_TYPE_MASK;
use super::error::{Error, Result};
use super::types::{AF_INET, AF_INET6, IfInfoMsg, RtMsg, ifla, rta};

/// Result type of the winnow parsers in this module.
pub type PResult<T> = std::result::Result<T, ErrMode<ContextError>>;

/// Parse a typed message from the payload following the netlink header.
pub trait FromNetlink: Sized {
    /// Parse from a winnow input.
    fn parse(input: &mut &[u8]) -> PResult<Self>;

    /// Parse from a complete payload.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut input = data;
        Self::parse(&mut input)
            .map_err(|e| Error::InvalidMessage(format!("failed to parse reply: {e:?}")))
    }
}

fn cut<T>() -> PResult<T> {
    Err(ErrMode::Cut(ContextError::new()))
}

fn fixed<'a>(input: &mut &'a [u8], len: usize) -> PResult<&'a [u8]> {
    if input.len() < len {
        return cut();
    }
    take(len).parse_next(input)
}

/// Attribute header: (length, type).
fn attr_header(input: &mut &[u8]) -> PResult<(u16, u16)> {
    (le_u16, le_u16).parse_next(input)
}

/// One attribute: (type without flags, payload). Padding is consumed.
fn attribute<'a>(input: &mut &'a [u8]) -> PResult<(u16, &'a [u8])> {
    let (len, kind) = attr_header(input)?;
    let len = len as usize;
    if len < 4 || input.len() < len - 4 {
        return cut();
    }
    let payload = fixed(input, len - 4)?;
    let padding = ((len + 3) & !3) - len;
    let _ = fixed(input, padding.min(input.len()))?;
    Ok((kind & NLA_TYPE_MASK, payload))
}

fn attributes<'a>(input: &mut &'a [u8]) -> PResult<Vec<(u16, &'a [u8])>> {
    let mut attrs = Vec::new();
    while input.len() >= 4 {
        attrs.push(attribute(input)?);
    }
    Ok(attrs)
}

fn ne_u32(data: &[u8]) -> Option<u32> {
    data.get(..4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_ne_bytes)
}

/// Decode an address attribute for the given family.
pub fn parse_ip_addr(data: &[u8], family: u8) -> Option<IpAddr> {
    match family {
        AF_INET => {
            let octets: [u8; 4] = data.get(..4)?.try_into().ok()?;
            Some(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        AF_INET6 => {
            let octets: [u8; 16] = data.get(..16)?.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

/// The next hop of a route as returned by `RTM_GETROUTE`.
///
/// Only the attributes that pick an interface for a gateway are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMessage {
    pub(crate) gateway: Option<IpAddr>,
    pub(crate) oif: Option<u32>,
}

impl RouteMessage {
    /// Create a new empty route message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output interface.
    pub fn with_oif(mut self, oif: u32) -> Self {
        self.oif = Some(oif);
        self
    }

    /// Set the gateway.
    pub fn with_gateway(mut self, gateway: IpAddr) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn gateway(&self) -> Option<&IpAddr> {
        self.gateway.as_ref()
    }

    /// Output interface index (RTA_OIF).
    pub fn oif(&self) -> Option<u32> {
        self.oif
    }
}

impl FromNetlink for RouteMessage {
    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let header_bytes = fixed(input, RtMsg::SIZE)?;
        let Ok(header) = RtMsg::from_bytes(header_bytes) else {
            return cut();
        };
        let family = header.rtm_family;

        let mut msg = RouteMessage::default();
        for (kind, data) in attributes(input)? {
            match kind {
                rta::GATEWAY => msg.gateway = parse_ip_addr(data, family),
                rta::OIF => msg.oif = ne_u32(data),
                _ => {}
            }
        }

        Ok(msg)
    }
}

/// A link as returned by `RTM_GETLINK`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkMessage {
    pub(crate) index: u32,
    pub(crate) name: Option<String>,
}

impl LinkMessage {
    /// Interface index.
    pub fn ifindex(&self) -> u32 {
        self.index
    }

    /// Interface name (IFLA_IFNAME).
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl FromNetlink for LinkMessage {
    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let header_bytes = fixed(input, IfInfoMsg::SIZE)?;
        let Ok(header) = IfInfoMsg::from_bytes(header_bytes) else {
            return cut();
        };
        let index = u32::try_from(header.ifi_index).unwrap_or(0);

        let mut msg = LinkMessage { index, name: None };
        for (kind, data) in attributes(input)? {
            if kind == ifla::IFNAME {
                let len = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                msg.name = std::str::from_utf8(&data[..len]).ok().map(str::to_owned);
            }
        }

        Ok(msg)
    }
}
