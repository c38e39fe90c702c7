//! Link lookup.

use super::connection::{Connection, get_request};
use super::error::Result;
use super::message::NlMsgType;
use super::messages::LinkMessage;
use super::types::{IfInfoMsg, ifla};

/// Longest interface name the kernel accepts (IFNAMSIZ - 1).
pub const IFNAME_MAX: usize = 15;

/// Build an `RTM_GETLINK` request selecting the link by name.
pub(crate) fn get_link_request(name: &str) -> super::builder::MessageBuilder {
    let mut builder = get_request(NlMsgType::RTM_GETLINK);
    builder.append(&IfInfoMsg::new());
    builder.append_attr_str(ifla::IFNAME, name);
    builder
}

impl Connection {
    /// Get a network interface by name.
    ///
    /// Returns `None` if the interface doesn't exist.
    pub async fn get_link_by_name(&self, name: &str) -> Result<Option<LinkMessage>> {
        if name.is_empty() || name.len() > IFNAME_MAX {
            return Ok(None);
        }

        tracing::debug!(name, "looking up link");
        match self.request(get_link_request(name)).await {
            Ok(payload) => Ok(Some(self.parse_response(&payload)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.with_context(format!("link show {name}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::AttrIter;
    use crate::netlink::message::{NLM_F_ACK, NLMSG_HDRLEN, NlMsgHdr};

    #[test]
    fn test_get_link_request() {
        let msg = get_link_request("lo").finish();
        let header = NlMsgHdr::from_bytes(&msg).unwrap();
        assert_eq!(header.nlmsg_type, NlMsgType::RTM_GETLINK);
        assert_eq!(header.nlmsg_flags & NLM_F_ACK, 0);

        let attrs: Vec<_> = AttrIter::new(&msg[NLMSG_HDRLEN + IfInfoMsg::SIZE..]).collect();
        assert_eq!(attrs, vec![(ifla::IFNAME, &b"lo\0"[..])]);
    }
}
