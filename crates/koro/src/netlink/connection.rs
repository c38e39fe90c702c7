//! Netlink connection with request/response handling.

use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{MessageIter, NLM_F_ACK, NLM_F_REQUEST, NlMsgError, NlMsgHdr};
use super::messages::FromNetlink;
use super::socket::NetlinkSocket;
use crate::namespace::NamespaceFd;

/// A connection to the kernel's routing subsystem, bound to one namespace.
pub struct Connection {
    socket: NetlinkSocket,
}

impl Connection {
    /// Create a connection in the caller's current network namespace.
    pub fn new() -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new()?,
        })
    }

    /// Create a connection that operates inside the namespace behind `ns`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use koro::namespace::NamespaceFd;
    /// use koro::netlink::Connection;
    ///
    /// let ns = NamespaceFd::open_path("/var/run/netns/blue")?;
    /// let conn = Connection::new_in_namespace(&ns)?;
    /// let lo = conn.get_link_by_name("lo").await?;
    /// ```
    pub fn new_in_namespace(ns: &NamespaceFd) -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new_in_namespace(ns)?,
        })
    }

    fn stamp(&self, builder: &mut MessageBuilder) -> u32 {
        let seq = self.socket.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.socket.pid());
        seq
    }

    /// Send a request and wait for its single reply.
    ///
    /// Returns the reply payload (the bytes after the netlink header).
    pub async fn request(&self, mut builder: MessageBuilder) -> Result<Vec<u8>> {
        let seq = self.stamp(&mut builder);
        let msg = builder.finish();
        tracing::trace!(seq, len = msg.len(), "netlink request");
        self.socket.send(&msg).await?;

        loop {
            let data = self.socket.recv_msg().await?;
            if let Some(payload) = reply_for(&data, seq)? {
                return Ok(payload);
            }
        }
    }

    /// Send a request that expects an ACK only (no data response).
    pub async fn request_ack(&self, mut builder: MessageBuilder) -> Result<()> {
        let seq = self.stamp(&mut builder);
        let msg = builder.finish();
        tracing::trace!(seq, len = msg.len(), "netlink request (ack)");
        self.socket.send(&msg).await?;

        loop {
            let data = self.socket.recv_msg().await?;
            if ack_for(&data, seq)? {
                return Ok(());
            }
        }
    }

    /// Parse a reply payload into a typed message.
    pub fn parse_response<T: FromNetlink>(&self, payload: &[u8]) -> Result<T> {
        T::from_bytes(payload)
    }
}

/// Scan a datagram for the data reply to `seq`.
///
/// `Ok(None)` means the datagram held nothing for this request.
fn reply_for(data: &[u8], seq: u32) -> Result<Option<Vec<u8>>> {
    for result in MessageIter::new(data) {
        let (header, payload) = result?;

        if header.nlmsg_seq != seq {
            continue;
        }

        if header.is_error() {
            check_error(header, payload)?;
            return Err(Error::InvalidMessage("expected data reply, got ACK".into()));
        }

        return Ok(Some(payload.to_vec()));
    }

    Ok(None)
}

/// Scan a datagram for the ACK to `seq`.
fn ack_for(data: &[u8], seq: u32) -> Result<bool> {
    for result in MessageIter::new(data) {
        let (header, payload) = result?;

        if header.nlmsg_seq != seq {
            continue;
        }

        if header.is_error() {
            check_error(header, payload)?;
            return Ok(true);
        }
    }

    Ok(false)
}

fn check_error(header: &NlMsgHdr, payload: &[u8]) -> Result<()> {
    let err = NlMsgError::from_bytes(payload)?;
    if err.is_ack() {
        return Ok(());
    }
    let ext_ack = err.ext_ack_message(header.nlmsg_flags, payload);
    Err(Error::from_errno_with_ext_ack(err.error, ext_ack))
}

/// Helper to build a single-object GET request.
///
/// The kernel answers GETs with data or an error, never with an extra ACK,
/// so `NLM_F_ACK` is left out.
pub fn get_request(msg_type: u16) -> MessageBuilder {
    MessageBuilder::new(msg_type, NLM_F_REQUEST)
}

/// Helper to build a request expecting ACK.
pub fn ack_request(msg_type: u16, flags: u16) -> MessageBuilder {
    MessageBuilder::new(msg_type, NLM_F_REQUEST | NLM_F_ACK | flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::message::{NLM_F_ACK_TLVS, NLM_F_CAPPED, NlMsgType};

    fn error_msg(seq: u32, errno: i32) -> Vec<u8> {
        let mut builder = MessageBuilder::new(NlMsgType::ERROR, NLM_F_CAPPED);
        let mut payload = errno.to_ne_bytes().to_vec();
        payload.extend_from_slice(NlMsgHdr::new(NlMsgType::RTM_NEWROUTE, 0).as_bytes());
        builder.append_bytes(&payload);
        builder.set_seq(seq);
        builder.finish()
    }

    fn data_msg(seq: u32, body: &[u8]) -> Vec<u8> {
        let mut builder = MessageBuilder::new(NlMsgType::RTM_NEWROUTE, 0);
        builder.append_bytes(body);
        builder.set_seq(seq);
        builder.finish()
    }

    #[test]
    fn connection_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Connection>();
    }

    #[test]
    fn test_ack_skips_other_sequences() {
        let mut data = error_msg(7, 0);
        assert!(!ack_for(&data, 8).unwrap());

        data.extend(error_msg(8, 0));
        assert!(ack_for(&data, 8).unwrap());
    }

    #[test]
    fn test_ack_reports_kernel_error() {
        let data = error_msg(3, -libc::EEXIST);
        let err = ack_for(&data, 3).unwrap_err();
        assert!(err.is_already_exists());
    }

    #[test]
    fn test_ack_uses_ext_ack_text() {
        let mut builder = MessageBuilder::new(NlMsgType::ERROR, NLM_F_CAPPED | NLM_F_ACK_TLVS);
        let mut payload = (-libc::EINVAL).to_ne_bytes().to_vec();
        payload.extend_from_slice(NlMsgHdr::new(NlMsgType::RTM_NEWADDR, 0).as_bytes());
        let text = b"prefix length too long\0";
        payload.extend_from_slice(&((4 + text.len()) as u16).to_ne_bytes());
        payload.extend_from_slice(&1u16.to_ne_bytes());
        payload.extend_from_slice(text);
        builder.append_bytes(&payload);
        builder.set_seq(5);

        let err = ack_for(&builder.finish(), 5).unwrap_err();
        assert_eq!(err.errno(), Some(libc::EINVAL));
        assert!(err.to_string().contains("prefix length too long"));
    }

    #[test]
    fn test_reply_returns_payload() {
        let data = data_msg(9, &[1, 2, 3, 4]);
        assert_eq!(reply_for(&data, 9).unwrap(), Some(vec![1, 2, 3, 4]));
        assert_eq!(reply_for(&data, 10).unwrap(), None);
    }

    #[test]
    fn test_reply_error_is_propagated() {
        let data = error_msg(4, -libc::ENETUNREACH);
        let err = reply_for(&data, 4).unwrap_err();
        assert!(err.is_unreachable());
    }
}
