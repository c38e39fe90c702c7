//! Netlink message header and parsing.

use super::attr::AttrIter;
use super::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Round up to the 4-byte message boundary.
#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    len.next_multiple_of(4)
}

/// Size of the netlink message header.
pub const NLMSG_HDRLEN: usize = nlmsg_align(std::mem::size_of::<NlMsgHdr>());

/// Netlink message header (mirrors struct nlmsghdr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgHdr {
    /// Length of message including header.
    pub nlmsg_len: u32,
    /// Message type.
    pub nlmsg_type: u16,
    /// Additional flags.
    pub nlmsg_flags: u16,
    /// Sequence number.
    pub nlmsg_seq: u32,
    /// Sending process port ID.
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    /// Create a new message header.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            nlmsg_len: NLMSG_HDRLEN as u32,
            nlmsg_type: msg_type,
            nlmsg_flags: flags,
            nlmsg_seq: 0,
            nlmsg_pid: 0,
        }
    }

    /// Check if this is an error message (or ACK).
    pub fn is_error(&self) -> bool {
        self.nlmsg_type == NlMsgType::ERROR
    }

    /// Convert header to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Parse header from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Netlink message types used by koro.
pub struct NlMsgType;

impl NlMsgType {
    /// Error message or ACK.
    pub const ERROR: u16 = 2;

    pub const RTM_GETLINK: u16 = 18;

    pub const RTM_NEWADDR: u16 = 20;
    pub const RTM_DELADDR: u16 = 21;

    pub const RTM_NEWROUTE: u16 = 24;
    pub const RTM_DELROUTE: u16 = 25;
    pub const RTM_GETROUTE: u16 = 26;
}

/// Netlink message flags.
pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_ACK: u16 = 0x04;

// Flags on NLMSG_ERROR replies
pub const NLM_F_CAPPED: u16 = 0x100;
pub const NLM_F_ACK_TLVS: u16 = 0x200;

// Modifiers to NEW request
pub const NLM_F_EXCL: u16 = 0x200;
pub const NLM_F_CREATE: u16 = 0x400;

/// Extended ACK attribute carrying the error string.
pub const NLMSGERR_ATTR_MSG: u16 = 1;

/// Iterator over netlink messages in a buffer.
pub struct MessageIter<'a> {
    data: &'a [u8],
}

impl<'a> MessageIter<'a> {
    /// Create a new message iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<(&'a NlMsgHdr, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLMSG_HDRLEN {
            return None;
        }
        let header = match NlMsgHdr::from_bytes(self.data) {
            Ok(h) => h,
            Err(e) => return Some(Err(e)),
        };

        let len = header.nlmsg_len as usize;
        let Some(payload) = self.data.get(NLMSG_HDRLEN..len) else {
            // A bad length poisons the rest of the datagram.
            self.data = &[];
            return Some(Err(Error::InvalidMessage(format!(
                "invalid message length: {len}"
            ))));
        };
        self.data = self.data.get(nlmsg_align(len)..).unwrap_or_default();
        Some(Ok((header, payload)))
    }
}

/// Netlink error message payload (mirrors struct nlmsgerr).
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout)]
pub struct NlMsgError {
    /// Error code (negative errno or 0 for ACK).
    pub error: i32,
    /// Original message header that caused the error.
    pub msg: NlMsgHdr,
}

impl NlMsgError {
    /// Parse error message from payload.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }

    /// Check if this is an ACK (no error).
    pub fn is_ack(&self) -> bool {
        self.error == 0
    }

    /// Extended ACK attributes following the echoed request.
    ///
    /// The echoed request is only the header when the reply is capped,
    /// otherwise the whole original message sits in front of the TLVs.
    pub fn attrs<'a>(&self, flags: u16, payload: &'a [u8]) -> AttrIter<'a> {
        if flags & NLM_F_ACK_TLVS == 0 {
            return AttrIter::new(&[]);
        }
        let offset = if flags & NLM_F_CAPPED != 0 {
            std::mem::size_of::<Self>()
        } else {
            4 + nlmsg_align(self.msg.nlmsg_len as usize)
        };
        match payload.get(offset..) {
            Some(rest) => AttrIter::new(rest),
            None => AttrIter::new(&[]),
        }
    }

    /// The human readable extended ACK message, if the kernel sent one.
    pub fn ext_ack_message<'a>(&self, flags: u16, payload: &'a [u8]) -> Option<&'a str> {
        self.attrs(flags, payload)
            .find(|(kind, _)| *kind == NLMSGERR_ATTR_MSG)
            .and_then(|(_, data)| {
                let len = data.iter().position(|&b| b == 0).unwrap_or(data.len());
                std::str::from_utf8(&data[..len]).ok()
            })
    }
}
