use std::fmt;
use std::net::SocketAddr;

/// One received datagram, owned: the listener copies the socket buffer out
/// before handing the message over, so the parser never sees reused memory.
pub struct Message {
    pub addr: SocketAddr,
    pub buf: Vec<u8>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} - {} bytes - {:02X?}", self.addr, self.buf.len(), self.buf)
    }
}
