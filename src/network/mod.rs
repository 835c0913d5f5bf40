pub mod gossip;
pub mod peers;
pub mod protocol;
pub mod transport;

pub use gossip::GossipNode;
pub use peers::PeerSet;
pub use protocol::{OpCode, PROTOCOL_VERSION};
pub use transport::{Datagram, UdpTransport};
