//! Network module for ICMP packet crafting and raw socket handling

pub mod frame;
pub mod icmp;
pub mod packet;
pub mod socket;

pub use frame::{FrameLayout, OsFamily, SocketMode};
pub use icmp::{generate_identifier, IcmpPinger};
pub use packet::{internet_checksum, EchoRequestBuilder, IcmpMessage, ReplyClass, ReplyMatcher};
pub use socket::IcmpSocket;
