//! BIG-REQUESTS extension
//!
//! A single request, `Enable`, switches the connection to extended-length
//! framing: a core length field of zero means a second 32-bit word carries
//! the actual request length in 4-byte units.

/// Extension name for QueryExtension
pub const NAME: &str = "BIG-REQUESTS";

/// Maximum request length granted to big-requests clients, in 4-byte units
pub const MAX_REQUEST_LENGTH: u32 = 0x0010_0000;

/// Minor opcode of Enable
pub const ENABLE: u8 = 0;
