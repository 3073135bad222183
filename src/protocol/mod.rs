//! X11 wire protocol implementation
//!
//! Everything that touches bytes lives here: the connection setup handshake,
//! request decoding, and the encoders for replies, events, and errors. All
//! multi-byte integers honor the byte order negotiated per connection.

pub mod events;
pub mod handshake;
pub mod opcodes;
pub mod replies;
pub mod requests;
pub mod wire;

pub use events::Event;
pub use replies::Reply;
pub use requests::Request;
pub use wire::{WireOrder, WireReader, WireWriter};

/// A point in 16-bit device coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

/// A rectangle in device coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

/// A line segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub x1: i16,
    pub y1: i16,
    pub x2: i16,
    pub y2: i16,
}

/// An arc within a bounding rectangle, angles in 1/64 degree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arc {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub angle1: i16,
    pub angle2: i16,
}
