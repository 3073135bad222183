//! X11 protocol error taxonomy
//!
//! Protocol errors are values returned by handlers, not Rust errors: the
//! dispatcher encodes them into 32-byte error frames and the connection
//! stays usable.

/// Error codes from the core protocol, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    Request = 1,
    Value = 2,
    Window = 3,
    Pixmap = 4,
    Atom = 5,
    Cursor = 6,
    Font = 7,
    Match = 8,
    Drawable = 9,
    Access = 10,
    Alloc = 11,
    Colormap = 12,
    GContext = 13,
    IDChoice = 14,
    Name = 15,
    Length = 16,
    Implementation = 17,
}

/// A protocol error produced while handling one request
///
/// The sequence number, major and minor opcode are stamped by the dispatcher
/// when the frame is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct X11Error {
    pub code: ErrorCode,
    /// The offending resource id, atom, or value
    pub bad_value: u32,
}

impl X11Error {
    pub fn new(code: ErrorCode, bad_value: u32) -> Self {
        Self { code, bad_value }
    }

    pub fn window(xid: u32) -> Self {
        Self::new(ErrorCode::Window, xid)
    }

    pub fn pixmap(xid: u32) -> Self {
        Self::new(ErrorCode::Pixmap, xid)
    }

    pub fn drawable(xid: u32) -> Self {
        Self::new(ErrorCode::Drawable, xid)
    }

    pub fn gcontext(xid: u32) -> Self {
        Self::new(ErrorCode::GContext, xid)
    }

    pub fn font(xid: u32) -> Self {
        Self::new(ErrorCode::Font, xid)
    }

    pub fn cursor(xid: u32) -> Self {
        Self::new(ErrorCode::Cursor, xid)
    }

    pub fn colormap(xid: u32) -> Self {
        Self::new(ErrorCode::Colormap, xid)
    }

    pub fn atom(value: u32) -> Self {
        Self::new(ErrorCode::Atom, value)
    }

    pub fn id_choice(xid: u32) -> Self {
        Self::new(ErrorCode::IDChoice, xid)
    }

    pub fn value(value: u32) -> Self {
        Self::new(ErrorCode::Value, value)
    }

    pub fn match_error() -> Self {
        Self::new(ErrorCode::Match, 0)
    }

    pub fn access() -> Self {
        Self::new(ErrorCode::Access, 0)
    }

    pub fn alloc() -> Self {
        Self::new(ErrorCode::Alloc, 0)
    }

    pub fn name() -> Self {
        Self::new(ErrorCode::Name, 0)
    }

    pub fn length() -> Self {
        Self::new(ErrorCode::Length, 0)
    }

    pub fn request() -> Self {
        Self::new(ErrorCode::Request, 0)
    }

    pub fn implementation() -> Self {
        Self::new(ErrorCode::Implementation, 0)
    }
}

/// Result alias used by request handlers
pub type HandlerResult<T> = std::result::Result<T, X11Error>;
