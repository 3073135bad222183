//! Server-side resources
//!
//! The typed resource table and the records it holds. Windows carry real
//! state (tree links, attributes, properties, passive grabs); pixmaps,
//! fonts, and cursors are flyweights whose contents live in the frontend.

pub mod colormap;
pub mod gcontext;
pub mod registry;
pub mod window;

pub use colormap::{ColorCell, Colormap};
pub use gcontext::Gc;
pub use registry::ResourceTable;
pub use window::{MapState, Property, Window, WindowAttributes};

use crate::core::ids::{ClientId, FontId, PixmapId};

/// A pixmap: the core tracks existence, geometry, and ownership only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    pub id: PixmapId,
    pub owner: ClientId,
    pub width: u16,
    pub height: u16,
    pub depth: u8,
}

/// An open font; metrics are supplied by the frontend on demand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub id: FontId,
    pub owner: ClientId,
    pub name: String,
}

/// A cursor handle; the image lives in the frontend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub id: u32,
    pub owner: ClientId,
}
