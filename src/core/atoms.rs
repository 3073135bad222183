//! Atom registry
//!
//! Process-wide `string <-> u32` interning. Atoms 1-68 are the predefined set
//! from the core protocol; dynamic interning allocates monotonically from 69.

use std::collections::HashMap;
use tracing::debug;

use crate::core::ids::Atom;

/// Predefined atom values, in protocol order
pub mod predefined {
    pub const PRIMARY: u32 = 1;
    pub const SECONDARY: u32 = 2;
    pub const ARC: u32 = 3;
    pub const ATOM: u32 = 4;
    pub const BITMAP: u32 = 5;
    pub const CARDINAL: u32 = 6;
    pub const COLORMAP: u32 = 7;
    pub const CURSOR: u32 = 8;
    pub const CUT_BUFFER0: u32 = 9;
    pub const CUT_BUFFER1: u32 = 10;
    pub const CUT_BUFFER2: u32 = 11;
    pub const CUT_BUFFER3: u32 = 12;
    pub const CUT_BUFFER4: u32 = 13;
    pub const CUT_BUFFER5: u32 = 14;
    pub const CUT_BUFFER6: u32 = 15;
    pub const CUT_BUFFER7: u32 = 16;
    pub const DRAWABLE: u32 = 17;
    pub const FONT: u32 = 18;
    pub const INTEGER: u32 = 19;
    pub const PIXMAP: u32 = 20;
    pub const POINT: u32 = 21;
    pub const RECTANGLE: u32 = 22;
    pub const RESOURCE_MANAGER: u32 = 23;
    pub const RGB_COLOR_MAP: u32 = 24;
    pub const RGB_BEST_MAP: u32 = 25;
    pub const RGB_BLUE_MAP: u32 = 26;
    pub const RGB_DEFAULT_MAP: u32 = 27;
    pub const RGB_GRAY_MAP: u32 = 28;
    pub const RGB_GREEN_MAP: u32 = 29;
    pub const RGB_RED_MAP: u32 = 30;
    pub const STRING: u32 = 31;
    pub const VISUALID: u32 = 32;
    pub const WINDOW: u32 = 33;
    pub const WM_COMMAND: u32 = 34;
    pub const WM_HINTS: u32 = 35;
    pub const WM_CLIENT_MACHINE: u32 = 36;
    pub const WM_ICON_NAME: u32 = 37;
    pub const WM_ICON_SIZE: u32 = 38;
    pub const WM_NAME: u32 = 39;
    pub const WM_NORMAL_HINTS: u32 = 40;
    pub const WM_SIZE_HINTS: u32 = 41;
    pub const WM_ZOOM_HINTS: u32 = 42;
    pub const MIN_SPACE: u32 = 43;
    pub const NORM_SPACE: u32 = 44;
    pub const MAX_SPACE: u32 = 45;
    pub const END_SPACE: u32 = 46;
    pub const SUPERSCRIPT_X: u32 = 47;
    pub const SUPERSCRIPT_Y: u32 = 48;
    pub const SUBSCRIPT_X: u32 = 49;
    pub const SUBSCRIPT_Y: u32 = 50;
    pub const UNDERLINE_POSITION: u32 = 51;
    pub const UNDERLINE_THICKNESS: u32 = 52;
    pub const STRIKEOUT_ASCENT: u32 = 53;
    pub const STRIKEOUT_DESCENT: u32 = 54;
    pub const ITALIC_ANGLE: u32 = 55;
    pub const X_HEIGHT: u32 = 56;
    pub const QUAD_WIDTH: u32 = 57;
    pub const WEIGHT: u32 = 58;
    pub const POINT_SIZE: u32 = 59;
    pub const RESOLUTION: u32 = 60;
    pub const COPYRIGHT: u32 = 61;
    pub const NOTICE: u32 = 62;
    pub const FONT_NAME: u32 = 63;
    pub const FAMILY_NAME: u32 = 64;
    pub const FULL_NAME: u32 = 65;
    pub const CAP_HEIGHT: u32 = 66;
    pub const WM_CLASS: u32 = 67;
    pub const WM_TRANSIENT_FOR: u32 = 68;

    /// First id handed out by dynamic interning
    pub const FIRST_DYNAMIC: u32 = 69;
}

const PREDEFINED_NAMES: [&str; 68] = [
    "PRIMARY",
    "SECONDARY",
    "ARC",
    "ATOM",
    "BITMAP",
    "CARDINAL",
    "COLORMAP",
    "CURSOR",
    "CUT_BUFFER0",
    "CUT_BUFFER1",
    "CUT_BUFFER2",
    "CUT_BUFFER3",
    "CUT_BUFFER4",
    "CUT_BUFFER5",
    "CUT_BUFFER6",
    "CUT_BUFFER7",
    "DRAWABLE",
    "FONT",
    "INTEGER",
    "PIXMAP",
    "POINT",
    "RECTANGLE",
    "RESOURCE_MANAGER",
    "RGB_COLOR_MAP",
    "RGB_BEST_MAP",
    "RGB_BLUE_MAP",
    "RGB_DEFAULT_MAP",
    "RGB_GRAY_MAP",
    "RGB_GREEN_MAP",
    "RGB_RED_MAP",
    "STRING",
    "VISUALID",
    "WINDOW",
    "WM_COMMAND",
    "WM_HINTS",
    "WM_CLIENT_MACHINE",
    "WM_ICON_NAME",
    "WM_ICON_SIZE",
    "WM_NAME",
    "WM_NORMAL_HINTS",
    "WM_SIZE_HINTS",
    "WM_ZOOM_HINTS",
    "MIN_SPACE",
    "NORM_SPACE",
    "MAX_SPACE",
    "END_SPACE",
    "SUPERSCRIPT_X",
    "SUPERSCRIPT_Y",
    "SUBSCRIPT_X",
    "SUBSCRIPT_Y",
    "UNDERLINE_POSITION",
    "UNDERLINE_THICKNESS",
    "STRIKEOUT_ASCENT",
    "STRIKEOUT_DESCENT",
    "ITALIC_ANGLE",
    "X_HEIGHT",
    "QUAD_WIDTH",
    "WEIGHT",
    "POINT_SIZE",
    "RESOLUTION",
    "COPYRIGHT",
    "NOTICE",
    "FONT_NAME",
    "FAMILY_NAME",
    "FULL_NAME",
    "CAP_HEIGHT",
    "WM_CLASS",
    "WM_TRANSIENT_FOR",
];

/// Atom interning table with the predefined set preloaded
#[derive(Debug)]
pub struct AtomTable {
    name_to_id: HashMap<String, Atom>,
    id_to_name: HashMap<Atom, String>,
    next_id: Atom,
}

impl AtomTable {
    pub fn new() -> Self {
        let mut table = AtomTable {
            name_to_id: HashMap::with_capacity(PREDEFINED_NAMES.len() * 2),
            id_to_name: HashMap::with_capacity(PREDEFINED_NAMES.len() * 2),
            next_id: predefined::FIRST_DYNAMIC,
        };
        for (i, name) in PREDEFINED_NAMES.iter().enumerate() {
            let id = (i + 1) as Atom;
            table.name_to_id.insert(name.to_string(), id);
            table.id_to_name.insert(id, name.to_string());
        }
        table
    }

    /// Intern a name, allocating a fresh id unless it already exists.
    /// With `only_if_exists`, returns 0 for unknown names.
    pub fn intern(&mut self, name: &str, only_if_exists: bool) -> Atom {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        if only_if_exists {
            return 0;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.insert(id, name.to_string());
        debug!(atom = id, name, "interned atom");
        id
    }

    /// Look up an id without interning
    pub fn lookup(&self, name: &str) -> Option<Atom> {
        self.name_to_id.get(name).copied()
    }

    /// Name for an id, None when the id was never allocated
    pub fn name(&self, id: Atom) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    pub fn is_valid(&self, id: Atom) -> bool {
        self.id_to_name.contains_key(&id)
    }
}

impl Default for AtomTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_atoms() {
        let table = AtomTable::new();
        assert_eq!(table.lookup("PRIMARY"), Some(predefined::PRIMARY));
        assert_eq!(table.lookup("STRING"), Some(predefined::STRING));
        assert_eq!(table.lookup("WM_TRANSIENT_FOR"), Some(68));
        assert_eq!(table.name(predefined::CARDINAL), Some("CARDINAL"));
    }

    #[test]
    fn test_intern_is_idempotent() {
        let mut table = AtomTable::new();
        let a = table.intern("FOO_BAR", false);
        let b = table.intern("FOO_BAR", false);
        assert_eq!(a, b);
        assert!(a >= predefined::FIRST_DYNAMIC);
        assert_eq!(table.name(a), Some("FOO_BAR"));
    }

    #[test]
    fn test_only_if_exists() {
        let mut table = AtomTable::new();
        assert_eq!(table.intern("NOT_THERE", true), 0);
        assert_eq!(table.intern("PRIMARY", true), predefined::PRIMARY);
    }

    #[test]
    fn test_dynamic_ids_are_sequential() {
        let mut table = AtomTable::new();
        let a = table.intern("A", false);
        let b = table.intern("B", false);
        assert_eq!(a, predefined::FIRST_DYNAMIC);
        assert_eq!(b, a + 1);
    }
}
