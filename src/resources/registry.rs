//! Resource table
//!
//! The typed map from resource id to record. Lookups validate the class and
//! answer with the class-specific error on a miss; inserts validate the
//! client's id range and collision-check the whole id space, since X resource
//! ids share one namespace.

use std::collections::HashMap;

use crate::core::errors::{HandlerResult, X11Error};
use crate::core::ids::{
    ClientId, ColormapId, CursorId, DEFAULT_COLORMAP, FontId, GContextId, PixmapId,
    ROOT_VISUAL, ROOT_WINDOW, WindowId, Xid, id_in_range,
};
use crate::resources::colormap::Colormap;
use crate::resources::gcontext::Gc;
use crate::resources::window::{MapState, Window};
use crate::resources::{Cursor, Font, Pixmap};

/// A drawable resolved to its class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawableInfo {
    Window {
        id: WindowId,
        width: u16,
        height: u16,
        depth: u8,
    },
    Pixmap {
        id: PixmapId,
        width: u16,
        height: u16,
        depth: u8,
    },
}

impl DrawableInfo {
    pub fn depth(&self) -> u8 {
        match self {
            DrawableInfo::Window { depth, .. } | DrawableInfo::Pixmap { depth, .. } => *depth,
        }
    }
}

/// All resources, keyed by id within per-class maps
#[derive(Debug)]
pub struct ResourceTable {
    windows: HashMap<WindowId, Window>,
    pixmaps: HashMap<PixmapId, Pixmap>,
    gcontexts: HashMap<GContextId, Gc>,
    fonts: HashMap<FontId, Font>,
    cursors: HashMap<CursorId, Cursor>,
    colormaps: HashMap<ColormapId, Colormap>,
}

impl ResourceTable {
    /// A fresh table holding the server-owned root window and the default
    /// colormap
    pub fn new(root_width: u16, root_height: u16) -> Self {
        let mut table = Self {
            windows: HashMap::new(),
            pixmaps: HashMap::new(),
            gcontexts: HashMap::new(),
            fonts: HashMap::new(),
            cursors: HashMap::new(),
            colormaps: HashMap::new(),
        };
        let mut root = Window::new(ROOT_WINDOW, 0, 0);
        root.width = root_width;
        root.height = root_height;
        root.mapped = true;
        root.map_state = MapState::Viewable;
        root.attributes.colormap = DEFAULT_COLORMAP;
        table.windows.insert(ROOT_WINDOW, root);
        table
            .colormaps
            .insert(DEFAULT_COLORMAP, Colormap::new(DEFAULT_COLORMAP, 0, ROOT_WINDOW, ROOT_VISUAL));
        table
    }

    /// Does any resource of any class hold this id?
    pub fn id_exists(&self, id: Xid) -> bool {
        self.windows.contains_key(&id)
            || self.pixmaps.contains_key(&id)
            || self.gcontexts.contains_key(&id)
            || self.fonts.contains_key(&id)
            || self.cursors.contains_key(&id)
            || self.colormaps.contains_key(&id)
    }

    /// Validate an id a client wants to assign to a new resource
    pub fn check_new_id(&self, id: Xid, client: ClientId) -> HandlerResult<()> {
        if id == 0 || !id_in_range(id, client) || self.id_exists(id) {
            return Err(X11Error::id_choice(id));
        }
        Ok(())
    }

    // Typed lookups

    pub fn window(&self, id: WindowId) -> HandlerResult<&Window> {
        self.windows.get(&id).ok_or_else(|| X11Error::window(id))
    }

    pub fn window_mut(&mut self, id: WindowId) -> HandlerResult<&mut Window> {
        self.windows.get_mut(&id).ok_or_else(|| X11Error::window(id))
    }

    pub fn has_window(&self, id: WindowId) -> bool {
        self.windows.contains_key(&id)
    }

    pub fn pixmap(&self, id: PixmapId) -> HandlerResult<&Pixmap> {
        self.pixmaps.get(&id).ok_or_else(|| X11Error::pixmap(id))
    }

    pub fn gcontext(&self, id: GContextId) -> HandlerResult<&Gc> {
        self.gcontexts.get(&id).ok_or_else(|| X11Error::gcontext(id))
    }

    pub fn gcontext_mut(&mut self, id: GContextId) -> HandlerResult<&mut Gc> {
        self.gcontexts.get_mut(&id).ok_or_else(|| X11Error::gcontext(id))
    }

    pub fn font(&self, id: FontId) -> HandlerResult<&Font> {
        self.fonts.get(&id).ok_or_else(|| X11Error::font(id))
    }

    pub fn cursor(&self, id: CursorId) -> HandlerResult<&Cursor> {
        self.cursors.get(&id).ok_or_else(|| X11Error::cursor(id))
    }

    pub fn colormap(&self, id: ColormapId) -> HandlerResult<&Colormap> {
        self.colormaps.get(&id).ok_or_else(|| X11Error::colormap(id))
    }

    pub fn colormap_mut(&mut self, id: ColormapId) -> HandlerResult<&mut Colormap> {
        self.colormaps.get_mut(&id).ok_or_else(|| X11Error::colormap(id))
    }

    /// A window or pixmap; anything else is a Drawable error
    pub fn drawable(&self, id: Xid) -> HandlerResult<DrawableInfo> {
        if let Some(win) = self.windows.get(&id) {
            return Ok(DrawableInfo::Window {
                id,
                width: win.width,
                height: win.height,
                depth: win.depth,
            });
        }
        if let Some(pix) = self.pixmaps.get(&id) {
            return Ok(DrawableInfo::Pixmap {
                id,
                width: pix.width,
                height: pix.height,
                depth: pix.depth,
            });
        }
        Err(X11Error::drawable(id))
    }

    // Inserts; callers run check_new_id first

    pub fn insert_window(&mut self, win: Window) {
        self.windows.insert(win.id, win);
    }

    pub fn insert_pixmap(&mut self, pix: Pixmap) {
        self.pixmaps.insert(pix.id, pix);
    }

    pub fn insert_gcontext(&mut self, gc: Gc) {
        self.gcontexts.insert(gc.id, gc);
    }

    pub fn insert_font(&mut self, font: Font) {
        self.fonts.insert(font.id, font);
    }

    pub fn insert_cursor(&mut self, cursor: Cursor) {
        self.cursors.insert(cursor.id, cursor);
    }

    pub fn insert_colormap(&mut self, cmap: Colormap) {
        self.colormaps.insert(cmap.id, cmap);
    }

    // Removals

    pub fn remove_window(&mut self, id: WindowId) -> Option<Window> {
        self.windows.remove(&id)
    }

    pub fn remove_pixmap(&mut self, id: PixmapId) -> Option<Pixmap> {
        self.pixmaps.remove(&id)
    }

    pub fn remove_gcontext(&mut self, id: GContextId) -> Option<Gc> {
        self.gcontexts.remove(&id)
    }

    pub fn remove_font(&mut self, id: FontId) -> Option<Font> {
        self.fonts.remove(&id)
    }

    pub fn remove_cursor(&mut self, id: CursorId) -> Option<Cursor> {
        self.cursors.remove(&id)
    }

    pub fn remove_colormap(&mut self, id: ColormapId) -> Option<Colormap> {
        self.colormaps.remove(&id)
    }

    // Tree operations

    /// Append `child` to `parent`'s child list (top of the stacking order)
    pub fn add_child(&mut self, parent: WindowId, child: WindowId) {
        if let Some(p) = self.windows.get_mut(&parent) {
            p.children.push(child);
        }
    }

    /// Remove `child` from its parent's list
    pub fn unlink_child(&mut self, child: WindowId) {
        let parent = match self.windows.get(&child) {
            Some(w) => w.parent,
            None => return,
        };
        if let Some(p) = self.windows.get_mut(&parent) {
            p.children.retain(|&c| c != child);
        }
    }

    /// `ancestor` is `window` itself or somewhere on its parent chain
    pub fn is_ancestor_or_self(&self, ancestor: WindowId, window: WindowId) -> bool {
        let mut cursor = window;
        loop {
            if cursor == ancestor {
                return true;
            }
            match self.windows.get(&cursor) {
                Some(w) if w.parent != 0 => cursor = w.parent,
                _ => return false,
            }
        }
    }

    /// The chain `window, parent, ..., root`
    pub fn ancestor_chain(&self, window: WindowId) -> Vec<WindowId> {
        let mut chain = Vec::new();
        let mut cursor = window;
        while let Some(w) = self.windows.get(&cursor) {
            chain.push(cursor);
            if w.parent == 0 {
                break;
            }
            cursor = w.parent;
        }
        chain
    }

    /// Descendants of `window` (exclusive), children before parents
    pub fn descendants_post_order(&self, window: WindowId) -> Vec<WindowId> {
        let mut out = Vec::new();
        let children = match self.windows.get(&window) {
            Some(w) => w.children.clone(),
            None => return out,
        };
        for child in children {
            out.extend(self.descendants_post_order(child));
            out.push(child);
        }
        out
    }

    /// Recompute the derived map state for `window` and its subtree
    pub fn refresh_map_state(&mut self, window: WindowId) {
        let parent_viewable = match self.windows.get(&window) {
            Some(w) if w.parent != 0 => self
                .windows
                .get(&w.parent)
                .map(|p| p.map_state == MapState::Viewable)
                .unwrap_or(false),
            Some(_) => true, // root
            None => return,
        };
        let children = {
            let w = self.windows.get_mut(&window).unwrap();
            w.map_state = if !w.mapped {
                MapState::Unmapped
            } else if parent_viewable {
                MapState::Viewable
            } else {
                MapState::Unviewable
            };
            w.children.clone()
        };
        for child in children {
            self.refresh_map_state(child);
        }
    }

    // Ownership queries for client drain

    pub fn windows_owned_by(&self, client: ClientId) -> Vec<WindowId> {
        self.windows
            .values()
            .filter(|w| w.owner == client && w.id != ROOT_WINDOW)
            .map(|w| w.id)
            .collect()
    }

    pub fn pixmaps_owned_by(&self, client: ClientId) -> Vec<PixmapId> {
        self.pixmaps
            .values()
            .filter(|p| p.owner == client)
            .map(|p| p.id)
            .collect()
    }

    pub fn gcontexts_owned_by(&self, client: ClientId) -> Vec<GContextId> {
        self.gcontexts
            .values()
            .filter(|g| g.owner == client)
            .map(|g| g.id)
            .collect()
    }

    pub fn fonts_owned_by(&self, client: ClientId) -> Vec<FontId> {
        self.fonts
            .values()
            .filter(|f| f.owner == client)
            .map(|f| f.id)
            .collect()
    }

    pub fn cursors_owned_by(&self, client: ClientId) -> Vec<CursorId> {
        self.cursors
            .values()
            .filter(|c| c.owner == client)
            .map(|c| c.id)
            .collect()
    }

    pub fn colormaps_owned_by(&self, client: ClientId) -> Vec<ColormapId> {
        self.colormaps
            .values()
            .filter(|c| c.owner == client && c.id != DEFAULT_COLORMAP)
            .map(|c| c.id)
            .collect()
    }

    /// Hand every resource owned by `from` to `to` (retain-permanent)
    pub fn transfer_ownership(&mut self, from: ClientId, to: ClientId) {
        for w in self.windows.values_mut() {
            if w.owner == from {
                w.owner = to;
            }
        }
        for p in self.pixmaps.values_mut() {
            if p.owner == from {
                p.owner = to;
            }
        }
        for g in self.gcontexts.values_mut() {
            if g.owner == from {
                g.owner = to;
            }
        }
        for f in self.fonts.values_mut() {
            if f.owner == from {
                f.owner = to;
            }
        }
        for c in self.cursors.values_mut() {
            if c.owner == from {
                c.owner = to;
            }
        }
        for c in self.colormaps.values_mut() {
            if c.owner == from {
                c.owner = to;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::id_base;

    fn table() -> ResourceTable {
        ResourceTable::new(1024, 768)
    }

    #[test]
    fn test_root_and_default_colormap_exist() {
        let t = table();
        assert!(t.window(ROOT_WINDOW).is_ok());
        assert!(t.colormap(DEFAULT_COLORMAP).is_ok());
        assert_eq!(t.window(ROOT_WINDOW).unwrap().map_state, MapState::Viewable);
    }

    #[test]
    fn test_lookup_miss_uses_class_error() {
        let t = table();
        let err = t.window(0x0020_0005).unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Window);
        let err = t.gcontext(0x0020_0005).unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::GContext);
    }

    #[test]
    fn test_check_new_id() {
        let mut t = table();
        let id = id_base(1) | 1;
        assert!(t.check_new_id(id, 1).is_ok());
        // out of range for client 2
        assert!(t.check_new_id(id, 2).is_err());
        t.insert_window(Window::new(id, 1, ROOT_WINDOW));
        // collision
        let err = t.check_new_id(id, 1).unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::IDChoice);
    }

    #[test]
    fn test_id_namespace_is_shared_across_classes() {
        let mut t = table();
        let id = id_base(1) | 7;
        t.insert_pixmap(Pixmap {
            id,
            owner: 1,
            width: 4,
            height: 4,
            depth: 24,
        });
        assert!(t.check_new_id(id, 1).is_err());
        // window lookup of a pixmap id is a Window error
        assert_eq!(
            t.window(id).unwrap_err().code,
            crate::core::errors::ErrorCode::Window
        );
        // but drawable lookup succeeds
        assert!(matches!(
            t.drawable(id).unwrap(),
            DrawableInfo::Pixmap { .. }
        ));
    }

    #[test]
    fn test_tree_links_and_post_order() {
        let mut t = table();
        let a = id_base(1) | 1;
        let b = id_base(1) | 2;
        let c = id_base(1) | 3;
        t.insert_window(Window::new(a, 1, ROOT_WINDOW));
        t.add_child(ROOT_WINDOW, a);
        t.insert_window(Window::new(b, 1, a));
        t.add_child(a, b);
        t.insert_window(Window::new(c, 1, b));
        t.add_child(b, c);

        assert!(t.is_ancestor_or_self(ROOT_WINDOW, c));
        assert!(t.is_ancestor_or_self(a, c));
        assert!(!t.is_ancestor_or_self(c, a));
        assert_eq!(t.ancestor_chain(c), vec![c, b, a, ROOT_WINDOW]);
        assert_eq!(t.descendants_post_order(a), vec![c, b]);
    }

    #[test]
    fn test_map_state_propagates() {
        let mut t = table();
        let a = id_base(1) | 1;
        let b = id_base(1) | 2;
        t.insert_window(Window::new(a, 1, ROOT_WINDOW));
        t.add_child(ROOT_WINDOW, a);
        t.insert_window(Window::new(b, 1, a));
        t.add_child(a, b);

        t.window_mut(b).unwrap().mapped = true;
        t.refresh_map_state(a);
        // parent unmapped: child is unviewable, not viewable
        assert_eq!(t.window(b).unwrap().map_state, MapState::Unviewable);

        t.window_mut(a).unwrap().mapped = true;
        t.refresh_map_state(a);
        assert_eq!(t.window(a).unwrap().map_state, MapState::Viewable);
        assert_eq!(t.window(b).unwrap().map_state, MapState::Viewable);
    }
}
