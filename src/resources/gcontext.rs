//! Graphics context state
//!
//! The server keeps the 23 GC fields so ChangeGC deltas and CopyGC have
//! something to operate on; the frontend receives every change and owns the
//! actual rasterization state.

use crate::core::ids::{ClientId, GContextId};
use crate::protocol::requests::{GcMask, GcValues};

/// A graphics context with X11 default values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gc {
    pub id: GContextId,
    pub owner: ClientId,
    pub drawable: u32,
    pub function: u8,
    pub plane_mask: u32,
    pub foreground: u32,
    pub background: u32,
    pub line_width: u16,
    pub line_style: u8,
    pub cap_style: u8,
    pub join_style: u8,
    pub fill_style: u8,
    pub fill_rule: u8,
    pub tile: u32,
    pub stipple: u32,
    pub tile_stipple_x: i16,
    pub tile_stipple_y: i16,
    pub font: u32,
    pub subwindow_mode: u8,
    pub graphics_exposures: bool,
    pub clip_x: i16,
    pub clip_y: i16,
    pub clip_mask: u32,
    pub dash_offset: u16,
    pub dashes: u8,
    pub arc_mode: u8,
}

impl Gc {
    pub fn new(id: GContextId, owner: ClientId, drawable: u32) -> Self {
        Self {
            id,
            owner,
            drawable,
            function: 3, // Copy
            plane_mask: !0,
            foreground: 0,
            background: 1,
            line_width: 0,
            line_style: 0,
            cap_style: 1, // Butt
            join_style: 0,
            fill_style: 0,
            fill_rule: 0,
            tile: 0,
            stipple: 0,
            tile_stipple_x: 0,
            tile_stipple_y: 0,
            font: 0,
            subwindow_mode: 0,
            graphics_exposures: true,
            clip_x: 0,
            clip_y: 0,
            clip_mask: 0,
            dash_offset: 0,
            dashes: 4,
            arc_mode: 1, // PieSlice
        }
    }

    /// Apply a ChangeGC / CreateGC value list
    pub fn apply(&mut self, values: &GcValues) {
        if let Some(v) = values.function {
            self.function = v;
        }
        if let Some(v) = values.plane_mask {
            self.plane_mask = v;
        }
        if let Some(v) = values.foreground {
            self.foreground = v;
        }
        if let Some(v) = values.background {
            self.background = v;
        }
        if let Some(v) = values.line_width {
            self.line_width = v;
        }
        if let Some(v) = values.line_style {
            self.line_style = v;
        }
        if let Some(v) = values.cap_style {
            self.cap_style = v;
        }
        if let Some(v) = values.join_style {
            self.join_style = v;
        }
        if let Some(v) = values.fill_style {
            self.fill_style = v;
        }
        if let Some(v) = values.fill_rule {
            self.fill_rule = v;
        }
        if let Some(v) = values.tile {
            self.tile = v;
        }
        if let Some(v) = values.stipple {
            self.stipple = v;
        }
        if let Some(v) = values.tile_stipple_x {
            self.tile_stipple_x = v;
        }
        if let Some(v) = values.tile_stipple_y {
            self.tile_stipple_y = v;
        }
        if let Some(v) = values.font {
            self.font = v;
        }
        if let Some(v) = values.subwindow_mode {
            self.subwindow_mode = v;
        }
        if let Some(v) = values.graphics_exposures {
            self.graphics_exposures = v;
        }
        if let Some(v) = values.clip_x {
            self.clip_x = v;
        }
        if let Some(v) = values.clip_y {
            self.clip_y = v;
        }
        if let Some(v) = values.clip_mask {
            self.clip_mask = v;
        }
        if let Some(v) = values.dash_offset {
            self.dash_offset = v;
        }
        if let Some(v) = values.dashes {
            self.dashes = v;
        }
        if let Some(v) = values.arc_mode {
            self.arc_mode = v;
        }
    }

    /// CopyGC: copy the fields named in `mask` from `src`
    pub fn copy_from(&mut self, src: &Gc, mask: GcMask) {
        if mask.contains(GcMask::FUNCTION) {
            self.function = src.function;
        }
        if mask.contains(GcMask::PLANE_MASK) {
            self.plane_mask = src.plane_mask;
        }
        if mask.contains(GcMask::FOREGROUND) {
            self.foreground = src.foreground;
        }
        if mask.contains(GcMask::BACKGROUND) {
            self.background = src.background;
        }
        if mask.contains(GcMask::LINE_WIDTH) {
            self.line_width = src.line_width;
        }
        if mask.contains(GcMask::LINE_STYLE) {
            self.line_style = src.line_style;
        }
        if mask.contains(GcMask::CAP_STYLE) {
            self.cap_style = src.cap_style;
        }
        if mask.contains(GcMask::JOIN_STYLE) {
            self.join_style = src.join_style;
        }
        if mask.contains(GcMask::FILL_STYLE) {
            self.fill_style = src.fill_style;
        }
        if mask.contains(GcMask::FILL_RULE) {
            self.fill_rule = src.fill_rule;
        }
        if mask.contains(GcMask::TILE) {
            self.tile = src.tile;
        }
        if mask.contains(GcMask::STIPPLE) {
            self.stipple = src.stipple;
        }
        if mask.contains(GcMask::TILE_STIPPLE_X) {
            self.tile_stipple_x = src.tile_stipple_x;
        }
        if mask.contains(GcMask::TILE_STIPPLE_Y) {
            self.tile_stipple_y = src.tile_stipple_y;
        }
        if mask.contains(GcMask::FONT) {
            self.font = src.font;
        }
        if mask.contains(GcMask::SUBWINDOW_MODE) {
            self.subwindow_mode = src.subwindow_mode;
        }
        if mask.contains(GcMask::GRAPHICS_EXPOSURES) {
            self.graphics_exposures = src.graphics_exposures;
        }
        if mask.contains(GcMask::CLIP_X) {
            self.clip_x = src.clip_x;
        }
        if mask.contains(GcMask::CLIP_Y) {
            self.clip_y = src.clip_y;
        }
        if mask.contains(GcMask::CLIP_MASK) {
            self.clip_mask = src.clip_mask;
        }
        if mask.contains(GcMask::DASH_OFFSET) {
            self.dash_offset = src.dash_offset;
        }
        if mask.contains(GcMask::DASHES) {
            self.dashes = src.dashes;
        }
        if mask.contains(GcMask::ARC_MODE) {
            self.arc_mode = src.arc_mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol() {
        let gc = Gc::new(1, 1, 2);
        assert_eq!(gc.function, 3);
        assert_eq!(gc.plane_mask, !0);
        assert_eq!(gc.background, 1);
        assert!(gc.graphics_exposures);
        assert_eq!(gc.dashes, 4);
    }

    #[test]
    fn test_apply_then_copy() {
        let mut a = Gc::new(1, 1, 2);
        a.apply(&GcValues {
            foreground: Some(0xABCDEF),
            line_width: Some(3),
            ..Default::default()
        });
        let mut b = Gc::new(2, 1, 2);
        b.copy_from(&a, GcMask::FOREGROUND);
        assert_eq!(b.foreground, 0xABCDEF);
        // line width not named in the mask stays default
        assert_eq!(b.line_width, 0);
    }
}
