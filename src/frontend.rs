//! Frontend capability
//!
//! The core never touches pixels. Every drawing side effect, resource
//! lifecycle notification, font query, and device control goes through this
//! trait; the host document implements it over its canvases. Clipboard I/O
//! is async because the host clipboard is.
//!
//! Input flows the other way: the frontend constructs [`InputPrimitive`]
//! values and enqueues them onto the server event loop.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::protocol::requests::GcValues;
use crate::protocol::{Arc, Point, Rectangle, Segment};

/// Per-character metrics as reported by QueryFont
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharMetrics {
    pub left_bearing: i16,
    pub right_bearing: i16,
    pub width: i16,
    pub ascent: i16,
    pub descent: i16,
    pub attributes: u16,
}

/// The metrics tuple backing the QueryFont reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontMetrics {
    pub min_bounds: CharMetrics,
    pub max_bounds: CharMetrics,
    pub min_char_or_byte2: u16,
    pub max_char_or_byte2: u16,
    pub default_char: u16,
    pub draw_direction: u8,
    pub min_byte1: u8,
    pub max_byte1: u8,
    pub all_chars_exist: bool,
    pub font_ascent: i16,
    pub font_descent: i16,
}

/// QueryTextExtents result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextExtents {
    pub font_ascent: i16,
    pub font_descent: i16,
    pub overall_ascent: i16,
    pub overall_descent: i16,
    pub overall_width: i32,
    pub overall_left: i32,
    pub overall_right: i32,
}

/// An input primitive captured by the frontend
///
/// Coordinates come in both the originating window's space and root space;
/// `state` is the modifier/button state at capture time. Server time is
/// stamped by the core when the primitive enters the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPrimitive {
    Button {
        window: u32,
        button: u8,
        pressed: bool,
        x: i16,
        y: i16,
        root_x: i16,
        root_y: i16,
        state: u16,
    },
    Motion {
        window: u32,
        x: i16,
        y: i16,
        root_x: i16,
        root_y: i16,
        state: u16,
    },
    Crossing {
        window: u32,
        entered: bool,
        detail: u8,
        mode: u8,
        x: i16,
        y: i16,
        root_x: i16,
        root_y: i16,
        state: u16,
    },
    Key {
        keycode: u8,
        pressed: bool,
        state: u16,
    },
    Focus {
        window: u32,
        focused: bool,
    },
    /// Pointer position update with no event generation
    PointerPosition {
        window: u32,
        root_x: i16,
        root_y: i16,
    },
    /// The host resized the root surface
    RootResize {
        width: u16,
        height: u16,
    },
}

/// The capability set the core invokes for side effects
///
/// Implementations must be cheap to call from the event loop; the core
/// assumes every non-clipboard method returns without suspending.
#[async_trait]
pub trait Frontend: Send + Sync {
    // Window lifecycle
    fn create_window(&self, window: u32, parent: u32, x: i16, y: i16, width: u16, height: u16);
    fn destroy_window(&self, window: u32);
    fn destroy_subwindows(&self, window: u32);
    fn reparent_window(&self, window: u32, parent: u32, x: i16, y: i16);
    fn map_window(&self, window: u32);
    fn unmap_window(&self, window: u32);
    fn configure_window(&self, window: u32, x: i16, y: i16, width: u16, height: u16);
    fn circulate_window(&self, window: u32, raise: bool);
    fn change_window_attributes(&self, window: u32, background_pixel: Option<u32>);
    fn set_window_cursor(&self, window: u32, cursor: u32);

    // Resource lifecycle
    fn create_pixmap(&self, pixmap: u32, width: u16, height: u16, depth: u8);
    fn free_pixmap(&self, pixmap: u32);
    fn create_gc(&self, gc: u32, drawable: u32, values: &GcValues);
    fn change_gc(&self, gc: u32, values: &GcValues);
    fn copy_gc(&self, src: u32, dst: u32);
    fn free_gc(&self, gc: u32);
    fn set_dashes(&self, gc: u32, dash_offset: u16, dashes: &[u8]);
    fn set_clip_rectangles(&self, gc: u32, clip_x: i16, clip_y: i16, rects: &[Rectangle]);
    fn open_font(&self, font: u32, name: &str);
    fn close_font(&self, font: u32);
    fn create_cursor(&self, cursor: u32, source: u32, mask: u32, x: u16, y: u16);
    fn create_cursor_from_glyph(&self, cursor: u32, font: u32, glyph: u16);
    fn free_cursor(&self, cursor: u32);
    fn recolor_cursor(&self, cursor: u32, fore: (u16, u16, u16), back: (u16, u16, u16));

    // Drawing
    #[allow(clippy::too_many_arguments)]
    fn copy_area(
        &self,
        src: u32,
        dst: u32,
        gc: u32,
        src_x: i16,
        src_y: i16,
        dst_x: i16,
        dst_y: i16,
        width: u16,
        height: u16,
    );
    #[allow(clippy::too_many_arguments)]
    fn copy_plane(
        &self,
        src: u32,
        dst: u32,
        gc: u32,
        src_x: i16,
        src_y: i16,
        dst_x: i16,
        dst_y: i16,
        width: u16,
        height: u16,
        bit_plane: u32,
    );
    fn poly_point(&self, drawable: u32, gc: u32, relative: bool, points: &[Point]);
    fn poly_line(&self, drawable: u32, gc: u32, relative: bool, points: &[Point]);
    fn poly_segment(&self, drawable: u32, gc: u32, segments: &[Segment]);
    fn poly_rectangle(&self, drawable: u32, gc: u32, rects: &[Rectangle]);
    fn poly_arc(&self, drawable: u32, gc: u32, arcs: &[Arc]);
    fn fill_poly(&self, drawable: u32, gc: u32, shape: u8, relative: bool, points: &[Point]);
    fn poly_fill_rectangle(&self, drawable: u32, gc: u32, rects: &[Rectangle]);
    fn poly_fill_arc(&self, drawable: u32, gc: u32, arcs: &[Arc]);
    #[allow(clippy::too_many_arguments)]
    fn put_image(
        &self,
        drawable: u32,
        gc: u32,
        width: u16,
        height: u16,
        dst_x: i16,
        dst_y: i16,
        left_pad: u8,
        depth: u8,
        format: u8,
        data: &[u8],
    );
    fn get_image(
        &self,
        drawable: u32,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        format: u8,
    ) -> Vec<u8>;
    fn image_text8(&self, drawable: u32, gc: u32, x: i16, y: i16, text: &[u8]);
    fn image_text16(&self, drawable: u32, gc: u32, x: i16, y: i16, text: &[u16]);
    fn poly_text8(&self, drawable: u32, gc: u32, x: i16, y: i16, items: &[u8]);
    fn poly_text16(&self, drawable: u32, gc: u32, x: i16, y: i16, items: &[u8]);
    fn clear_area(&self, window: u32, x: i16, y: i16, width: u16, height: u16);
    /// Redraw hint issued after every paint request
    fn compose_window(&self, window: u32);

    // Font queries (synchronous)
    fn query_font(&self, font: u32) -> FontMetrics;
    fn query_text_extents(&self, font: u32, text: &[u16]) -> TextExtents;
    fn list_fonts(&self, pattern: &str, max_names: u16) -> Vec<String>;

    // Device and server controls
    fn bell(&self, percent: i8);
    fn change_pointer_control(&self, accel_num: i16, accel_den: i16, threshold: i16);
    fn change_keyboard_control(&self, value_mask: u32, values: &[u32]);
    fn set_screen_saver(&self, timeout: i16, interval: i16);
    fn change_hosts(&self, mode: u8, family: u8, address: &[u8]);
    fn set_access_control(&self, enabled: bool);
    fn set_close_down_mode(&self, client: u8, mode: u8);
    fn kill_client(&self, client: u8);
    fn set_pointer_mapping(&self, map: &[u8]);
    fn get_pointer_mapping(&self) -> Vec<u8>;
    fn set_modifier_mapping(&self, keycodes_per_modifier: u8, keycodes: &[u8]);
    fn get_modifier_mapping(&self) -> Vec<u8>;

    // Color
    fn get_rgb_color(&self, colormap: u32, pixel: u32) -> (u8, u8, u8);
    /// Color-name dictionary lookup, 16-bit channels
    fn lookup_color(&self, name: &str) -> Option<(u16, u16, u16)>;

    // Clipboard (asynchronous; see the selection handshake)
    async fn read_clipboard(&self) -> Option<String>;
    async fn write_clipboard(&self, text: String);
}

/// A frontend that records calls and renders nothing
///
/// Backs the standalone binary and the tests; the recorded call log lets
/// tests assert that a request reached the drawing layer.
#[derive(Debug, Default)]
pub struct HeadlessFrontend {
    calls: Mutex<Vec<String>>,
    clipboard: Mutex<String>,
    pointer_map: Mutex<Vec<u8>>,
    modifier_map: Mutex<Vec<u8>>,
}

impl HeadlessFrontend {
    pub fn with_clipboard(text: &str) -> Self {
        let fe = Self::default();
        *fe.clipboard.lock().unwrap() = text.to_string();
        fe
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    /// Calls recorded so far, oldest first
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Frontend for HeadlessFrontend {
    fn create_window(&self, window: u32, parent: u32, x: i16, y: i16, width: u16, height: u16) {
        self.record(format!(
            "create_window {window:#x} parent={parent:#x} {x},{y} {width}x{height}"
        ));
    }

    fn destroy_window(&self, window: u32) {
        self.record(format!("destroy_window {window:#x}"));
    }

    fn destroy_subwindows(&self, window: u32) {
        self.record(format!("destroy_subwindows {window:#x}"));
    }

    fn reparent_window(&self, window: u32, parent: u32, x: i16, y: i16) {
        self.record(format!("reparent_window {window:#x} -> {parent:#x} {x},{y}"));
    }

    fn map_window(&self, window: u32) {
        self.record(format!("map_window {window:#x}"));
    }

    fn unmap_window(&self, window: u32) {
        self.record(format!("unmap_window {window:#x}"));
    }

    fn configure_window(&self, window: u32, x: i16, y: i16, width: u16, height: u16) {
        self.record(format!("configure_window {window:#x} {x},{y} {width}x{height}"));
    }

    fn circulate_window(&self, window: u32, raise: bool) {
        self.record(format!("circulate_window {window:#x} raise={raise}"));
    }

    fn change_window_attributes(&self, window: u32, background_pixel: Option<u32>) {
        self.record(format!(
            "change_window_attributes {window:#x} bg={background_pixel:?}"
        ));
    }

    fn set_window_cursor(&self, window: u32, cursor: u32) {
        self.record(format!("set_window_cursor {window:#x} {cursor:#x}"));
    }

    fn create_pixmap(&self, pixmap: u32, width: u16, height: u16, depth: u8) {
        self.record(format!("create_pixmap {pixmap:#x} {width}x{height}@{depth}"));
    }

    fn free_pixmap(&self, pixmap: u32) {
        self.record(format!("free_pixmap {pixmap:#x}"));
    }

    fn create_gc(&self, gc: u32, drawable: u32, _values: &GcValues) {
        self.record(format!("create_gc {gc:#x} drawable={drawable:#x}"));
    }

    fn change_gc(&self, gc: u32, _values: &GcValues) {
        self.record(format!("change_gc {gc:#x}"));
    }

    fn copy_gc(&self, src: u32, dst: u32) {
        self.record(format!("copy_gc {src:#x} -> {dst:#x}"));
    }

    fn free_gc(&self, gc: u32) {
        self.record(format!("free_gc {gc:#x}"));
    }

    fn set_dashes(&self, gc: u32, _dash_offset: u16, _dashes: &[u8]) {
        self.record(format!("set_dashes {gc:#x}"));
    }

    fn set_clip_rectangles(&self, gc: u32, _clip_x: i16, _clip_y: i16, rects: &[Rectangle]) {
        self.record(format!("set_clip_rectangles {gc:#x} n={}", rects.len()));
    }

    fn open_font(&self, font: u32, name: &str) {
        self.record(format!("open_font {font:#x} {name}"));
    }

    fn close_font(&self, font: u32) {
        self.record(format!("close_font {font:#x}"));
    }

    fn create_cursor(&self, cursor: u32, source: u32, _mask: u32, _x: u16, _y: u16) {
        self.record(format!("create_cursor {cursor:#x} source={source:#x}"));
    }

    fn create_cursor_from_glyph(&self, cursor: u32, font: u32, glyph: u16) {
        self.record(format!("create_cursor_from_glyph {cursor:#x} {font:#x} {glyph}"));
    }

    fn free_cursor(&self, cursor: u32) {
        self.record(format!("free_cursor {cursor:#x}"));
    }

    fn recolor_cursor(&self, cursor: u32, _fore: (u16, u16, u16), _back: (u16, u16, u16)) {
        self.record(format!("recolor_cursor {cursor:#x}"));
    }

    fn copy_area(
        &self,
        src: u32,
        dst: u32,
        _gc: u32,
        _src_x: i16,
        _src_y: i16,
        _dst_x: i16,
        _dst_y: i16,
        width: u16,
        height: u16,
    ) {
        self.record(format!("copy_area {src:#x} -> {dst:#x} {width}x{height}"));
    }

    fn copy_plane(
        &self,
        src: u32,
        dst: u32,
        _gc: u32,
        _src_x: i16,
        _src_y: i16,
        _dst_x: i16,
        _dst_y: i16,
        _width: u16,
        _height: u16,
        bit_plane: u32,
    ) {
        self.record(format!("copy_plane {src:#x} -> {dst:#x} plane={bit_plane:#x}"));
    }

    fn poly_point(&self, drawable: u32, _gc: u32, _relative: bool, points: &[Point]) {
        self.record(format!("poly_point {drawable:#x} n={}", points.len()));
    }

    fn poly_line(&self, drawable: u32, _gc: u32, _relative: bool, points: &[Point]) {
        self.record(format!("poly_line {drawable:#x} n={}", points.len()));
    }

    fn poly_segment(&self, drawable: u32, _gc: u32, segments: &[Segment]) {
        self.record(format!("poly_segment {drawable:#x} n={}", segments.len()));
    }

    fn poly_rectangle(&self, drawable: u32, _gc: u32, rects: &[Rectangle]) {
        self.record(format!("poly_rectangle {drawable:#x} n={}", rects.len()));
    }

    fn poly_arc(&self, drawable: u32, _gc: u32, arcs: &[Arc]) {
        self.record(format!("poly_arc {drawable:#x} n={}", arcs.len()));
    }

    fn fill_poly(&self, drawable: u32, _gc: u32, _shape: u8, _relative: bool, points: &[Point]) {
        self.record(format!("fill_poly {drawable:#x} n={}", points.len()));
    }

    fn poly_fill_rectangle(&self, drawable: u32, _gc: u32, rects: &[Rectangle]) {
        self.record(format!("poly_fill_rectangle {drawable:#x} n={}", rects.len()));
    }

    fn poly_fill_arc(&self, drawable: u32, _gc: u32, arcs: &[Arc]) {
        self.record(format!("poly_fill_arc {drawable:#x} n={}", arcs.len()));
    }

    fn put_image(
        &self,
        drawable: u32,
        _gc: u32,
        width: u16,
        height: u16,
        _dst_x: i16,
        _dst_y: i16,
        _left_pad: u8,
        _depth: u8,
        _format: u8,
        _data: &[u8],
    ) {
        self.record(format!("put_image {drawable:#x} {width}x{height}"));
    }

    fn get_image(
        &self,
        drawable: u32,
        _x: i16,
        _y: i16,
        width: u16,
        height: u16,
        _format: u8,
    ) -> Vec<u8> {
        self.record(format!("get_image {drawable:#x} {width}x{height}"));
        vec![0; width as usize * height as usize * 4]
    }

    fn image_text8(&self, drawable: u32, _gc: u32, _x: i16, _y: i16, text: &[u8]) {
        self.record(format!("image_text8 {drawable:#x} len={}", text.len()));
    }

    fn image_text16(&self, drawable: u32, _gc: u32, _x: i16, _y: i16, text: &[u16]) {
        self.record(format!("image_text16 {drawable:#x} len={}", text.len()));
    }

    fn poly_text8(&self, drawable: u32, _gc: u32, _x: i16, _y: i16, items: &[u8]) {
        self.record(format!("poly_text8 {drawable:#x} len={}", items.len()));
    }

    fn poly_text16(&self, drawable: u32, _gc: u32, _x: i16, _y: i16, items: &[u8]) {
        self.record(format!("poly_text16 {drawable:#x} len={}", items.len()));
    }

    fn clear_area(&self, window: u32, _x: i16, _y: i16, width: u16, height: u16) {
        self.record(format!("clear_area {window:#x} {width}x{height}"));
    }

    fn compose_window(&self, window: u32) {
        self.record(format!("compose_window {window:#x}"));
    }

    fn query_font(&self, _font: u32) -> FontMetrics {
        // fixed-cell terminal font shape
        FontMetrics {
            min_bounds: CharMetrics {
                width: 8,
                ascent: 12,
                descent: 4,
                ..Default::default()
            },
            max_bounds: CharMetrics {
                width: 8,
                ascent: 12,
                descent: 4,
                ..Default::default()
            },
            min_char_or_byte2: 32,
            max_char_or_byte2: 255,
            default_char: 32,
            draw_direction: 0,
            min_byte1: 0,
            max_byte1: 0,
            all_chars_exist: true,
            font_ascent: 12,
            font_descent: 4,
        }
    }

    fn query_text_extents(&self, _font: u32, text: &[u16]) -> TextExtents {
        TextExtents {
            font_ascent: 12,
            font_descent: 4,
            overall_ascent: 12,
            overall_descent: 4,
            overall_width: text.len() as i32 * 8,
            overall_left: 0,
            overall_right: text.len() as i32 * 8,
        }
    }

    fn list_fonts(&self, _pattern: &str, max_names: u16) -> Vec<String> {
        let names = ["fixed", "cursor"];
        names
            .iter()
            .take(max_names as usize)
            .map(|s| s.to_string())
            .collect()
    }

    fn bell(&self, percent: i8) {
        self.record(format!("bell {percent}"));
    }

    fn change_pointer_control(&self, _accel_num: i16, _accel_den: i16, _threshold: i16) {
        self.record("change_pointer_control");
    }

    fn change_keyboard_control(&self, _value_mask: u32, _values: &[u32]) {
        self.record("change_keyboard_control");
    }

    fn set_screen_saver(&self, _timeout: i16, _interval: i16) {
        self.record("set_screen_saver");
    }

    fn change_hosts(&self, _mode: u8, _family: u8, _address: &[u8]) {
        self.record("change_hosts");
    }

    fn set_access_control(&self, _enabled: bool) {
        self.record("set_access_control");
    }

    fn set_close_down_mode(&self, client: u8, mode: u8) {
        self.record(format!("set_close_down_mode client={client} mode={mode}"));
    }

    fn kill_client(&self, client: u8) {
        self.record(format!("kill_client {client}"));
    }

    fn set_pointer_mapping(&self, map: &[u8]) {
        *self.pointer_map.lock().unwrap() = map.to_vec();
    }

    fn get_pointer_mapping(&self) -> Vec<u8> {
        let map = self.pointer_map.lock().unwrap();
        if map.is_empty() {
            vec![1, 2, 3]
        } else {
            map.clone()
        }
    }

    fn set_modifier_mapping(&self, _keycodes_per_modifier: u8, keycodes: &[u8]) {
        *self.modifier_map.lock().unwrap() = keycodes.to_vec();
    }

    fn get_modifier_mapping(&self) -> Vec<u8> {
        let map = self.modifier_map.lock().unwrap();
        if map.is_empty() {
            vec![0; 16]
        } else {
            map.clone()
        }
    }

    fn get_rgb_color(&self, _colormap: u32, pixel: u32) -> (u8, u8, u8) {
        (
            ((pixel >> 16) & 0xFF) as u8,
            ((pixel >> 8) & 0xFF) as u8,
            (pixel & 0xFF) as u8,
        )
    }

    fn lookup_color(&self, name: &str) -> Option<(u16, u16, u16)> {
        // minimal built-in dictionary; the real table is injected by the host
        match name.to_ascii_lowercase().as_str() {
            "black" => Some((0, 0, 0)),
            "white" => Some((0xFFFF, 0xFFFF, 0xFFFF)),
            "red" => Some((0xFFFF, 0, 0)),
            "green" => Some((0, 0xFFFF, 0)),
            "blue" => Some((0, 0, 0xFFFF)),
            _ => None,
        }
    }

    async fn read_clipboard(&self) -> Option<String> {
        let text = self.clipboard.lock().unwrap().clone();
        if text.is_empty() { None } else { Some(text) }
    }

    async fn write_clipboard(&self, text: String) {
        *self.clipboard.lock().unwrap() = text;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_records_calls() {
        let fe = HeadlessFrontend::default();
        fe.map_window(0x5);
        fe.bell(50);
        let calls = fe.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("map_window"));
    }

    #[test]
    fn test_headless_clipboard() {
        tokio_test::block_on(async {
            let fe = HeadlessFrontend::with_clipboard("hello");
            assert_eq!(fe.read_clipboard().await.as_deref(), Some("hello"));
            fe.write_clipboard("next".into()).await;
            assert_eq!(fe.read_clipboard().await.as_deref(), Some("next"));
        });
    }
}
