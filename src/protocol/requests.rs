//! Request decoding
//!
//! Each request is a tagged variant with a typed payload. The dispatcher
//! pattern-matches on the tag; handlers never touch raw bytes. Decoding
//! failures surface as `Length` or `Value` errors on the offending request
//! without killing the connection.

use bitflags::bitflags;

use crate::core::errors::{HandlerResult, X11Error};
use crate::extensions::xinput::XiRequest;
use crate::protocol::opcodes as op;
use crate::protocol::wire::WireReader;
use crate::protocol::{Arc, Point, Rectangle, Segment};

bitflags! {
    /// CreateWindow / ChangeWindowAttributes value mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WindowAttrMask: u32 {
        const BACKGROUND_PIXMAP = 1 << 0;
        const BACKGROUND_PIXEL = 1 << 1;
        const BORDER_PIXMAP = 1 << 2;
        const BORDER_PIXEL = 1 << 3;
        const BIT_GRAVITY = 1 << 4;
        const WIN_GRAVITY = 1 << 5;
        const BACKING_STORE = 1 << 6;
        const BACKING_PLANES = 1 << 7;
        const BACKING_PIXEL = 1 << 8;
        const OVERRIDE_REDIRECT = 1 << 9;
        const SAVE_UNDER = 1 << 10;
        const EVENT_MASK = 1 << 11;
        const DO_NOT_PROPAGATE = 1 << 12;
        const COLORMAP = 1 << 13;
        const CURSOR = 1 << 14;
    }
}

bitflags! {
    /// CreateGC / ChangeGC / CopyGC value mask, in field order
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GcMask: u32 {
        const FUNCTION = 1 << 0;
        const PLANE_MASK = 1 << 1;
        const FOREGROUND = 1 << 2;
        const BACKGROUND = 1 << 3;
        const LINE_WIDTH = 1 << 4;
        const LINE_STYLE = 1 << 5;
        const CAP_STYLE = 1 << 6;
        const JOIN_STYLE = 1 << 7;
        const FILL_STYLE = 1 << 8;
        const FILL_RULE = 1 << 9;
        const TILE = 1 << 10;
        const STIPPLE = 1 << 11;
        const TILE_STIPPLE_X = 1 << 12;
        const TILE_STIPPLE_Y = 1 << 13;
        const FONT = 1 << 14;
        const SUBWINDOW_MODE = 1 << 15;
        const GRAPHICS_EXPOSURES = 1 << 16;
        const CLIP_X = 1 << 17;
        const CLIP_Y = 1 << 18;
        const CLIP_MASK = 1 << 19;
        const DASH_OFFSET = 1 << 20;
        const DASHES = 1 << 21;
        const ARC_MODE = 1 << 22;
    }
}

bitflags! {
    /// ConfigureWindow value mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConfigMask: u16 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const WIDTH = 1 << 2;
        const HEIGHT = 1 << 3;
        const BORDER_WIDTH = 1 << 4;
        const SIBLING = 1 << 5;
        const STACK_MODE = 1 << 6;
    }
}

/// Window attributes present in a value list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowAttrValues {
    pub background_pixmap: Option<u32>,
    pub background_pixel: Option<u32>,
    pub border_pixmap: Option<u32>,
    pub border_pixel: Option<u32>,
    pub bit_gravity: Option<u8>,
    pub win_gravity: Option<u8>,
    pub backing_store: Option<u8>,
    pub backing_planes: Option<u32>,
    pub backing_pixel: Option<u32>,
    pub override_redirect: Option<bool>,
    pub save_under: Option<bool>,
    pub event_mask: Option<u32>,
    pub do_not_propagate_mask: Option<u32>,
    pub colormap: Option<u32>,
    pub cursor: Option<u32>,
}

impl WindowAttrValues {
    pub fn decode(mask_bits: u32, r: &mut WireReader) -> HandlerResult<Self> {
        let mask =
            WindowAttrMask::from_bits(mask_bits).ok_or_else(|| X11Error::value(mask_bits))?;
        let mut v = WindowAttrValues::default();
        if mask.contains(WindowAttrMask::BACKGROUND_PIXMAP) {
            v.background_pixmap = Some(r.u32()?);
        }
        if mask.contains(WindowAttrMask::BACKGROUND_PIXEL) {
            v.background_pixel = Some(r.u32()?);
        }
        if mask.contains(WindowAttrMask::BORDER_PIXMAP) {
            v.border_pixmap = Some(r.u32()?);
        }
        if mask.contains(WindowAttrMask::BORDER_PIXEL) {
            v.border_pixel = Some(r.u32()?);
        }
        if mask.contains(WindowAttrMask::BIT_GRAVITY) {
            v.bit_gravity = Some(r.u32()? as u8);
        }
        if mask.contains(WindowAttrMask::WIN_GRAVITY) {
            v.win_gravity = Some(r.u32()? as u8);
        }
        if mask.contains(WindowAttrMask::BACKING_STORE) {
            v.backing_store = Some(r.u32()? as u8);
        }
        if mask.contains(WindowAttrMask::BACKING_PLANES) {
            v.backing_planes = Some(r.u32()?);
        }
        if mask.contains(WindowAttrMask::BACKING_PIXEL) {
            v.backing_pixel = Some(r.u32()?);
        }
        if mask.contains(WindowAttrMask::OVERRIDE_REDIRECT) {
            v.override_redirect = Some(r.u32()? != 0);
        }
        if mask.contains(WindowAttrMask::SAVE_UNDER) {
            v.save_under = Some(r.u32()? != 0);
        }
        if mask.contains(WindowAttrMask::EVENT_MASK) {
            v.event_mask = Some(r.u32()?);
        }
        if mask.contains(WindowAttrMask::DO_NOT_PROPAGATE) {
            v.do_not_propagate_mask = Some(r.u32()?);
        }
        if mask.contains(WindowAttrMask::COLORMAP) {
            v.colormap = Some(r.u32()?);
        }
        if mask.contains(WindowAttrMask::CURSOR) {
            v.cursor = Some(r.u32()?);
        }
        Ok(v)
    }
}

/// GC attributes present in a value list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcValues {
    pub function: Option<u8>,
    pub plane_mask: Option<u32>,
    pub foreground: Option<u32>,
    pub background: Option<u32>,
    pub line_width: Option<u16>,
    pub line_style: Option<u8>,
    pub cap_style: Option<u8>,
    pub join_style: Option<u8>,
    pub fill_style: Option<u8>,
    pub fill_rule: Option<u8>,
    pub tile: Option<u32>,
    pub stipple: Option<u32>,
    pub tile_stipple_x: Option<i16>,
    pub tile_stipple_y: Option<i16>,
    pub font: Option<u32>,
    pub subwindow_mode: Option<u8>,
    pub graphics_exposures: Option<bool>,
    pub clip_x: Option<i16>,
    pub clip_y: Option<i16>,
    pub clip_mask: Option<u32>,
    pub dash_offset: Option<u16>,
    pub dashes: Option<u8>,
    pub arc_mode: Option<u8>,
}

impl GcValues {
    pub fn decode(mask_bits: u32, r: &mut WireReader) -> HandlerResult<Self> {
        let mask = GcMask::from_bits(mask_bits).ok_or_else(|| X11Error::value(mask_bits))?;
        let mut v = GcValues::default();
        if mask.contains(GcMask::FUNCTION) {
            v.function = Some(r.u32()? as u8);
        }
        if mask.contains(GcMask::PLANE_MASK) {
            v.plane_mask = Some(r.u32()?);
        }
        if mask.contains(GcMask::FOREGROUND) {
            v.foreground = Some(r.u32()?);
        }
        if mask.contains(GcMask::BACKGROUND) {
            v.background = Some(r.u32()?);
        }
        if mask.contains(GcMask::LINE_WIDTH) {
            v.line_width = Some(r.u32()? as u16);
        }
        if mask.contains(GcMask::LINE_STYLE) {
            v.line_style = Some(r.u32()? as u8);
        }
        if mask.contains(GcMask::CAP_STYLE) {
            v.cap_style = Some(r.u32()? as u8);
        }
        if mask.contains(GcMask::JOIN_STYLE) {
            v.join_style = Some(r.u32()? as u8);
        }
        if mask.contains(GcMask::FILL_STYLE) {
            v.fill_style = Some(r.u32()? as u8);
        }
        if mask.contains(GcMask::FILL_RULE) {
            v.fill_rule = Some(r.u32()? as u8);
        }
        if mask.contains(GcMask::TILE) {
            v.tile = Some(r.u32()?);
        }
        if mask.contains(GcMask::STIPPLE) {
            v.stipple = Some(r.u32()?);
        }
        if mask.contains(GcMask::TILE_STIPPLE_X) {
            v.tile_stipple_x = Some(r.u32()? as i16);
        }
        if mask.contains(GcMask::TILE_STIPPLE_Y) {
            v.tile_stipple_y = Some(r.u32()? as i16);
        }
        if mask.contains(GcMask::FONT) {
            v.font = Some(r.u32()?);
        }
        if mask.contains(GcMask::SUBWINDOW_MODE) {
            v.subwindow_mode = Some(r.u32()? as u8);
        }
        if mask.contains(GcMask::GRAPHICS_EXPOSURES) {
            v.graphics_exposures = Some(r.u32()? != 0);
        }
        if mask.contains(GcMask::CLIP_X) {
            v.clip_x = Some(r.u32()? as i16);
        }
        if mask.contains(GcMask::CLIP_Y) {
            v.clip_y = Some(r.u32()? as i16);
        }
        if mask.contains(GcMask::CLIP_MASK) {
            v.clip_mask = Some(r.u32()?);
        }
        if mask.contains(GcMask::DASH_OFFSET) {
            v.dash_offset = Some(r.u32()? as u16);
        }
        if mask.contains(GcMask::DASHES) {
            v.dashes = Some(r.u32()? as u8);
        }
        if mask.contains(GcMask::ARC_MODE) {
            v.arc_mode = Some(r.u32()? as u8);
        }
        Ok(v)
    }
}

/// ConfigureWindow values present in a value list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigValues {
    pub x: Option<i16>,
    pub y: Option<i16>,
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub border_width: Option<u16>,
    pub sibling: Option<u32>,
    pub stack_mode: Option<u8>,
}

impl ConfigValues {
    pub fn decode(mask_bits: u16, r: &mut WireReader) -> HandlerResult<Self> {
        let mask = ConfigMask::from_bits(mask_bits)
            .ok_or_else(|| X11Error::value(mask_bits as u32))?;
        let mut v = ConfigValues::default();
        if mask.contains(ConfigMask::X) {
            v.x = Some(r.u32()? as i16);
        }
        if mask.contains(ConfigMask::Y) {
            v.y = Some(r.u32()? as i16);
        }
        if mask.contains(ConfigMask::WIDTH) {
            v.width = Some(r.u32()? as u16);
        }
        if mask.contains(ConfigMask::HEIGHT) {
            v.height = Some(r.u32()? as u16);
        }
        if mask.contains(ConfigMask::BORDER_WIDTH) {
            v.border_width = Some(r.u32()? as u16);
        }
        if mask.contains(ConfigMask::SIBLING) {
            v.sibling = Some(r.u32()?);
        }
        if mask.contains(ConfigMask::STACK_MODE) {
            v.stack_mode = Some(r.u32()? as u8);
        }
        Ok(v)
    }
}

/// A StoreColors item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorItem {
    pub pixel: u32,
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub do_mask: u8,
}

/// All requests the server executes
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    CreateWindow {
        depth: u8,
        wid: u32,
        parent: u32,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        border_width: u16,
        class: u16,
        visual: u32,
        values: WindowAttrValues,
    },
    ChangeWindowAttributes {
        window: u32,
        values: WindowAttrValues,
    },
    GetWindowAttributes {
        window: u32,
    },
    DestroyWindow {
        window: u32,
    },
    DestroySubwindows {
        window: u32,
    },
    ChangeSaveSet {
        mode: u8,
        window: u32,
    },
    ReparentWindow {
        window: u32,
        parent: u32,
        x: i16,
        y: i16,
    },
    MapWindow {
        window: u32,
    },
    MapSubwindows {
        window: u32,
    },
    UnmapWindow {
        window: u32,
    },
    UnmapSubwindows {
        window: u32,
    },
    ConfigureWindow {
        window: u32,
        values: ConfigValues,
    },
    CirculateWindow {
        direction: u8,
        window: u32,
    },
    GetGeometry {
        drawable: u32,
    },
    QueryTree {
        window: u32,
    },
    InternAtom {
        only_if_exists: bool,
        name: String,
    },
    GetAtomName {
        atom: u32,
    },
    ChangeProperty {
        mode: u8,
        window: u32,
        property: u32,
        property_type: u32,
        format: u8,
        data: Vec<u8>,
    },
    DeleteProperty {
        window: u32,
        property: u32,
    },
    GetProperty {
        delete: bool,
        window: u32,
        property: u32,
        property_type: u32,
        long_offset: u32,
        long_length: u32,
    },
    ListProperties {
        window: u32,
    },
    SetSelectionOwner {
        owner: u32,
        selection: u32,
        time: u32,
    },
    GetSelectionOwner {
        selection: u32,
    },
    ConvertSelection {
        requestor: u32,
        selection: u32,
        target: u32,
        property: u32,
        time: u32,
    },
    SendEvent {
        propagate: bool,
        destination: u32,
        event_mask: u32,
        event: [u8; 32],
    },
    GrabPointer {
        owner_events: bool,
        grab_window: u32,
        event_mask: u16,
        pointer_mode: u8,
        keyboard_mode: u8,
        confine_to: u32,
        cursor: u32,
        time: u32,
    },
    UngrabPointer {
        time: u32,
    },
    GrabButton {
        owner_events: bool,
        grab_window: u32,
        event_mask: u16,
        pointer_mode: u8,
        keyboard_mode: u8,
        confine_to: u32,
        cursor: u32,
        button: u8,
        modifiers: u16,
    },
    UngrabButton {
        button: u8,
        grab_window: u32,
        modifiers: u16,
    },
    ChangeActivePointerGrab {
        cursor: u32,
        time: u32,
        event_mask: u16,
    },
    GrabKeyboard {
        owner_events: bool,
        grab_window: u32,
        time: u32,
        pointer_mode: u8,
        keyboard_mode: u8,
    },
    UngrabKeyboard {
        time: u32,
    },
    GrabKey {
        owner_events: bool,
        grab_window: u32,
        modifiers: u16,
        key: u8,
        pointer_mode: u8,
        keyboard_mode: u8,
    },
    UngrabKey {
        key: u8,
        grab_window: u32,
        modifiers: u16,
    },
    AllowEvents {
        mode: u8,
        time: u32,
    },
    GrabServer,
    UngrabServer,
    QueryPointer {
        window: u32,
    },
    GetMotionEvents {
        window: u32,
        start: u32,
        stop: u32,
    },
    TranslateCoordinates {
        src_window: u32,
        dst_window: u32,
        src_x: i16,
        src_y: i16,
    },
    WarpPointer {
        src_window: u32,
        dst_window: u32,
        src_x: i16,
        src_y: i16,
        src_width: u16,
        src_height: u16,
        dst_x: i16,
        dst_y: i16,
    },
    SetInputFocus {
        revert_to: u8,
        focus: u32,
        time: u32,
    },
    GetInputFocus,
    QueryKeymap,
    OpenFont {
        fid: u32,
        name: String,
    },
    CloseFont {
        font: u32,
    },
    QueryFont {
        font: u32,
    },
    QueryTextExtents {
        font: u32,
        text: Vec<u16>,
    },
    ListFonts {
        max_names: u16,
        pattern: String,
    },
    ListFontsWithInfo {
        max_names: u16,
        pattern: String,
    },
    SetFontPath {
        paths: Vec<String>,
    },
    GetFontPath,
    CreatePixmap {
        depth: u8,
        pid: u32,
        drawable: u32,
        width: u16,
        height: u16,
    },
    FreePixmap {
        pixmap: u32,
    },
    CreateGC {
        cid: u32,
        drawable: u32,
        values: GcValues,
    },
    ChangeGC {
        gc: u32,
        values: GcValues,
    },
    CopyGC {
        src_gc: u32,
        dst_gc: u32,
        mask: u32,
    },
    SetDashes {
        gc: u32,
        dash_offset: u16,
        dashes: Vec<u8>,
    },
    SetClipRectangles {
        ordering: u8,
        gc: u32,
        clip_x: i16,
        clip_y: i16,
        rectangles: Vec<Rectangle>,
    },
    FreeGC {
        gc: u32,
    },
    ClearArea {
        exposures: bool,
        window: u32,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
    },
    CopyArea {
        src_drawable: u32,
        dst_drawable: u32,
        gc: u32,
        src_x: i16,
        src_y: i16,
        dst_x: i16,
        dst_y: i16,
        width: u16,
        height: u16,
    },
    CopyPlane {
        src_drawable: u32,
        dst_drawable: u32,
        gc: u32,
        src_x: i16,
        src_y: i16,
        dst_x: i16,
        dst_y: i16,
        width: u16,
        height: u16,
        bit_plane: u32,
    },
    PolyPoint {
        coordinate_mode: u8,
        drawable: u32,
        gc: u32,
        points: Vec<Point>,
    },
    PolyLine {
        coordinate_mode: u8,
        drawable: u32,
        gc: u32,
        points: Vec<Point>,
    },
    PolySegment {
        drawable: u32,
        gc: u32,
        segments: Vec<Segment>,
    },
    PolyRectangle {
        drawable: u32,
        gc: u32,
        rectangles: Vec<Rectangle>,
    },
    PolyArc {
        drawable: u32,
        gc: u32,
        arcs: Vec<Arc>,
    },
    FillPoly {
        drawable: u32,
        gc: u32,
        shape: u8,
        coordinate_mode: u8,
        points: Vec<Point>,
    },
    PolyFillRectangle {
        drawable: u32,
        gc: u32,
        rectangles: Vec<Rectangle>,
    },
    PolyFillArc {
        drawable: u32,
        gc: u32,
        arcs: Vec<Arc>,
    },
    PutImage {
        format: u8,
        drawable: u32,
        gc: u32,
        width: u16,
        height: u16,
        dst_x: i16,
        dst_y: i16,
        left_pad: u8,
        depth: u8,
        data: Vec<u8>,
    },
    GetImage {
        format: u8,
        drawable: u32,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        plane_mask: u32,
    },
    PolyText8 {
        drawable: u32,
        gc: u32,
        x: i16,
        y: i16,
        items: Vec<u8>,
    },
    PolyText16 {
        drawable: u32,
        gc: u32,
        x: i16,
        y: i16,
        items: Vec<u8>,
    },
    ImageText8 {
        drawable: u32,
        gc: u32,
        x: i16,
        y: i16,
        text: Vec<u8>,
    },
    ImageText16 {
        drawable: u32,
        gc: u32,
        x: i16,
        y: i16,
        text: Vec<u16>,
    },
    CreateColormap {
        alloc: u8,
        mid: u32,
        window: u32,
        visual: u32,
    },
    FreeColormap {
        cmap: u32,
    },
    CopyColormapAndFree {
        mid: u32,
        src_cmap: u32,
    },
    InstallColormap {
        cmap: u32,
    },
    UninstallColormap {
        cmap: u32,
    },
    ListInstalledColormaps {
        window: u32,
    },
    AllocColor {
        cmap: u32,
        red: u16,
        green: u16,
        blue: u16,
    },
    AllocNamedColor {
        cmap: u32,
        name: String,
    },
    AllocColorCells {
        contiguous: bool,
        cmap: u32,
        colors: u16,
        planes: u16,
    },
    AllocColorPlanes {
        contiguous: bool,
        cmap: u32,
        colors: u16,
        reds: u16,
        greens: u16,
        blues: u16,
    },
    FreeColors {
        cmap: u32,
        plane_mask: u32,
        pixels: Vec<u32>,
    },
    StoreColors {
        cmap: u32,
        items: Vec<ColorItem>,
    },
    StoreNamedColor {
        do_rgb: u8,
        cmap: u32,
        pixel: u32,
        name: String,
    },
    QueryColors {
        cmap: u32,
        pixels: Vec<u32>,
    },
    LookupColor {
        cmap: u32,
        name: String,
    },
    CreateCursor {
        cid: u32,
        source: u32,
        mask: u32,
        fore_red: u16,
        fore_green: u16,
        fore_blue: u16,
        back_red: u16,
        back_green: u16,
        back_blue: u16,
        x: u16,
        y: u16,
    },
    CreateGlyphCursor {
        cid: u32,
        source_font: u32,
        mask_font: u32,
        source_char: u16,
        mask_char: u16,
        fore_red: u16,
        fore_green: u16,
        fore_blue: u16,
        back_red: u16,
        back_green: u16,
        back_blue: u16,
    },
    FreeCursor {
        cursor: u32,
    },
    RecolorCursor {
        cursor: u32,
        fore_red: u16,
        fore_green: u16,
        fore_blue: u16,
        back_red: u16,
        back_green: u16,
        back_blue: u16,
    },
    QueryBestSize {
        class: u8,
        drawable: u32,
        width: u16,
        height: u16,
    },
    QueryExtension {
        name: String,
    },
    ListExtensions,
    ChangeKeyboardMapping {
        keycode_count: u8,
        first_keycode: u8,
        keysyms_per_keycode: u8,
        keysyms: Vec<u32>,
    },
    GetKeyboardMapping {
        first_keycode: u8,
        count: u8,
    },
    ChangeKeyboardControl {
        value_mask: u32,
        values: Vec<u32>,
    },
    GetKeyboardControl,
    Bell {
        percent: i8,
    },
    ChangePointerControl {
        accel_numerator: i16,
        accel_denominator: i16,
        threshold: i16,
        do_accel: bool,
        do_threshold: bool,
    },
    GetPointerControl,
    SetScreenSaver {
        timeout: i16,
        interval: i16,
        prefer_blanking: u8,
        allow_exposures: u8,
    },
    GetScreenSaver,
    ChangeHosts {
        mode: u8,
        family: u8,
        address: Vec<u8>,
    },
    ListHosts,
    SetAccessControl {
        mode: u8,
    },
    SetCloseDownMode {
        mode: u8,
    },
    KillClient {
        resource: u32,
    },
    RotateProperties {
        window: u32,
        delta: i16,
        properties: Vec<u32>,
    },
    ForceScreenSaver {
        mode: u8,
    },
    SetPointerMapping {
        map: Vec<u8>,
    },
    GetPointerMapping,
    SetModifierMapping {
        keycodes_per_modifier: u8,
        keycodes: Vec<u8>,
    },
    GetModifierMapping,
    NoOperation,
    /// BIG-REQUESTS Enable
    BigReqEnable,
    /// Any XInputExtension request, dispatched by minor opcode
    Xi(XiRequest),
}

impl Request {
    /// Decode one request from its header byte and reassembled body
    pub fn decode(
        major: u8,
        data: u8,
        body: &[u8],
        order: crate::protocol::wire::WireOrder,
    ) -> HandlerResult<Request> {
        let mut r = WireReader::new(body, order);
        let req = match major {
            op::CREATE_WINDOW => {
                let wid = r.u32()?;
                let parent = r.u32()?;
                let x = r.i16()?;
                let y = r.i16()?;
                let width = r.u16()?;
                let height = r.u16()?;
                let border_width = r.u16()?;
                let class = r.u16()?;
                let visual = r.u32()?;
                let mask = r.u32()?;
                Request::CreateWindow {
                    depth: data,
                    wid,
                    parent,
                    x,
                    y,
                    width,
                    height,
                    border_width,
                    class,
                    visual,
                    values: WindowAttrValues::decode(mask, &mut r)?,
                }
            }
            op::CHANGE_WINDOW_ATTRIBUTES => {
                let window = r.u32()?;
                let mask = r.u32()?;
                Request::ChangeWindowAttributes {
                    window,
                    values: WindowAttrValues::decode(mask, &mut r)?,
                }
            }
            op::GET_WINDOW_ATTRIBUTES => Request::GetWindowAttributes { window: r.u32()? },
            op::DESTROY_WINDOW => Request::DestroyWindow { window: r.u32()? },
            op::DESTROY_SUBWINDOWS => Request::DestroySubwindows { window: r.u32()? },
            op::CHANGE_SAVE_SET => Request::ChangeSaveSet {
                mode: data,
                window: r.u32()?,
            },
            op::REPARENT_WINDOW => Request::ReparentWindow {
                window: r.u32()?,
                parent: r.u32()?,
                x: r.i16()?,
                y: r.i16()?,
            },
            op::MAP_WINDOW => Request::MapWindow { window: r.u32()? },
            op::MAP_SUBWINDOWS => Request::MapSubwindows { window: r.u32()? },
            op::UNMAP_WINDOW => Request::UnmapWindow { window: r.u32()? },
            op::UNMAP_SUBWINDOWS => Request::UnmapSubwindows { window: r.u32()? },
            op::CONFIGURE_WINDOW => {
                let window = r.u32()?;
                let mask = r.u16()?;
                r.skip(2)?;
                Request::ConfigureWindow {
                    window,
                    values: ConfigValues::decode(mask, &mut r)?,
                }
            }
            op::CIRCULATE_WINDOW => Request::CirculateWindow {
                direction: data,
                window: r.u32()?,
            },
            op::GET_GEOMETRY => Request::GetGeometry { drawable: r.u32()? },
            op::QUERY_TREE => Request::QueryTree { window: r.u32()? },
            op::INTERN_ATOM => {
                let len = r.u16()? as usize;
                r.skip(2)?;
                Request::InternAtom {
                    only_if_exists: data != 0,
                    name: r.string8(len)?,
                }
            }
            op::GET_ATOM_NAME => Request::GetAtomName { atom: r.u32()? },
            op::CHANGE_PROPERTY => {
                let window = r.u32()?;
                let property = r.u32()?;
                let property_type = r.u32()?;
                let format = r.u8()?;
                r.skip(3)?;
                let units = r.u32()? as usize;
                let nbytes = match format {
                    8 => units,
                    16 => units * 2,
                    32 => units * 4,
                    _ => return Err(X11Error::value(format as u32)),
                };
                Request::ChangeProperty {
                    mode: data,
                    window,
                    property,
                    property_type,
                    format,
                    data: r.bytes(nbytes)?.to_vec(),
                }
            }
            op::DELETE_PROPERTY => Request::DeleteProperty {
                window: r.u32()?,
                property: r.u32()?,
            },
            op::GET_PROPERTY => Request::GetProperty {
                delete: data != 0,
                window: r.u32()?,
                property: r.u32()?,
                property_type: r.u32()?,
                long_offset: r.u32()?,
                long_length: r.u32()?,
            },
            op::LIST_PROPERTIES => Request::ListProperties { window: r.u32()? },
            op::SET_SELECTION_OWNER => Request::SetSelectionOwner {
                owner: r.u32()?,
                selection: r.u32()?,
                time: r.u32()?,
            },
            op::GET_SELECTION_OWNER => Request::GetSelectionOwner { selection: r.u32()? },
            op::CONVERT_SELECTION => Request::ConvertSelection {
                requestor: r.u32()?,
                selection: r.u32()?,
                target: r.u32()?,
                property: r.u32()?,
                time: r.u32()?,
            },
            op::SEND_EVENT => {
                let destination = r.u32()?;
                let event_mask = r.u32()?;
                let raw = r.bytes(32)?;
                let mut event = [0u8; 32];
                event.copy_from_slice(raw);
                Request::SendEvent {
                    propagate: data != 0,
                    destination,
                    event_mask,
                    event,
                }
            }
            op::GRAB_POINTER => Request::GrabPointer {
                owner_events: data != 0,
                grab_window: r.u32()?,
                event_mask: r.u16()?,
                pointer_mode: r.u8()?,
                keyboard_mode: r.u8()?,
                confine_to: r.u32()?,
                cursor: r.u32()?,
                time: r.u32()?,
            },
            op::UNGRAB_POINTER => Request::UngrabPointer { time: r.u32()? },
            op::GRAB_BUTTON => {
                let grab_window = r.u32()?;
                let event_mask = r.u16()?;
                let pointer_mode = r.u8()?;
                let keyboard_mode = r.u8()?;
                let confine_to = r.u32()?;
                let cursor = r.u32()?;
                let button = r.u8()?;
                r.skip(1)?;
                let modifiers = r.u16()?;
                Request::GrabButton {
                    owner_events: data != 0,
                    grab_window,
                    event_mask,
                    pointer_mode,
                    keyboard_mode,
                    confine_to,
                    cursor,
                    button,
                    modifiers,
                }
            }
            op::UNGRAB_BUTTON => Request::UngrabButton {
                button: data,
                grab_window: r.u32()?,
                modifiers: r.u16()?,
            },
            op::CHANGE_ACTIVE_POINTER_GRAB => Request::ChangeActivePointerGrab {
                cursor: r.u32()?,
                time: r.u32()?,
                event_mask: r.u16()?,
            },
            op::GRAB_KEYBOARD => Request::GrabKeyboard {
                owner_events: data != 0,
                grab_window: r.u32()?,
                time: r.u32()?,
                pointer_mode: r.u8()?,
                keyboard_mode: r.u8()?,
            },
            op::UNGRAB_KEYBOARD => Request::UngrabKeyboard { time: r.u32()? },
            op::GRAB_KEY => Request::GrabKey {
                owner_events: data != 0,
                grab_window: r.u32()?,
                modifiers: r.u16()?,
                key: r.u8()?,
                pointer_mode: r.u8()?,
                keyboard_mode: r.u8()?,
            },
            op::UNGRAB_KEY => Request::UngrabKey {
                key: data,
                grab_window: r.u32()?,
                modifiers: r.u16()?,
            },
            op::ALLOW_EVENTS => Request::AllowEvents {
                mode: data,
                time: r.u32()?,
            },
            op::GRAB_SERVER => Request::GrabServer,
            op::UNGRAB_SERVER => Request::UngrabServer,
            op::QUERY_POINTER => Request::QueryPointer { window: r.u32()? },
            op::GET_MOTION_EVENTS => Request::GetMotionEvents {
                window: r.u32()?,
                start: r.u32()?,
                stop: r.u32()?,
            },
            op::TRANSLATE_COORDINATES => Request::TranslateCoordinates {
                src_window: r.u32()?,
                dst_window: r.u32()?,
                src_x: r.i16()?,
                src_y: r.i16()?,
            },
            op::WARP_POINTER => Request::WarpPointer {
                src_window: r.u32()?,
                dst_window: r.u32()?,
                src_x: r.i16()?,
                src_y: r.i16()?,
                src_width: r.u16()?,
                src_height: r.u16()?,
                dst_x: r.i16()?,
                dst_y: r.i16()?,
            },
            op::SET_INPUT_FOCUS => Request::SetInputFocus {
                revert_to: data,
                focus: r.u32()?,
                time: r.u32()?,
            },
            op::GET_INPUT_FOCUS => Request::GetInputFocus,
            op::QUERY_KEYMAP => Request::QueryKeymap,
            op::OPEN_FONT => {
                let fid = r.u32()?;
                let len = r.u16()? as usize;
                r.skip(2)?;
                Request::OpenFont {
                    fid,
                    name: r.string8(len)?,
                }
            }
            op::CLOSE_FONT => Request::CloseFont { font: r.u32()? },
            op::QUERY_FONT => Request::QueryFont { font: r.u32()? },
            op::QUERY_TEXT_EXTENTS => {
                let font = r.u32()?;
                let mut units = r.remaining() / 2;
                // odd-length flag drops the final 16-bit pad
                if data != 0 && units > 0 {
                    units -= 1;
                }
                let mut text = Vec::with_capacity(units);
                for _ in 0..units {
                    text.push(r.u16()?);
                }
                Request::QueryTextExtents { font, text }
            }
            op::LIST_FONTS | op::LIST_FONTS_WITH_INFO => {
                let max_names = r.u16()?;
                let len = r.u16()? as usize;
                let pattern = r.string8(len)?;
                if major == op::LIST_FONTS {
                    Request::ListFonts { max_names, pattern }
                } else {
                    Request::ListFontsWithInfo { max_names, pattern }
                }
            }
            op::SET_FONT_PATH => {
                let count = r.u16()? as usize;
                r.skip(2)?;
                let mut paths = Vec::with_capacity(count);
                for _ in 0..count {
                    let len = r.u8()? as usize;
                    paths.push(r.string8(len)?);
                }
                Request::SetFontPath { paths }
            }
            op::GET_FONT_PATH => Request::GetFontPath,
            op::CREATE_PIXMAP => Request::CreatePixmap {
                depth: data,
                pid: r.u32()?,
                drawable: r.u32()?,
                width: r.u16()?,
                height: r.u16()?,
            },
            op::FREE_PIXMAP => Request::FreePixmap { pixmap: r.u32()? },
            op::CREATE_GC => {
                let cid = r.u32()?;
                let drawable = r.u32()?;
                let mask = r.u32()?;
                Request::CreateGC {
                    cid,
                    drawable,
                    values: GcValues::decode(mask, &mut r)?,
                }
            }
            op::CHANGE_GC => {
                let gc = r.u32()?;
                let mask = r.u32()?;
                Request::ChangeGC {
                    gc,
                    values: GcValues::decode(mask, &mut r)?,
                }
            }
            op::COPY_GC => Request::CopyGC {
                src_gc: r.u32()?,
                dst_gc: r.u32()?,
                mask: r.u32()?,
            },
            op::SET_DASHES => {
                let gc = r.u32()?;
                let dash_offset = r.u16()?;
                let n = r.u16()? as usize;
                Request::SetDashes {
                    gc,
                    dash_offset,
                    dashes: r.bytes(n)?.to_vec(),
                }
            }
            op::SET_CLIP_RECTANGLES => {
                let gc = r.u32()?;
                let clip_x = r.i16()?;
                let clip_y = r.i16()?;
                Request::SetClipRectangles {
                    ordering: data,
                    gc,
                    clip_x,
                    clip_y,
                    rectangles: read_rectangles(&mut r)?,
                }
            }
            op::FREE_GC => Request::FreeGC { gc: r.u32()? },
            op::CLEAR_AREA => Request::ClearArea {
                exposures: data != 0,
                window: r.u32()?,
                x: r.i16()?,
                y: r.i16()?,
                width: r.u16()?,
                height: r.u16()?,
            },
            op::COPY_AREA => Request::CopyArea {
                src_drawable: r.u32()?,
                dst_drawable: r.u32()?,
                gc: r.u32()?,
                src_x: r.i16()?,
                src_y: r.i16()?,
                dst_x: r.i16()?,
                dst_y: r.i16()?,
                width: r.u16()?,
                height: r.u16()?,
            },
            op::COPY_PLANE => Request::CopyPlane {
                src_drawable: r.u32()?,
                dst_drawable: r.u32()?,
                gc: r.u32()?,
                src_x: r.i16()?,
                src_y: r.i16()?,
                dst_x: r.i16()?,
                dst_y: r.i16()?,
                width: r.u16()?,
                height: r.u16()?,
                bit_plane: r.u32()?,
            },
            op::POLY_POINT | op::POLY_LINE => {
                let drawable = r.u32()?;
                let gc = r.u32()?;
                let points = read_points(&mut r)?;
                if major == op::POLY_POINT {
                    Request::PolyPoint {
                        coordinate_mode: data,
                        drawable,
                        gc,
                        points,
                    }
                } else {
                    Request::PolyLine {
                        coordinate_mode: data,
                        drawable,
                        gc,
                        points,
                    }
                }
            }
            op::POLY_SEGMENT => {
                let drawable = r.u32()?;
                let gc = r.u32()?;
                let mut segments = Vec::with_capacity(r.remaining() / 8);
                while r.remaining() >= 8 {
                    segments.push(Segment {
                        x1: r.i16()?,
                        y1: r.i16()?,
                        x2: r.i16()?,
                        y2: r.i16()?,
                    });
                }
                Request::PolySegment {
                    drawable,
                    gc,
                    segments,
                }
            }
            op::POLY_RECTANGLE | op::POLY_FILL_RECTANGLE => {
                let drawable = r.u32()?;
                let gc = r.u32()?;
                let rectangles = read_rectangles(&mut r)?;
                if major == op::POLY_RECTANGLE {
                    Request::PolyRectangle {
                        drawable,
                        gc,
                        rectangles,
                    }
                } else {
                    Request::PolyFillRectangle {
                        drawable,
                        gc,
                        rectangles,
                    }
                }
            }
            op::POLY_ARC | op::POLY_FILL_ARC => {
                let drawable = r.u32()?;
                let gc = r.u32()?;
                let arcs = read_arcs(&mut r)?;
                if major == op::POLY_ARC {
                    Request::PolyArc { drawable, gc, arcs }
                } else {
                    Request::PolyFillArc { drawable, gc, arcs }
                }
            }
            op::FILL_POLY => {
                let drawable = r.u32()?;
                let gc = r.u32()?;
                let shape = r.u8()?;
                let coordinate_mode = r.u8()?;
                r.skip(2)?;
                Request::FillPoly {
                    drawable,
                    gc,
                    shape,
                    coordinate_mode,
                    points: read_points(&mut r)?,
                }
            }
            op::PUT_IMAGE => {
                let drawable = r.u32()?;
                let gc = r.u32()?;
                let width = r.u16()?;
                let height = r.u16()?;
                let dst_x = r.i16()?;
                let dst_y = r.i16()?;
                let left_pad = r.u8()?;
                let depth = r.u8()?;
                r.skip(2)?;
                Request::PutImage {
                    format: data,
                    drawable,
                    gc,
                    width,
                    height,
                    dst_x,
                    dst_y,
                    left_pad,
                    depth,
                    data: r.rest().to_vec(),
                }
            }
            op::GET_IMAGE => Request::GetImage {
                format: data,
                drawable: r.u32()?,
                x: r.i16()?,
                y: r.i16()?,
                width: r.u16()?,
                height: r.u16()?,
                plane_mask: r.u32()?,
            },
            op::POLY_TEXT8 | op::POLY_TEXT16 => {
                let drawable = r.u32()?;
                let gc = r.u32()?;
                let x = r.i16()?;
                let y = r.i16()?;
                let items = r.rest().to_vec();
                if major == op::POLY_TEXT8 {
                    Request::PolyText8 {
                        drawable,
                        gc,
                        x,
                        y,
                        items,
                    }
                } else {
                    Request::PolyText16 {
                        drawable,
                        gc,
                        x,
                        y,
                        items,
                    }
                }
            }
            op::IMAGE_TEXT8 => {
                let drawable = r.u32()?;
                let gc = r.u32()?;
                let x = r.i16()?;
                let y = r.i16()?;
                Request::ImageText8 {
                    drawable,
                    gc,
                    x,
                    y,
                    text: r.bytes(data as usize)?.to_vec(),
                }
            }
            op::IMAGE_TEXT16 => {
                let drawable = r.u32()?;
                let gc = r.u32()?;
                let x = r.i16()?;
                let y = r.i16()?;
                let mut text = Vec::with_capacity(data as usize);
                for _ in 0..data {
                    text.push(r.u16()?);
                }
                Request::ImageText16 {
                    drawable,
                    gc,
                    x,
                    y,
                    text,
                }
            }
            op::CREATE_COLORMAP => Request::CreateColormap {
                alloc: data,
                mid: r.u32()?,
                window: r.u32()?,
                visual: r.u32()?,
            },
            op::FREE_COLORMAP => Request::FreeColormap { cmap: r.u32()? },
            op::COPY_COLORMAP_AND_FREE => Request::CopyColormapAndFree {
                mid: r.u32()?,
                src_cmap: r.u32()?,
            },
            op::INSTALL_COLORMAP => Request::InstallColormap { cmap: r.u32()? },
            op::UNINSTALL_COLORMAP => Request::UninstallColormap { cmap: r.u32()? },
            op::LIST_INSTALLED_COLORMAPS => {
                Request::ListInstalledColormaps { window: r.u32()? }
            }
            op::ALLOC_COLOR => Request::AllocColor {
                cmap: r.u32()?,
                red: r.u16()?,
                green: r.u16()?,
                blue: r.u16()?,
            },
            op::ALLOC_NAMED_COLOR => {
                let cmap = r.u32()?;
                let len = r.u16()? as usize;
                r.skip(2)?;
                Request::AllocNamedColor {
                    cmap,
                    name: r.string8(len)?,
                }
            }
            op::ALLOC_COLOR_CELLS => Request::AllocColorCells {
                contiguous: data != 0,
                cmap: r.u32()?,
                colors: r.u16()?,
                planes: r.u16()?,
            },
            op::ALLOC_COLOR_PLANES => Request::AllocColorPlanes {
                contiguous: data != 0,
                cmap: r.u32()?,
                colors: r.u16()?,
                reds: r.u16()?,
                greens: r.u16()?,
                blues: r.u16()?,
            },
            op::FREE_COLORS => {
                let cmap = r.u32()?;
                let plane_mask = r.u32()?;
                Request::FreeColors {
                    cmap,
                    plane_mask,
                    pixels: read_u32_list(&mut r)?,
                }
            }
            op::STORE_COLORS => {
                let cmap = r.u32()?;
                let mut items = Vec::with_capacity(r.remaining() / 12);
                while r.remaining() >= 12 {
                    let pixel = r.u32()?;
                    let red = r.u16()?;
                    let green = r.u16()?;
                    let blue = r.u16()?;
                    let do_mask = r.u8()?;
                    r.skip(1)?;
                    items.push(ColorItem {
                        pixel,
                        red,
                        green,
                        blue,
                        do_mask,
                    });
                }
                Request::StoreColors { cmap, items }
            }
            op::STORE_NAMED_COLOR => {
                let cmap = r.u32()?;
                let pixel = r.u32()?;
                let len = r.u16()? as usize;
                r.skip(2)?;
                Request::StoreNamedColor {
                    do_rgb: data,
                    cmap,
                    pixel,
                    name: r.string8(len)?,
                }
            }
            op::QUERY_COLORS => {
                let cmap = r.u32()?;
                Request::QueryColors {
                    cmap,
                    pixels: read_u32_list(&mut r)?,
                }
            }
            op::LOOKUP_COLOR => {
                let cmap = r.u32()?;
                let len = r.u16()? as usize;
                r.skip(2)?;
                Request::LookupColor {
                    cmap,
                    name: r.string8(len)?,
                }
            }
            op::CREATE_CURSOR => Request::CreateCursor {
                cid: r.u32()?,
                source: r.u32()?,
                mask: r.u32()?,
                fore_red: r.u16()?,
                fore_green: r.u16()?,
                fore_blue: r.u16()?,
                back_red: r.u16()?,
                back_green: r.u16()?,
                back_blue: r.u16()?,
                x: r.u16()?,
                y: r.u16()?,
            },
            op::CREATE_GLYPH_CURSOR => Request::CreateGlyphCursor {
                cid: r.u32()?,
                source_font: r.u32()?,
                mask_font: r.u32()?,
                source_char: r.u16()?,
                mask_char: r.u16()?,
                fore_red: r.u16()?,
                fore_green: r.u16()?,
                fore_blue: r.u16()?,
                back_red: r.u16()?,
                back_green: r.u16()?,
                back_blue: r.u16()?,
            },
            op::FREE_CURSOR => Request::FreeCursor { cursor: r.u32()? },
            op::RECOLOR_CURSOR => Request::RecolorCursor {
                cursor: r.u32()?,
                fore_red: r.u16()?,
                fore_green: r.u16()?,
                fore_blue: r.u16()?,
                back_red: r.u16()?,
                back_green: r.u16()?,
                back_blue: r.u16()?,
            },
            op::QUERY_BEST_SIZE => Request::QueryBestSize {
                class: data,
                drawable: r.u32()?,
                width: r.u16()?,
                height: r.u16()?,
            },
            op::QUERY_EXTENSION => {
                let len = r.u16()? as usize;
                r.skip(2)?;
                Request::QueryExtension {
                    name: r.string8(len)?,
                }
            }
            op::LIST_EXTENSIONS => Request::ListExtensions,
            op::CHANGE_KEYBOARD_MAPPING => {
                let first_keycode = r.u8()?;
                let keysyms_per_keycode = r.u8()?;
                r.skip(2)?;
                let count = data as usize * keysyms_per_keycode as usize;
                let mut keysyms = Vec::with_capacity(count);
                for _ in 0..count {
                    keysyms.push(r.u32()?);
                }
                Request::ChangeKeyboardMapping {
                    keycode_count: data,
                    first_keycode,
                    keysyms_per_keycode,
                    keysyms,
                }
            }
            op::GET_KEYBOARD_MAPPING => Request::GetKeyboardMapping {
                first_keycode: r.u8()?,
                count: r.u8()?,
            },
            op::CHANGE_KEYBOARD_CONTROL => {
                let value_mask = r.u32()?;
                let mut values = Vec::with_capacity(value_mask.count_ones() as usize);
                for _ in 0..value_mask.count_ones() {
                    values.push(r.u32()?);
                }
                Request::ChangeKeyboardControl { value_mask, values }
            }
            op::GET_KEYBOARD_CONTROL => Request::GetKeyboardControl,
            op::BELL => Request::Bell { percent: data as i8 },
            op::CHANGE_POINTER_CONTROL => Request::ChangePointerControl {
                accel_numerator: r.i16()?,
                accel_denominator: r.i16()?,
                threshold: r.i16()?,
                do_accel: r.u8()? != 0,
                do_threshold: r.u8()? != 0,
            },
            op::GET_POINTER_CONTROL => Request::GetPointerControl,
            op::SET_SCREEN_SAVER => Request::SetScreenSaver {
                timeout: r.i16()?,
                interval: r.i16()?,
                prefer_blanking: r.u8()?,
                allow_exposures: r.u8()?,
            },
            op::GET_SCREEN_SAVER => Request::GetScreenSaver,
            op::CHANGE_HOSTS => {
                let family = r.u8()?;
                r.skip(1)?;
                let len = r.u16()? as usize;
                Request::ChangeHosts {
                    mode: data,
                    family,
                    address: r.bytes(len)?.to_vec(),
                }
            }
            op::LIST_HOSTS => Request::ListHosts,
            op::SET_ACCESS_CONTROL => Request::SetAccessControl { mode: data },
            op::SET_CLOSE_DOWN_MODE => Request::SetCloseDownMode { mode: data },
            op::KILL_CLIENT => Request::KillClient { resource: r.u32()? },
            op::ROTATE_PROPERTIES => {
                let window = r.u32()?;
                let count = r.u16()? as usize;
                let delta = r.i16()?;
                let mut properties = Vec::with_capacity(count);
                for _ in 0..count {
                    properties.push(r.u32()?);
                }
                Request::RotateProperties {
                    window,
                    delta,
                    properties,
                }
            }
            op::FORCE_SCREEN_SAVER => Request::ForceScreenSaver { mode: data },
            op::SET_POINTER_MAPPING => Request::SetPointerMapping {
                map: r.bytes(data as usize)?.to_vec(),
            },
            op::GET_POINTER_MAPPING => Request::GetPointerMapping,
            op::SET_MODIFIER_MAPPING => Request::SetModifierMapping {
                keycodes_per_modifier: data,
                keycodes: r.bytes(data as usize * 8)?.to_vec(),
            },
            op::GET_MODIFIER_MAPPING => Request::GetModifierMapping,
            op::NO_OPERATION => Request::NoOperation,
            op::BIG_REQUESTS_MAJOR => match data {
                0 => Request::BigReqEnable,
                _ => return Err(X11Error::request()),
            },
            op::XINPUT_MAJOR => Request::Xi(XiRequest::decode(data, &mut r)?),
            _ => return Err(X11Error::implementation()),
        };
        Ok(req)
    }
}

fn read_points(r: &mut WireReader) -> HandlerResult<Vec<Point>> {
    let mut points = Vec::with_capacity(r.remaining() / 4);
    while r.remaining() >= 4 {
        points.push(Point {
            x: r.i16()?,
            y: r.i16()?,
        });
    }
    Ok(points)
}

fn read_rectangles(r: &mut WireReader) -> HandlerResult<Vec<Rectangle>> {
    let mut rects = Vec::with_capacity(r.remaining() / 8);
    while r.remaining() >= 8 {
        rects.push(Rectangle {
            x: r.i16()?,
            y: r.i16()?,
            width: r.u16()?,
            height: r.u16()?,
        });
    }
    Ok(rects)
}

fn read_arcs(r: &mut WireReader) -> HandlerResult<Vec<Arc>> {
    let mut arcs = Vec::with_capacity(r.remaining() / 12);
    while r.remaining() >= 12 {
        arcs.push(Arc {
            x: r.i16()?,
            y: r.i16()?,
            width: r.u16()?,
            height: r.u16()?,
            angle1: r.i16()?,
            angle2: r.i16()?,
        });
    }
    Ok(arcs)
}

fn read_u32_list(r: &mut WireReader) -> HandlerResult<Vec<u32>> {
    let mut list = Vec::with_capacity(r.remaining() / 4);
    while r.remaining() >= 4 {
        list.push(r.u32()?);
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire::{WireOrder, WireWriter};

    fn decode_lsb(major: u8, data: u8, body: &[u8]) -> Request {
        Request::decode(major, data, body, WireOrder::Lsb).unwrap()
    }

    #[test]
    fn test_decode_map_window() {
        let mut w = WireWriter::new(WireOrder::Lsb);
        w.u32(0x0020_0001);
        let req = decode_lsb(op::MAP_WINDOW, 0, w.as_slice());
        assert_eq!(req, Request::MapWindow { window: 0x0020_0001 });
    }

    #[test]
    fn test_decode_intern_atom() {
        let mut w = WireWriter::new(WireOrder::Lsb);
        w.u16(7).u16(0).string8_padded("FOO_BAR");
        let req = decode_lsb(op::INTERN_ATOM, 0, w.as_slice());
        assert_eq!(
            req,
            Request::InternAtom {
                only_if_exists: false,
                name: "FOO_BAR".into()
            }
        );
    }

    #[test]
    fn test_decode_create_window_values() {
        let mut w = WireWriter::new(WireOrder::Lsb);
        w.u32(0x0020_0001); // wid
        w.u32(0x2); // parent
        w.i16(10).i16(20).u16(100).u16(80).u16(1);
        w.u16(1); // InputOutput
        w.u32(0x1); // visual
        w.u32(
            (WindowAttrMask::BACKGROUND_PIXEL | WindowAttrMask::EVENT_MASK).bits(),
        );
        w.u32(0xFF_0000);
        w.u32(0x0002_0004);
        let req = decode_lsb(op::CREATE_WINDOW, 24, w.as_slice());
        match req {
            Request::CreateWindow {
                depth,
                wid,
                values,
                ..
            } => {
                assert_eq!(depth, 24);
                assert_eq!(wid, 0x0020_0001);
                assert_eq!(values.background_pixel, Some(0xFF_0000));
                assert_eq!(values.event_mask, Some(0x0002_0004));
                assert_eq!(values.cursor, None);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_change_property_format16() {
        let mut w = WireWriter::new(WireOrder::Lsb);
        w.u32(0x0020_0001).u32(39).u32(31);
        w.u8(16).zeros(3);
        w.u32(3); // three 16-bit items
        w.u16(1).u16(2).u16(3).u16(0);
        let req = decode_lsb(op::CHANGE_PROPERTY, 0, w.as_slice());
        match req {
            Request::ChangeProperty { format, data, .. } => {
                assert_eq!(format, 16);
                assert_eq!(data.len(), 6);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_truncated_body_is_length_error() {
        let body = [1u8, 2];
        let err = Request::decode(op::MAP_WINDOW, 0, &body, WireOrder::Lsb).unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Length);
    }

    #[test]
    fn test_decode_poly_rectangle_list() {
        let mut w = WireWriter::new(WireOrder::Lsb);
        w.u32(0x0020_0002).u32(0x0020_0003);
        w.i16(0).i16(0).u16(4).u16(4);
        w.i16(8).i16(8).u16(2).u16(2);
        let req = decode_lsb(op::POLY_FILL_RECTANGLE, 0, w.as_slice());
        match req {
            Request::PolyFillRectangle { rectangles, .. } => {
                assert_eq!(rectangles.len(), 2);
                assert_eq!(rectangles[1].x, 8);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_core_opcode() {
        let err = Request::decode(125, 0, &[], WireOrder::Lsb).unwrap_err();
        assert_eq!(err.code, crate::core::errors::ErrorCode::Implementation);
    }
}
