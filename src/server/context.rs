//! Server context
//!
//! All mutable protocol state behind one value: the atom table, the resource
//! table, connected clients, selections, grabs, focus, the pointer, and
//! server time. Only the event-loop task touches it, which is the whole
//! concurrency story.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::config::DisplaySettings;
use crate::core::atoms::AtomTable;
use crate::core::ids::{
    Atom, ClientId, RETAINED_CLIENT, ROOT_WINDOW, Timestamp, WindowId, Xid, time_before,
};
use crate::frontend::Frontend;
use crate::input::grabs::GrabState;
use crate::protocol::events::{Event, EventMask};
use crate::protocol::handshake::ScreenDescription;
use crate::resources::registry::ResourceTable;
use crate::server::client::{Client, CloseDownMode};
use crate::server::event_loop::ServerMessage;

/// Current owner of one selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionOwner {
    pub window: WindowId,
    pub client: ClientId,
    pub time: Timestamp,
}

/// Input focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusState {
    /// Window id, `NONE`, or `POINTER_ROOT`
    pub window: u32,
    pub revert_to: u8,
}

/// Pointer state tracked for QueryPointer and event synthesis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerState {
    pub root_x: i16,
    pub root_y: i16,
    /// Window currently under the pointer
    pub window: WindowId,
    /// Button and modifier state as last reported by the frontend
    pub state: u16,
    /// Buttons currently held, as a bit per button (bit 0 = button 1)
    pub buttons: u8,
}

/// Stored device-control settings echoed back by the Get* requests
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub pointer_accel_numerator: i16,
    pub pointer_accel_denominator: i16,
    pub pointer_threshold: i16,
    pub bell_percent: i8,
    pub screen_saver_timeout: i16,
    pub screen_saver_interval: i16,
    pub screen_saver_prefer_blanking: u8,
    pub screen_saver_allow_exposures: u8,
    pub access_control: bool,
    pub keyboard_map: HashMap<u8, Vec<u32>>,
    pub keysyms_per_keycode: u8,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            pointer_accel_numerator: 2,
            pointer_accel_denominator: 1,
            pointer_threshold: 4,
            bell_percent: 50,
            screen_saver_timeout: 600,
            screen_saver_interval: 600,
            screen_saver_prefer_blanking: 1,
            screen_saver_allow_exposures: 1,
            access_control: false,
            keyboard_map: HashMap::new(),
            keysyms_per_keycode: 2,
        }
    }
}

/// The single owner of all protocol state
pub struct ServerContext {
    pub screen: ScreenDescription,
    pub atoms: AtomTable,
    pub resources: ResourceTable,
    pub clients: HashMap<ClientId, Client>,
    pub selections: HashMap<Atom, SelectionOwner>,
    pub grabs: GrabState,
    pub focus: FocusState,
    pub pointer: PointerState,
    /// Monotonically increasing 32-bit server time
    pub time: Timestamp,
    pub settings: DeviceSettings,
    pub font_path: Vec<String>,
    pub frontend: Arc<dyn Frontend>,
    /// Handle back into the event loop for deferred completions
    pub loop_tx: mpsc::UnboundedSender<ServerMessage>,
    next_client_index: ClientId,
    free_client_indices: Vec<ClientId>,
    /// Ids parked by retain-temporary close-down
    retained_temporary: Vec<Xid>,
}

impl ServerContext {
    pub fn new(
        display: &DisplaySettings,
        frontend: Arc<dyn Frontend>,
        loop_tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        Self {
            screen: ScreenDescription {
                width: display.width,
                height: display.height,
                vendor: display.vendor.clone(),
            },
            atoms: AtomTable::new(),
            resources: ResourceTable::new(display.width, display.height),
            clients: HashMap::new(),
            selections: HashMap::new(),
            grabs: GrabState::default(),
            focus: FocusState {
                window: crate::core::ids::POINTER_ROOT,
                revert_to: 1,
            },
            pointer: PointerState {
                window: ROOT_WINDOW,
                ..Default::default()
            },
            time: 1,
            settings: DeviceSettings::default(),
            font_path: vec!["built-ins".to_string()],
            frontend,
            loop_tx,
            next_client_index: 1,
            free_client_indices: Vec::new(),
            retained_temporary: Vec::new(),
        }
    }

    /// Advance server time; every input primitive and timestamped request
    /// observes a fresh tick
    pub fn tick(&mut self) -> Timestamp {
        self.time = self.time.wrapping_add(1);
        if self.time == 0 {
            self.time = 1;
        }
        self.time
    }

    /// Substitute CurrentTime with the server clock
    pub fn resolve_time(&self, time: Timestamp) -> Timestamp {
        if time == crate::core::ids::CURRENT_TIME {
            self.time
        } else {
            time
        }
    }

    /// Allocate a client index; indexes are reused only after full
    /// close-down (destroy mode)
    pub fn allocate_client_index(&mut self) -> Option<ClientId> {
        if let Some(id) = self.free_client_indices.pop() {
            return Some(id);
        }
        if self.next_client_index == u8::MAX {
            return None;
        }
        let id = self.next_client_index;
        self.next_client_index += 1;
        Some(id)
    }

    // Output plumbing

    /// Send an already-encoded reply or error frame; these bypass the
    /// server-grab hold queue
    pub fn send_frame(&self, client: ClientId, bytes: Vec<u8>) {
        if let Some(c) = self.clients.get(&client) {
            c.send_raw(bytes);
        }
    }

    /// Deliver an event to one client, honoring the server grab: while
    /// another client holds the server, events are held back and flushed on
    /// ungrab
    pub fn send_event(&mut self, client: ClientId, event: &Event) {
        let Some(c) = self.clients.get_mut(&client) else {
            return;
        };
        let bytes = event.encode(c.last_sequence, c.order);
        if let Some(holder) = self.grabs.server {
            if holder != client {
                trace!(client, code = event.code(), "holding event during server grab");
                c.held_events.push(bytes);
                return;
            }
        }
        c.send_raw(bytes);
    }

    /// Flush events held during a server grab, in arrival order
    pub fn release_held_events(&mut self) {
        for c in self.clients.values_mut() {
            let held = std::mem::take(&mut c.held_events);
            for bytes in held {
                c.send_raw(bytes);
            }
        }
    }

    // Event selection helpers

    /// The client that receives events selected on `window`
    pub fn window_event_target(&self, window: WindowId) -> Option<ClientId> {
        let win = self.resources.window(window).ok()?;
        win.event_client.or({
            if win.owner == 0 {
                None
            } else {
                Some(win.owner)
            }
        })
    }

    /// First window in the bubble walk from `origin` that selects `mask`,
    /// with its event target. Propagation stops at a window whose
    /// do-not-propagate mask covers `mask`.
    pub fn find_interested(
        &self,
        origin: WindowId,
        mask: EventMask,
    ) -> Option<(ClientId, WindowId)> {
        for window in self.resources.ancestor_chain(origin) {
            let Ok(win) = self.resources.window(window) else {
                return None;
            };
            if win.selects(mask) {
                return self.window_event_target(window).map(|c| (c, window));
            }
            if win.blocks_propagation(mask) {
                return None;
            }
        }
        None
    }

    /// Deliver to the window itself (structure-notify) and its parent
    /// (substructure-notify); `make` builds the event for each event-window
    pub fn deliver_structure(&mut self, window: WindowId, make: impl Fn(WindowId) -> Event) {
        let parent = self
            .resources
            .window(window)
            .map(|w| w.parent)
            .unwrap_or(0);
        if let Ok(win) = self.resources.window(window) {
            if win.selects(EventMask::STRUCTURE_NOTIFY) {
                if let Some(target) = self.window_event_target(window) {
                    self.send_event(target, &make(window));
                }
            }
        }
        if parent != 0 {
            if let Ok(pwin) = self.resources.window(parent) {
                if pwin.selects(EventMask::SUBSTRUCTURE_NOTIFY) {
                    if let Some(target) = self.window_event_target(parent) {
                        self.send_event(target, &make(parent));
                    }
                }
            }
        }
    }

    /// Absolute (root-relative) position of a window's origin
    pub fn window_abs_pos(&self, window: WindowId) -> (i16, i16) {
        let mut x = 0i32;
        let mut y = 0i32;
        for id in self.resources.ancestor_chain(window) {
            if let Ok(w) = self.resources.window(id) {
                x += w.x as i32;
                y += w.y as i32;
            }
        }
        (x as i16, y as i16)
    }

    /// Direct child of `ancestor` on the path toward `origin`, or 0
    pub fn child_toward(&self, ancestor: WindowId, origin: WindowId) -> WindowId {
        if ancestor == origin {
            return 0;
        }
        let chain = self.resources.ancestor_chain(origin);
        let mut prev = 0;
        for id in chain {
            if id == ancestor {
                return prev;
            }
            prev = id;
        }
        0
    }

    // Selections

    /// Install a new selection owner, clearing the previous one.
    /// Returns false when the timestamp loses the race.
    pub fn set_selection_owner(
        &mut self,
        selection: Atom,
        owner: WindowId,
        client: ClientId,
        time: Timestamp,
    ) -> bool {
        let time = self.resolve_time(time);
        if let Some(current) = self.selections.get(&selection) {
            if time_before(time, current.time) {
                return false;
            }
        }
        let previous = self.selections.get(&selection).copied();
        if owner == 0 {
            self.selections.remove(&selection);
        } else {
            self.selections.insert(
                selection,
                SelectionOwner {
                    window: owner,
                    client,
                    time,
                },
            );
        }
        if let Some(prev) = previous {
            if prev.window != owner {
                self.send_event(
                    prev.client,
                    &Event::SelectionClear {
                        time,
                        owner: prev.window,
                        selection,
                    },
                );
            }
        }
        true
    }

    // Window destruction, shared by DestroyWindow and client drain

    /// Destroy a window and its subtree, post-order, with notifications
    pub fn destroy_window_tree(&mut self, window: WindowId) {
        if window == ROOT_WINDOW || !self.resources.has_window(window) {
            return;
        }
        let mut victims = self.resources.descendants_post_order(window);
        victims.push(window);
        self.resources.unlink_child(window);
        for victim in victims {
            self.destroy_single_window(victim);
        }
    }

    /// DestroySubwindows: children in bottom-to-top order, each post-order
    pub fn destroy_subwindows(&mut self, window: WindowId) {
        let children = match self.resources.window(window) {
            Ok(w) => w.children.clone(),
            Err(_) => return,
        };
        for child in children {
            self.destroy_window_tree(child);
        }
    }

    fn destroy_single_window(&mut self, window: WindowId) {
        // descendants are already gone; this window's record still holds its
        // properties and passive grabs, which die with it
        self.deliver_structure(window, |event| Event::DestroyNotify { event, window });

        if self.focus.window == window {
            self.revert_focus();
        }
        if self.pointer.window == window {
            self.pointer.window = ROOT_WINDOW;
        }
        self.selections.retain(|_, owner| owner.window != window);
        if let Some(grab) = &self.grabs.pointer {
            if grab.window == window {
                self.grabs.pointer = None;
            }
        }
        if let Some(grab) = &self.grabs.keyboard {
            if grab.window == window {
                self.grabs.keyboard = None;
            }
        }
        self.grabs.device.retain(|_, g| g.window != window);
        for client in self.clients.values_mut() {
            client.save_set.remove(&window);
            client.xi1_selections.remove(&window);
            client.xi2_masks.retain(|(w, _), _| *w != window);
        }

        self.resources.remove_window(window);
        self.frontend.destroy_window(window);
        debug!(window = format_args!("{window:#x}"), "destroyed window");
    }

    /// Apply the focus revert-to policy after the focus window vanished
    pub fn revert_focus(&mut self) {
        self.focus.window = match self.focus.revert_to {
            1 => crate::core::ids::POINTER_ROOT,
            2 => {
                // revert to parent; the parent of a destroyed window is not
                // recoverable here, fall back to the pointer root
                crate::core::ids::POINTER_ROOT
            }
            _ => crate::core::ids::NONE,
        };
    }

    // Client teardown

    /// Full drain on disconnect or KillClient
    pub fn disconnect_client(&mut self, client: ClientId) {
        let Some(c) = self.clients.get(&client) else {
            return;
        };
        let close_down = c.close_down;
        let save_set: Vec<WindowId> = c.save_set.iter().copied().collect();
        info!(client, ?close_down, "disconnecting client");

        self.grabs.release_client(client);
        let owned: Vec<(Atom, SelectionOwner)> = self
            .selections
            .iter()
            .filter(|(_, owner)| owner.client == client)
            .map(|(&sel, &owner)| (sel, owner))
            .collect();
        for (sel, owner) in owned {
            self.selections.remove(&sel);
            self.send_event(
                client,
                &Event::SelectionClear {
                    time: self.time,
                    owner: owner.window,
                    selection: sel,
                },
            );
        }

        for window in save_set {
            self.reparent_save_set_window(window, client);
        }

        match close_down {
            CloseDownMode::Destroy => {
                self.destroy_client_resources(client);
                self.free_client_indices.push(client);
            }
            CloseDownMode::RetainPermanent => {
                self.resources.transfer_ownership(client, RETAINED_CLIENT);
            }
            CloseDownMode::RetainTemporary => {
                for id in self.resources.windows_owned_by(client) {
                    self.retained_temporary.push(id);
                }
                for id in self.resources.pixmaps_owned_by(client) {
                    self.retained_temporary.push(id);
                }
                for id in self.resources.gcontexts_owned_by(client) {
                    self.retained_temporary.push(id);
                }
                for id in self.resources.fonts_owned_by(client) {
                    self.retained_temporary.push(id);
                }
                for id in self.resources.cursors_owned_by(client) {
                    self.retained_temporary.push(id);
                }
                for id in self.resources.colormaps_owned_by(client) {
                    self.retained_temporary.push(id);
                }
                self.resources.transfer_ownership(client, RETAINED_CLIENT);
            }
        }
        self.clients.remove(&client);
    }

    /// KillClient(AllTemporary): destroy resources parked by
    /// retain-temporary close-downs
    pub fn kill_temporary_resources(&mut self) {
        let ids = std::mem::take(&mut self.retained_temporary);
        for id in ids {
            if self.resources.has_window(id) {
                self.destroy_window_tree(id);
            } else if self.resources.remove_pixmap(id).is_some() {
                self.frontend.free_pixmap(id);
            } else if self.resources.remove_gcontext(id).is_some() {
                self.frontend.free_gc(id);
            } else if self.resources.remove_font(id).is_some() {
                self.frontend.close_font(id);
            } else if self.resources.remove_cursor(id).is_some() {
                self.frontend.free_cursor(id);
            } else {
                self.resources.remove_colormap(id);
            }
        }
    }

    fn destroy_client_resources(&mut self, client: ClientId) {
        for id in self.resources.windows_owned_by(client) {
            // subtrees may already have taken siblings down
            if self.resources.has_window(id) {
                self.destroy_window_tree(id);
            }
        }
        for id in self.resources.pixmaps_owned_by(client) {
            self.resources.remove_pixmap(id);
            self.frontend.free_pixmap(id);
        }
        for id in self.resources.gcontexts_owned_by(client) {
            self.resources.remove_gcontext(id);
            self.frontend.free_gc(id);
        }
        for id in self.resources.fonts_owned_by(client) {
            self.resources.remove_font(id);
            self.frontend.close_font(id);
        }
        for id in self.resources.cursors_owned_by(client) {
            self.resources.remove_cursor(id);
            self.frontend.free_cursor(id);
        }
        for id in self.resources.colormaps_owned_by(client) {
            self.resources.remove_colormap(id);
        }
        if let Ok(cmap) = self
            .resources
            .colormap_mut(crate::core::ids::DEFAULT_COLORMAP)
        {
            cmap.free_client_cells(client);
        }
    }

    /// Reparent a save-set member to the nearest ancestor not owned by the
    /// disconnecting client, or the root
    fn reparent_save_set_window(&mut self, window: WindowId, leaving: ClientId) {
        if !self.resources.has_window(window) {
            return;
        }
        let chain = self.resources.ancestor_chain(window);
        let target = chain
            .iter()
            .skip(1)
            .find(|&&id| {
                self.resources
                    .window(id)
                    .map(|w| w.owner != leaving)
                    .unwrap_or(false)
            })
            .copied()
            .unwrap_or(ROOT_WINDOW);
        let (abs_x, abs_y) = self.window_abs_pos(window);
        let (t_abs_x, t_abs_y) = self.window_abs_pos(target);
        let x = abs_x - t_abs_x;
        let y = abs_y - t_abs_y;

        self.resources.unlink_child(window);
        if let Ok(w) = self.resources.window_mut(window) {
            w.parent = target;
            w.x = x;
            w.y = y;
        }
        self.resources.add_child(target, window);
        self.resources.refresh_map_state(window);
        self.frontend.reparent_window(window, target, x, y);
        let or = self
            .resources
            .window(window)
            .map(|w| w.attributes.override_redirect)
            .unwrap_or(false);
        self.deliver_structure(window, |event| Event::ReparentNotify {
            event,
            window,
            parent: target,
            x,
            y,
            override_redirect: or,
        });
        debug!(
            window = format_args!("{window:#x}"),
            target = format_args!("{target:#x}"),
            "save-set reparent"
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::DisplaySettings;
    use crate::core::ids::id_base;
    use crate::frontend::HeadlessFrontend;
    use crate::resources::window::Window;
    use std::sync::atomic::AtomicBool;

    pub fn test_context() -> ServerContext {
        let (tx, _rx) = mpsc::unbounded_channel();
        ServerContext::new(&DisplaySettings::default(), Arc::new(HeadlessFrontend::default()), tx)
    }

    pub fn add_client(ctx: &mut ServerContext, id: ClientId) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Client::new(
            id,
            crate::protocol::wire::WireOrder::Lsb,
            Arc::new(AtomicBool::new(false)),
            tx,
        );
        ctx.clients.insert(id, client);
        rx
    }

    #[test]
    fn test_selection_owner_time_race() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let win = id_base(1) | 1;
        ctx.resources.insert_window(Window::new(win, 1, ROOT_WINDOW));
        ctx.resources.add_child(ROOT_WINDOW, win);

        let sel = ctx.atoms.intern("CLIPBOARD", false);
        assert!(ctx.set_selection_owner(sel, win, 1, 100));
        // older timestamp is a no-op
        assert!(!ctx.set_selection_owner(sel, win, 1, 50));
        assert_eq!(ctx.selections.get(&sel).unwrap().time, 100);
    }

    #[test]
    fn test_selection_clear_goes_to_previous_owner() {
        let mut ctx = test_context();
        let mut rx1 = add_client(&mut ctx, 1);
        let _rx2 = add_client(&mut ctx, 2);
        let w1 = id_base(1) | 1;
        let w2 = id_base(2) | 1;
        ctx.resources.insert_window(Window::new(w1, 1, ROOT_WINDOW));
        ctx.resources.insert_window(Window::new(w2, 2, ROOT_WINDOW));

        let sel = crate::core::atoms::predefined::PRIMARY;
        assert!(ctx.set_selection_owner(sel, w1, 1, 10));
        assert!(ctx.set_selection_owner(sel, w2, 2, 20));

        let frame = rx1.try_recv().expect("SelectionClear to old owner");
        assert_eq!(frame[0], crate::protocol::opcodes::EV_SELECTION_CLEAR);
    }

    #[test]
    fn test_destroy_window_tree_is_recursive() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let a = id_base(1) | 1;
        let b = id_base(1) | 2;
        ctx.resources.insert_window(Window::new(a, 1, ROOT_WINDOW));
        ctx.resources.add_child(ROOT_WINDOW, a);
        ctx.resources.insert_window(Window::new(b, 1, a));
        ctx.resources.add_child(a, b);

        ctx.destroy_window_tree(a);
        assert!(!ctx.resources.has_window(a));
        assert!(!ctx.resources.has_window(b));
        assert!(
            !ctx.resources
                .window(ROOT_WINDOW)
                .unwrap()
                .children
                .contains(&a)
        );
    }

    #[test]
    fn test_disconnect_destroy_drains_resources() {
        let mut ctx = test_context();
        let _rx = add_client(&mut ctx, 1);
        let win = id_base(1) | 1;
        ctx.resources.insert_window(Window::new(win, 1, ROOT_WINDOW));
        ctx.resources.add_child(ROOT_WINDOW, win);
        ctx.resources.insert_pixmap(crate::resources::Pixmap {
            id: id_base(1) | 2,
            owner: 1,
            width: 4,
            height: 4,
            depth: 24,
        });

        ctx.disconnect_client(1);
        assert!(!ctx.resources.has_window(win));
        assert!(ctx.resources.pixmap(id_base(1) | 2).is_err());
        assert!(!ctx.clients.contains_key(&1));
    }

    #[test]
    fn test_save_set_reparents_to_foreign_ancestor() {
        let mut ctx = test_context();
        let _rx1 = add_client(&mut ctx, 1);
        let _rx2 = add_client(&mut ctx, 2);
        // client 1 owns a frame window under root; client 2's window sits in it
        let frame = id_base(1) | 1;
        let inner = id_base(2) | 1;
        ctx.resources.insert_window(Window::new(frame, 1, ROOT_WINDOW));
        ctx.resources.add_child(ROOT_WINDOW, frame);
        ctx.resources.insert_window(Window::new(inner, 2, frame));
        ctx.resources.add_child(frame, inner);
        // client 1 holds the inner window in its save-set
        ctx.clients.get_mut(&1).unwrap().save_set.insert(inner);

        ctx.disconnect_client(1);
        // the frame died with its owner, the save-set member survives on root
        assert!(!ctx.resources.has_window(frame));
        let w = ctx.resources.window(inner).unwrap();
        assert_eq!(w.parent, ROOT_WINDOW);
    }

    #[test]
    fn test_server_grab_holds_events() {
        let mut ctx = test_context();
        let mut rx1 = add_client(&mut ctx, 1);
        let _rx2 = add_client(&mut ctx, 2);
        ctx.grabs.server = Some(2);

        ctx.send_event(
            1,
            &Event::MappingNotify {
                request: 0,
                first_keycode: 8,
                count: 1,
            },
        );
        assert!(rx1.try_recv().is_err());

        ctx.grabs.server = None;
        ctx.release_held_events();
        assert!(rx1.try_recv().is_ok());
    }
}
