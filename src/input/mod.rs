//! Input event routing
//!
//! Turns frontend input primitives into protocol events, honoring focus,
//! event masks, propagation, and the grab state machine for the core and
//! XInput domains.

pub mod grabs;
pub mod router;

pub use grabs::{DeviceGrab, GrabState, KeyboardGrab, PassiveGrab, PointerGrab};
