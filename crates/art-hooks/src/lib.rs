//! Typed pub/sub event bus (spec §4.7 "Hook bus").

pub mod bus;
pub mod event;

pub use bus::{HookBus, Subscriber};
pub use event::{HookEnvelope, HookEvent};
