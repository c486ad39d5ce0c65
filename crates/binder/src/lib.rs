//! Live bindings from controls and encoders to tracks, devices and parameters.
//!
//! A [`Binding`] owns a mode-scoped [`BindingTable`] of parsed target
//! descriptors. On every bind it resolves the active descriptor against a
//! [`LiveSet`], drops all of its subscriptions, and subscribes again to
//! exactly the feeds [`assess_dynamism`] names plus the target's own value
//! feed. Notifications arrive as [`FeedEvent`]s on a crossbeam channel the
//! host drains between events.
//!
//! Failing to find a target is expected and shows up as
//! [`FeedbackState::Disabled`]; malformed binding strings are configuration
//! [`Error`]s raised when the table is built.

mod binding;
mod error;
mod feed;
mod live;
mod table;
mod target;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(test)]
mod test_binding;

pub use binding::{BindOptions, Binding, FeedbackState};
pub use error::{BindError, Error, Result};
pub use feed::{Feed, FeedEvent, Notifier, Subject, Subscription, Topic, assess_dynamism};
pub use live::{
    ChainRef, DeviceParent, DeviceRef, LiveSet, MixerSlot, ParamRef, ParameterState, TrackFlag,
    TrackRef,
};
pub use table::{BindingTable, compile_target};
pub use target::{Target, TrackAttribute, find_device, resolve, resolve_track};
