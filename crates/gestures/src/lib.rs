//! Gesture handling for control-surface controls.
//!
//! A [`GestureTable`] maps `gesture[__mode...]` keys to action bundles. A
//! [`Dispatcher`] owns one table plus the per-control press state, picks the
//! entries that fire for a gesture under the current mode snapshot, and runs
//! them through the resolver.

mod dispatch;
mod error;
mod table;

#[cfg(test)]
mod test_dispatch;

pub use dispatch::{
    Animation, AnimationHandle, AnimationSlot, Animator, Dispatch, Dispatcher, Invocation,
};
pub use error::GestureError;
pub use table::{Entry, Gesture, GestureTable};
