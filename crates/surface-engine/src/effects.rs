//! Outbound side effects: actions, messages, pages and lights.

use crossbeam_channel::Sender;
use gestures::{Animation, AnimationHandle};
use serde_json::Value;
use tracing::{info, trace};

/// Collaborators the engine drives on behalf of controls.
///
/// Methods take `&self` so one implementation can serve as both the
/// action host and the animator within a single dispatch.
pub trait Effects {
    /// Run an external action list.
    fn trigger_action(&self, action: &str);

    /// Show a transient status message.
    fn show_message(&self, text: &str);

    /// Switch page. Returns false when the page does not exist.
    fn request_page(&self, page: &str) -> bool;

    /// Return to the previously shown page.
    fn return_to_last_page(&self);

    /// Redraw the whole surface.
    fn refresh(&self);

    /// Light `control` with `color`.
    fn set_color(&self, control: &str, color: &Value);

    /// Start a transient animation on `control`.
    fn start_animation(&self, control: &str, kind: Animation) -> Box<dyn AnimationHandle>;

    /// Show or clear the attention state of `control`.
    fn set_attention(&self, control: &str, on: bool);
}

/// One side effect, as delivered by [`ChannelEffects`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// An action list to run.
    Action(String),
    /// A status message.
    Message(String),
    /// A page change.
    Page(String),
    /// Return to the previous page.
    LastPage,
    /// Full redraw.
    Refresh,
    /// A control's color.
    Color {
        /// Control name.
        control: String,
        /// Color spec.
        color: Value,
    },
    /// An animation started.
    Animation {
        /// Control name.
        control: String,
        /// Which animation.
        kind: Animation,
    },
    /// An animation was stopped early.
    AnimationCancelled {
        /// Control name.
        control: String,
        /// Which animation.
        kind: Animation,
    },
    /// Attention state changed.
    Attention {
        /// Control name.
        control: String,
        /// New state.
        on: bool,
    },
}

/// [`Effects`] that forward every side effect over a channel.
#[derive(Debug, Clone)]
pub struct ChannelEffects {
    /// Event sink.
    tx: Sender<SurfaceEvent>,
    /// Known pages; `None` accepts any page.
    pages: Option<Vec<String>>,
}

impl ChannelEffects {
    /// Forward effects to `tx`, accepting any page.
    pub fn new(tx: Sender<SurfaceEvent>) -> Self {
        Self { tx, pages: None }
    }

    /// Only accept page changes to `pages`.
    #[must_use]
    pub fn with_pages<S: Into<String>>(mut self, pages: impl IntoIterator<Item = S>) -> Self {
        self.pages = Some(pages.into_iter().map(Into::into).collect());
        self
    }

    /// Send one event; a closed receiver is traced and ignored.
    fn send(&self, event: SurfaceEvent) {
        if let Err(e) = self.tx.send(event) {
            trace!(event = ?e.0, "surface_event_dropped");
        }
    }
}

/// Reports cancellation of a channel-delivered animation.
struct ChannelAnimation {
    /// Event sink.
    tx: Sender<SurfaceEvent>,
    /// Control name.
    control: String,
    /// Which animation.
    kind: Animation,
}

impl AnimationHandle for ChannelAnimation {
    fn cancel(&mut self) {
        let event = SurfaceEvent::AnimationCancelled {
            control: self.control.clone(),
            kind: self.kind,
        };
        if self.tx.send(event).is_err() {
            trace!(control = %self.control, "surface_event_dropped");
        }
    }
}

impl Effects for ChannelEffects {
    fn trigger_action(&self, action: &str) {
        info!(action, "action_triggered");
        self.send(SurfaceEvent::Action(action.to_string()));
    }

    fn show_message(&self, text: &str) {
        self.send(SurfaceEvent::Message(text.to_string()));
    }

    fn request_page(&self, page: &str) -> bool {
        let known = self
            .pages
            .as_ref()
            .is_none_or(|pages| pages.iter().any(|p| p == page));
        if known {
            self.send(SurfaceEvent::Page(page.to_string()));
        }
        known
    }

    fn return_to_last_page(&self) {
        self.send(SurfaceEvent::LastPage);
    }

    fn refresh(&self) {
        self.send(SurfaceEvent::Refresh);
    }

    fn set_color(&self, control: &str, color: &Value) {
        self.send(SurfaceEvent::Color {
            control: control.to_string(),
            color: color.clone(),
        });
    }

    fn start_animation(&self, control: &str, kind: Animation) -> Box<dyn AnimationHandle> {
        self.send(SurfaceEvent::Animation {
            control: control.to_string(),
            kind,
        });
        Box::new(ChannelAnimation {
            tx: self.tx.clone(),
            control: control.to_string(),
            kind,
        })
    }

    fn set_attention(&self, control: &str, on: bool) {
        self.send(SurfaceEvent::Attention {
            control: control.to_string(),
            on,
        });
    }
}
