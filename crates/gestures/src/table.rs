use std::{fmt, str::FromStr};

use surface_config::{ActionBundle, Cascade, KEY_SEPARATOR, Map, ModeSnapshot};

use crate::GestureError;

/// A named physical input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    /// Control went down.
    Pressed,
    /// Control has been held past the hold delay.
    PressedDelayed,
    /// Control came up.
    Released,
    /// Control came up after the hold delay.
    ReleasedDelayed,
    /// Control came up before the hold delay.
    ReleasedImmediately,
    /// Two presses within the double-click window.
    DoubleClicked,
}

impl Gesture {
    /// Every gesture, in a stable order.
    pub const ALL: [Self; 6] = [
        Self::Pressed,
        Self::PressedDelayed,
        Self::Released,
        Self::ReleasedDelayed,
        Self::ReleasedImmediately,
        Self::DoubleClicked,
    ];

    /// Configuration name of this gesture.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pressed => "pressed",
            Self::PressedDelayed => "pressed_delayed",
            Self::Released => "released",
            Self::ReleasedDelayed => "released_delayed",
            Self::ReleasedImmediately => "released_immediately",
            Self::DoubleClicked => "double_clicked",
        }
    }

    /// Gestures that need a minimum intensity to register.
    pub fn is_on(self) -> bool {
        matches!(
            self,
            Self::Pressed | Self::PressedDelayed | Self::DoubleClicked
        )
    }

    /// Gestures that need a registered press to fire.
    pub fn is_off(self) -> bool {
        !self.is_on()
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Gesture {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// One gesture-table entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The key as written, e.g. `pressed__shift__select`.
    pub key: String,
    /// Gesture this entry answers.
    pub gesture: Gesture,
    /// Required modes, sorted.
    pub modes: Vec<String>,
    /// Position in the configuration.
    pub order: usize,
    /// What to run.
    pub bundle: ActionBundle,
}

impl Entry {
    /// Specificity key: more modes first, then later declarations.
    fn rank(&self) -> (usize, usize) {
        (self.modes.len(), self.order)
    }
}

/// Gesture-to-action table for one control. Built once; never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureTable {
    /// Entries in declaration order.
    entries: Vec<Entry>,
    /// Union of modes named by any entry, sorted.
    concerned: Vec<String>,
}

impl GestureTable {
    /// Build a table from a `gestures` mapping.
    ///
    /// Keys are `gesture[__mode...]`. Every mode must appear in `modes`.
    pub fn from_config(gestures: &Map, modes: &ModeSnapshot) -> Result<Self, GestureError> {
        let mut entries = Vec::with_capacity(gestures.len());
        for (order, (key, value)) in gestures.iter().enumerate() {
            let mut parts = key.split(KEY_SEPARATOR).filter(|p| !p.is_empty());
            let head = parts.next().unwrap_or_default();
            let gesture = head
                .parse::<Gesture>()
                .map_err(|()| GestureError::UnknownGesture {
                    key: key.clone(),
                    gesture: head.to_string(),
                })?;
            let mut required = Vec::new();
            for mode in parts {
                if !modes.is_declared(mode) {
                    return Err(GestureError::UnknownMode {
                        key: key.clone(),
                        mode: mode.to_string(),
                    });
                }
                required.push(mode.to_string());
            }
            required.sort_unstable();
            required.dedup();
            let bundle = ActionBundle::from_value(value).map_err(|source| GestureError::Bundle {
                key: key.clone(),
                source,
            })?;
            entries.push(Entry {
                key: key.clone(),
                gesture,
                modes: required,
                order,
                bundle,
            });
        }
        let mut concerned: Vec<String> = entries.iter().flat_map(|e| e.modes.clone()).collect();
        concerned.sort_unstable();
        concerned.dedup();
        Ok(Self { entries, concerned })
    }

    /// Modes any entry depends on.
    pub fn concerned_modes(&self) -> &[String] {
        &self.concerned
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// True when the table answers no gesture.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if some entry answers `gesture`, in any mode.
    pub fn handles(&self, gesture: Gesture) -> bool {
        self.entries.iter().any(|e| e.gesture == gesture)
    }

    /// Pick the entries that fire for `gesture` under `snapshot`.
    ///
    /// Without cascade, the single most mode-specific entry wins, ties going
    /// to the later declaration. With cascade every matching entry fires,
    /// least specific first for `Down` and most specific first for `Up`.
    pub fn select(&self, gesture: Gesture, snapshot: &ModeSnapshot, cascade: Cascade) -> Vec<&Entry> {
        let mut candidates: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|e| e.gesture == gesture && e.modes.iter().all(|m| snapshot.is_active(m)))
            .collect();
        candidates.sort_by_key(|e| e.rank());
        match cascade {
            Cascade::Down => candidates,
            Cascade::Up => {
                candidates.reverse();
                candidates
            }
            Cascade::Off => candidates.pop().into_iter().collect(),
        }
    }
}
