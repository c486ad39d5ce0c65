//! Surface-wide names visible to every expression.

/// Read-only globals shared by every control on one surface.
///
/// Expressions see them as `this_cs` (surface name), `sel_track` (name of
/// the selected track, or unit when nothing is selected) and `ring` (the
/// session ring's left edge). Declared variables may shadow them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Globals {
    /// Surface name.
    pub surface: String,
    /// Name of the selected track.
    pub selected_track: Option<String>,
    /// Session ring left edge.
    pub ring_offset: u32,
}

impl Globals {
    /// Globals for a surface called `surface`, with no selection.
    pub fn new(surface: impl Into<String>) -> Self {
        Self {
            surface: surface.into(),
            ..Self::default()
        }
    }
}
