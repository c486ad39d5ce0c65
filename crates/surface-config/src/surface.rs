//! The top-level configuration document.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::{
    ControlDefinition, EncoderDefinition, Error, Result, TemplateCompiler, TemplateLibrary,
    section::{Coord, Section},
    value::Map,
};

/// Default minimum velocity for on-class gestures.
pub const DEFAULT_ON_THRESHOLD: u8 = 30;

/// Process-wide behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Promote every configuration error to critical.
    pub strict: bool,
    /// Abort the rest of an action bundle when one item fails.
    pub abort_on_failure: bool,
    /// Log failed bindings at `warn` instead of `debug`.
    pub log_failed_bindings: bool,
    /// Minimum velocity for on-class gestures when a control sets none.
    pub on_threshold: u8,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            strict: false,
            abort_on_failure: true,
            log_failed_bindings: false,
            on_threshold: DEFAULT_ON_THRESHOLD,
        }
    }
}

impl Preferences {
    /// Error policy implied by these preferences.
    pub fn policy(&self) -> crate::Policy {
        crate::Policy {
            strict: self.strict,
        }
    }
}

/// One section as written in configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SectionConfig {
    /// Section name.
    pub name: String,
    /// Explicit coordinates, as `[row, col]` pairs.
    #[serde(default)]
    pub coordinates: Option<Vec<(u32, u32)>>,
    /// Inclusive `[first, last]` rows, used with `cols`.
    #[serde(default)]
    pub rows: Option<(u32, u32)>,
    /// Inclusive `[first, last]` columns, used with `rows`.
    #[serde(default)]
    pub cols: Option<(u32, u32)>,
    /// Layer applied beneath every control in this section.
    #[serde(default)]
    pub template: Map,
    /// Control list, or a single mapping applied to every pad.
    #[serde(default)]
    pub controls: Value,
}

impl SectionConfig {
    /// Build the section geometry.
    pub fn section(&self) -> Result<Section> {
        match (&self.coordinates, self.rows, self.cols) {
            (Some(coords), None, None) => Section::new(
                self.name.clone(),
                coords.iter().map(|&(r, c)| Coord::new(r, c)).collect(),
            ),
            (None, Some(rows), Some(cols)) if rows.0 <= rows.1 && cols.0 <= cols.1 => {
                Section::rect(self.name.clone(), rows, cols)
            }
            _ => Err(Error::critical(
                "a section needs either `coordinates` or valid `rows` and `cols`",
            )
            .at(self.name.clone())),
        }
    }
}

/// The whole configuration for one surface instance.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Surface name, visible to expressions as `this_cs`.
    pub name: String,
    /// Declared mode names.
    pub modes: Vec<String>,
    /// Layer applied beneath every control.
    pub global_template: Map,
    /// Named templates.
    pub templates: Map,
    /// Matrix sections.
    pub sections: Vec<SectionConfig>,
    /// Named (non-matrix) controls.
    pub named_controls: Map,
    /// Encoders.
    pub encoders: Map,
    /// Behavior switches.
    pub preferences: Preferences,
}

impl SurfaceConfig {
    /// Parse a configuration document. Shape errors are critical.
    pub fn from_value(v: Value) -> Result<Self> {
        serde_json::from_value(v)
            .map_err(|e| Error::critical(format!("malformed configuration: {e}")))
    }

    /// Parse configuration text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::critical(format!("malformed configuration: {e}")))
    }

    /// Expand every section, named control and encoder into definitions.
    ///
    /// Control names must be unique across sections and named controls.
    pub fn compile(&self) -> Result<CompiledSurface> {
        let library = TemplateLibrary::new(self.global_template.clone(), self.templates.clone())?;
        let compiler = TemplateCompiler::new(&library, self.preferences.policy());

        let mut controls = Vec::new();
        for sc in &self.sections {
            let section = sc.section()?;
            let template = (!sc.template.is_empty()).then_some(&sc.template);
            controls.extend(compiler.compile_section(&section, template, &sc.controls)?);
        }
        controls.extend(compiler.compile_named(NAMED_SECTION, &self.named_controls)?);

        let mut seen = HashSet::new();
        if let Some(dup) = controls.iter().find(|c| !seen.insert(c.name.as_str())) {
            return Err(
                Error::critical(format!("multiple definitions for {}", dup.name)).at(dup.name.clone())
            );
        }

        let encoders = compiler.compile_encoders(&self.encoders)?;
        info!(
            controls = controls.len(),
            encoders = encoders.len(),
            placeholders = controls.iter().filter(|c| c.is_placeholder()).count(),
            "surface_compiled"
        );
        let name = if self.name.is_empty() {
            DEFAULT_SURFACE_NAME.to_string()
        } else {
            self.name.clone()
        };
        Ok(CompiledSurface {
            name,
            controls,
            encoders,
        })
    }
}

/// Name used when a configuration does not give one.
pub const DEFAULT_SURFACE_NAME: &str = "surface";

/// Section name recorded on named controls.
pub const NAMED_SECTION: &str = "named";

/// Every definition produced from one [`SurfaceConfig`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledSurface {
    /// Surface name.
    pub name: String,
    /// Pads and named controls, sections first.
    pub controls: Vec<ControlDefinition>,
    /// Encoders in declaration order.
    pub encoders: Vec<EncoderDefinition>,
}

impl CompiledSurface {
    /// Look up a control by name.
    pub fn control(&self, name: &str) -> Option<&ControlDefinition> {
        self.controls.iter().find(|c| c.name == name)
    }

    /// Look up an encoder by name.
    pub fn encoder(&self, name: &str) -> Option<&EncoderDefinition> {
        self.encoders.iter().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn preference_defaults() {
        let c = SurfaceConfig::from_value(json!({})).unwrap();
        assert_eq!(c.preferences, Preferences::default());
        assert!(c.preferences.abort_on_failure);
        assert_eq!(c.preferences.on_threshold, 30);

        let c = SurfaceConfig::from_value(json!({"preferences": {"strict": true}})).unwrap();
        assert!(c.preferences.strict);
        assert!(c.preferences.abort_on_failure);
        assert!(c.preferences.policy().strict);
    }

    #[test]
    fn section_geometry() {
        let c = SurfaceConfig::from_value(json!({
            "sections": [
                {"name": "grid", "rows": [0, 1], "cols": [0, 3]},
                {"name": "edge", "coordinates": [[7, 0], [7, 1]]},
                {"name": "broken"}
            ]
        }))
        .unwrap();
        assert_eq!(c.sections[0].section().unwrap().len(), 8);
        assert_eq!(c.sections[1].section().unwrap().len(), 2);
        let err = c.sections[2].section().unwrap_err();
        assert!(err.is_critical());
        assert_eq!(err.location(), Some("broken"));
    }

    #[test]
    fn surface_name_defaults() {
        let c = SurfaceConfig::from_value(json!({})).unwrap();
        assert_eq!(c.compile().unwrap().name, DEFAULT_SURFACE_NAME);

        let c = SurfaceConfig::from_value(json!({"name": "pad_grid"})).unwrap();
        assert_eq!(c.compile().unwrap().name, "pad_grid");
    }

    #[test]
    fn malformed_document_is_critical() {
        let err = SurfaceConfig::from_value(json!({"sections": {"a": 1}})).unwrap_err();
        assert!(err.is_critical());
    }
}
