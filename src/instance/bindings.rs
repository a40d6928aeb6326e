//! Element bindings — explicit render-target wiring.
//!
//! Tools declare a name→element-id map; binding resolves every declared
//! entry against the render target passed in at construction time. Nothing
//! is looked up ambiently, and the core validates nothing about the target
//! beyond the existence of declared element ids.

use std::collections::HashMap;

use crate::task::protocol::TaskResult;
use crate::types::{Error, Result};

/// One declared entry in a tool's element map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementSpec {
    /// Name the tool code uses to refer to the element.
    pub name: &'static str,
    /// Element id expected to exist in the injected template.
    pub element_id: &'static str,
    /// Missing required elements fail binding; optional ones are skipped.
    pub required: bool,
}

impl ElementSpec {
    pub const fn required(name: &'static str, element_id: &'static str) -> Self {
        Self {
            name,
            element_id,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, element_id: &'static str) -> Self {
        Self {
            name,
            element_id,
            required: false,
        }
    }
}

/// Resolved handle to one bound element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    element_id: String,
}

impl ElementHandle {
    pub fn element_id(&self) -> &str {
        &self.element_id
    }
}

/// The surface the instance renders into.
///
/// Implemented by the embedding page/shell; the core drives it and never
/// reaches around it.
pub trait RenderTarget: Send {
    /// Whether an element with this id exists in the injected template.
    fn has_element(&self, element_id: &str) -> bool;

    /// Mirror an activity-log line.
    fn append_log(&mut self, line: &str);

    /// Show the progress indicator at `percent` with a stage label.
    fn set_progress(&mut self, percent: f64, stage: &str);

    /// Hide the progress indicator.
    fn hide_progress(&mut self);

    /// Render a completed result. Prior results are replaced, not cleared
    /// on failure.
    fn render_result(&mut self, result: &TaskResult);

    /// Enable or disable the processing action control.
    fn set_action_enabled(&mut self, enabled: bool);
}

/// Name→handle map resolved at bind time.
#[derive(Debug, Clone, Default)]
pub struct ElementBindings {
    by_name: HashMap<&'static str, ElementHandle>,
}

impl ElementBindings {
    /// Resolve a declared element map against a render target.
    ///
    /// Fails with [`Error::Binding`] naming every missing required element;
    /// missing optional elements are skipped.
    pub fn resolve(specs: &[ElementSpec], target: &dyn RenderTarget) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(specs.len());
        let mut missing = Vec::new();

        for spec in specs {
            if target.has_element(spec.element_id) {
                by_name.insert(
                    spec.name,
                    ElementHandle {
                        element_id: spec.element_id.to_string(),
                    },
                );
            } else if spec.required {
                missing.push(format!("{} (#{})", spec.name, spec.element_id));
            }
        }

        if !missing.is_empty() {
            return Err(Error::binding(format!(
                "required elements missing: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { by_name })
    }

    pub fn get(&self, name: &str) -> Option<&ElementHandle> {
        self.by_name.get(name)
    }

    /// Get a handle that binding guaranteed to exist.
    pub fn require(&self, name: &str) -> Result<&ElementHandle> {
        self.by_name
            .get(name)
            .ok_or_else(|| Error::binding(format!("element '{name}' was not bound")))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Target double backed by a set of known element ids.
    struct SetTarget(HashSet<&'static str>);

    impl RenderTarget for SetTarget {
        fn has_element(&self, element_id: &str) -> bool {
            self.0.contains(element_id)
        }
        fn append_log(&mut self, _line: &str) {}
        fn set_progress(&mut self, _percent: f64, _stage: &str) {}
        fn hide_progress(&mut self) {}
        fn render_result(&mut self, _result: &TaskResult) {}
        fn set_action_enabled(&mut self, _enabled: bool) {}
    }

    const SPECS: &[ElementSpec] = &[
        ElementSpec::required("dropZone", "dropZone"),
        ElementSpec::required("processBtn", "processBtn"),
        ElementSpec::optional("preview", "preview"),
    ];

    #[test]
    fn resolves_all_declared_elements() {
        let target = SetTarget(["dropZone", "processBtn", "preview"].into());
        let bindings = ElementBindings::resolve(SPECS, &target).unwrap();
        assert_eq!(bindings.len(), 3);
        assert_eq!(
            bindings.require("processBtn").unwrap().element_id(),
            "processBtn"
        );
    }

    #[test]
    fn missing_required_element_fails_binding() {
        let target = SetTarget(["dropZone"].into());
        let err = ElementBindings::resolve(SPECS, &target).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("processBtn"));
        assert!(!msg.contains("dropZone (#"));
    }

    #[test]
    fn missing_optional_element_is_skipped() {
        let target = SetTarget(["dropZone", "processBtn"].into());
        let bindings = ElementBindings::resolve(SPECS, &target).unwrap();
        assert_eq!(bindings.len(), 2);
        assert!(bindings.get("preview").is_none());
        assert!(bindings.require("preview").is_err());
    }
}
