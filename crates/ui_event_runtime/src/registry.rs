//! Component registry mapping validated tags to composed primitive definitions.
//!
//! Components are composed, not subclassed: a definition names a base primitive kind
//! and the style layers stacked on top of it, and instantiation creates an ordinary
//! dispatch target carrying the tag. Rendering is owned by the host UI framework.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    dispatch::DispatchError,
    model::{EventTree, TargetId},
};

/// Validated tag for a registered composed component, such as `ew-divider`.
///
/// Tags follow the custom-component naming policy: lowercase ASCII segments of
/// letters, digits, and dashes, with at least one dash separating segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentTag(String);

impl ComponentTag {
    /// Returns a component tag when `raw` conforms to the dashed-segment policy.
    pub fn new(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        if is_valid_component_tag(&raw) {
            Ok(Self(raw))
        } else {
            Err(format!(
                "invalid component tag `{raw}`; expected lowercase dashed segments"
            ))
        }
    }

    /// Creates a tag without validation for compile-time trusted constants.
    pub fn trusted(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the string form of the tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ComponentTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_valid_component_tag(raw: &str) -> bool {
    if raw.is_empty() || raw.len() > 64 || !raw.contains('-') {
        return false;
    }

    for part in raw.split('-') {
        if part.is_empty() {
            return false;
        }
        let bytes = part.as_bytes();
        if !bytes[0].is_ascii_lowercase() {
            return false;
        }
        if !bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return false;
        }
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Base primitive kinds a composed component can wrap.
pub enum BaseKind {
    /// Clickable button primitive.
    Button,
    /// Visual separator primitive.
    Divider,
    /// Single-line text input primitive.
    TextField,
}

impl BaseKind {
    /// Returns a stable string token for debugging and persistence hooks.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Divider => "divider",
            Self::TextField => "text-field",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Definition of one composed component: a base primitive plus stacked style layers.
pub struct ComponentSpec {
    /// Tag the component is registered under.
    pub tag: ComponentTag,
    /// Wrapped base primitive.
    pub base: BaseKind,
    /// Style layer names applied over the base, in stacking order.
    pub style_layers: Vec<&'static str>,
}

impl ComponentSpec {
    /// Creates a definition with no style layers.
    pub fn new(tag: ComponentTag, base: BaseKind) -> Self {
        Self {
            tag,
            base,
            style_layers: Vec::new(),
        }
    }

    /// Appends a style layer on top of the current stack.
    pub fn with_style_layer(mut self, layer: &'static str) -> Self {
        self.style_layers.push(layer);
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors surfaced by component registration and instantiation.
pub enum RegistryError {
    /// The tag already has a registered definition.
    #[error("component tag `{0}` is already defined")]
    DuplicateTag(String),
    /// The tag has no registered definition.
    #[error("component tag `{0}` is not defined")]
    UnknownTag(String),
    /// The supplied parent target cannot accept a dispatched event.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Default)]
/// Registry of composed component definitions keyed by tag.
pub struct ComponentRegistry {
    components: BTreeMap<String, ComponentSpec>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component definition.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateTag`] when the tag is already defined.
    pub fn define(&mut self, spec: ComponentSpec) -> Result<(), RegistryError> {
        let key = spec.tag.as_str().to_string();
        if self.components.contains_key(&key) {
            return Err(RegistryError::DuplicateTag(key));
        }
        self.components.insert(key, spec);
        Ok(())
    }

    /// Looks up the definition registered under `tag`.
    pub fn get(&self, tag: &ComponentTag) -> Option<&ComponentSpec> {
        self.components.get(tag.as_str())
    }

    /// Iterates registered tags in lexical order.
    pub fn tags(&self) -> impl Iterator<Item = &ComponentTag> {
        self.components.values().map(|spec| &spec.tag)
    }

    /// Creates a dispatch target for a registered component, nested under `parent`
    /// when one is given.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownTag`] when the tag was never defined, or
    /// [`RegistryError::Dispatch`] when `parent` is stale.
    pub fn instantiate(
        &self,
        tree: &EventTree,
        tag: &ComponentTag,
        parent: Option<TargetId>,
    ) -> Result<TargetId, RegistryError> {
        let spec = self
            .get(tag)
            .ok_or_else(|| RegistryError::UnknownTag(tag.as_str().to_string()))?;
        let target = match parent {
            Some(parent) => tree.create_child(parent)?,
            None => tree.create_target(),
        };
        tree.set_component(target, spec.tag.clone());
        Ok(target)
    }
}
