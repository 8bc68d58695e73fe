//! Shared event contract types between the dispatch runtime and composed UI components.
//!
//! This crate is intentionally runtime-agnostic. It defines serializable event names,
//! propagation options, per-dispatch envelopes, and the static event-name → payload-shape
//! table used by typed dispatch, without depending on any tree or listener runtime.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Identifier for an event type, such as `value-changed` or `install-state`.
///
/// Names are never validated against any registry: dispatching a name nobody listens
/// for is an ordinary no-op. The only structural requirements are that the name is
/// non-empty and contains no ASCII whitespace or uppercase letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventName(String);

impl EventName {
    /// Returns an event name when `raw` is a non-empty lowercase identifier without
    /// whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        if is_valid_event_name(&raw) {
            Ok(Self(raw))
        } else {
            Err(format!(
                "invalid event name `{raw}`; expected a non-empty lowercase identifier without whitespace"
            ))
        }
    }

    /// Creates a name without validation for compile-time trusted constants.
    pub fn trusted(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the string form of the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_valid_event_name(raw: &str) -> bool {
    !raw.is_empty()
        && !raw
            .bytes()
            .any(|b| b.is_ascii_whitespace() || b.is_ascii_uppercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
/// Propagation flags attached to a dispatched event.
///
/// Every flag defaults to `true`, both in [`Default`] and when deserializing a
/// partial options object.
pub struct DispatchOptions {
    /// Whether the event propagates to ancestor targets after the origin target.
    pub bubbles: bool,
    /// Whether listeners may mark the event's default action as prevented.
    pub cancelable: bool,
    /// Whether the event crosses encapsulation boundaries while bubbling.
    pub composed: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            bubbles: true,
            cancelable: true,
            composed: true,
        }
    }
}

impl DispatchOptions {
    /// Replaces the `bubbles` flag.
    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    /// Replaces the `cancelable` flag.
    pub fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    /// Replaces the `composed` flag.
    pub fn with_composed(mut self, composed: bool) -> Self {
        self.composed = composed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Immutable envelope describing one occurrence of a named event.
///
/// A descriptor is created fresh per dispatch call and has no identity or lifecycle
/// beyond that single delivery. The payload, when present, is carried verbatim; the
/// dispatcher never inspects or transforms it.
pub struct EventDescriptor {
    /// Event type identifier.
    pub name: EventName,
    /// Optional structured payload for listeners to read.
    pub payload: Option<Value>,
    /// Propagation flags for this occurrence.
    pub options: DispatchOptions,
}

impl EventDescriptor {
    /// Creates a payload-less descriptor with default propagation flags.
    pub fn new(name: EventName) -> Self {
        Self {
            name,
            payload: None,
            options: DispatchOptions::default(),
        }
    }

    /// Attaches a payload to the descriptor.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Replaces the propagation flags.
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }
}

/// Static mapping from a recognized event name to its payload shape.
///
/// Implementations pin a compile-time name to a payload type so that typed dispatch
/// cannot pair a name with the wrong payload. Payload conversion is infallible by
/// construction (`Into<Value>`); a payload that converts to JSON `null` is treated
/// as "no payload".
pub trait EventKind {
    /// Stable event name for this kind.
    const NAME: &'static str;
    /// Payload shape carried by this kind.
    type Payload: Into<Value>;
}

/// Builds a descriptor for a typed event kind with default propagation flags.
pub fn descriptor_for<E: EventKind>(payload: E::Payload) -> EventDescriptor {
    descriptor_for_with::<E>(payload, DispatchOptions::default())
}

/// Builds a descriptor for a typed event kind with explicit propagation flags.
pub fn descriptor_for_with<E: EventKind>(
    payload: E::Payload,
    options: DispatchOptions,
) -> EventDescriptor {
    let payload = match payload.into() {
        Value::Null => None,
        value => Some(value),
    };
    EventDescriptor {
        name: EventName::trusted(E::NAME),
        payload,
        options,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Payload for the `value-changed` control event.
pub struct ValueChanged {
    /// New committed control value.
    pub value: Value,
}

impl EventKind for ValueChanged {
    const NAME: &'static str = "value-changed";
    type Payload = Self;
}

impl From<ValueChanged> for Value {
    fn from(payload: ValueChanged) -> Self {
        json!({ "value": payload.value })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Payload for the `input-edited` control event emitted while text is being edited.
pub struct InputEdited {
    /// Current in-progress text.
    pub text: String,
}

impl EventKind for InputEdited {
    const NAME: &'static str = "input-edited";
    type Payload = Self;
}

impl From<InputEdited> for Value {
    fn from(payload: InputEdited) -> Self {
        json!({ "text": payload.text })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Marker for the payload-less `pressed` control event.
pub struct Pressed;

impl EventKind for Pressed {
    const NAME: &'static str = "pressed";
    type Payload = Self;
}

impl From<Pressed> for Value {
    fn from(_: Pressed) -> Self {
        Value::Null
    }
}
