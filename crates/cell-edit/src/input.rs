//! Mapping of host key/blur signals onto lifecycle operations.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A key as delivered by the host, named the way DOM `KeyboardEvent.key` names it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Char(char),
    Other(String),
}

impl Key {
    /// Map a legacy numeric key code.
    pub fn from_key_code(code: u32) -> Self {
        match code {
            8 => Key::Backspace,
            9 => Key::Tab,
            13 => Key::Enter,
            27 => Key::Escape,
            46 => Key::Delete,
            other => match char::from_u32(other) {
                Some(ch) if !ch.is_control() => Key::Char(ch),
                _ => Key::Other(format!("KeyCode{other}")),
            },
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Enter => f.write_str("Enter"),
            Key::Escape => f.write_str("Escape"),
            Key::Tab => f.write_str("Tab"),
            Key::Backspace => f.write_str("Backspace"),
            Key::Delete => f.write_str("Delete"),
            Key::Char(ch) => write!(f, "{ch}"),
            Key::Other(name) => f.write_str(name),
        }
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            "" => return Err("empty key name".to_string()),
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            "Tab" => Key::Tab,
            "Backspace" => Key::Backspace,
            "Delete" | "Del" => Key::Delete,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Key::Char(ch),
                    _ => Key::Other(other.to_string()),
                }
            }
        };
        Ok(key)
    }
}

impl TryFrom<String> for Key {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

/// Raw signal forwarded by the host while an editing surface is open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSignal {
    KeyDown(Key),
    KeyUp(Key),
    Blur,
}

impl InputSignal {
    pub fn is_key(&self) -> bool {
        !matches!(self, InputSignal::Blur)
    }
}

/// Lifecycle operation a signal is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Store,
    Cancel,
    Revert,
    Close,
}

/// Configurable signal → action table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyBindings {
    pub key_down: BTreeMap<Key, Action>,
    pub key_up: BTreeMap<Key, Action>,
    pub blur: Option<Action>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            key_down: BTreeMap::from([(Key::Escape, Action::Revert), (Key::Enter, Action::Store)]),
            key_up: BTreeMap::new(),
            blur: Some(Action::Store),
        }
    }
}

impl KeyBindings {
    /// Bindings that never act; only live dirty tracking remains.
    pub fn none() -> Self {
        Self {
            key_down: BTreeMap::new(),
            key_up: BTreeMap::new(),
            blur: None,
        }
    }

    pub fn resolve(&self, signal: &InputSignal) -> Option<Action> {
        match signal {
            InputSignal::KeyDown(key) => self.key_down.get(key).copied(),
            InputSignal::KeyUp(key) => self.key_up.get(key).copied(),
            InputSignal::Blur => self.blur,
        }
    }
}

/// What routing a signal did, handed back so host callbacks can follow up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteOutcome {
    pub signal: InputSignal,
    /// Live dirty state after re-evaluating the surface text (key signals only).
    pub live_dirty: Option<bool>,
    pub action: Option<Action>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_match_legacy_keys() {
        let bindings = KeyBindings::default();
        assert_eq!(
            bindings.resolve(&InputSignal::KeyDown(Key::Escape)),
            Some(Action::Revert)
        );
        assert_eq!(
            bindings.resolve(&InputSignal::KeyDown(Key::Enter)),
            Some(Action::Store)
        );
        assert_eq!(bindings.resolve(&InputSignal::Blur), Some(Action::Store));
        assert_eq!(bindings.resolve(&InputSignal::KeyUp(Key::Enter)), None);
        assert_eq!(bindings.resolve(&InputSignal::KeyDown(Key::Char('x'))), None);
    }

    #[test]
    fn key_codes_map_to_named_keys() {
        assert_eq!(Key::from_key_code(27), Key::Escape);
        assert_eq!(Key::from_key_code(13), Key::Enter);
        assert_eq!(Key::from_key_code(65), Key::Char('A'));
        assert_eq!(Key::from_key_code(0), Key::Other("KeyCode0".to_string()));
    }

    #[test]
    fn bindings_deserialize_from_partial_json() {
        let bindings: KeyBindings = serde_json::from_str(
            r#"{ "keyDown": { "Escape": "cancel", "Tab": "store" }, "blur": null }"#,
        )
        .unwrap();

        assert_eq!(
            bindings.resolve(&InputSignal::KeyDown(Key::Escape)),
            Some(Action::Cancel)
        );
        assert_eq!(
            bindings.resolve(&InputSignal::KeyDown(Key::Tab)),
            Some(Action::Store)
        );
        assert_eq!(bindings.resolve(&InputSignal::KeyDown(Key::Enter)), None);
        assert_eq!(bindings.resolve(&InputSignal::Blur), None);
        assert!(bindings.key_up.is_empty());
    }

    #[test]
    fn key_names_round_trip_through_strings() {
        for name in ["Enter", "Escape", "q", "ArrowLeft"] {
            let key: Key = name.parse().unwrap();
            assert_eq!(key.to_string(), name);
        }
        assert!("".parse::<Key>().is_err());
    }
}
