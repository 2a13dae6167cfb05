use std::collections::BTreeMap;

pub const KEY_PAUSE_ON_IDLE: &str = "node.pause-on-idle";
pub const KEY_DRIVER: &str = "node.driver";
pub const KEY_MEDIA_CLASS: &str = "media.class";
pub const KEY_NODE_SESSION: &str = "node.session";
pub const KEY_NODE_NAME: &str = "node.name";
pub const KEY_NODE_ID: &str = "node.id";

/// A small string-keyed, string-valued property bag.
///
/// Mirrors `node.c`'s `pw_properties`, minus the refcounting: dicts here are
/// owned and cloned on write, which this crate's property sets are small
/// enough to afford.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    map: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.map.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.map.remove(key)
    }

    /// Merge `other` into `self`, overwriting on key collision. Returns
    /// whether anything actually changed.
    pub fn merge(&mut self, other: &Properties) -> bool {
        let mut changed = false;
        for (k, v) in &other.map {
            if self.map.get(k) != Some(v) {
                self.map.insert(k.clone(), v.clone());
                changed = true;
            }
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// `node.pause-on-idle`, default true. Controls whether a node is paused
/// automatically when it reaches `Idle`.
pub fn pause_on_idle(props: &Properties) -> bool {
    props
        .get(KEY_PAUSE_ON_IDLE)
        .map(|v| parse_bool(v, true))
        .unwrap_or(true)
}

/// `node.driver`, default false. Whether the node is allowed to head a
/// driver group of its own accord.
pub fn is_driver(props: &Properties) -> bool {
    props
        .get(KEY_DRIVER)
        .map(|v| parse_bool(v, false))
        .unwrap_or(false)
}
