//! Scratch record
//!
//! Normalized lines talk to the engine through dot-prefixed slots that no
//! user identifier can spell: `.args`, `.send`, `.4`, `.continue8`, ...

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::values::{ExcVal, Val};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SlotKey {
    /// Argument stack
    Args,
    /// Pending send value; reading it takes it
    Send,
    /// Iterator of the loop header at this indent
    Tracked(usize),
    /// Evaluated decorators awaiting application
    Decorator,
    /// Loop-adjust sentinel of the loop at this indent
    Continue(usize),
    /// Loop variable of a delegating suspension
    Yielded,
    /// Loop variable of the single-pass wrapper
    Once,
}

impl SlotKey {
    /// Parse a spelling such as `.args` or `.12`
    pub fn parse(spelling: &str) -> Option<Self> {
        let name = spelling.strip_prefix('.')?;
        match name {
            "args" => Some(SlotKey::Args),
            "send" => Some(SlotKey::Send),
            "decorator" => Some(SlotKey::Decorator),
            "yielded" => Some(SlotKey::Yielded),
            "once" => Some(SlotKey::Once),
            _ => {
                if let Some(indent) = name.strip_prefix("continue") {
                    return indent.parse().ok().map(SlotKey::Continue);
                }
                if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) {
                    return name.parse().ok().map(SlotKey::Tracked);
                }
                None
            }
        }
    }

    pub fn spelling(&self) -> String {
        match self {
            SlotKey::Args => ".args".to_string(),
            SlotKey::Send => ".send".to_string(),
            SlotKey::Tracked(indent) => format!(".{}", indent),
            SlotKey::Decorator => ".decorator".to_string(),
            SlotKey::Continue(indent) => format!(".continue{}", indent),
            SlotKey::Yielded => ".yielded".to_string(),
            SlotKey::Once => ".once".to_string(),
        }
    }

    /// Value a slot holds before anything was stored in it
    fn initial(&self) -> Val {
        match self {
            SlotKey::Args | SlotKey::Decorator => Val::List(Vec::new()),
            SlotKey::Continue(_) => Val::Bool(false),
            _ => Val::None,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spelling())
    }
}

impl From<SlotKey> for String {
    fn from(key: SlotKey) -> Self {
        key.spelling()
    }
}

impl TryFrom<String> for SlotKey {
    type Error = String;

    fn try_from(spelling: String) -> Result<Self, Self::Error> {
        SlotKey::parse(&spelling).ok_or_else(|| format!("unknown scratch slot `{}`", spelling))
    }
}

/// Auxiliary state owned by one generator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scratch {
    slots: BTreeMap<SlotKey, Val>,
    /// Exception being handled when the generator suspended
    handled: Option<ExcVal>,
}

impl Scratch {
    pub fn get(&self, key: SlotKey) -> Option<&Val> {
        self.slots.get(&key)
    }

    /// Evaluate a slot read; `.send` is consumed
    pub fn read(&mut self, key: SlotKey) -> Option<Val> {
        match key {
            SlotKey::Send => Some(self.slots.remove(&key).unwrap_or(Val::None)),
            SlotKey::Args | SlotKey::Decorator | SlotKey::Continue(_) => {
                Some(self.slots.get(&key).cloned().unwrap_or_else(|| key.initial()))
            }
            _ => self.slots.get(&key).cloned(),
        }
    }

    pub fn set(&mut self, key: SlotKey, value: Val) {
        self.slots.insert(key, value);
    }

    pub fn remove(&mut self, key: SlotKey) -> Option<Val> {
        self.slots.remove(&key)
    }

    /// Mutable access, creating the slot with its initial value if needed
    pub fn slot_mut(&mut self, key: SlotKey) -> &mut Val {
        self.slots.entry(key).or_insert_with(|| key.initial())
    }

    pub fn args(&self) -> &[Val] {
        match self.slots.get(&SlotKey::Args) {
            Some(Val::List(items)) => items,
            _ => &[],
        }
    }

    pub fn set_send(&mut self, value: Val) {
        self.slots.insert(SlotKey::Send, value);
    }

    pub fn take_send(&mut self) -> Val {
        self.slots.remove(&SlotKey::Send).unwrap_or(Val::None)
    }

    /// Tracked iterators by loop indent
    pub fn tracked(&self) -> BTreeMap<usize, Val> {
        self.slots
            .iter()
            .filter_map(|(key, value)| match key {
                SlotKey::Tracked(indent) => Some((*indent, value.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn handled(&self) -> Option<&ExcVal> {
        self.handled.as_ref()
    }

    pub fn set_handled(&mut self, exc: Option<ExcVal>) {
        self.handled = exc;
    }
}
