//! Tri-state field updates.
//!
//! A partial update must distinguish three intents for a nullable field:
//! leave it alone, clear it, or set it. `Option<Option<T>>` can express this
//! but reads poorly at call sites, so updates carry a [`Patch<T>`] instead.
//!
//! ## Deserialization
//!
//! `Patch<T>` deserializes from `null` to [`Patch::Null`] and from any other
//! value to [`Patch::Value`]. A *missing* key only becomes [`Patch::Absent`]
//! when the containing struct marks the field `#[serde(default)]`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Field not mentioned: keep the current value.
    Absent,
    /// Field explicitly `null`: clear the current value.
    Null,
    /// Field set to a new value.
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Absent => Patch::Absent,
            Patch::Null => Patch::Null,
            Patch::Value(v) => Patch::Value(f(v)),
        }
    }

    /// Apply to a nullable slot.
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Absent => {}
            Patch::Null => *slot = None,
            Patch::Value(v) => *slot = Some(v),
        }
    }

    /// Collapse into an update for a non-nullable field.
    ///
    /// `null` is rejected: a required field cannot be cleared.
    pub fn into_required(self, field: &str) -> Result<Option<T>, DomainError> {
        match self {
            Patch::Absent => Ok(None),
            Patch::Null => Err(DomainError::validation(format!("{field} cannot be null"))),
            Patch::Value(v) => Ok(Some(v)),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

impl<T> Serialize for Patch<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Value(v) => v.serialize(serializer),
            Patch::Absent | Patch::Null => serializer.serialize_none(),
        }
    }
}
