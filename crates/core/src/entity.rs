//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Stable lowercase name of the entity kind (`"project"`, `"task"`, ...).
    ///
    /// Used as the `entityType` of audit entries and in not-found messages.
    const ENTITY_TYPE: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
