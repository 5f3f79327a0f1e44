//! Writable-field sets.
//!
//! The policy engine answers "allowed" together with the set of fields the
//! caller may write; services compute the set a request touches and the
//! engine checks it is a subset.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum Field {
    // tenant
    Name,
    Status,
    SubscriptionPlan,
    MaxUsers,
    MaxProjects,
    // user
    FullName,
    Role,
    IsActive,
    // project / task
    Description,
    Title,
    Priority,
    AssignedTo,
    DueDate,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Name,
        Field::Status,
        Field::SubscriptionPlan,
        Field::MaxUsers,
        Field::MaxProjects,
        Field::FullName,
        Field::Role,
        Field::IsActive,
        Field::Description,
        Field::Title,
        Field::Priority,
        Field::AssignedTo,
        Field::DueDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Status => "status",
            Field::SubscriptionPlan => "subscriptionPlan",
            Field::MaxUsers => "maxUsers",
            Field::MaxProjects => "maxProjects",
            Field::FullName => "fullName",
            Field::Role => "role",
            Field::IsActive => "isActive",
            Field::Description => "description",
            Field::Title => "title",
            Field::Priority => "priority",
            Field::AssignedTo => "assignedTo",
            Field::DueDate => "dueDate",
        }
    }

    const fn bit(self) -> u16 {
        1 << (self as u8)
    }
}

/// Compact set of [`Field`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldMask(u16);

impl FieldMask {
    pub const EMPTY: FieldMask = FieldMask(0);

    pub const fn of(fields: &[Field]) -> Self {
        let mut bits = 0u16;
        let mut i = 0;
        while i < fields.len() {
            bits |= fields[i].bit();
            i += 1;
        }
        FieldMask(bits)
    }

    pub const fn union(self, other: FieldMask) -> Self {
        FieldMask(self.0 | other.0)
    }

    pub fn insert(&mut self, field: Field) {
        self.0 |= field.bit();
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_subset_of(&self, other: FieldMask) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn intersects(&self, other: FieldMask) -> bool {
        self.0 & other.0 != 0
    }

    /// Fields in `self` that are not in `other`.
    pub fn difference(&self, other: FieldMask) -> FieldMask {
        FieldMask(self.0 & !other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(|f| self.contains(*f))
    }
}

impl FromIterator<Field> for FieldMask {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut mask = FieldMask::EMPTY;
        for f in iter {
            mask.insert(f);
        }
        mask
    }
}

impl core::fmt::Display for FieldMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for field in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(field.as_str())?;
            first = false;
        }
        Ok(())
    }
}
