//! Value sources: the externally owned form the engine reads values from.
//!
//! The engine never owns or mutates form state. It only needs to enumerate
//! named fields in declaration order, look one up by name, and, for
//! group-style fields (radio lists, checkbox groups), see which members are
//! checked. [`ValueSource`] is that contract; [`FormData`] is the in-memory
//! implementation used by tests and the CLI.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One member of a group-style field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    /// Submitted value of the member.
    pub value: Value,
    /// Whether the member is selected.
    #[serde(default)]
    pub checked: bool,
}

impl GroupMember {
    /// Creates a group member.
    pub fn new(value: impl Into<Value>, checked: bool) -> Self {
        Self {
            value: value.into(),
            checked,
        }
    }
}

/// Shape of a field as seen by the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A single input carrying one value.
    Single,
    /// A group of selectable members sharing one name.
    Group,
}

/// Borrowed view of one field of a value source.
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'a> {
    /// Field name.
    pub name: &'a str,
    /// Current value.
    pub value: &'a Value,
    /// Group members, for group-style fields.
    pub members: Option<&'a [GroupMember]>,
}

impl FieldRef<'_> {
    /// Returns the field's shape.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        if self.members.is_some() {
            FieldKind::Group
        } else {
            FieldKind::Single
        }
    }

    /// Number of checked members; a single field counts as one member
    /// checked when its value is truthy.
    #[must_use]
    pub fn checked_count(&self) -> usize {
        match self.members {
            Some(members) => members.iter().filter(|m| m.checked).count(),
            None => usize::from(crate::value::is_truthy(self.value)),
        }
    }
}

/// Read-only access to a form's fields.
///
/// Absence of a name is "not present", never a failure.
pub trait ValueSource {
    /// All named fields, in declaration order.
    fn fields(&self) -> Vec<FieldRef<'_>>;

    /// Looks up a field by name.
    fn field(&self, name: &str) -> Option<FieldRef<'_>>;

    /// Raw `name -> value` map of every named field.
    fn values(&self) -> IndexMap<String, Value> {
        self.fields()
            .into_iter()
            .filter(|f| !f.name.is_empty())
            .map(|f| (f.name.to_owned(), f.value.clone()))
            .collect()
    }
}

/// A field held by [`FormData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormField {
    /// A group-style field; serialized as `{"group": [...]}`.
    Group {
        /// Members of the group.
        group: Vec<GroupMember>,
        /// Value of the first checked member, or `""`.
        #[serde(skip)]
        selected: Value,
    },
    /// A plain value.
    Value(Value),
}

impl FormField {
    /// Builds a group field, deriving its value from the first checked member.
    pub fn group(members: Vec<GroupMember>) -> Self {
        let selected = first_checked(&members);
        Self::Group {
            group: members,
            selected,
        }
    }

    fn view<'a>(&'a self, name: &'a str) -> FieldRef<'a> {
        match self {
            Self::Group { group, selected } => FieldRef {
                name,
                value: selected,
                members: Some(group),
            },
            Self::Value(value) => FieldRef {
                name,
                value,
                members: None,
            },
        }
    }

    /// Recomputes derived state after deserialization.
    fn normalize(&mut self) {
        if let Self::Group { group, selected } = self {
            *selected = first_checked(group);
        }
    }
}

fn first_checked(members: &[GroupMember]) -> Value {
    members
        .iter()
        .find(|m| m.checked)
        .map_or_else(|| Value::String(String::new()), |m| m.value.clone())
}

/// In-memory form: an ordered map of named fields.
///
/// # Examples
///
/// ```
/// use formguard_validator::source::{FormData, GroupMember, ValueSource};
/// use serde_json::json;
///
/// let form = FormData::new()
///     .with("age", json!("21"))
///     .with_group("plan", vec![GroupMember::new("basic", false), GroupMember::new("pro", true)]);
///
/// assert_eq!(form.field("plan").unwrap().value, &json!("pro"));
/// assert!(form.field("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormData {
    fields: IndexMap<String, FormField>,
}

impl FormData {
    /// Creates an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a plain field.
    #[must_use = "builder methods must be chained or built"]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds (or replaces) a group field.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_group(mut self, name: impl Into<String>, members: Vec<GroupMember>) -> Self {
        self.fields.insert(name.into(), FormField::group(members));
        self
    }

    /// Sets a plain field's value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields
            .insert(name.into(), FormField::Value(value.into()));
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when the form has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'de> Deserialize<'de> for FormData {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = IndexMap::<String, FormField>::deserialize(deserializer)?;
        for field in fields.values_mut() {
            field.normalize();
        }
        Ok(Self { fields })
    }
}

impl ValueSource for FormData {
    fn fields(&self) -> Vec<FieldRef<'_>> {
        self.fields
            .iter()
            .map(|(name, field)| field.view(name))
            .collect()
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        self.fields
            .get_key_value(name)
            .map(|(name, field)| field.view(name))
    }
}
