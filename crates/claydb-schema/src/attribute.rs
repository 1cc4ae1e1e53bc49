use crate::rule::{Rule, RuleError};
use serde::{Deserialize, Serialize};

///
/// DataType
///
/// Declared semantic type of an attribute's stored value. Compound shapes
/// (lists, dictionaries) are driven by the display type; the data type
/// describes the element/scalar semantics.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    #[default]
    Text,
    Int,
    Decimal,
    Bool,
    Datetime,
}

///
/// DisplayType
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayType {
    #[default]
    Text,
    Textarea,
    Number,
    Date,
    Datetime,
    Dropdown,
    Multiselect,
    Gallery,
    Dictionary,
    EditTable,
    Picklist,
    Tree,
}

impl DisplayType {
    /// Display types whose editor needs an enumerated choice list.
    #[must_use]
    pub const fn requires_choices(self) -> bool {
        matches!(self, Self::Dropdown | Self::Multiselect)
    }

    /// Display types whose stored value is a list.
    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(self, Self::Multiselect | Self::Gallery)
    }

    /// Display types whose stored value is a string-keyed map.
    #[must_use]
    pub const fn is_map(self) -> bool {
        matches!(self, Self::Dictionary)
    }
}

///
/// Attribute
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub label: String,
    pub data_type: DataType,
    pub display_type: DisplayType,

    /// Enumerated choices for choice-driven display types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,

    /// Compiled validation rule; evaluated against the submitted value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Rule>,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            data_type: DataType::default(),
            display_type: DisplayType::default(),
            choices: None,
            validation: None,
        }
    }

    #[must_use]
    pub const fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    #[must_use]
    pub const fn with_display_type(mut self, display_type: DisplayType) -> Self {
        self.display_type = display_type;
        self
    }

    #[must_use]
    pub fn with_choices(mut self, choices: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    /// Attach a validation rule, compiling it from source.
    ///
    /// Rules outside the closed grammar are rejected here, before the
    /// attribute can ever reach a stored schema version.
    pub fn with_validation(mut self, source: &str) -> Result<Self, RuleError> {
        self.validation = Some(Rule::parse(source)?);
        Ok(self)
    }

    /// Whether a submitted value belongs to the declared choice set.
    ///
    /// Attributes without choices accept any value.
    #[must_use]
    pub fn choice_allowed(&self, value: &str) -> bool {
        self.choices
            .as_ref()
            .is_none_or(|choices| choices.iter().any(|c| c == value))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_text() {
        let attr = Attribute::new("name", "Name");
        assert_eq!(attr.data_type, DataType::Text);
        assert_eq!(attr.display_type, DisplayType::Text);
        assert!(attr.choices.is_none());
        assert!(attr.validation.is_none());
    }

    #[test]
    fn choice_membership_is_open_without_choices() {
        let attr = Attribute::new("name", "Name");
        assert!(attr.choice_allowed("anything"));

        let attr = attr.with_choices(["a", "b"]);
        assert!(attr.choice_allowed("a"));
        assert!(!attr.choice_allowed("c"));
    }

    #[test]
    fn with_validation_rejects_bad_grammar() {
        let res = Attribute::new("name", "Name").with_validation("name ==");
        assert!(res.is_err());
    }

    #[test]
    fn display_type_choice_requirements() {
        assert!(DisplayType::Dropdown.requires_choices());
        assert!(DisplayType::Multiselect.requires_choices());
        assert!(!DisplayType::Gallery.requires_choices());
        assert!(DisplayType::Gallery.is_list());
        assert!(DisplayType::Dictionary.is_map());
    }
}
