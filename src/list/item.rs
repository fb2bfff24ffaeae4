use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// View Flags
// ============================================================================

/// Sentinel tag carried by non-data rows.
///
/// Serialized as the raw integer (`-1` / `-2`) so cached state stays
/// readable by any host that shares the session storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum ViewFlag {
    /// Header row, also reused by the tail loading placeholder.
    Header,
    /// Footer row, appended once the total count is known.
    Footer,
}

impl ViewFlag {
    pub const HEADER_CODE: i8 = -1;
    pub const FOOTER_CODE: i8 = -2;
}

impl From<ViewFlag> for i8 {
    fn from(flag: ViewFlag) -> Self {
        match flag {
            ViewFlag::Header => ViewFlag::HEADER_CODE,
            ViewFlag::Footer => ViewFlag::FOOTER_CODE,
        }
    }
}

/// Error for integers that are not a known view flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownViewFlag(pub i8);

impl fmt::Display for UnknownViewFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown view flag {}", self.0)
    }
}

impl std::error::Error for UnknownViewFlag {}

impl TryFrom<i8> for ViewFlag {
    type Error = UnknownViewFlag;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            ViewFlag::HEADER_CODE => Ok(ViewFlag::Header),
            ViewFlag::FOOTER_CODE => Ok(ViewFlag::Footer),
            other => Err(UnknownViewFlag(other)),
        }
    }
}

// ============================================================================
// Item
// ============================================================================

/// One row of the list: either a data record or a sentinel.
///
/// Data fields are kept as an open JSON map because the shape of a record is
/// owned by whatever page provider produced it. `loading`, `viewFlag` and
/// `selected` are reserved keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Placeholder row shown while a page fetch is in flight.
    #[serde(default, skip_serializing_if = "is_false")]
    pub loading: bool,

    #[serde(rename = "viewFlag", default, skip_serializing_if = "Option::is_none")]
    pub view_flag: Option<ViewFlag>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub selected: bool,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Item {
    /// A data row built from a field map.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Builder-style field setter, mostly for hosts and tests.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn header() -> Self {
        Self {
            loading: false,
            view_flag: Some(ViewFlag::Header),
            ..Self::default()
        }
    }

    pub fn footer() -> Self {
        Self {
            loading: false,
            view_flag: Some(ViewFlag::Footer),
            ..Self::default()
        }
    }

    /// Tail spinner row appended while a page is being fetched.
    pub fn loading_placeholder() -> Self {
        Self {
            loading: true,
            view_flag: Some(ViewFlag::Header),
            ..Self::default()
        }
    }

    /// True for the header row. The loading placeholder shares the header
    /// flag but is never treated as a header.
    pub fn is_header(&self) -> bool {
        self.view_flag == Some(ViewFlag::Header) && !self.loading
    }

    pub fn is_footer(&self) -> bool {
        self.view_flag == Some(ViewFlag::Footer)
    }

    pub fn is_placeholder(&self) -> bool {
        self.loading
    }

    /// Any row that is not a data record.
    pub fn is_sentinel(&self) -> bool {
        self.view_flag.is_some() || self.loading
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

// ============================================================================
// Layout Metadata
// ============================================================================

/// How a column's values are displayed, and therefore compared when sorting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayType {
    Number,
    Money,
    Date,
    Boolean,
    #[default]
    #[serde(other)]
    Text,
}

impl DisplayType {
    /// Types compared numerically (dates as epoch millis).
    pub fn is_numeric(self) -> bool {
        matches!(self, DisplayType::Number | DisplayType::Money | DisplayType::Date)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Column/field metadata describing how to render one field of each item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutDescriptor {
    pub field: String,
    pub label: String,
    pub align: Alignment,
    #[serde(rename = "type")]
    pub display_type: DisplayType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u16>,
}

impl LayoutDescriptor {
    pub fn new(field: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, display_type: DisplayType) -> Self {
        self.display_type = display_type;
        if display_type.is_numeric() {
            self.align = Alignment::Right;
        }
        self
    }

    pub fn with_width(mut self, width: u16) -> Self {
        self.width = Some(width);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sentinel_serializes_as_integer_flag() {
        let json = serde_json::to_value(Item::header()).unwrap();
        assert_eq!(json, json!({"viewFlag": -1}));

        let json = serde_json::to_value(Item::loading_placeholder()).unwrap();
        assert_eq!(json, json!({"loading": true, "viewFlag": -1}));

        let json = serde_json::to_value(Item::footer()).unwrap();
        assert_eq!(json, json!({"viewFlag": -2}));
    }

    #[test]
    fn test_data_row_fields_are_flattened() {
        let item = Item::default().with("id", 7).with("name", "Acme");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, json!({"id": 7, "name": "Acme"}));

        let back: Item = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
        assert!(!back.is_sentinel());
    }

    #[test]
    fn test_unknown_view_flag_rejected() {
        let result: Result<Item, _> = serde_json::from_value(json!({"viewFlag": -7}));
        assert!(result.is_err());
    }

    #[test]
    fn test_placeholder_is_not_a_header() {
        let placeholder = Item::loading_placeholder();
        assert!(placeholder.is_placeholder());
        assert!(!placeholder.is_header());
        assert!(Item::header().is_header());
        assert!(Item::footer().is_footer());
    }

    #[test]
    fn test_unknown_display_type_falls_back_to_text() {
        let layout: LayoutDescriptor =
            serde_json::from_value(json!({"field": "x", "label": "X", "type": "sparkline"}))
                .unwrap();
        assert_eq!(layout.display_type, DisplayType::Text);
    }

    #[test]
    fn test_numeric_layout_right_aligned() {
        let layout = LayoutDescriptor::new("total", "Total").with_type(DisplayType::Money);
        assert_eq!(layout.align, Alignment::Right);
        assert!(layout.display_type.is_numeric());
    }
}
