use cms_core::Value;

/// A mapping from column name to [`Value`], produced by a dynamic `SELECT`.
/// Carries exactly the schema's column set as keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRow {
    columns: Vec<(String, Value)>,
}

impl DynamicRow {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(c, _)| c == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(c, v)| (c.as_str(), v))
    }
}
