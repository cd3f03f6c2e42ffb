use serde::{Deserialize, Serialize};
use std::fmt;

/// Input type of a field, used by forms to pick a keyboard and masking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Password,
    Ip,
    Number,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Password => "password",
            FieldType::Ip => "ip",
            FieldType::Number => "number",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(FieldType::Text),
            "password" => Ok(FieldType::Password),
            "ip" => Ok(FieldType::Ip),
            "number" => Ok(FieldType::Number),
            _ => Err(format!(
                "Invalid field type: '{}'. Valid types: text, password, ip, number",
                s
            )),
        }
    }
}

/// One user-configurable column of the customer schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    /// Stable identifier used as the attribute name on every record.
    pub key: String,
    #[serde(alias = "labelAr")]
    pub label_primary: String,
    #[serde(alias = "labelEn")]
    pub label_secondary: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    pub order: u32,
}

impl FieldDefinition {
    pub fn new(
        id: impl Into<String>,
        key: impl Into<String>,
        label_primary: impl Into<String>,
        label_secondary: impl Into<String>,
        field_type: FieldType,
        order: u32,
    ) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            label_primary: label_primary.into(),
            label_secondary: label_secondary.into(),
            field_type,
            required: false,
            order,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl fmt::Display for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}. {} / {} [{}]",
            self.order, self.label_primary, self.label_secondary, self.field_type
        )?;
        if self.required {
            write!(f, " (required)")?;
        }
        Ok(())
    }
}

/// Keys of the built-in identity fields. Always present and always required.
pub const IDENTITY_KEYS: [&str; 3] = ["serialNumber", "location", "name"];

/// The built-in schema every installation starts from.
pub fn default_fields() -> Vec<FieldDefinition> {
    use FieldType::*;

    let specs: [(&str, &str, &str, FieldType, bool); 12] = [
        ("serialNumber", "رقم تسلسلي", "Serial Number", Text, true),
        ("location", "الموقع", "Location", Text, true),
        ("name", "الاسم", "Name", Text, true),
        ("pointName", "اسم النقطة", "Point Name", Text, false),
        ("networkName", "اسم الشبكة", "Network Name", Text, false),
        ("networkPassword", "كلمة مرور الشبكة", "Network Password", Password, false),
        ("username", "اسم المستخدم", "Username", Text, false),
        ("userPassword", "كلمة المرور", "Password", Password, false),
        ("ipAddress", "عنوان IP", "IP Address", Ip, false),
        ("gatewayIp", "IP Gateway", "IP Gateway", Ip, false),
        ("packageSpeed", "سرعة الباقة", "Package Speed", Text, false),
        ("packageSize", "حجم الباقة", "Package Size", Text, false),
    ];

    specs
        .into_iter()
        .zip(1u32..)
        .map(|((key, primary, secondary, field_type, required), order)| {
            let field =
                FieldDefinition::new(order.to_string(), key, primary, secondary, field_type, order);
            if required {
                field.required()
            } else {
                field
            }
        })
        .collect()
}
