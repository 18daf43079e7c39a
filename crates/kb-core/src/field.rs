//! Attributes of the focused editor field.

use serde::{Deserialize, Serialize};

// Android InputType bits
pub mod input_type {
    pub const MASK_CLASS: u32 = 0x0000_000f;
    pub const MASK_VARIATION: u32 = 0x0000_0ff0;

    pub const CLASS_TEXT: u32 = 0x1;
    pub const CLASS_NUMBER: u32 = 0x2;
    pub const CLASS_PHONE: u32 = 0x3;
    pub const CLASS_DATETIME: u32 = 0x4;

    pub const TEXT_VARIATION_PASSWORD: u32 = 0x80;
    pub const TEXT_VARIATION_VISIBLE_PASSWORD: u32 = 0x90;
    pub const TEXT_VARIATION_WEB_EDIT_TEXT: u32 = 0xa0;
    pub const TEXT_VARIATION_WEB_PASSWORD: u32 = 0xe0;
    pub const NUMBER_VARIATION_PASSWORD: u32 = 0x10;
}

// Android EditorInfo.imeOptions bits
pub mod ime_options {
    pub const MASK_ACTION: u32 = 0xff;
    pub const ACTION_UNSPECIFIED: u32 = 0x0;
    pub const ACTION_NONE: u32 = 0x1;
    pub const FLAG_NO_ENTER_ACTION: u32 = 0x4000_0000;
}

/// Field category reported to the engine on focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFieldType {
    #[default]
    Normal,
    Password,
    Tel,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldInfo {
    #[serde(default)]
    pub package_name: String,
    #[serde(default)]
    pub input_type: u32,
    #[serde(default)]
    pub ime_options: u32,
    #[serde(default)]
    pub action_id: i32,
    #[serde(default)]
    pub action_label: Option<String>,
    /// Initial selection in code points, `None` when the editor does not know it.
    #[serde(default)]
    pub initial_selection: Option<(usize, usize)>,
    #[serde(default)]
    pub field_id: i32,
}

impl FieldInfo {
    pub fn text(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            input_type: input_type::CLASS_TEXT,
            ..Self::default()
        }
    }

    pub fn with_selection(mut self, start: usize, end: usize) -> Self {
        self.initial_selection = Some((start, end));
        self
    }

    pub fn with_custom_action(mut self, action_id: i32, label: impl Into<String>) -> Self {
        self.action_id = action_id;
        self.action_label = Some(label.into());
        self
    }

    pub fn input_class(&self) -> u32 {
        self.input_type & input_type::MASK_CLASS
    }

    pub fn variation(&self) -> u32 {
        self.input_type & input_type::MASK_VARIATION
    }

    pub fn is_password(&self) -> bool {
        let variation = self.variation();
        match self.input_class() {
            input_type::CLASS_TEXT => matches!(
                variation,
                input_type::TEXT_VARIATION_PASSWORD
                    | input_type::TEXT_VARIATION_VISIBLE_PASSWORD
                    | input_type::TEXT_VARIATION_WEB_PASSWORD
            ),
            input_type::CLASS_NUMBER => variation == input_type::NUMBER_VARIATION_PASSWORD,
            _ => false,
        }
    }

    pub fn field_type(&self) -> InputFieldType {
        if self.is_password() {
            return InputFieldType::Password;
        }
        match self.input_class() {
            input_type::CLASS_PHONE => InputFieldType::Tel,
            input_type::CLASS_NUMBER => InputFieldType::Number,
            _ => InputFieldType::Normal,
        }
    }

    pub fn is_web_edit_text(&self) -> bool {
        self.input_class() == input_type::CLASS_TEXT
            && self.variation() == input_type::TEXT_VARIATION_WEB_EDIT_TEXT
    }

    /// The editor supplied its own action for the enter key.
    pub fn has_custom_enter_action(&self) -> bool {
        self.action_label.is_some() && self.ime_options & ime_options::FLAG_NO_ENTER_ACTION == 0
    }
}
