use serde::{Deserialize, Serialize};

/// Composition mode requested from the engine along with a key or a mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionMode {
    Direct,
    Hiragana,
    FullKatakana,
    HalfAscii,
    FullAscii,
    HalfKatakana,
}

/// Active input specification. Exactly one is current per session and it only
/// changes through an explicit transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyboardSpecification {
    #[default]
    TwelveKeyToggleKana,
    TwelveKeyFlickKana,
    TwelveKeyToggleAlphabet,
    QwertyKana,
    QwertyAlphabet,
    SymbolNumber,
    HardwareQwertyKana,
    HardwareQwertyAlphabet,
}

impl KeyboardSpecification {
    pub fn composition_mode(&self) -> CompositionMode {
        match self {
            Self::TwelveKeyToggleKana
            | Self::TwelveKeyFlickKana
            | Self::QwertyKana
            | Self::HardwareQwertyKana => CompositionMode::Hiragana,
            Self::TwelveKeyToggleAlphabet
            | Self::QwertyAlphabet
            | Self::SymbolNumber
            | Self::HardwareQwertyAlphabet => CompositionMode::HalfAscii,
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(
            self,
            Self::HardwareQwertyKana | Self::HardwareQwertyAlphabet
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TwelveKeyToggleKana => "twelve_key_toggle_kana",
            Self::TwelveKeyFlickKana => "twelve_key_flick_kana",
            Self::TwelveKeyToggleAlphabet => "twelve_key_toggle_alphabet",
            Self::QwertyKana => "qwerty_kana",
            Self::QwertyAlphabet => "qwerty_alphabet",
            Self::SymbolNumber => "symbol_number",
            Self::HardwareQwertyKana => "hardware_qwerty_kana",
            Self::HardwareQwertyAlphabet => "hardware_qwerty_alphabet",
        }
    }
}
