use crate::TableError;

/// Stable registry of element type codes shared by compiler and runtime (§6).
///
/// New element kinds are appended with a fresh code; codes are never reused
/// or renumbered, since a KRB written by an older compiler must still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ElementTypeCode {
    App = 0x0001,
    Container = 0x0010,
    Row = 0x0011,
    Column = 0x0012,
    Stack = 0x0013,
    Grid = 0x0014,
    ScrollView = 0x0015,
    Text = 0x0020,
    RichText = 0x0021,
    Button = 0x0030,
    TextInput = 0x0040,
    Checkbox = 0x0050,
    Radio = 0x0051,
    Slider = 0x0052,
    Dropdown = 0x0060,
    Image = 0x0070,
    Svg = 0x0071,
    Video = 0x0072,
    Canvas = 0x0080,
    ProgressBar = 0x0090,
    Spacer = 0x00A0,
}

impl ElementTypeCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::App => "App",
            Self::Container => "Container",
            Self::Row => "Row",
            Self::Column => "Column",
            Self::Stack => "Stack",
            Self::Grid => "Grid",
            Self::ScrollView => "ScrollView",
            Self::Text => "Text",
            Self::RichText => "RichText",
            Self::Button => "Button",
            Self::TextInput => "TextInput",
            Self::Checkbox => "Checkbox",
            Self::Radio => "Radio",
            Self::Slider => "Slider",
            Self::Dropdown => "Dropdown",
            Self::Image => "Image",
            Self::Svg => "Svg",
            Self::Video => "Video",
            Self::Canvas => "Canvas",
            Self::ProgressBar => "ProgressBar",
            Self::Spacer => "Spacer",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, TableError> {
        Ok(match name {
            "App" => Self::App,
            "Container" => Self::Container,
            "Row" => Self::Row,
            "Column" => Self::Column,
            "Stack" => Self::Stack,
            "Grid" => Self::Grid,
            "ScrollView" => Self::ScrollView,
            "Text" => Self::Text,
            "RichText" => Self::RichText,
            "Button" => Self::Button,
            "TextInput" => Self::TextInput,
            "Checkbox" => Self::Checkbox,
            "Radio" => Self::Radio,
            "Slider" => Self::Slider,
            "Dropdown" => Self::Dropdown,
            "Image" => Self::Image,
            "Svg" => Self::Svg,
            "Video" => Self::Video,
            "Canvas" => Self::Canvas,
            "ProgressBar" => Self::ProgressBar,
            "Spacer" => Self::Spacer,
            other => return Err(TableError::UnknownElementName(other.to_string())),
        })
    }

    pub fn from_code(code: u16) -> Result<Self, TableError> {
        Ok(match code {
            0x0001 => Self::App,
            0x0010 => Self::Container,
            0x0011 => Self::Row,
            0x0012 => Self::Column,
            0x0013 => Self::Stack,
            0x0014 => Self::Grid,
            0x0015 => Self::ScrollView,
            0x0020 => Self::Text,
            0x0021 => Self::RichText,
            0x0030 => Self::Button,
            0x0040 => Self::TextInput,
            0x0050 => Self::Checkbox,
            0x0051 => Self::Radio,
            0x0052 => Self::Slider,
            0x0060 => Self::Dropdown,
            0x0070 => Self::Image,
            0x0071 => Self::Svg,
            0x0072 => Self::Video,
            0x0080 => Self::Canvas,
            0x0090 => Self::ProgressBar,
            0x00A0 => Self::Spacer,
            other => return Err(TableError::UnknownElementCode(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_round_trips_by_name_and_code() {
        let all = [
            ElementTypeCode::App,
            ElementTypeCode::Container,
            ElementTypeCode::Row,
            ElementTypeCode::Column,
            ElementTypeCode::Stack,
            ElementTypeCode::Grid,
            ElementTypeCode::ScrollView,
            ElementTypeCode::Text,
            ElementTypeCode::RichText,
            ElementTypeCode::Button,
            ElementTypeCode::TextInput,
            ElementTypeCode::Checkbox,
            ElementTypeCode::Radio,
            ElementTypeCode::Slider,
            ElementTypeCode::Dropdown,
            ElementTypeCode::Image,
            ElementTypeCode::Svg,
            ElementTypeCode::Video,
            ElementTypeCode::Canvas,
            ElementTypeCode::ProgressBar,
            ElementTypeCode::Spacer,
        ];
        for ty in all {
            assert_eq!(ElementTypeCode::from_name(ty.name()).unwrap(), ty);
            assert_eq!(ElementTypeCode::from_code(ty.code()).unwrap(), ty);
        }
    }

    #[test]
    fn unknown_name_is_a_hard_error() {
        assert!(matches!(
            ElementTypeCode::from_name("Frobnicator"),
            Err(TableError::UnknownElementName(_))
        ));
    }

    #[test]
    fn unknown_code_is_a_hard_error() {
        assert!(matches!(
            ElementTypeCode::from_code(0xBEEF),
            Err(TableError::UnknownElementCode(0xBEEF))
        ));
    }

    #[test]
    fn spec_examples_match_documented_codes() {
        assert_eq!(ElementTypeCode::App.code(), 0x0001);
        assert_eq!(ElementTypeCode::Container.code(), 0x0010);
        assert_eq!(ElementTypeCode::Row.code(), 0x0011);
        assert_eq!(ElementTypeCode::Column.code(), 0x0012);
        assert_eq!(ElementTypeCode::Text.code(), 0x0020);
        assert_eq!(ElementTypeCode::Button.code(), 0x0030);
        assert_eq!(ElementTypeCode::TextInput.code(), 0x0040);
        assert_eq!(ElementTypeCode::Checkbox.code(), 0x0050);
        assert_eq!(ElementTypeCode::Dropdown.code(), 0x0060);
        assert_eq!(ElementTypeCode::Image.code(), 0x0070);
    }
}
