use crate::TableError;

/// Stable registry of property name codes shared by compiler and runtime (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PropertyCode {
    Id = 0x0001,
    Class = 0x0002,
    Text = 0x0010,
    Placeholder = 0x0011,
    BackgroundColor = 0x0020,
    Color = 0x0021,
    BorderColor = 0x0022,
    BorderWidth = 0x0023,
    BorderRadius = 0x0024,
    Width = 0x0030,
    Height = 0x0031,
    MinWidth = 0x0032,
    MinHeight = 0x0033,
    MaxWidth = 0x0034,
    MaxHeight = 0x0035,
    Padding = 0x0040,
    Margin = 0x0041,
    Gap = 0x0042,
    Layout = 0x0050,
    Alignment = 0x0051,
    Direction = 0x0052,
    OnClick = 0x0060,
    OnChange = 0x0061,
    Visible = 0x0070,
    Enabled = 0x0071,
    ZIndex = 0x0072,
    Opacity = 0x0073,
    FontSize = 0x0080,
    FontWeight = 0x0081,
    TextAlign = 0x0082,
    Src = 0x0090,
    Checked = 0x00A0,
    Value = 0x00A1,
    Options = 0x00A2,
    SelectedIndex = 0x00A3,
    Bind = 0x00B0,
}

impl PropertyCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Class => "class",
            Self::Text => "text",
            Self::Placeholder => "placeholder",
            Self::BackgroundColor => "backgroundColor",
            Self::Color => "color",
            Self::BorderColor => "borderColor",
            Self::BorderWidth => "borderWidth",
            Self::BorderRadius => "borderRadius",
            Self::Width => "width",
            Self::Height => "height",
            Self::MinWidth => "minWidth",
            Self::MinHeight => "minHeight",
            Self::MaxWidth => "maxWidth",
            Self::MaxHeight => "maxHeight",
            Self::Padding => "padding",
            Self::Margin => "margin",
            Self::Gap => "gap",
            Self::Layout => "layout",
            Self::Alignment => "alignment",
            Self::Direction => "direction",
            Self::OnClick => "onClick",
            Self::OnChange => "onChange",
            Self::Visible => "visible",
            Self::Enabled => "enabled",
            Self::ZIndex => "zIndex",
            Self::Opacity => "opacity",
            Self::FontSize => "fontSize",
            Self::FontWeight => "fontWeight",
            Self::TextAlign => "textAlign",
            Self::Src => "src",
            Self::Checked => "checked",
            Self::Value => "value",
            Self::Options => "options",
            Self::SelectedIndex => "selectedIndex",
            Self::Bind => "bind",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, TableError> {
        Ok(match name {
            "id" => Self::Id,
            "class" => Self::Class,
            "text" => Self::Text,
            "placeholder" => Self::Placeholder,
            "backgroundColor" => Self::BackgroundColor,
            "color" => Self::Color,
            "borderColor" => Self::BorderColor,
            "borderWidth" => Self::BorderWidth,
            "borderRadius" => Self::BorderRadius,
            "width" => Self::Width,
            "height" => Self::Height,
            "minWidth" => Self::MinWidth,
            "minHeight" => Self::MinHeight,
            "maxWidth" => Self::MaxWidth,
            "maxHeight" => Self::MaxHeight,
            "padding" => Self::Padding,
            "margin" => Self::Margin,
            "gap" => Self::Gap,
            "layout" => Self::Layout,
            "alignment" => Self::Alignment,
            "direction" => Self::Direction,
            "onClick" => Self::OnClick,
            "onChange" => Self::OnChange,
            "visible" => Self::Visible,
            "enabled" => Self::Enabled,
            "zIndex" => Self::ZIndex,
            "opacity" => Self::Opacity,
            "fontSize" => Self::FontSize,
            "fontWeight" => Self::FontWeight,
            "textAlign" => Self::TextAlign,
            "src" => Self::Src,
            "checked" => Self::Checked,
            "value" => Self::Value,
            "options" => Self::Options,
            "selectedIndex" => Self::SelectedIndex,
            "bind" => Self::Bind,
            other => return Err(TableError::UnknownPropertyName(other.to_string())),
        })
    }

    pub fn from_code(code: u16) -> Result<Self, TableError> {
        Ok(match code {
            0x0001 => Self::Id,
            0x0002 => Self::Class,
            0x0010 => Self::Text,
            0x0011 => Self::Placeholder,
            0x0020 => Self::BackgroundColor,
            0x0021 => Self::Color,
            0x0022 => Self::BorderColor,
            0x0023 => Self::BorderWidth,
            0x0024 => Self::BorderRadius,
            0x0030 => Self::Width,
            0x0031 => Self::Height,
            0x0032 => Self::MinWidth,
            0x0033 => Self::MinHeight,
            0x0034 => Self::MaxWidth,
            0x0035 => Self::MaxHeight,
            0x0040 => Self::Padding,
            0x0041 => Self::Margin,
            0x0042 => Self::Gap,
            0x0050 => Self::Layout,
            0x0051 => Self::Alignment,
            0x0052 => Self::Direction,
            0x0060 => Self::OnClick,
            0x0061 => Self::OnChange,
            0x0070 => Self::Visible,
            0x0071 => Self::Enabled,
            0x0072 => Self::ZIndex,
            0x0073 => Self::Opacity,
            0x0080 => Self::FontSize,
            0x0081 => Self::FontWeight,
            0x0082 => Self::TextAlign,
            0x0090 => Self::Src,
            0x00A0 => Self::Checked,
            0x00A1 => Self::Value,
            0x00A2 => Self::Options,
            0x00A3 => Self::SelectedIndex,
            0x00B0 => Self::Bind,
            other => return Err(TableError::UnknownPropertyCode(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[PropertyCode] = &[
        PropertyCode::Id,
        PropertyCode::Class,
        PropertyCode::Text,
        PropertyCode::Placeholder,
        PropertyCode::BackgroundColor,
        PropertyCode::Color,
        PropertyCode::BorderColor,
        PropertyCode::BorderWidth,
        PropertyCode::BorderRadius,
        PropertyCode::Width,
        PropertyCode::Height,
        PropertyCode::MinWidth,
        PropertyCode::MinHeight,
        PropertyCode::MaxWidth,
        PropertyCode::MaxHeight,
        PropertyCode::Padding,
        PropertyCode::Margin,
        PropertyCode::Gap,
        PropertyCode::Layout,
        PropertyCode::Alignment,
        PropertyCode::Direction,
        PropertyCode::OnClick,
        PropertyCode::OnChange,
        PropertyCode::Visible,
        PropertyCode::Enabled,
        PropertyCode::ZIndex,
        PropertyCode::Opacity,
        PropertyCode::FontSize,
        PropertyCode::FontWeight,
        PropertyCode::TextAlign,
        PropertyCode::Src,
        PropertyCode::Checked,
        PropertyCode::Value,
        PropertyCode::Options,
        PropertyCode::SelectedIndex,
        PropertyCode::Bind,
    ];

    #[test]
    fn every_variant_round_trips_by_name_and_code() {
        for p in ALL {
            assert_eq!(PropertyCode::from_name(p.name()).unwrap(), *p);
            assert_eq!(PropertyCode::from_code(p.code()).unwrap(), *p);
        }
    }

    #[test]
    fn spec_examples_match_documented_codes() {
        assert_eq!(PropertyCode::Id.code(), 0x0001);
        assert_eq!(PropertyCode::Class.code(), 0x0002);
        assert_eq!(PropertyCode::Text.code(), 0x0010);
        assert_eq!(PropertyCode::BackgroundColor.code(), 0x0020);
        assert_eq!(PropertyCode::Color.code(), 0x0021);
        assert_eq!(PropertyCode::Width.code(), 0x0030);
        assert_eq!(PropertyCode::Height.code(), 0x0031);
        assert_eq!(PropertyCode::Padding.code(), 0x0040);
        assert_eq!(PropertyCode::Margin.code(), 0x0041);
        assert_eq!(PropertyCode::Layout.code(), 0x0050);
        assert_eq!(PropertyCode::OnClick.code(), 0x0060);
    }

    #[test]
    fn unknown_property_is_a_hard_error() {
        assert!(matches!(
            PropertyCode::from_name("glarbFactor"),
            Err(TableError::UnknownPropertyName(_))
        ));
        assert!(matches!(
            PropertyCode::from_code(0xDEAD),
            Err(TableError::UnknownPropertyCode(0xDEAD))
        ));
    }
}
