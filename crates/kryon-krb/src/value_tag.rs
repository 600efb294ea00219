use crate::TableError;

/// The `value-tag` byte that precedes every property's payload (§4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueTag {
    String = 0,
    Integer = 1,
    Float = 2,
    Boolean = 3,
    Color = 4,
    Reference = 5,
    Expression = 6,
    Array = 7,
    Template = 8,
    /// `f64` magnitude plus a one-byte unit code (px/%/em/rem/vw/vh/pt),
    /// for dimension values whose unit isn't implicitly pixels (§4.E).
    Dimension = 9,
}

impl ValueTag {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self, TableError> {
        Ok(match tag {
            0 => Self::String,
            1 => Self::Integer,
            2 => Self::Float,
            3 => Self::Boolean,
            4 => Self::Color,
            5 => Self::Reference,
            6 => Self::Expression,
            7 => Self::Array,
            8 => Self::Template,
            9 => Self::Dimension,
            other => return Err(TableError::UnknownValueTag(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        for t in [
            ValueTag::String,
            ValueTag::Integer,
            ValueTag::Float,
            ValueTag::Boolean,
            ValueTag::Color,
            ValueTag::Reference,
            ValueTag::Expression,
            ValueTag::Array,
            ValueTag::Template,
            ValueTag::Dimension,
        ] {
            assert_eq!(ValueTag::from_tag(t.tag()).unwrap(), t);
        }
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(matches!(ValueTag::from_tag(200), Err(TableError::UnknownValueTag(200))));
    }
}
