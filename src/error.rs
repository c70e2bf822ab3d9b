use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("tile index {index} is outside a grid of {len} tiles")]
    TileOutOfRange { index: usize, len: usize },

    #[error("grid coordinate ({x}, {z}) is outside a {size}x{size} grid")]
    CoordsOutOfRange { x: i64, z: i64, size: usize },

    #[error("invalid value {value:?} for setting {key}")]
    InvalidSetting { key: &'static str, value: String },

    /// The tile texture file exists but could not be read or decoded.
    #[error("failed to load texture {path}: {reason}")]
    TextureLoad { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = EditorError::TileOutOfRange { index: 9, len: 4 };
        assert_eq!(err.to_string(), "tile index 9 is outside a grid of 4 tiles");

        let err = EditorError::CoordsOutOfRange { x: 3, z: -1, size: 2 };
        assert_eq!(err.to_string(), "grid coordinate (3, -1) is outside a 2x2 grid");

        let err = EditorError::InvalidSetting {
            key: "TILE_EDITOR_SEED",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value \"abc\" for setting TILE_EDITOR_SEED");

        let boxed: Box<dyn std::error::Error> = Box::new(EditorError::TextureLoad {
            path: "a.ktx2".to_string(),
            reason: "truncated".to_string(),
        });
        assert_eq!(boxed.to_string(), "failed to load texture a.ktx2: truncated");
    }
}
