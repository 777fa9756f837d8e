pub type ReelResult<T> = Result<T, ReelError>;

#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("parse error in frame {frame_index}: bad row {line:?}")]
    Parse { frame_index: u64, line: String },

    #[error("frame {0} not found")]
    FrameNotFound(u64),

    #[error("render error: {0}")]
    Render(String),

    #[error("assembly error: {0}")]
    Assembly(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn parse(frame_index: u64, line: impl Into<String>) -> Self {
        Self::Parse {
            frame_index,
            line: line.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::Assembly(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ReelError::parse(3, "a:b")
                .to_string()
                .contains("parse error in frame 3")
        );
        assert!(
            ReelError::FrameNotFound(7)
                .to_string()
                .contains("frame 7 not found")
        );
        assert!(ReelError::render("x").to_string().contains("render error:"));
        assert!(
            ReelError::assembly("x")
                .to_string()
                .contains("assembly error:")
        );
        assert!(
            ReelError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            ReelError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn parse_error_carries_offending_line() {
        let err = ReelError::parse(12, "bogus row");
        assert!(err.to_string().contains("bogus row"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ReelError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
