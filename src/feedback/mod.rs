//! Comment submission validation.

/// Longest accepted name, in bytes.
pub const MAX_NAME_BYTES: usize = 50;

/// Longest accepted comment, in bytes.
pub const MAX_COMMENT_BYTES: usize = 800;

pub const NAME_ERROR: &str = "Name is required (max 50 chars).";
pub const COMMENT_ERROR: &str = "Comment is required (max 800 chars).";

/// A validated, trimmed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub comment: String,
}

impl Submission {
    /// Trim and validate raw form input, reporting every problem at once.
    pub fn parse(name: &str, comment: &str) -> Result<Self, Vec<&'static str>> {
        let name = name.trim();
        let comment = comment.trim();
        let mut errors = Vec::new();

        if name.is_empty() || name.len() > MAX_NAME_BYTES {
            errors.push(NAME_ERROR);
        }
        if comment.is_empty() || comment.len() > MAX_COMMENT_BYTES {
            errors.push(COMMENT_ERROR);
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self {
            name: name.to_string(),
            comment: comment.to_string(),
        })
    }
}
