//! Free-text fields: chat messages, group titles, suggestions

use super::validation::{check_len, ValidationError};

const MAX_CHAT_LEN: usize = 1000;
const MAX_GROUP_TITLE_LEN: usize = 50;
const MAX_SUGGESTION_TYPE_LEN: usize = 16;

/// Body of a group or personal chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatContent(String);

impl ChatContent {
    /// Blank messages are rejected; surrounding whitespace is kept.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.trim().is_empty() {
            return Err(ValidationError::Empty { field: "content" });
        }
        check_len("content", s, MAX_CHAT_LEN)?;
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTitle(String);

impl GroupTitle {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "title" });
        }
        check_len("title", s, MAX_GROUP_TITLE_LEN)?;
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Category and body of a user suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    suggestion_type: String,
    content: String,
}

impl Suggestion {
    pub fn new(suggestion_type: &str, content: &str) -> Result<Self, ValidationError> {
        let suggestion_type = suggestion_type.trim();
        if suggestion_type.is_empty() {
            return Err(ValidationError::Empty {
                field: "suggestion_type",
            });
        }
        check_len("suggestion_type", suggestion_type, MAX_SUGGESTION_TYPE_LEN)?;
        if content.trim().is_empty() {
            return Err(ValidationError::Empty { field: "content" });
        }

        Ok(Self {
            suggestion_type: suggestion_type.to_owned(),
            content: content.to_owned(),
        })
    }

    pub fn suggestion_type(&self) -> &str {
        &self.suggestion_type
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}
