use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is empty")]
    Empty(&'static str),
    #[error("{what} is {len} characters; the limit is {max}")]
    TooLong {
        what: &'static str,
        len: usize,
        max: usize,
    },
}

/// Trim `content` and check it is non-empty and at most `max_chars` characters.
pub fn validate_content<'a>(
    what: &'static str,
    content: &'a str,
    max_chars: usize,
) -> Result<&'a str, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(what));
    }
    let len = trimmed.chars().count();
    if len > max_chars {
        return Err(ValidationError::TooLong {
            what,
            len,
            max: max_chars,
        });
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank() {
        assert_eq!(
            validate_content("post", "  \n ", 500),
            Err(ValidationError::Empty("post"))
        );
    }

    #[test]
    fn counts_characters_not_bytes() {
        let arabic = "م".repeat(500);
        assert_eq!(validate_content("post", &arabic, 500), Ok(arabic.as_str()));
        let long = "م".repeat(501);
        assert!(matches!(
            validate_content("post", &long, 500),
            Err(ValidationError::TooLong { len: 501, .. })
        ));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(validate_content("comment", "  hi #rust ", 10), Ok("hi #rust"));
    }
}
