//! Group slug and username validation.

use slug::slugify;
use thiserror::Error;

pub const MAX_SLUG_LEN: usize = 200;
pub const MAX_USERNAME_LEN: usize = 150;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("`{input}` is not a URL-safe slug")]
    NotUrlSafe { input: String },
    #[error("slug exceeds {MAX_SLUG_LEN} characters")]
    TooLong,
}

/// Derive a slug from a human-readable title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Accept slugs made of ASCII letters, digits, hyphens and underscores.
pub fn validate_group_slug(input: &str) -> Result<(), SlugError> {
    if input.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if input.chars().count() > MAX_SLUG_LEN {
        return Err(SlugError::TooLong);
    }
    if !input
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(SlugError::NotUrlSafe {
            input: input.to_string(),
        });
    }
    Ok(())
}

/// Usernames: 1..=150 characters of letters, digits and `@.+-_`.
pub fn is_valid_username(input: &str) -> bool {
    let len = input.chars().count();
    (1..=MAX_USERNAME_LEN).contains(&len)
        && input
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_lowercases_and_hyphenates() {
        assert_eq!(derive_slug("Cats & Dogs").expect("slug"), "cats-dogs");
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn group_slug_rejects_spaces_and_slashes() {
        assert!(validate_group_slug("rust-lang_2").is_ok());
        assert!(matches!(
            validate_group_slug("rust lang"),
            Err(SlugError::NotUrlSafe { .. })
        ));
        assert!(validate_group_slug("a/b").is_err());
        assert_eq!(validate_group_slug(""), Err(SlugError::EmptyInput));
    }

    #[test]
    fn usernames_follow_the_allowed_alphabet() {
        assert!(is_valid_username("leo.tolstoy+1@mail"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"a".repeat(151)));
    }
}
