use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use orkut_types::{UpdateProfileRequest, RELATIONSHIP_STATUSES};

pub const MAX_POST_CHARS: usize = 500;
pub const MAX_COMMENT_CHARS: usize = 500;
pub const MAX_SCRAP_CHARS: usize = 1000;
pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const MAX_BIO_CHARS: usize = 500;
pub const MAX_DISPLAY_NAME_CHARS: usize = 50;
pub const MAX_COMMUNITY_NAME_CHARS: usize = 100;
pub const MAX_COMMUNITY_DESCRIPTION_CHARS: usize = 1000;
pub const MIN_PASSWORD_CHARS: usize = 6;

/// 3-20 characters: letters, digits, underscore and dot
static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.]{3,20}$").expect("Failed to compile username regex"));

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Failed to compile email regex")
});

pub fn validate_username(username: &str) -> Result<(), String> {
    if USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err("Username must be 3-20 characters of letters, digits, '_' or '.'".to_string())
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.len() <= 254 && EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err("Invalid email address".to_string())
    }
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() >= MIN_PASSWORD_CHARS {
        Ok(())
    } else {
        Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        ))
    }
}

/// Non-blank text of at most `max` characters
pub fn validate_content(field: &str, content: &str, max: usize) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err(format!("{} cannot be empty", field));
    }
    let len = content.chars().count();
    if len > max {
        return Err(format!(
            "{} too long: {} characters (max {})",
            field, len, max
        ));
    }
    Ok(())
}

/// Validate only the fields present in the request
pub fn validate_profile(fields: &UpdateProfileRequest) -> Result<(), String> {
    if let Some(display_name) = &fields.display_name {
        validate_content("Display name", display_name, MAX_DISPLAY_NAME_CHARS)?;
    }

    if let Some(bio) = &fields.bio {
        let len = bio.chars().count();
        if len > MAX_BIO_CHARS {
            return Err(format!(
                "Bio too long: {} characters (max {})",
                len, MAX_BIO_CHARS
            ));
        }
    }

    if let Some(status) = &fields.relationship_status {
        let normalized = status.to_lowercase();
        if !RELATIONSHIP_STATUSES.contains(&normalized.as_str()) {
            return Err(format!(
                "Relationship status must be one of: {}",
                RELATIONSHIP_STATUSES.join(", ")
            ));
        }
    }

    if let Some(birthday) = &fields.birthday {
        validate_birthday(birthday)?;
    }

    Ok(())
}

/// `YYYY-MM-DD`, a real calendar date
pub fn validate_birthday(birthday: &str) -> Result<(), String> {
    if birthday.len() != 10 {
        return Err("Birthday must be formatted as YYYY-MM-DD".to_string());
    }
    NaiveDate::parse_from_str(birthday, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| "Birthday must be formatted as YYYY-MM-DD".to_string())
}
