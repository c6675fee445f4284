//! Field validators for profile submissions.
//!
//! All checks are pure and return a human-readable message on failure.

use chrono::{Datelike, NaiveDate};
use image::ImageFormat;

use crate::parser::profile::Gender;

pub const MAX_NAME_LENGTH: usize = 100;
pub const MIN_BIRTH_YEAR: i32 = 1900;
pub const MIN_AGE_YEARS: u32 = 18;
/// Default avatar upload limit (1 MiB).
pub const DEFAULT_MAX_AVATAR_BYTES: usize = 1024 * 1024;
pub const ACCEPTED_IMAGE_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

pub fn validate_name(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("Name cannot be empty.".to_string());
    }

    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(format!("Name must not exceed {MAX_NAME_LENGTH} characters."));
    }

    let mut chars = value.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_allowed = chars.all(|c| c.is_ascii_alphabetic() || c == '-' || c == '\'');

    if !starts_with_letter || !rest_allowed {
        return Err(format!("{value} contains non-english letters"));
    }

    Ok(())
}

pub fn validate_gender(value: &str) -> Result<Gender, String> {
    value.parse::<Gender>().map_err(|_| {
        let allowed: Vec<&str> = Gender::ALL.iter().map(Gender::as_str).collect();
        format!("Gender must be one of: {}", allowed.join(", "))
    })
}

pub fn validate_birth_date(date: NaiveDate, today: NaiveDate) -> Result<(), String> {
    if date > today {
        return Err("Birth date cannot be in the future.".to_string());
    }

    if date.year() < MIN_BIRTH_YEAR {
        return Err(format!(
            "Invalid birth date - year must be greater than {MIN_BIRTH_YEAR}."
        ));
    }

    // years_since is None only when date > today, handled above
    let age = today.years_since(date).unwrap_or(0);
    if age < MIN_AGE_YEARS {
        return Err(format!(
            "You must be at least {MIN_AGE_YEARS} years old to be considered."
        ));
    }

    Ok(())
}

pub fn validate_info(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("Info field cannot be empty or contain only spaces.".to_string());
    }
    Ok(())
}

/// Checks declared type, size, and the actual encoded format of an avatar.
pub fn validate_image(content_type: &str, data: &[u8], max_bytes: usize) -> Result<(), String> {
    let content_type = content_type.trim().to_ascii_lowercase();
    if !ACCEPTED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(format!(
            "Invalid image format: {content_type}. Supported formats: {}",
            ACCEPTED_IMAGE_TYPES.join(", ")
        ));
    }

    if data.is_empty() {
        return Err("Image file is empty.".to_string());
    }

    if data.len() > max_bytes {
        return Err(format!("Image size exceeds {max_bytes} bytes."));
    }

    match image::guess_format(data) {
        Ok(ImageFormat::Jpeg) | Ok(ImageFormat::Png) => Ok(()),
        _ => Err("Invalid image format. Supported formats: JPG, JPEG, PNG".to_string()),
    }
}
