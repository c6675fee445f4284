use chrono::NaiveDate;
use serde::Serialize;

use crate::parser::profile::{Avatar, NewProfile};
use crate::validation::{
    validate_birth_date, validate_gender, validate_image, validate_info, validate_name,
};

/// One violated field in a rejected submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn missing(field: &str) -> Self {
        Self::new(field, "Field required", "missing")
    }

    pub fn value(field: &str, msg: impl Into<String>) -> Self {
        Self::new(field, msg, "value_error")
    }

    fn new(field: &str, msg: impl Into<String>, kind: &str) -> Self {
        FieldError {
            loc: vec!["body".to_string(), field.to_string()],
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }

    pub fn field(&self) -> &str {
        self.loc.last().map(String::as_str).unwrap_or("")
    }
}

/// Raw multipart values as received, before any validation.
#[derive(Clone, Debug, Default)]
pub struct ProfileForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub info: Option<String>,
    pub avatar: Option<Avatar>,
    /// Parts that could not be read as a value at all, e.g. non UTF-8 text.
    pub rejected: Vec<FieldError>,
}

impl ProfileForm {
    /// Records `field` as unreadable. A later part with the same name does not
    /// clear it.
    pub fn reject(&mut self, field: &str, msg: impl Into<String>) {
        self.rejected.push(FieldError::value(field, msg));
    }

    /// Runs every validator and either yields the normalized profile or one
    /// error per violated field.
    pub fn validate(self, today: NaiveDate, max_avatar_bytes: usize) -> Result<NewProfile, Vec<FieldError>> {
        let mut errors = self.rejected;

        let first_name = check(&mut errors, "first_name", self.first_name, |v| {
            validate_name(&v).map(|_| v.to_lowercase())
        });
        let last_name = check(&mut errors, "last_name", self.last_name, |v| {
            validate_name(&v).map(|_| v.to_lowercase())
        });
        let gender = check(&mut errors, "gender", self.gender, |v| validate_gender(&v));
        let date_of_birth = check(&mut errors, "date_of_birth", self.date_of_birth, |v| {
            let date = NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                .map_err(|e| format!("Input should be a valid date in YYYY-MM-DD format: {e}"))?;
            validate_birth_date(date, today).map(|_| date)
        });
        let info = check(&mut errors, "info", self.info, |v| {
            validate_info(&v).map(|_| v.trim().to_string())
        });
        let avatar = check(&mut errors, "avatar", self.avatar, |a| {
            validate_image(&a.content_type, &a.data, max_avatar_bytes).map(|_| a)
        });

        match (first_name, last_name, gender, date_of_birth, info, avatar) {
            (Some(first_name), Some(last_name), Some(gender), Some(date_of_birth), Some(info), Some(avatar))
                if errors.is_empty() =>
            {
                Ok(NewProfile {
                    first_name,
                    last_name,
                    gender,
                    date_of_birth,
                    info,
                    avatar,
                })
            }
            _ => Err(errors),
        }
    }
}

fn check<T, U>(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: Option<T>,
    validate: impl FnOnce(T) -> Result<U, String>,
) -> Option<U> {
    if errors.iter().any(|e| e.field() == field) {
        return None;
    }
    let Some(value) = value else {
        errors.push(FieldError::missing(field));
        return None;
    };

    match validate(value) {
        Ok(v) => Some(v),
        Err(msg) => {
            errors.push(FieldError::value(field, msg));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::profile::Gender;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn valid_form() -> ProfileForm {
        ProfileForm {
            first_name: Some("John".to_string()),
            last_name: Some("Doe".to_string()),
            gender: Some("male".to_string()),
            date_of_birth: Some("1990-05-01".to_string()),
            info: Some("  Likes films.  ".to_string()),
            avatar: Some(Avatar {
                content_type: "image/png".to_string(),
                data: PNG_MAGIC.to_vec(),
            }),
            rejected: Vec::new(),
        }
    }

    #[test]
    fn valid_form_is_normalized() {
        let profile = valid_form().validate(today(), 1024).unwrap();

        assert_eq!(profile.first_name, "john");
        assert_eq!(profile.last_name, "doe");
        assert_eq!(profile.gender, Gender::Male);
        assert_eq!(profile.info, "Likes films.");
        assert_eq!(profile.date_of_birth, NaiveDate::from_ymd_opt(1990, 5, 1).unwrap());
    }

    #[test]
    fn one_error_per_violated_field() {
        let mut form = valid_form();
        form.first_name = Some("J0hn".to_string());
        form.gender = Some("robot".to_string());
        form.date_of_birth = Some("2030-01-01".to_string());
        form.avatar = Some(Avatar {
            content_type: "image/gif".to_string(),
            data: PNG_MAGIC.to_vec(),
        });

        let errors = form.validate(today(), 1024).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(FieldError::field).collect();

        assert_eq!(fields, vec!["first_name", "gender", "date_of_birth", "avatar"]);
        assert!(errors.iter().all(|e| e.kind == "value_error"));
    }

    #[test]
    fn missing_fields_are_reported() {
        let errors = ProfileForm::default().validate(today(), 1024).unwrap_err();

        assert_eq!(errors.len(), 6);
        assert!(errors.iter().all(|e| e.kind == "missing" && e.msg == "Field required"));
    }

    #[test]
    fn malformed_date_is_a_value_error() {
        let mut form = valid_form();
        form.date_of_birth = Some("01/05/1990".to_string());

        let errors = form.validate(today(), 1024).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), "date_of_birth");
    }

    #[test]
    fn rejected_part_is_reported_once() {
        let mut form = valid_form();
        form.first_name = None;
        form.reject("first_name", "Input should be a valid UTF-8 string");

        let errors = form.validate(today(), 1024).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), "first_name");
        assert_eq!(errors[0].kind, "value_error");
        assert_eq!(errors[0].msg, "Input should be a valid UTF-8 string");
    }

    #[test]
    fn rejected_part_wins_over_a_later_valid_one() {
        let mut form = valid_form();
        form.reject("info", "Input should be a valid UTF-8 string");

        let errors = form.validate(today(), 1024).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), "info");
    }
}
