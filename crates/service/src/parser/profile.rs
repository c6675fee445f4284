use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Group id that grants permission to act on other users' profiles.
pub const ADMIN_GROUP_ID: i64 = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub is_active: bool,
    pub group_id: i64,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.group_id == ADMIN_GROUP_ID
    }

    /// Self-or-admin rule for acting on `target_user_id`.
    pub fn can_manage(&self, target_user_id: i64) -> bool {
        self.id == target_user_id || self.is_admin()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(format!("Unknown gender: {s}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,              // one profile per user
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub info: String,
    pub avatar: String,            // storage key, swapped for a URL in responses
}

/// Validated and normalized profile submission.
#[derive(Clone, Debug)]
pub struct NewProfile {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub info: String,
    pub avatar: Avatar,
}

#[derive(Clone, Debug)]
pub struct Avatar {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Row written by the repository; the id is assigned on insert.
#[derive(Clone, Debug)]
pub struct NewProfileRecord {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub info: String,
    pub avatar: String,
}

impl NewProfileRecord {
    pub fn into_profile(self, id: i64) -> UserProfile {
        UserProfile {
            id,
            user_id: self.user_id,
            first_name: self.first_name,
            last_name: self.last_name,
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            info: self.info,
            avatar: self.avatar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_manage_anyone() {
        let admin = User { id: 1, is_active: true, group_id: ADMIN_GROUP_ID };
        let user = User { id: 2, is_active: true, group_id: 1 };

        assert!(admin.can_manage(2));
        assert!(user.can_manage(2));
        assert!(!user.can_manage(1));
    }

    #[test]
    fn gender_parsing_is_case_insensitive() {
        assert_eq!("Female".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!(" other ".parse::<Gender>(), Ok(Gender::Other));
        assert!("unknown".parse::<Gender>().is_err());
    }
}
