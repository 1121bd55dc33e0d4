use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    Artisan,
    Employer,
    Doctor,
    Lawyer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "CLIENT",
            Role::Artisan => "ARTISAN",
            Role::Employer => "EMPLOYER",
            Role::Doctor => "DOCTOR",
            Role::Lawyer => "LAWYER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CLIENT" => Ok(Role::Client),
            "ARTISAN" => Ok(Role::Artisan),
            "EMPLOYER" => Ok(Role::Employer),
            "DOCTOR" => Ok(Role::Doctor),
            "LAWYER" => Ok(Role::Lawyer),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Licensed professions that can take consultations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Profession {
    Doctor,
    Lawyer,
}

impl Profession {
    pub fn as_str(&self) -> &'static str {
        self.role().as_str()
    }

    pub fn role(&self) -> Role {
        match self {
            Profession::Doctor => Role::Doctor,
            Profession::Lawyer => Role::Lawyer,
        }
    }

    pub fn from_role(role: Role) -> Option<Self> {
        match role {
            Role::Doctor => Some(Profession::Doctor),
            Role::Lawyer => Some(Profession::Lawyer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub roles: Vec<String>,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub email_verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub email_verification_expires: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub is_verified: bool,
    pub verification_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role.eq_ignore_ascii_case(role.as_str())
            || self.roles.iter().any(|r| r.eq_ignore_ascii_case(role.as_str()))
    }
}

/// Public projection used when a user is embedded in another resource.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub is_verified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("doctor".parse::<Role>().unwrap(), Role::Doctor);
        assert_eq!(" Employer ".parse::<Role>().unwrap(), Role::Employer);
        assert!("pilot".parse::<Role>().is_err());
    }

    #[test]
    fn profession_maps_to_role() {
        assert_eq!(Profession::Lawyer.role(), Role::Lawyer);
        assert_eq!(Profession::from_role(Role::Doctor), Some(Profession::Doctor));
        assert_eq!(Profession::from_role(Role::Artisan), None);
    }
}
