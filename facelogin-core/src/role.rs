//! User roles and the dashboard each one lands on after login.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    /// Lecturer
    GiangVien,
    /// Student
    SinhVien,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::GiangVien => "GIANGVIEN",
            Role::SinhVien => "SINHVIEN",
        }
    }

    /// The route a freshly authenticated user of this role is sent to.
    pub fn dashboard_route(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::GiangVien => "/lecturer/dashboard",
            Role::SinhVien => "/student/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "GIANGVIEN" => Ok(Role::GiangVien),
            "SINHVIEN" => Ok(Role::SinhVien),
            other => Err(AuthError::UnknownRole(other.to_string())),
        }
    }
}
