//! Account profile and session models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Position, TeacherRole};

/// Profile document stored per signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub church: String,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<TeacherRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating or replacing an account profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAccountRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub church: String,
    pub department: String,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub role: Option<TeacherRole>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

/// Session view: signed-in identity merged with the stored profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Account>,
    pub auth_ready: bool,
}
