//! Roster document model: one document per (church, department, position).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Member, MemberPatch, NewMember, TeacherRole};

/// Which kind of members a roster holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Student,
    Teacher,
}

impl Position {
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Student => "student",
            Position::Teacher => "teacher",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Position::Student),
            "teacher" => Some(Position::Teacher),
            _ => None,
        }
    }
}

/// The (church, department, position) triple identifying one roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Scope {
    pub church: String,
    pub department: String,
    pub position: Position,
}

impl Scope {
    pub fn new(church: impl Into<String>, department: impl Into<String>, position: Position) -> Self {
        Self {
            church: church.into(),
            department: department.into(),
            position,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.church,
            self.department,
            self.position.as_str()
        )
    }
}

/// The persisted record holding all members for one scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterDocument {
    pub id: String,
    pub church: String,
    pub department: String,
    pub position: Position,
    pub members: Vec<Member>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped on every successful write
    pub version: i64,
}

/// Request body for appending members to a roster.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMembersRequest {
    pub members: Vec<NewMember>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Request body for patching a single member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyMemberRequest {
    #[serde(flatten)]
    pub patch: MemberPatch,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Request body for removing members by id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMembersRequest {
    pub ids: Vec<String>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Query parameters of the role-aware member listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewerQuery {
    #[serde(default)]
    pub role: Option<TeacherRole>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}
