//! Roster member model: students and teachers embedded in a roster document.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::Position;
use crate::errors::AppError;

/// Role a teacher holds inside a department.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TeacherRole {
    Admin,
    Main,
    Sub,
}

impl TeacherRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeacherRole::Admin => "admin",
            TeacherRole::Main => "main",
            TeacherRole::Sub => "sub",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(TeacherRole::Admin),
            "main" => Some(TeacherRole::Main),
            "sub" => Some(TeacherRole::Sub),
            _ => None,
        }
    }
}

/// Variant-specific part of a member. Serialized as a `position` tag
/// inside the member object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "position", rename_all = "lowercase")]
pub enum MemberKind {
    Student,
    Teacher { role: TeacherRole },
}

/// A student or teacher record embedded in a roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub grade: String,
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth: Option<NaiveDate>,
    pub registered_at: NaiveDate,
    #[serde(flatten)]
    pub kind: MemberKind,
}

/// Payload for a member about to be appended to a roster.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub grade: String,
    pub group: String,
    #[serde(default)]
    pub birth: Option<NaiveDate>,
    #[serde(default)]
    pub registered_at: Option<NaiveDate>,
    #[serde(default)]
    pub role: Option<TeacherRole>,
}

impl NewMember {
    /// Build the stored member for a roster of the given position, assigning
    /// an id and registration date when the caller left them out.
    pub fn into_member(self, position: Position) -> Result<Member, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Member name is required".to_string()));
        }

        let kind = match (position, self.role) {
            (Position::Student, None) => MemberKind::Student,
            (Position::Student, Some(_)) => {
                return Err(AppError::Validation(
                    "Students cannot carry a teacher role".to_string(),
                ))
            }
            (Position::Teacher, Some(role)) => MemberKind::Teacher { role },
            (Position::Teacher, None) => {
                return Err(AppError::Validation("Teacher role is required".to_string()))
            }
        };

        let id = match self.id {
            Some(id) if id.trim().is_empty() => {
                return Err(AppError::Validation("Member id cannot be blank".to_string()))
            }
            Some(id) => id,
            None => uuid::Uuid::new_v4().to_string(),
        };

        Ok(Member {
            id,
            name: self.name,
            grade: self.grade,
            group: self.group,
            birth: self.birth,
            registered_at: self
                .registered_at
                .unwrap_or_else(|| Utc::now().date_naive()),
            kind,
        })
    }
}

/// Partial fields merged into an existing member. The id is never patched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    /// `Some(None)` clears the birth date; an absent field keeps it.
    #[serde(default, deserialize_with = "present")]
    pub birth: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub registered_at: Option<NaiveDate>,
    #[serde(default)]
    pub role: Option<TeacherRole>,
}

/// Wrap a field that was present in the payload, so an explicit `null`
/// is told apart from a missing key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl MemberPatch {
    /// Reject a patch that could never apply to members of this position.
    pub fn validate(&self, position: Position) -> Result<(), AppError> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::Validation("Member name cannot be blank".to_string()));
        }
        if position == Position::Student && self.role.is_some() {
            return Err(AppError::Validation(
                "Students cannot carry a teacher role".to_string(),
            ));
        }
        Ok(())
    }

    /// Merge the present fields into `member`, leaving the rest untouched.
    pub fn apply(&self, member: &mut Member) {
        if let Some(name) = &self.name {
            member.name = name.clone();
        }
        if let Some(grade) = &self.grade {
            member.grade = grade.clone();
        }
        if let Some(group) = &self.group {
            member.group = group.clone();
        }
        if let Some(birth) = self.birth {
            member.birth = birth;
        }
        if let Some(registered_at) = self.registered_at {
            member.registered_at = registered_at;
        }
        if let (Some(new_role), MemberKind::Teacher { role }) = (self.role, &mut member.kind) {
            *role = new_role;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_member(role: Option<TeacherRole>) -> NewMember {
        NewMember {
            id: Some("m1".to_string()),
            name: "Kim".to_string(),
            grade: "3".to_string(),
            group: "2".to_string(),
            birth: NaiveDate::from_ymd_opt(2012, 4, 1),
            registered_at: NaiveDate::from_ymd_opt(2024, 1, 7),
            role,
        }
    }

    #[test]
    fn test_teacher_serializes_with_position_tag() {
        let member = new_member(Some(TeacherRole::Main))
            .into_member(Position::Teacher)
            .unwrap();
        let value = serde_json::to_value(&member).unwrap();

        assert_eq!(value["position"], "teacher");
        assert_eq!(value["role"], "main");
        assert_eq!(value["registeredAt"], "2024-01-07");
        assert_eq!(value["birth"], "2012-04-01");

        let back: Member = serde_json::from_value(value).unwrap();
        assert_eq!(back, member);
    }

    #[test]
    fn test_student_deserializes_without_role() {
        let member: Member = serde_json::from_value(json!({
            "id": "s1",
            "name": "Lee",
            "grade": "1",
            "group": "1",
            "registeredAt": "2023-03-05",
            "position": "student"
        }))
        .unwrap();

        assert_eq!(member.kind, MemberKind::Student);
        assert!(member.birth.is_none());
    }

    #[test]
    fn test_into_member_checks_role_against_position() {
        assert!(matches!(
            new_member(Some(TeacherRole::Sub)).into_member(Position::Student),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            new_member(None).into_member(Position::Teacher),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_into_member_assigns_id_and_registration_date() {
        let mut payload = new_member(None);
        payload.id = None;
        payload.registered_at = None;

        let member = payload.into_member(Position::Student).unwrap();
        assert!(uuid::Uuid::parse_str(&member.id).is_ok());
        assert_eq!(member.registered_at, Utc::now().date_naive());
    }

    #[test]
    fn test_into_member_rejects_blank_name() {
        let mut payload = new_member(None);
        payload.name = "   ".to_string();
        assert!(payload.into_member(Position::Student).is_err());
    }

    #[test]
    fn test_patch_merges_only_present_fields() {
        let mut member = new_member(Some(TeacherRole::Sub))
            .into_member(Position::Teacher)
            .unwrap();
        let patch = MemberPatch {
            group: Some("5".to_string()),
            role: Some(TeacherRole::Main),
            ..Default::default()
        };

        patch.apply(&mut member);

        assert_eq!(member.group, "5");
        assert_eq!(
            member.kind,
            MemberKind::Teacher {
                role: TeacherRole::Main
            }
        );
        assert_eq!(member.name, "Kim");
        assert_eq!(member.grade, "3");
        assert_eq!(member.birth, NaiveDate::from_ymd_opt(2012, 4, 1));
    }

    #[test]
    fn test_patch_validate() {
        let patch = MemberPatch {
            role: Some(TeacherRole::Admin),
            ..Default::default()
        };
        assert!(patch.validate(Position::Student).is_err());
        assert!(patch.validate(Position::Teacher).is_ok());

        let blank = MemberPatch {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(blank.validate(Position::Teacher).is_err());
    }

    #[test]
    fn test_patch_null_birth_clears_it() {
        let mut member = new_member(None).into_member(Position::Student).unwrap();

        let request: crate::models::ModifyMemberRequest =
            serde_json::from_value(json!({ "name": "Kim Ji" })).unwrap();
        assert_eq!(request.patch.birth, None);
        request.patch.apply(&mut member);
        assert_eq!(member.birth, NaiveDate::from_ymd_opt(2012, 4, 1));

        let request: crate::models::ModifyMemberRequest =
            serde_json::from_value(json!({ "birth": null, "expectedVersion": 3 })).unwrap();
        assert_eq!(request.patch.birth, Some(None));
        assert_eq!(request.expected_version, Some(3));
        request.patch.apply(&mut member);
        assert_eq!(member.birth, None);
        assert_eq!(member.name, "Kim Ji");
    }

    #[test]
    fn test_role_strings_match_serde_names() {
        for role in [TeacherRole::Admin, TeacherRole::Main, TeacherRole::Sub] {
            assert_eq!(serde_json::to_value(role).unwrap(), role.as_str());
            assert_eq!(TeacherRole::from_str(role.as_str()), Some(role));
        }
    }
}
