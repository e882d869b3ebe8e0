//! Ordering and role-based visibility over an in-memory roster.

use std::cmp::Ordering;

use crate::models::{Member, TeacherRole, ViewerQuery};

/// Compare two members by grade, then group, then name.
fn roster_order(a: &Member, b: &Member) -> Ordering {
    a.grade
        .cmp(&b.grade)
        .then_with(|| a.group.cmp(&b.group))
        .then_with(|| a.name.cmp(&b.name))
}

/// Sort members ascending by (grade, group, name). Ties keep input order.
pub fn sort_members(members: &mut [Member]) {
    // slice::sort_by is stable
    members.sort_by(roster_order);
}

/// The caller on whose behalf a roster is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    pub role: Option<TeacherRole>,
    pub grade: Option<String>,
    pub group: Option<String>,
}

impl Viewer {
    /// Main and sub teachers only see their own grade and group.
    pub fn can_see(&self, member: &Member) -> bool {
        match self.role {
            Some(TeacherRole::Main) | Some(TeacherRole::Sub) => {
                self.grade.as_deref() == Some(member.grade.as_str())
                    && self.group.as_deref() == Some(member.group.as_str())
            }
            Some(TeacherRole::Admin) | None => true,
        }
    }
}

impl From<ViewerQuery> for Viewer {
    fn from(query: ViewerQuery) -> Self {
        Self {
            role: query.role,
            grade: query.grade,
            group: query.group,
        }
    }
}

/// Keep the members `viewer` may see, sorted by (grade, group, name).
pub fn visible_members(members: Vec<Member>, viewer: &Viewer) -> Vec<Member> {
    let mut visible: Vec<Member> = members.into_iter().filter(|m| viewer.can_see(m)).collect();
    sort_members(&mut visible);
    visible
}
