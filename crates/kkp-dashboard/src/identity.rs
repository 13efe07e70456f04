//! The caller identity every authorization decision is based on.
use serde::{Deserialize, Serialize};

/// Resolved information about the user issuing a request.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub email: String,
    pub is_admin: bool,
    #[serde(default)]
    pub groups: Vec<String>,

    /// IDs of the projects the caller was resolved as a member of.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<String>,
}

impl UserInfo {
    pub fn new(email: impl Into<String>, is_admin: bool) -> Self {
        Self {
            email: email.into(),
            is_admin,
            groups: Vec::new(),
            projects: Vec::new(),
        }
    }

    /// Marks the caller as a member of `project_id` within `group`.
    pub fn in_project(mut self, project_id: impl Into<String>, group: impl Into<String>) -> Self {
        self.projects.push(project_id.into());
        self.groups.push(group.into());
        self
    }

    pub fn is_member_of(&self, project_id: &str) -> bool {
        self.projects.iter().any(|project| project == project_id)
    }

    /// Returns whether the caller passes an email restriction list.
    ///
    /// An empty list places no restriction. Otherwise an entry matches when it
    /// equals the caller's email or names the caller's email domain (with or
    /// without a leading `@`). Matching ignores ASCII case.
    pub fn matches_email_restrictions(&self, restrictions: &[String]) -> bool {
        if restrictions.is_empty() {
            return true;
        }

        let email = self.email.to_ascii_lowercase();
        let domain = email.rsplit_once('@').map(|(_, domain)| domain);

        restrictions.iter().any(|restriction| {
            let restriction = restriction.to_ascii_lowercase();
            if restriction.contains('@') && !restriction.starts_with('@') {
                return restriction == email;
            }

            domain.is_some_and(|domain| domain == restriction.trim_start_matches('@'))
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(&[], true)]
    #[case(&["example.com"], true)]
    #[case(&["@example.com"], true)]
    #[case(&["EXAMPLE.com"], true)]
    #[case(&["bob@example.com"], true)]
    #[case(&["alice@example.com"], false)]
    #[case(&["other.org"], false)]
    #[case(&["other.org", "example.com"], true)]
    #[case(&["ample.com"], false)]
    fn email_restrictions(#[case] restrictions: &[&str], #[case] expected: bool) {
        let user = UserInfo::new("bob@example.com", false);
        let restrictions: Vec<String> = restrictions.iter().map(ToString::to_string).collect();

        assert_eq!(user.matches_email_restrictions(&restrictions), expected);
    }

    #[test]
    fn project_membership() {
        let user = UserInfo::new("bob@example.com", false).in_project("p1", "editors-p1");

        assert!(user.is_member_of("p1"));
        assert!(!user.is_member_of("p2"));
        assert_eq!(user.groups, vec!["editors-p1"]);
    }
}
