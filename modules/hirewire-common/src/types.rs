//! Shared vocabulary: the closed string sets stored in TEXT columns.
//!
//! Models keep plain `String` fields (what the row actually holds); these
//! enums centralize parsing and the canonical spellings so role and status
//! checks never compare against scattered literals.

/// Account role. Immutable after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Employee,
    Employer,
    Company,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Employee, Role::Employer, Role::Company];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Employer => "employer",
            Role::Company => "company",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "employee" => Some(Role::Employee),
            "employer" => Some(Role::Employer),
            "company" => Some(Role::Company),
            _ => None,
        }
    }

    /// Employers and companies publish jobs; employees apply.
    pub fn can_publish_jobs(&self) -> bool {
        matches!(self, Role::Employer | Role::Company)
    }
}

/// Lifecycle of a follow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FollowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowStatus::Pending => "pending",
            FollowStatus::Accepted => "accepted",
            FollowStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FollowStatus::Pending),
            "accepted" => Some(FollowStatus::Accepted),
            "rejected" => Some(FollowStatus::Rejected),
            _ => None,
        }
    }
}

/// Application review state. An open enum by design: the publisher may move
/// an application to any of these values in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    Submitted,
    Reviewing,
    Shortlisted,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::Reviewing,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Hired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Hired => "hired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    Fulltime,
    Parttime,
    Intern,
}

impl JobType {
    pub const ALL: [JobType; 3] = [JobType::Fulltime, JobType::Parttime, JobType::Intern];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Fulltime => "fulltime",
            JobType::Parttime => "parttime",
            JobType::Intern => "intern",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkMode {
    Remote,
    Hybrid,
    Onsite,
}

impl WorkMode {
    pub const ALL: [WorkMode; 3] = [WorkMode::Remote, WorkMode::Hybrid, WorkMode::Onsite];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkMode::Remote => "remote",
            WorkMode::Hybrid => "hybrid",
            WorkMode::Onsite => "onsite",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }
}

/// Kind tag on a notification row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    Follow,
    Post,
    Job,
    Like,
    Comment,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Follow => "follow",
            NotificationType::Post => "post",
            NotificationType::Job => "job",
            NotificationType::Like => "like",
            NotificationType::Comment => "comment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn publishing_roles() {
        assert!(!Role::Employee.can_publish_jobs());
        assert!(Role::Employer.can_publish_jobs());
        assert!(Role::Company.can_publish_jobs());
    }

    #[test]
    fn application_status_round_trip() {
        for status in ApplicationStatus::ALL {
            assert_eq!(ApplicationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApplicationStatus::parse("archived"), None);
    }

    #[test]
    fn job_type_round_trip() {
        for jt in JobType::ALL {
            assert_eq!(JobType::parse(jt.as_str()), Some(jt));
        }
        assert_eq!(JobType::parse("contract"), None);
    }
}
