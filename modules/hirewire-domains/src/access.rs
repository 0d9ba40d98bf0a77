//! Authorization decisions, centralized so handlers stay declarative.
//!
//! The matrix mixes role gates (who may publish or apply) with ownership
//! gates (who may touch a specific row). Staff accounts pass every
//! ownership gate but are still bound by role gates where the operation is
//! role-shaped by nature.

use hirewire_common::Role;
use uuid::Uuid;

use crate::users::User;

/// The authenticated principal, reduced to what authorization needs.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub is_staff: bool,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role(),
            is_staff: user.is_staff,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Action {
    /// Create a job posting.
    PublishJob,
    /// Update or soft-delete a specific job.
    ModifyJob { publisher_id: Uuid },
    /// Submit an application to a job.
    ApplyToJob,
    /// View one application's detail.
    ViewApplication {
        applicant_id: Uuid,
        publisher_id: Uuid,
    },
    /// Change an application's status or review notes.
    ReviewApplication { publisher_id: Uuid },
    /// Update, soft-delete, or manage images of a post.
    ModifyPost { author_id: Uuid },
    /// Soft-delete a comment.
    DeleteComment {
        comment_author_id: Uuid,
        post_author_id: Uuid,
    },
}

pub fn allows(actor: Actor, action: Action) -> bool {
    match action {
        Action::PublishJob => actor.role.can_publish_jobs(),
        Action::ModifyJob { publisher_id } => actor.is_staff || actor.id == publisher_id,
        Action::ApplyToJob => actor.role == Role::Employee,
        Action::ViewApplication {
            applicant_id,
            publisher_id,
        } => actor.is_staff || actor.id == applicant_id || actor.id == publisher_id,
        Action::ReviewApplication { publisher_id } => actor.id == publisher_id,
        Action::ModifyPost { author_id } => actor.is_staff || actor.id == author_id,
        Action::DeleteComment {
            comment_author_id,
            post_author_id,
        } => actor.is_staff || actor.id == comment_author_id || actor.id == post_author_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, staff: bool) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
            is_staff: staff,
        }
    }

    #[test]
    fn only_employers_and_companies_publish() {
        assert!(allows(actor(Role::Employer, false), Action::PublishJob));
        assert!(allows(actor(Role::Company, false), Action::PublishJob));
        assert!(!allows(actor(Role::Employee, false), Action::PublishJob));
    }

    #[test]
    fn only_employees_apply() {
        assert!(allows(actor(Role::Employee, false), Action::ApplyToJob));
        assert!(!allows(actor(Role::Employer, false), Action::ApplyToJob));
        assert!(!allows(actor(Role::Company, false), Action::ApplyToJob));
    }

    #[test]
    fn job_modification_is_owner_or_staff() {
        let owner = actor(Role::Employer, false);
        assert!(allows(
            owner,
            Action::ModifyJob {
                publisher_id: owner.id
            }
        ));
        assert!(!allows(
            actor(Role::Employer, false),
            Action::ModifyJob {
                publisher_id: Uuid::new_v4()
            }
        ));
        assert!(allows(
            actor(Role::Employee, true),
            Action::ModifyJob {
                publisher_id: Uuid::new_v4()
            }
        ));
    }

    #[test]
    fn application_visibility_is_two_sided() {
        let applicant = actor(Role::Employee, false);
        let publisher = actor(Role::Employer, false);
        let action = Action::ViewApplication {
            applicant_id: applicant.id,
            publisher_id: publisher.id,
        };
        assert!(allows(applicant, action));
        assert!(allows(publisher, action));
        assert!(!allows(actor(Role::Employee, false), action));
    }

    #[test]
    fn review_is_publisher_only_even_for_staff_readers() {
        let publisher = actor(Role::Employer, false);
        assert!(allows(
            publisher,
            Action::ReviewApplication {
                publisher_id: publisher.id
            }
        ));
        assert!(!allows(
            actor(Role::Employer, true),
            Action::ReviewApplication {
                publisher_id: Uuid::new_v4()
            }
        ));
    }

    #[test]
    fn comment_deletion_covers_both_authors_and_staff() {
        let commenter = actor(Role::Employee, false);
        let post_author = actor(Role::Employer, false);
        let action = Action::DeleteComment {
            comment_author_id: commenter.id,
            post_author_id: post_author.id,
        };
        assert!(allows(commenter, action));
        assert!(allows(post_author, action));
        assert!(allows(actor(Role::Employee, true), action));
        assert!(!allows(actor(Role::Employee, false), action));
    }
}
