use crate::error::{Error, Result};
use crate::models::profile::UserRole;

/// Authenticated caller with their role resolved from the profile store.
#[derive(Debug, Clone)]
pub struct Caller {
    pub uid: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Update,
    Delete,
    Download,
}

/// Ownership facts for a resource, tagged by kind. Callers fetch whatever
/// linkage facts the rules need and pass them in; the guard itself does no
/// I/O.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Job {
        recruiter_uid: &'a str,
    },
    Cv {
        owner_uid: &'a str,
        /// Whether an application links this CV to a job owned by the caller.
        recruiter_has_application: bool,
    },
    Application {
        applicant_uid: &'a str,
        job_recruiter_uid: &'a str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// First match wins: owner access, recruiter-via-application CV access,
/// recruiter access to their own job's resources, deny.
pub fn authorize(caller: &Caller, resource: Resource<'_>, action: Action) -> Decision {
    match resource {
        Resource::Job { recruiter_uid } => {
            if recruiter_uid == caller.uid {
                return Decision::Allow;
            }
            Decision::Deny("access denied")
        }
        Resource::Cv {
            owner_uid,
            recruiter_has_application,
        } => {
            if owner_uid == caller.uid {
                return Decision::Allow;
            }
            if caller.role == UserRole::Recruiter {
                if !recruiter_has_application {
                    return Decision::Deny("no application linkage");
                }
                // Linkage grants read access only; the CV stays the
                // applicant's to modify.
                if matches!(action, Action::View | Action::Download) {
                    return Decision::Allow;
                }
            }
            Decision::Deny("access denied")
        }
        Resource::Application {
            applicant_uid,
            job_recruiter_uid,
        } => {
            if applicant_uid == caller.uid {
                return Decision::Allow;
            }
            if caller.role == UserRole::Recruiter && job_recruiter_uid == caller.uid {
                return Decision::Allow;
            }
            Decision::Deny("access denied")
        }
    }
}

/// Same decision, translated into the error taxonomy for service code.
pub fn require(caller: &Caller, resource: Resource<'_>, action: Action) -> Result<()> {
    match authorize(caller, resource, action) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => Err(Error::Forbidden(format!("Access denied: {}", reason))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeker(uid: &str) -> Caller {
        Caller {
            uid: uid.to_string(),
            role: UserRole::JobSeeker,
        }
    }

    fn recruiter(uid: &str) -> Caller {
        Caller {
            uid: uid.to_string(),
            role: UserRole::Recruiter,
        }
    }

    #[test]
    fn owner_is_allowed_regardless_of_role() {
        let cv = Resource::Cv {
            owner_uid: "u1",
            recruiter_has_application: false,
        };
        assert!(authorize(&seeker("u1"), cv, Action::Update).is_allowed());
        assert!(authorize(&recruiter("u1"), cv, Action::Delete).is_allowed());

        let job = Resource::Job {
            recruiter_uid: "r1",
        };
        assert!(authorize(&recruiter("r1"), job, Action::Delete).is_allowed());

        let application = Resource::Application {
            applicant_uid: "u1",
            job_recruiter_uid: "r1",
        };
        assert!(authorize(&seeker("u1"), application, Action::View).is_allowed());
    }

    #[test]
    fn recruiter_reads_cv_through_application_linkage() {
        let linked = Resource::Cv {
            owner_uid: "u1",
            recruiter_has_application: true,
        };
        assert!(authorize(&recruiter("r1"), linked, Action::View).is_allowed());
        assert!(authorize(&recruiter("r1"), linked, Action::Download).is_allowed());

        // Linkage never grants write access.
        assert_eq!(
            authorize(&recruiter("r1"), linked, Action::Delete),
            Decision::Deny("access denied")
        );
    }

    #[test]
    fn recruiter_without_linkage_gets_the_linkage_reason() {
        let unlinked = Resource::Cv {
            owner_uid: "u1",
            recruiter_has_application: false,
        };
        assert_eq!(
            authorize(&recruiter("r1"), unlinked, Action::View),
            Decision::Deny("no application linkage")
        );
    }

    #[test]
    fn job_seeker_never_reads_someone_elses_cv() {
        let cv = Resource::Cv {
            owner_uid: "u1",
            recruiter_has_application: true,
        };
        assert_eq!(
            authorize(&seeker("u2"), cv, Action::View),
            Decision::Deny("access denied")
        );
    }

    #[test]
    fn owning_recruiter_may_act_on_applications_to_their_job() {
        let application = Resource::Application {
            applicant_uid: "u1",
            job_recruiter_uid: "r1",
        };
        assert!(authorize(&recruiter("r1"), application, Action::Update).is_allowed());
        assert_eq!(
            authorize(&recruiter("r2"), application, Action::Update),
            Decision::Deny("access denied")
        );
    }

    #[test]
    fn foreign_job_is_denied() {
        let job = Resource::Job {
            recruiter_uid: "r1",
        };
        assert_eq!(
            authorize(&recruiter("r2"), job, Action::Update),
            Decision::Deny("access denied")
        );
        assert_eq!(
            authorize(&seeker("u1"), job, Action::Delete),
            Decision::Deny("access denied")
        );
    }

    #[test]
    fn require_maps_deny_to_forbidden() {
        let job = Resource::Job {
            recruiter_uid: "r1",
        };
        assert!(require(&recruiter("r1"), job, Action::Update).is_ok());
        let err = require(&recruiter("r2"), job, Action::Update).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }
}
