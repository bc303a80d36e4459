use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{AppError, AppResult};

/// Every account role. Only the first three own a marketplace [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Individual,
    Startup,
    Investor,
    Donor,
    Ngo,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Individual => "individual",
            Role::Startup => "startup",
            Role::Investor => "investor",
            Role::Donor => "donor",
            Role::Ngo => "ngo",
        }
    }

    pub fn has_marketplace_profile(self) -> bool {
        matches!(self, Role::Individual | Role::Startup | Role::Investor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(Role::Individual),
            "startup" => Ok(Role::Startup),
            "investor" => Ok(Role::Investor),
            "donor" => Ok(Role::Donor),
            "ngo" => Ok(Role::Ngo),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub inbox: Vec<String>,
    #[serde(flatten)]
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Profile {
    Individual(IndividualProfile),
    Startup(StartupProfile),
    Investor(InvestorProfile),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndividualProfile {
    pub skills: Vec<String>,
    pub saved_jobs: Vec<String>,
    pub applications: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartupProfile {
    pub description: String,
    pub jobs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvestorProfile {
    pub portfolio: Vec<String>,
}

impl Profile {
    /// Empty payload for a freshly registered account, if the role has one.
    pub fn empty(role: Role) -> Option<Profile> {
        match role {
            Role::Individual => Some(Profile::Individual(IndividualProfile::default())),
            Role::Startup => Some(Profile::Startup(StartupProfile::default())),
            Role::Investor => Some(Profile::Investor(InvestorProfile::default())),
            Role::Donor | Role::Ngo => None,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Profile::Individual(_) => Role::Individual,
            Profile::Startup(_) => Role::Startup,
            Profile::Investor(_) => Role::Investor,
        }
    }
}

impl User {
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn as_individual(&self) -> Option<&IndividualProfile> {
        match &self.profile {
            Profile::Individual(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_individual_mut(&mut self) -> Option<&mut IndividualProfile> {
        match &mut self.profile {
            Profile::Individual(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_startup_mut(&mut self) -> Option<&mut StartupProfile> {
        match &mut self.profile {
            Profile::Startup(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_investor(&self) -> Option<&InvestorProfile> {
        match &self.profile {
            Profile::Investor(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_investor_mut(&mut self) -> Option<&mut InvestorProfile> {
        match &mut self.profile {
            Profile::Investor(p) => Some(p),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Active,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub description: String,
    pub startup_id: String,
    #[serde(default)]
    pub skills_required: Vec<String>,
    #[serde(default)]
    pub applicants: Vec<String>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Job {
    /// Case-insensitive overlap between the job's skills and `skills`.
    pub fn matches_any(&self, skills: &[String]) -> bool {
        self.skills_required
            .iter()
            .any(|wanted| skills.iter().any(|have| have.eq_ignore_ascii_case(wanted)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Submitted,
    Reviewed,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub job_id: String,
    pub individual_id: String,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub applied_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub from: String,
    pub to: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub read: bool,
}

/// The whole flat-file document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Data {
    pub users: Vec<User>,
    pub jobs: Vec<Job>,
    pub applications: Vec<Application>,
    pub messages: Vec<Message>,
}

impl Data {
    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_mut(&mut self, id: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    /// The user with `id`, provided it holds `role`.
    pub fn user_in_role(&self, id: &str, role: Role) -> AppResult<&User> {
        self.user(id)
            .filter(|u| u.role() == role)
            .ok_or_else(|| AppError::not_found(format!("{role} {id}")))
    }

    pub fn user_in_role_mut(&mut self, id: &str, role: Role) -> AppResult<&mut User> {
        self.user_mut(id)
            .filter(|u| u.role() == role)
            .ok_or_else(|| AppError::not_found(format!("{role} {id}")))
    }

    pub fn individual(&self, id: &str) -> AppResult<&IndividualProfile> {
        self.user(id)
            .and_then(User::as_individual)
            .ok_or_else(|| AppError::not_found(format!("individual {id}")))
    }

    pub fn individual_mut(&mut self, id: &str) -> AppResult<&mut IndividualProfile> {
        self.user_mut(id)
            .and_then(User::as_individual_mut)
            .ok_or_else(|| AppError::not_found(format!("individual {id}")))
    }

    pub fn startup_mut(&mut self, id: &str) -> AppResult<&mut StartupProfile> {
        self.user_mut(id)
            .and_then(User::as_startup_mut)
            .ok_or_else(|| AppError::not_found(format!("startup {id}")))
    }

    pub fn investor_mut(&mut self, id: &str) -> AppResult<&mut InvestorProfile> {
        self.user_mut(id)
            .and_then(User::as_investor_mut)
            .ok_or_else(|| AppError::not_found(format!("investor {id}")))
    }

    pub fn job(&self, id: &str) -> AppResult<&Job> {
        self.jobs
            .iter()
            .find(|j| j.id == id)
            .ok_or_else(|| AppError::not_found(format!("job {id}")))
    }

    pub fn job_mut(&mut self, id: &str) -> AppResult<&mut Job> {
        self.jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| AppError::not_found(format!("job {id}")))
    }

    pub fn applications_of<'a>(&'a self, individual_id: &'a str) -> impl Iterator<Item = &'a Application> + 'a {
        self.applications
            .iter()
            .filter(move |a| a.individual_id == individual_id)
    }

    pub fn has_applied(&self, individual_id: &str, job_id: &str) -> bool {
        self.applications_of(individual_id).any(|a| a.job_id == job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn users_serialize_with_a_role_tag() {
        let user = User {
            id: "i1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            inbox: vec![],
            profile: Profile::Individual(IndividualProfile {
                skills: vec!["rust".into()],
                ..Default::default()
            }),
        };

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["role"], "individual");
        assert_eq!(value["skills"], json!(["rust"]));
        assert_eq!(value["savedJobs"], json!([]));
    }

    #[test]
    fn role_payload_fields_default_when_missing() {
        let user: User = serde_json::from_value(json!({
            "id": "v1",
            "name": "Fund",
            "role": "investor",
        }))
        .unwrap();

        assert_eq!(user.role(), Role::Investor);
        assert!(user.as_investor().unwrap().portfolio.is_empty());
    }

    #[test]
    fn skill_matching_ignores_case() {
        let job = Job {
            id: "j".into(),
            title: "Eng".into(),
            description: String::new(),
            startup_id: "s".into(),
            skills_required: vec!["Go".into()],
            applicants: vec![],
            status: JobStatus::Active,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };

        assert!(job.matches_any(&["go".into()]));
        assert!(!job.matches_any(&["rust".into()]));
    }

    #[test]
    fn lookups_in_the_wrong_role_are_not_found() {
        let data = Data {
            users: vec![User {
                id: "s1".into(),
                name: "Acme".into(),
                email: String::new(),
                inbox: vec![],
                profile: Profile::Startup(StartupProfile::default()),
            }],
            ..Default::default()
        };

        assert!(data.user_in_role("s1", Role::Startup).is_ok());
        assert!(matches!(
            data.user_in_role("s1", Role::Investor),
            Err(AppError::NotFound(_))
        ));
    }
}
