//! Child profile form backed by `/profile`.
//!
//! The client never asks whether a profile exists. Fetching treats any
//! failure as "no profile yet", and saving tries a create first and falls
//! back to an update.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::api::{Headers, Method};
use crate::context::ClientContext;
use crate::error::{ClientError, Result};

const PROFILE_PATH: &str = "/profile";

/// The editable profile form. Blank strings mean "not filled in".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub nickname: String,
    /// `YYYY-MM-DD`.
    pub birth_date: String,
    pub grade: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Nickname,
    BirthDate,
    Grade,
    Notes,
}

/// Backend representation; optional fields come back as `null`.
#[derive(Debug, Default, Deserialize)]
struct ProfileRecord {
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    birth_date: Option<String>,
    #[serde(default)]
    grade: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

impl Profile {
    pub fn set_field(&mut self, field: ProfileField, value: impl Into<String>) {
        let value = value.into();
        match field {
            ProfileField::Nickname => self.nickname = value,
            ProfileField::BirthDate => self.birth_date = value,
            ProfileField::Grade => self.grade = value,
            ProfileField::Notes => self.notes = value,
        }
    }

    /// Nickname and birth date are the only fields checked locally.
    pub fn validate(&self) -> Result<()> {
        if self.nickname.trim().is_empty() || self.birth_date.trim().is_empty() {
            return Err(ClientError::Validation(
                "nickname and birth date are required".to_string(),
            ));
        }
        Ok(())
    }

    fn from_record(record: ProfileRecord) -> Self {
        Self {
            nickname: record.nickname.unwrap_or_default(),
            birth_date: date_only(record.birth_date.as_deref().unwrap_or_default()),
            grade: record.grade.unwrap_or_default(),
            notes: record.notes.unwrap_or_default(),
        }
    }
}

/// Drop any time-of-day suffix: `2017-05-20T00:00:00` becomes `2017-05-20`.
fn date_only(value: &str) -> String {
    value.split('T').next().unwrap_or_default().to_string()
}

#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    profile: Profile,
}

impl ProfileForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn set_field(&mut self, field: ProfileField, value: impl Into<String>) {
        self.profile.set_field(field, value);
    }

    /// Fill the form from the backend.
    ///
    /// Returns `false` and leaves the form as it was when there is no
    /// profile, the request fails, or the stored profile has no nickname.
    pub async fn fetch_profile(&mut self, ctx: &ClientContext) -> bool {
        let record = ctx
            .api
            .request_as::<(), ProfileRecord>(PROFILE_PATH, Method::Get, None, &Headers::new())
            .await;

        match record {
            Ok(record) if record.nickname.as_deref().is_some_and(|n| !n.is_empty()) => {
                self.profile = Profile::from_record(record);
                true
            }
            Ok(_) => {
                info!("profile has no nickname, keeping form as is");
                false
            }
            Err(e) => {
                info!("no profile or fetch error: {}", e);
                false
            }
        }
    }

    /// Create the profile, or update it if the create is refused.
    pub async fn submit_profile(&self, ctx: &ClientContext) -> Result<SaveOutcome> {
        self.profile.validate()?;

        match ctx
            .api
            .request_as::<_, serde_json::Value>(
                PROFILE_PATH,
                Method::Post,
                Some(&self.profile),
                &Headers::new(),
            )
            .await
        {
            Ok(_) => return Ok(SaveOutcome::Created),
            Err(e) => info!("profile create failed ({}), trying update", e),
        }

        ctx.api
            .request_as::<_, serde_json::Value>(
                PROFILE_PATH,
                Method::Put,
                Some(&self.profile),
                &Headers::new(),
            )
            .await
            .map(|_| SaveOutcome::Updated)
            .map_err(|e| {
                warn!("profile save failed: {}", e);
                e
            })
    }
}
