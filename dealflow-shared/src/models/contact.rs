//! Contacts: people and companies tracked per organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contact within an organization.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    /// Contact ID
    pub id: Uuid,

    /// Owning organization
    pub organization_id: Uuid,

    /// Contact name
    pub name: String,

    /// Email address
    pub email: Option<String>,

    /// Phone number
    pub phone: Option<String>,

    /// Company name
    pub company: Option<String>,

    /// Free-form notes
    pub notes: Option<String>,

    /// When the contact was created
    pub created_at: DateTime<Utc>,

    /// When the contact was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
}

/// Partial update for a contact. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
}

impl Contact {
    /// Builds a new contact record with a fresh id and timestamps.
    pub fn new(organization_id: Uuid, data: CreateContact) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name: data.name,
            email: data.email,
            phone: data.phone,
            company: data.company,
            notes: data.notes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update in place and bumps `updated_at`.
    pub fn apply(&mut self, changes: UpdateContact) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(email) = changes.email {
            self.email = Some(email);
        }
        if let Some(phone) = changes.phone {
            self.phone = Some(phone);
        }
        if let Some(company) = changes.company {
            self.company = Some(company);
        }
        if let Some(notes) = changes.notes {
            self.notes = Some(notes);
        }
        self.updated_at = Utc::now();
    }
}
