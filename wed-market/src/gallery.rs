// Anonymous landing page: latest listings and the contact form.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;
use wed_docs::{Direction, DocumentStore, Query};

use crate::error::{MarketError, MarketResult};
use crate::records::ListingRecord;

/// Newest public listings, for the landing view
#[derive(Clone)]
pub struct PublicGallery {
    docs: Arc<dyn DocumentStore>,
    collection: String,
}

impl PublicGallery {
    pub fn new(docs: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            docs,
            collection: collection.into(),
        }
    }

    pub async fn latest(&self, limit: usize) -> MarketResult<Vec<ListingRecord>> {
        let query = Query::new()
            .order_by("uploadedAt", Direction::Descending)
            .limit(limit);
        let docs = self
            .docs
            .query(&self.collection, query)
            .await
            .map_err(|e| MarketError::fetch("public listings", e))?;

        Ok(docs
            .iter()
            .filter_map(|doc| match doc.decode::<ListingRecord>() {
                Ok(listing) => Some(listing),
                Err(e) => {
                    warn!(doc = %doc.id(), error = %e, "skipping malformed listing");
                    None
                }
            })
            .collect())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContactFormError {
    #[error("Name is required")]
    MissingName,
    #[error("A valid email address is required")]
    InvalidEmail,
    #[error("Message is required")]
    MissingMessage,
}

/// Landing page contact form. There is no backend; a valid submission
/// simply resets the fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<(), ContactFormError> {
        if self.name.trim().is_empty() {
            return Err(ContactFormError::MissingName);
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ContactFormError::InvalidEmail);
        }
        if self.message.trim().is_empty() {
            return Err(ContactFormError::MissingMessage);
        }
        Ok(())
    }

    /// Validate, then clear the form. Invalid input is left in place.
    pub fn submit(&mut self) -> Result<(), ContactFormError> {
        self.validate()?;
        *self = Self::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> ContactForm {
        ContactForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            message: "Is the arch still available?".into(),
        }
    }

    #[test]
    fn valid_submission_clears_form() {
        let mut form = filled();
        assert_eq!(form.submit(), Ok(()));
        assert_eq!(form, ContactForm::default());
    }

    #[test]
    fn invalid_submission_keeps_input() {
        let mut form = ContactForm {
            email: "ada.example.com".into(),
            ..filled()
        };
        assert_eq!(form.submit(), Err(ContactFormError::InvalidEmail));
        assert_eq!(form.name, "Ada");

        form.email = "ada@example.com".into();
        form.message = "  ".into();
        assert_eq!(form.submit(), Err(ContactFormError::MissingMessage));

        form.name = String::new();
        assert_eq!(form.validate(), Err(ContactFormError::MissingName));
    }
}
