//! Admin-driven business status transitions and input checks.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::{Business, BusinessStatus, NewBusiness, StatusChange, UpdateBusiness};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdminAction {
    Approve,
    Reject,
    Suspend,
    Reactivate,
}

/// Status write for `action` applied to `business`, or why it is not allowed.
pub fn transition(business: &Business, action: AdminAction, reason: Option<String>) -> Result<StatusChange, String> {
    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    match (action, business.status) {
        (AdminAction::Approve, BusinessStatus::Pending | BusinessStatus::Inactive) => Ok(StatusChange {
            status: BusinessStatus::Active,
            verified: true,
            rejection_reason: None,
            suspension_reason: None,
        }),
        (AdminAction::Reject, BusinessStatus::Pending) => Ok(StatusChange {
            status: BusinessStatus::Inactive,
            verified: false,
            rejection_reason: Some(reason.ok_or("a rejection reason is required")?),
            suspension_reason: None,
        }),
        (AdminAction::Suspend, BusinessStatus::Active) => Ok(StatusChange {
            status: BusinessStatus::Suspended,
            verified: business.verified,
            rejection_reason: None,
            suspension_reason: Some(reason.ok_or("a suspension reason is required")?),
        }),
        (AdminAction::Reactivate, BusinessStatus::Suspended) => Ok(StatusChange {
            status: BusinessStatus::Active,
            verified: business.verified,
            rejection_reason: None,
            suspension_reason: None,
        }),
        (action, status) => Err(format!("cannot {action:?} a business that is {status}").to_lowercase()),
    }
}

fn check_website(site: &str, errors: &mut Vec<String>) {
    if !(site.starts_with("http://") || site.starts_with("https://")) {
        errors.push("website must start with http:// or https://".to_string());
    }
}

pub fn validate_new(new: &NewBusiness) -> Vec<String> {
    let mut errors = Vec::new();
    let name = new.name.trim();
    if name.is_empty() {
        errors.push("name is required".to_string());
    } else if name.chars().count() > 100 {
        errors.push("name cannot exceed 100 characters".to_string());
    }
    if new.category.trim().is_empty() {
        errors.push("category is required".to_string());
    }
    if new.description.chars().count() > 1000 {
        errors.push("description cannot exceed 1000 characters".to_string());
    }
    if let Some(site) = new.website.as_deref() {
        check_website(site, &mut errors);
    }
    errors
}

pub fn validate_update(upd: &UpdateBusiness) -> Vec<String> {
    let mut errors = Vec::new();
    if upd.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        errors.push("name cannot be empty".to_string());
    }
    if upd.description.as_deref().is_some_and(|d| d.chars().count() > 1000) {
        errors.push("description cannot exceed 1000 characters".to_string());
    }
    if let Some(site) = upd.website.as_deref() {
        check_website(site, &mut errors);
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn business(status: BusinessStatus) -> Business {
        Business {
            id: 1, owner_id: 1, name: "Cafe".into(), category: "food".into(), description: String::new(),
            website: None, address: None, phone: None, logo: None, status, verified: false,
            rejection_reason: None, suspension_reason: None, followers: 0, followers_list: vec![],
            total_posts: 0, total_products: 0, engagement_rate: 0.0, created_at: Utc::now(), updated_at: Utc::now(),
        }
    }

    #[test]
    fn approve_pending() {
        let change = transition(&business(BusinessStatus::Pending), AdminAction::Approve, None).unwrap();
        assert_eq!(change.status, BusinessStatus::Active);
        assert!(change.verified);
    }

    #[test]
    fn suspend_needs_reason() {
        let b = business(BusinessStatus::Active);
        assert!(transition(&b, AdminAction::Suspend, Some("  ".into())).is_err());
        let change = transition(&b, AdminAction::Suspend, Some("spam".into())).unwrap();
        assert_eq!(change.suspension_reason.as_deref(), Some("spam"));
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let err = transition(&business(BusinessStatus::Suspended), AdminAction::Approve, None).unwrap_err();
        assert_eq!(err, "cannot approve a business that is suspended");
    }
}
