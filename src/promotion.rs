//! Promotion lifecycle: `draft -> scheduled -> active -> expired`, with
//! owner-driven `active <-> paused`.

use chrono::{DateTime, Utc};

use crate::models::{DiscountType, Promotion, PromotionInput, PromotionPerformance, PromotionStatus};

/// Status implied by the promotion's dates at `now`.
///
/// Pure in `(start, end, now)`: the prior status only matters when it is
/// `Paused`, which is kept until the end date passes.
pub fn derive_status(
    current: PromotionStatus,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> PromotionStatus {
    let ended = end.is_some_and(|e| e < now);
    if current == PromotionStatus::Paused && !ended {
        return PromotionStatus::Paused;
    }
    if start > now {
        PromotionStatus::Scheduled
    } else if ended {
        PromotionStatus::Expired
    } else {
        PromotionStatus::Active
    }
}

/// Read-only view used by listings and the dashboard.
pub fn is_active(promo: &Promotion, now: DateTime<Utc>) -> bool {
    promo.status == PromotionStatus::Active
        && promo.start_date <= now
        && promo.end_date.map_or(true, |e| e > now)
}

/// Field checks applied to every create and update.
pub fn validate(input: &PromotionInput) -> Vec<String> {
    let mut errors = Vec::new();
    if input.name.trim().is_empty() {
        errors.push("name is required".to_string());
    }
    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        if end <= start {
            errors.push("endDate must be after startDate".to_string());
        }
    }
    match input.discount_type {
        DiscountType::None => {}
        DiscountType::Percentage | DiscountType::Fixed if input.discount_value <= 0.0 => {
            errors.push("discountValue must be greater than 0".to_string());
        }
        DiscountType::Percentage if input.discount_value > 100.0 => {
            errors.push("percentage discount cannot exceed 100".to_string());
        }
        _ => {}
    }
    errors
}

/// Builds a new draft from `input` and derives its status.
pub fn new_promotion(input: PromotionInput, now: DateTime<Utc>) -> Promotion {
    let start = input.start_date.unwrap_or(now);
    let mut promo = Promotion {
        id: 0,
        business_id: input.business_id,
        name: input.name.trim().to_string(),
        description: input.description,
        promo_type: input.promo_type,
        display_type: input.display_type,
        discount_type: input.discount_type,
        discount_value: if input.discount_type == DiscountType::None { 0.0 } else { input.discount_value },
        coupon_code: input.coupon_code,
        start_date: start,
        end_date: input.end_date,
        status: PromotionStatus::Draft,
        platforms: input.platforms,
        image: input.image,
        performance: PromotionPerformance::default(),
        created_at: now,
        updated_at: now,
    };
    promo.status = derive_status(promo.status, promo.start_date, promo.end_date, now);
    promo
}

/// Applies `input` to `existing` and re-derives the status; a pause survives.
pub fn apply_update(existing: &Promotion, mut input: PromotionInput, now: DateTime<Utc>) -> Promotion {
    input.start_date = input.start_date.or(Some(existing.start_date));
    input.business_id = existing.business_id;
    let mut next = new_promotion(input, now);
    next.id = existing.id;
    next.status = derive_status(existing.status, next.start_date, next.end_date, now);
    next.performance = existing.performance.clone();
    next.created_at = existing.created_at;
    next
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TransitionError {
    #[error("only active promotions can be paused")]
    NotPausable,
    #[error("only paused promotions can be resumed")]
    NotPaused,
}

pub fn pause(promo: &Promotion, now: DateTime<Utc>) -> Result<PromotionStatus, TransitionError> {
    match derive_status(promo.status, promo.start_date, promo.end_date, now) {
        PromotionStatus::Active | PromotionStatus::Paused => Ok(PromotionStatus::Paused),
        _ => Err(TransitionError::NotPausable),
    }
}

pub fn resume(promo: &Promotion, now: DateTime<Utc>) -> Result<PromotionStatus, TransitionError> {
    if promo.status != PromotionStatus::Paused {
        return Err(TransitionError::NotPaused);
    }
    Ok(derive_status(PromotionStatus::Active, promo.start_date, promo.end_date, now))
}
