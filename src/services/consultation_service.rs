use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::consultation_dto::{
    AssignedProfessional, ConsultationReviewPayload, CrossBookPayload, CrossBookResponse,
    ProfessionalReviews,
};
use crate::error::{Error, Result};
use crate::models::consultation::{Consultation, ConsultationReview};
use crate::models::user::{Profession, Role};
use crate::utils::validation::normalize_email;

const CONSULTATION_COLUMNS: &str = "id, client_id, professional_id, topic, mode, scheduled_for, fee, \
    status, payout_status, created_at, updated_at";
const REVIEW_COLUMNS: &str =
    "id, consultation_id, professional_id, client_id, rating, comment, created_at, updated_at";

/// Flat cross-booking fee in naira.
pub const CROSS_BOOK_FEE: i32 = 3000;
const DEFAULT_LEAD_HOURS: i64 = 36;
const CONSULTATION_MODES: [&str; 3] = ["VIDEO", "PHONE", "IN_PERSON"];

pub fn average_rating(reviews: &[ConsultationReview]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
    Some(sum as f64 / reviews.len() as f64)
}

pub fn scheduled_for(preferred: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    preferred.unwrap_or_else(|| now + Duration::hours(DEFAULT_LEAD_HOURS))
}

/// A doctor may only book a lawyer and the other way round.
pub fn check_cross_booking(requester_role: &str, target: Profession) -> Result<Profession> {
    let requester = requester_role
        .parse::<Role>()
        .ok()
        .and_then(Profession::from_role)
        .ok_or_else(|| {
            Error::Forbidden(
                "Only verified doctors or lawyers can request cross-discipline consultations."
                    .to_string(),
            )
        })?;
    if requester == target {
        return Err(Error::BadRequest(
            "Select a different profession from your own.".to_string(),
        ));
    }
    Ok(requester)
}

fn normalize_mode(mode: Option<&str>) -> Result<Option<String>> {
    match mode.map(|m| m.trim().to_ascii_uppercase()) {
        None => Ok(None),
        Some(m) if CONSULTATION_MODES.contains(&m.as_str()) => Ok(Some(m)),
        Some(_) => Err(Error::BadRequest(
            "Mode must be one of VIDEO, PHONE or IN_PERSON".to_string(),
        )),
    }
}

#[derive(Clone)]
pub struct ConsultationService {
    pool: PgPool,
}

impl ConsultationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn review(
        &self,
        user_id: Uuid,
        consultation_id: Uuid,
        payload: ConsultationReviewPayload,
    ) -> Result<ConsultationReview> {
        let sql = format!("SELECT {} FROM consultations WHERE id = $1", CONSULTATION_COLUMNS);
        let consultation = sqlx::query_as::<_, Consultation>(&sql)
            .bind(consultation_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Consultation not found".to_string()))?;
        if consultation.client_id != user_id {
            return Err(Error::Forbidden(
                "You can only review your consultations".to_string(),
            ));
        }

        let sql = format!(
            r#"
            INSERT INTO consultation_reviews (consultation_id, professional_id, client_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (consultation_id)
            DO UPDATE SET rating = EXCLUDED.rating, comment = EXCLUDED.comment, updated_at = NOW()
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        );
        let review = sqlx::query_as::<_, ConsultationReview>(&sql)
            .bind(consultation.id)
            .bind(consultation.professional_id)
            .bind(consultation.client_id)
            .bind(payload.rating)
            .bind(payload.comment)
            .fetch_one(&self.pool)
            .await?;
        Ok(review)
    }

    pub async fn reviews_for(&self, professional_id: Uuid) -> Result<ProfessionalReviews> {
        let sql = format!(
            "SELECT {} FROM consultation_reviews WHERE professional_id = $1 ORDER BY created_at DESC LIMIT 50",
            REVIEW_COLUMNS
        );
        let reviews = sqlx::query_as::<_, ConsultationReview>(&sql)
            .bind(professional_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ProfessionalReviews {
            average_rating: average_rating(&reviews),
            reviews,
        })
    }

    pub async fn cross_book(&self, payload: CrossBookPayload) -> Result<CrossBookResponse> {
        let mode = normalize_mode(payload.mode.as_deref())?;
        let email = normalize_email(&payload.professional_email);

        let requester: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, role FROM users WHERE email = $1")
                .bind(&email)
                .fetch_optional(&self.pool)
                .await?;
        let (requester_id, requester_role) = requester.ok_or_else(|| {
            Error::Forbidden(
                "Only verified doctors or lawyers can request cross-discipline consultations."
                    .to_string(),
            )
        })?;
        check_cross_booking(&requester_role, payload.target_profession)?;

        let target: Option<(Uuid, String, String, String)> = sqlx::query_as(
            r#"
            SELECT u.id, u.first_name, u.last_name, u.role
            FROM users u
            JOIN professional_profiles p ON p.user_id = u.id
            WHERE u.role = $1
            ORDER BY u.created_at ASC
            LIMIT 1
            "#,
        )
        .bind(payload.target_profession.as_str())
        .fetch_optional(&self.pool)
        .await?;
        let (target_id, first_name, last_name, target_role) = target.ok_or_else(|| {
            Error::NotFound(format!(
                "We could not find an available {}. Try again later.",
                payload.target_profession.as_str().to_lowercase()
            ))
        })?;

        let sql = format!(
            r#"
            INSERT INTO consultations (client_id, professional_id, topic, mode, scheduled_for, fee, status, payout_status)
            VALUES ($1, $2, $3, $4, $5, $6, 'PENDING', 'REQUESTED')
            RETURNING {}
            "#,
            CONSULTATION_COLUMNS
        );
        let consultation = sqlx::query_as::<_, Consultation>(&sql)
            .bind(requester_id)
            .bind(target_id)
            .bind(payload.reason.trim())
            .bind(mode)
            .bind(scheduled_for(payload.preferred_date, Utc::now()))
            .bind(CROSS_BOOK_FEE)
            .fetch_one(&self.pool)
            .await?;

        let name = format!("{} {}", first_name, last_name).trim().to_string();
        tracing::info!(
            consultation_id = %consultation.id,
            %requester_id,
            %target_id,
            "cross-discipline consultation booked"
        );
        Ok(CrossBookResponse {
            message: format!(
                "Consultation booked with {}. Our concierge will finalise the schedule.",
                name
            ),
            consultation_id: consultation.id,
            scheduled_for: consultation.scheduled_for,
            assigned_professional: AssignedProfessional {
                id: target_id,
                name,
                role: target_role,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: i32) -> ConsultationReview {
        let now = Utc::now();
        ConsultationReview {
            id: Uuid::new_v4(),
            consultation_id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            rating,
            comment: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn average_is_null_without_reviews() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[review(4), review(5)]), Some(4.5));
    }

    #[test]
    fn only_the_other_profession_can_be_booked() {
        assert_eq!(
            check_cross_booking("DOCTOR", Profession::Lawyer).unwrap(),
            Profession::Doctor
        );
        assert!(matches!(
            check_cross_booking("LAWYER", Profession::Lawyer),
            Err(Error::BadRequest(_))
        ));
        assert!(matches!(
            check_cross_booking("ARTISAN", Profession::Doctor),
            Err(Error::Forbidden(_))
        ));
    }

    #[test]
    fn default_schedule_is_a_day_and_a_half_out() {
        let now = Utc::now();
        assert_eq!(scheduled_for(None, now), now + Duration::hours(36));
        let preferred = now + Duration::days(3);
        assert_eq!(scheduled_for(Some(preferred), now), preferred);
    }

    #[test]
    fn modes_are_normalized() {
        assert_eq!(normalize_mode(Some("video")).unwrap().as_deref(), Some("VIDEO"));
        assert!(normalize_mode(Some("carrier pigeon")).is_err());
        assert_eq!(normalize_mode(None).unwrap(), None);
    }
}
