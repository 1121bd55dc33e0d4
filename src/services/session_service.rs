use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::dto::consultation_dto::{
    DashboardQuery, MessagePage, MessagesQuery, ProfessionalDashboard, SessionAccessResponse,
    SessionReviewPayload, SessionStatistics, SessionWithReview,
};
use crate::error::{Error, Result};
use crate::middleware::auth::{issue_session_token, Claims, TokenKind};
use crate::models::consultation::{
    ConsultationProfessional, ConsultationSession, ProfessionalPublic, SenderType, SessionMessage,
    SessionReview, SessionStatus,
};
use crate::services::professional_service::PROFESSIONAL_COLUMNS;

pub(crate) const SESSION_COLUMNS: &str = "id, professional_id, client_anonymous_id, client_email, \
    payment_reference, amount, platform_fee, professional_earning, status, started_at, ends_at, \
    ended_at, ended_by, last_message_at, has_unread_messages, earnings_credited, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, session_id, sender_type, content, created_at";
const REVIEW_COLUMNS: &str = "id, session_id, professional_id, rating, review_text, created_at";

pub const MAX_MESSAGE_CHARS: usize = 2000;
const DEFAULT_PAGE: i64 = 50;
const DEFAULT_DASHBOARD_PAGE: i64 = 20;
const MAX_PAGE: i64 = 100;

/// Who is calling, derived from the token before touching the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Client { session_id: Uuid },
    ProfessionalUser { user_id: Uuid },
}

impl Viewer {
    /// Client tokens are bound to one session; any mismatch is rejected here.
    pub fn from_claims(claims: &Claims, session_id: Uuid) -> Result<Self> {
        match claims.kind {
            TokenKind::ConsultationClient => {
                if claims.subject_id()? != session_id {
                    return Err(Error::Forbidden("Access denied to this session".to_string()));
                }
                Ok(Viewer::Client { session_id })
            }
            TokenKind::User => Ok(Viewer::ProfessionalUser {
                user_id: claims.subject_id()?,
            }),
            TokenKind::Merchant => Err(Error::Forbidden("Access denied to this session".to_string())),
        }
    }

    pub fn client_only(claims: &Claims, session_id: Uuid) -> Result<Self> {
        if claims.kind != TokenKind::ConsultationClient {
            return Err(Error::Forbidden("A client session token is required".to_string()));
        }
        Self::from_claims(claims, session_id)
    }

    pub fn sender(&self) -> SenderType {
        match self {
            Viewer::Client { .. } => SenderType::Client,
            Viewer::ProfessionalUser { .. } => SenderType::Professional,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closing {
    EndedBy(SenderType),
    Expired,
}

impl Closing {
    fn status(&self) -> SessionStatus {
        match self {
            Closing::EndedBy(_) => SessionStatus::Ended,
            Closing::Expired => SessionStatus::Expired,
        }
    }

    fn ended_by(&self) -> &'static str {
        match self {
            Closing::EndedBy(sender) => sender.as_str(),
            Closing::Expired => "auto",
        }
    }
}

/// Trims and bounds a chat message.
pub fn validate_message_content(content: &str) -> Result<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::BadRequest("Message content is required".to_string()));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(Error::BadRequest(format!(
            "Message content must be {} characters or less",
            MAX_MESSAGE_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// Running average after one more rating, rounded to one decimal place.
pub fn next_average(current: Decimal, total_reviews: i32, rating: i32) -> Decimal {
    let total = Decimal::from(total_reviews.max(0));
    let sum = current * total + Decimal::from(rating);
    (sum / (total + Decimal::ONE)).round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

fn page_size(requested: Option<i64>, default: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, MAX_PAGE)
}

pub fn access_response(
    session: ConsultationSession,
    professional: &ConsultationProfessional,
) -> Result<SessionAccessResponse> {
    let client_token =
        issue_session_token(session.id, &session.client_anonymous_id, session.ends_at)?;
    Ok(SessionAccessResponse {
        session,
        client_token,
        professional: ProfessionalPublic::from(professional),
    })
}

#[derive(Clone)]
pub struct SessionService {
    pool: PgPool,
}

impl SessionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, session_id: Uuid) -> Result<ConsultationSession> {
        let sql = format!("SELECT {} FROM consultation_sessions WHERE id = $1", SESSION_COLUMNS);
        sqlx::query_as::<_, ConsultationSession>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Session not found".to_string()))
    }

    pub async fn find_by_reference(&self, reference: &str) -> Result<Option<ConsultationSession>> {
        let sql = format!(
            "SELECT {} FROM consultation_sessions WHERE payment_reference = $1",
            SESSION_COLUMNS
        );
        let row = sqlx::query_as::<_, ConsultationSession>(&sql)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn professional_by_id(&self, id: Uuid) -> Result<ConsultationProfessional> {
        let sql = format!("SELECT {} FROM consultation_professionals WHERE id = $1", PROFESSIONAL_COLUMNS);
        sqlx::query_as::<_, ConsultationProfessional>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Professional not found".to_string()))
    }

    async fn professional_for_user(&self, user_id: Uuid) -> Result<Option<ConsultationProfessional>> {
        let sql = format!(
            "SELECT {} FROM consultation_professionals WHERE user_id = $1",
            PROFESSIONAL_COLUMNS
        );
        let row = sqlx::query_as::<_, ConsultationProfessional>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Loads the session and checks that a professional viewer owns it.
    pub async fn authorize(&self, viewer: Viewer, session_id: Uuid) -> Result<ConsultationSession> {
        let session = self.find(session_id).await?;
        if let Viewer::ProfessionalUser { user_id } = viewer {
            let professional = self
                .professional_for_user(user_id)
                .await?
                .ok_or_else(|| Error::Forbidden("Professional profile not found".to_string()))?;
            if professional.id != session.professional_id {
                return Err(Error::Forbidden("Access denied to this session".to_string()));
            }
        }
        Ok(session)
    }

    /// Expires an overdue active session and returns its fresh state.
    async fn refresh(&self, session: ConsultationSession) -> Result<ConsultationSession> {
        if !session.is_overdue(Utc::now()) {
            return Ok(session);
        }
        self.close(session.id, Closing::Expired).await?;
        self.find(session.id).await
    }

    pub async fn get_for_client(&self, viewer: Viewer, session_id: Uuid) -> Result<SessionAccessResponse> {
        let session = self.authorize(viewer, session_id).await?;
        let session = self.refresh(session).await?;
        let professional = self.professional_by_id(session.professional_id).await?;
        access_response(session, &professional)
    }

    pub async fn send_message(
        &self,
        viewer: Viewer,
        session_id: Uuid,
        content: &str,
    ) -> Result<SessionMessage> {
        let content = validate_message_content(content)?;
        let session = self.authorize(viewer, session_id).await?;

        if !session.is_active() {
            return Err(Error::BadRequest(format!(
                "Cannot send messages in {} session",
                session.status
            )));
        }
        if session.is_overdue(Utc::now()) {
            self.close(session.id, Closing::Expired).await?;
            return Err(Error::BadRequest("Session has expired".to_string()));
        }

        let sender = viewer.sender();
        let mut tx = self.pool.begin().await?;
        let message = insert_message(&mut tx, session.id, sender, &content).await?;
        sqlx::query(
            r#"
            UPDATE consultation_sessions
            SET last_message_at = NOW(),
                has_unread_messages = has_unread_messages OR $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(session.id)
        .bind(sender == SenderType::Client)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(message)
    }

    pub async fn messages(
        &self,
        viewer: Viewer,
        session_id: Uuid,
        query: MessagesQuery,
    ) -> Result<MessagePage> {
        let session = self.authorize(viewer, session_id).await?;
        let limit = page_size(query.limit, DEFAULT_PAGE);

        let cursor: Option<(DateTime<Utc>, Uuid)> = match query.before {
            Some(before) => {
                let created_at: Option<DateTime<Utc>> = sqlx::query_scalar(
                    "SELECT created_at FROM session_messages WHERE id = $1 AND session_id = $2",
                )
                .bind(before)
                .bind(session.id)
                .fetch_optional(&self.pool)
                .await?;
                let created_at = created_at.ok_or_else(|| {
                    Error::BadRequest("Unknown message cursor for this session".to_string())
                })?;
                Some((created_at, before))
            }
            None => None,
        };

        let sql = format!(
            r#"
            SELECT {} FROM session_messages
            WHERE session_id = $1
              AND ($2::timestamptz IS NULL OR (created_at, id) < ($2, $3))
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
            MESSAGE_COLUMNS
        );
        let mut messages = sqlx::query_as::<_, SessionMessage>(&sql)
            .bind(session.id)
            .bind(cursor.map(|(created_at, _)| created_at))
            .bind(cursor.map(|(_, id)| id))
            .bind(limit + 1)
            .fetch_all(&self.pool)
            .await?;

        let has_more = messages.len() as i64 > limit;
        messages.truncate(limit as usize);
        messages.reverse();

        if matches!(viewer, Viewer::ProfessionalUser { .. }) && session.has_unread_messages {
            sqlx::query(
                "UPDATE consultation_sessions SET has_unread_messages = FALSE, updated_at = NOW() WHERE id = $1",
            )
            .bind(session.id)
            .execute(&self.pool)
            .await?;
        }

        Ok(MessagePage { messages, has_more })
    }

    pub async fn end(&self, viewer: Viewer, session_id: Uuid) -> Result<ConsultationSession> {
        let session = self.authorize(viewer, session_id).await?;
        if !session.is_active() {
            return Err(Error::BadRequest(format!(
                "Cannot end a session that is {}",
                session.status
            )));
        }
        match self.close(session.id, Closing::EndedBy(viewer.sender())).await? {
            Some(closed) => Ok(closed),
            None => Err(Error::BadRequest("Session is no longer active".to_string())),
        }
    }

    /// Moves an active session to ENDED or EXPIRED and credits the professional's
    /// share. The status guard makes the credit happen at most once per session.
    pub async fn close(&self, session_id: Uuid, closing: Closing) -> Result<Option<ConsultationSession>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r#"
            UPDATE consultation_sessions
            SET status = $2,
                ended_at = CASE WHEN $2 = 'expired' THEN ends_at ELSE NOW() END,
                ended_by = $3,
                earnings_credited = TRUE,
                updated_at = NOW()
            WHERE id = $1 AND status = 'active' AND earnings_credited = FALSE
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );
        let Some(session) = sqlx::query_as::<_, ConsultationSession>(&sql)
            .bind(session_id)
            .bind(closing.status().as_str())
            .bind(closing.ended_by())
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE consultation_professionals
            SET total_earnings = total_earnings + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(session.professional_id)
        .bind(session.professional_earning)
        .execute(&mut *tx)
        .await?;

        if let Closing::EndedBy(sender) = closing {
            let note = format!("Session ended by {}", sender.as_str());
            insert_message(&mut tx, session.id, SenderType::System, &note).await?;
        }
        tx.commit().await?;

        tracing::info!(
            session_id = %session.id,
            status = %session.status,
            earning = session.professional_earning,
            "consultation session closed"
        );
        Ok(Some(session))
    }

    /// Expires every active session past its end time. Returns how many were closed.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        let overdue: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM consultation_sessions WHERE status = 'active' AND ends_at < $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let mut expired = 0;
        for id in overdue {
            match self.close(id, Closing::Expired).await {
                Ok(Some(_)) => expired += 1,
                Ok(None) => {}
                Err(e) => tracing::error!(error = ?e, session_id = %id, "failed to expire session"),
            }
        }
        Ok(expired)
    }

    pub async fn review(
        &self,
        viewer: Viewer,
        session_id: Uuid,
        payload: SessionReviewPayload,
    ) -> Result<SessionReview> {
        let session = self.authorize(viewer, session_id).await?;
        let session = self.refresh(session).await?;
        match session.status() {
            Some(SessionStatus::Ended) | Some(SessionStatus::Expired) => {}
            _ => {
                return Err(Error::BadRequest(
                    "You can only review a session after it has ended".to_string(),
                ))
            }
        }

        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r#"
            INSERT INTO session_reviews (session_id, professional_id, rating, review_text)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (session_id) DO NOTHING
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        );
        let review = sqlx::query_as::<_, SessionReview>(&sql)
            .bind(session.id)
            .bind(session.professional_id)
            .bind(payload.rating)
            .bind(payload.review_text.trim())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::Conflict("Session has already been reviewed".to_string()))?;

        let (rating, total_reviews): (Decimal, i32) = sqlx::query_as(
            "SELECT rating, total_reviews FROM consultation_professionals WHERE id = $1 FOR UPDATE",
        )
        .bind(session.professional_id)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            UPDATE consultation_professionals
            SET rating = $2, total_reviews = total_reviews + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(session.professional_id)
        .bind(next_average(rating, total_reviews, payload.rating))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(review)
    }

    pub async fn professional_dashboard(
        &self,
        user_id: Uuid,
        query: DashboardQuery,
    ) -> Result<ProfessionalDashboard> {
        let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                SessionStatus::parse(raw)
                    .ok_or_else(|| Error::BadRequest("Invalid status filter".to_string()))?,
            ),
            None => None,
        };
        let professional = self
            .professional_for_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Professional profile not found".to_string()))?;
        let limit = page_size(query.limit, DEFAULT_DASHBOARD_PAGE);
        let offset = query.offset.unwrap_or(0).max(0);
        let status_filter = status.map(|s| s.as_str());

        let sql = format!(
            r#"
            SELECT {} FROM consultation_sessions
            WHERE professional_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            SESSION_COLUMNS
        );
        let sessions = sqlx::query_as::<_, ConsultationSession>(&sql)
            .bind(professional.id)
            .bind(status_filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM consultation_sessions WHERE professional_id = $1 AND ($2::text IS NULL OR status = $2)",
        )
        .bind(professional.id)
        .bind(status_filter)
        .fetch_one(&self.pool)
        .await?;

        let ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
        let sql = format!("SELECT {} FROM session_reviews WHERE session_id = ANY($1)", REVIEW_COLUMNS);
        let reviews = sqlx::query_as::<_, SessionReview>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        let (active_sessions, completed_sessions): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'active'),
                   COUNT(*) FILTER (WHERE status IN ('ended', 'expired'))
            FROM consultation_sessions
            WHERE professional_id = $1
            "#,
        )
        .bind(professional.id)
        .fetch_one(&self.pool)
        .await?;

        let has_more = offset + (sessions.len() as i64) < total;
        let sessions = sessions
            .into_iter()
            .map(|session| {
                let review = reviews.iter().find(|r| r.session_id == session.id).cloned();
                SessionWithReview { session, review }
            })
            .collect();

        Ok(ProfessionalDashboard {
            sessions,
            total,
            limit,
            offset,
            has_more,
            statistics: SessionStatistics {
                total_sessions: i64::from(professional.total_sessions),
                active_sessions,
                completed_sessions,
                total_earnings: professional.total_earnings,
                average_rating: professional.rating,
                total_reviews: professional.total_reviews,
            },
        })
    }
}

pub(crate) async fn insert_message(
    tx: &mut Transaction<'_, Postgres>,
    session_id: Uuid,
    sender: SenderType,
    content: &str,
) -> Result<SessionMessage> {
    let sql = format!(
        "INSERT INTO session_messages (session_id, sender_type, content) VALUES ($1, $2, $3) RETURNING {}",
        MESSAGE_COLUMNS
    );
    let message = sqlx::query_as::<_, SessionMessage>(&sql)
        .bind(session_id)
        .bind(sender.as_str())
        .bind(content)
        .fetch_one(&mut **tx)
        .await?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(kind: TokenKind, sub: Uuid) -> Claims {
        Claims {
            sub: sub.to_string(),
            exp: 0,
            role: None,
            roles: Vec::new(),
            email: None,
            kind,
            anonymous_id: None,
        }
    }

    #[test]
    fn blank_messages_are_rejected() {
        assert!(matches!(validate_message_content("   \n"), Err(Error::BadRequest(_))));
    }

    #[test]
    fn message_length_is_bounded() {
        let at_limit = "a".repeat(MAX_MESSAGE_CHARS);
        assert_eq!(validate_message_content(&at_limit).unwrap().len(), MAX_MESSAGE_CHARS);
        let over = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(matches!(validate_message_content(&over), Err(Error::BadRequest(_))));
    }

    #[test]
    fn messages_are_trimmed() {
        assert_eq!(validate_message_content("  hello doctor  ").unwrap(), "hello doctor");
    }

    #[test]
    fn client_token_for_another_session_is_forbidden() {
        let session = Uuid::new_v4();
        let token = claims(TokenKind::ConsultationClient, Uuid::new_v4());
        assert!(matches!(Viewer::from_claims(&token, session), Err(Error::Forbidden(_))));
        let own = claims(TokenKind::ConsultationClient, session);
        assert_eq!(
            Viewer::from_claims(&own, session).unwrap(),
            Viewer::Client { session_id: session }
        );
    }

    #[test]
    fn user_tokens_are_resolved_as_professionals() {
        let user = Uuid::new_v4();
        let viewer = Viewer::from_claims(&claims(TokenKind::User, user), Uuid::new_v4()).unwrap();
        assert_eq!(viewer, Viewer::ProfessionalUser { user_id: user });
        assert_eq!(viewer.sender(), SenderType::Professional);
        assert!(Viewer::client_only(&claims(TokenKind::User, user), Uuid::new_v4()).is_err());
    }

    #[test]
    fn merchant_tokens_cannot_open_sessions() {
        let token = claims(TokenKind::Merchant, Uuid::new_v4());
        assert!(Viewer::from_claims(&token, Uuid::new_v4()).is_err());
    }

    #[test]
    fn closing_records_who_ended_the_session() {
        assert_eq!(Closing::EndedBy(SenderType::Client).ended_by(), "client");
        assert_eq!(Closing::EndedBy(SenderType::Professional).status(), SessionStatus::Ended);
        assert_eq!(Closing::Expired.ended_by(), "auto");
        assert_eq!(Closing::Expired.status(), SessionStatus::Expired);
    }

    #[test]
    fn average_rating_rounds_to_one_decimal() {
        assert_eq!(next_average(Decimal::ZERO, 0, 4), Decimal::new(40, 1));
        assert_eq!(next_average(Decimal::new(45, 1), 2, 5), Decimal::new(47, 1));
        assert_eq!(next_average(Decimal::new(50, 1), 2, 4), Decimal::new(47, 1));
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(page_size(None, DEFAULT_PAGE), 50);
        assert_eq!(page_size(Some(0), DEFAULT_PAGE), 1);
        assert_eq!(page_size(Some(10_000), DEFAULT_PAGE), MAX_PAGE);
    }
}
