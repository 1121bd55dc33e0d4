use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::dashboard_dto::{
    ArtisanDashboardResponse, EmployerDashboardResponse, ProfessionalDashboardResponse,
    ProfessionalStats, WalletWithHistory,
};
use crate::error::{Error, Result};
use crate::models::consultation::Consultation;
use crate::models::payment::{Wallet, WalletTransaction};
use crate::services::application_service::ApplicationService;
use crate::services::job_service::JobService;
use crate::services::profile_service::ProfileService;

const RECENT_LIMIT: i64 = 20;
const WALLET_HISTORY_LIMIT: i64 = 10;

/// Read-only aggregates for the three signed-in home screens.
#[derive(Clone)]
pub struct DashboardService {
    pool: PgPool,
    profiles: ProfileService,
    jobs: JobService,
    applications: ApplicationService,
}

impl DashboardService {
    pub fn new(
        pool: PgPool,
        profiles: ProfileService,
        jobs: JobService,
        applications: ApplicationService,
    ) -> Self {
        Self {
            pool,
            profiles,
            jobs,
            applications,
        }
    }

    pub async fn professional(&self, user_id: Uuid) -> Result<ProfessionalDashboardResponse> {
        let profile = self
            .profiles
            .professional_profile(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Professional profile not found".to_string()))?;

        let consultations = sqlx::query_as::<_, Consultation>(
            r#"
            SELECT id, client_id, professional_id, topic, mode, scheduled_for, fee, status,
                   payout_status, created_at, updated_at
            FROM consultations
            WHERE professional_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(RECENT_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let (clients_served, consultations_scheduled): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT client_id), COUNT(*) FILTER (WHERE status = 'PENDING')
            FROM consultations
            WHERE professional_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let wallet = self.wallet(user_id).await?;
        let stats = ProfessionalStats {
            clients_served,
            consultations_scheduled,
            wallet_balance: wallet.as_ref().map_or(0, |w| w.wallet.balance),
        };

        Ok(ProfessionalDashboardResponse {
            profile,
            consultations,
            wallet,
            stats,
        })
    }

    async fn wallet(&self, user_id: Uuid) -> Result<Option<WalletWithHistory>> {
        let wallet = sqlx::query_as::<_, Wallet>(
            "SELECT id, user_id, balance, currency, created_at, updated_at FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(wallet) = wallet else {
            return Ok(None);
        };

        let history = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, wallet_id, amount, kind, reference, description, created_at
            FROM wallet_transactions
            WHERE wallet_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(wallet.id)
        .bind(WALLET_HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(WalletWithHistory { wallet, history }))
    }

    pub async fn employer(&self, user_id: Uuid) -> Result<EmployerDashboardResponse> {
        let recent_jobs = self.jobs.recent_for_poster(user_id).await?;
        let total_hires: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM hire_actions WHERE employer_id = $1 AND status = 'ACCEPTED'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(EmployerDashboardResponse {
            recent_jobs,
            total_hires,
        })
    }

    pub async fn artisan(&self, user_id: Uuid) -> Result<ArtisanDashboardResponse> {
        let profile = self
            .profiles
            .artisan_profile(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Artisan profile not found".to_string()))?;
        let applications = self
            .applications
            .list_for_applicant(user_id, RECENT_LIMIT)
            .await?;
        Ok(ArtisanDashboardResponse {
            profile,
            applications,
        })
    }
}
