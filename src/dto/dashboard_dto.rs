use serde::Serialize;

use crate::models::consultation::Consultation;
use crate::models::job::{ApplicationWithJob, JobListing};
use crate::models::payment::{Wallet, WalletTransaction};
use crate::models::profile::{ArtisanProfile, ProfessionalProfile};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletWithHistory {
    #[serde(flatten)]
    pub wallet: Wallet,
    pub history: Vec<WalletTransaction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalStats {
    pub clients_served: i64,
    pub consultations_scheduled: i64,
    pub wallet_balance: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalDashboardResponse {
    pub profile: ProfessionalProfile,
    pub consultations: Vec<Consultation>,
    pub wallet: Option<WalletWithHistory>,
    pub stats: ProfessionalStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerDashboardResponse {
    pub recent_jobs: Vec<JobListing>,
    pub total_hires: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtisanDashboardResponse {
    pub profile: ArtisanProfile,
    pub applications: Vec<ApplicationWithJob>,
}
