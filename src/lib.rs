pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::services::{
    alert_service::AlertService,
    application_service::ApplicationService,
    audit_service::AuditService,
    auth_service::AuthService,
    catalog_service::CatalogService,
    consultation_payment_service::ConsultationPaymentService,
    consultation_service::ConsultationService,
    dashboard_service::DashboardService,
    job_service::JobService,
    license_queue::{LicenseRecheckQueue, LicenseRecheckWorker},
    merchant_service::MerchantService,
    notification_service::{NotificationHub, NotificationService},
    payment_gateway::{PaymentGateway, PaystackClient},
    payment_service::PaymentService,
    professional_service::ProfessionalService,
    profile_service::ProfileService,
    session_service::SessionService,
    verification_service::{GovernmentIdVerifier, VerificationService},
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub notification_service: NotificationService,
    pub auth_service: AuthService,
    pub merchant_service: MerchantService,
    pub job_service: JobService,
    pub application_service: ApplicationService,
    pub catalog_service: CatalogService,
    pub profile_service: ProfileService,
    pub alert_service: AlertService,
    pub verification_service: VerificationService,
    pub license_queue: LicenseRecheckQueue,
    pub payment_service: PaymentService,
    pub session_service: SessionService,
    pub consultation_payment_service: ConsultationPaymentService,
    pub professional_service: ProfessionalService,
    pub consultation_service: ConsultationService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub fn new(pool: PgPool) -> crate::error::Result<Self> {
        let gateway: Arc<dyn PaymentGateway> = Arc::new(PaystackClient::from_config()?);
        Self::with_gateway(pool, gateway)
    }

    /// Builds the state around an explicit payment gateway.
    pub fn with_gateway(pool: PgPool, gateway: Arc<dyn PaymentGateway>) -> crate::error::Result<Self> {
        let notification_service = NotificationService::new(pool.clone(), NotificationHub::new());
        let audit_service = AuditService::new(pool.clone());
        let license_queue = LicenseRecheckQueue::from_config();

        let auth_service = AuthService::new(pool.clone(), audit_service.clone());
        let merchant_service = MerchantService::new(pool.clone(), audit_service);
        let job_service = JobService::new(pool.clone(), notification_service.clone());
        let application_service = ApplicationService::new(
            pool.clone(),
            job_service.clone(),
            notification_service.clone(),
        );
        let catalog_service = CatalogService::new(pool.clone());
        let profile_service = ProfileService::new(pool.clone(), notification_service.clone());
        let alert_service = AlertService::new(pool.clone());
        let verification_service = VerificationService::new(
            pool.clone(),
            GovernmentIdVerifier::from_config()?,
            license_queue.clone(),
            notification_service.clone(),
        );
        let payment_service = PaymentService::new(
            pool.clone(),
            gateway.clone(),
            notification_service.clone(),
        );
        let session_service = SessionService::new(pool.clone());
        let consultation_payment_service = ConsultationPaymentService::new(
            pool.clone(),
            gateway.clone(),
            session_service.clone(),
        );
        let professional_service = ProfessionalService::new(pool.clone(), gateway);
        let consultation_service = ConsultationService::new(pool.clone());
        let dashboard_service = DashboardService::new(
            pool.clone(),
            profile_service.clone(),
            job_service.clone(),
            application_service.clone(),
        );

        Ok(Self {
            pool,
            notification_service,
            auth_service,
            merchant_service,
            job_service,
            application_service,
            catalog_service,
            profile_service,
            alert_service,
            verification_service,
            license_queue,
            payment_service,
            session_service,
            consultation_payment_service,
            professional_service,
            consultation_service,
            dashboard_service,
        })
    }

    pub fn license_worker(&self) -> LicenseRecheckWorker {
        LicenseRecheckWorker::new(
            self.pool.clone(),
            self.license_queue.clone(),
            self.notification_service.clone(),
        )
    }
}
