pub mod alert_service;
pub mod application_service;
pub mod audit_service;
pub mod auth_service;
pub mod catalog_service;
pub mod consultation_payment_service;
pub mod consultation_service;
pub mod dashboard_service;
pub mod escrow;
pub mod job_service;
pub mod license_check;
pub mod license_queue;
pub mod lockout;
pub mod merchant_service;
pub mod notification_service;
pub mod payment_gateway;
pub mod payment_service;
pub mod professional_service;
pub mod profile_service;
pub mod session_service;
pub mod session_sweeper;
pub mod verification_service;
