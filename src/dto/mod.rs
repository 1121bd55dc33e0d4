pub mod auth_dto;
pub mod catalog_dto;
pub mod consultation_dto;
pub mod dashboard_dto;
pub mod job_dto;
pub mod payment_dto;
pub mod profile_dto;
pub mod verification_dto;
