use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::merchant::Merchant;
use crate::models::user::{Profession, User};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterClientPayload {
    #[validate(length(min = 2, max = 80))]
    pub first_name: String,
    #[validate(length(min = 2, max = 80))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProfessionalPayload {
    #[validate(length(min = 2, max = 80))]
    pub first_name: String,
    #[validate(length(min = 2, max = 80))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub profession: Profession,
    #[validate(length(min = 4))]
    pub license_number: String,
    #[validate(length(min = 2))]
    pub regulatory_body: String,
    #[validate(length(min = 10))]
    pub license_document: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterWorkerPayload {
    #[validate(length(min = 2, max = 80))]
    pub first_name: String,
    #[validate(length(min = 2, max = 80))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterEmployerPayload {
    #[validate(length(min = 2, max = 80))]
    pub first_name: String,
    #[validate(length(min = 2, max = 80))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 2, max = 120))]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyEmailPayload {
    #[validate(length(min = 10))]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordPayload {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordPayload {
    #[validate(length(min = 10))]
    pub token: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub roles: Vec<String>,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub message: String,
    pub user_id: Uuid,
    pub verification_token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMerchantPayload {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 2, max = 120))]
    pub business_name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub instagram: Option<String>,
    pub whatsapp: Option<String>,
    pub plan: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MerchantAuthResponse {
    pub token: String,
    pub merchant: Merchant,
}
