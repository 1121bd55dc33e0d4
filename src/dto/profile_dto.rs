use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::profile::{ArtisanProfile, EmployerProfile, ProfessionalProfile};
use crate::models::user::UserSummary;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfileResponse {
    #[serde(flatten)]
    pub user: UserSummary,
    pub artisan_profile: Option<ArtisanProfile>,
    pub professional_profile: Option<ProfessionalProfile>,
    pub employer_profile: Option<EmployerProfile>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HirePayload {
    pub artisan_id: Uuid,
    pub job_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfessionalPayload {
    #[validate(length(min = 10, max = 500000))]
    pub profile_image_url: Option<String>,
    #[validate(length(min = 2, max = 120))]
    pub regulatory_body: Option<String>,
    #[validate(length(min = 2, max = 120))]
    pub profession: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompletionPayload {
    #[validate(range(min = 0, max = 100))]
    pub completion: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertPayload {
    pub service_category_id: Uuid,
}
