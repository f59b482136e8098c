use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub skills: Option<Value>,
    pub experience: Option<Value>,
    pub education: Option<Value>,
    pub certifications: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile_picture: Option<String>,
    pub resume: Option<String>,
    pub skills: Value,
    pub experience: Value,
    pub education: Value,
    pub certifications: Value,
}
