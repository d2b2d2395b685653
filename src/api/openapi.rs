#![allow(clippy::needless_for_each)]

use super::{
    error::ErrorBody,
    handlers::{
        data, health,
        otp::{self, OtpRequest},
        save, Ack,
    },
};
use utoipa::OpenApi;

// Title, version, description, contact and license come from Cargo.toml.
#[derive(OpenApi)]
#[openapi(
    paths(data::data, save::save, otp::otp, health::health),
    components(schemas(Ack, ErrorBody, OtpRequest, health::Health, health::HealthEnv)),
    tags(
        (name = "data", description = "Whole-document read and replace"),
        (name = "otp", description = "Password reset with one-time codes"),
        (name = "health", description = "Configuration and store reachability"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
