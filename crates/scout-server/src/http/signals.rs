use scout_core::signal::{SignalAssessment, SignalInput};

use super::response::{ok, ApiJson, ApiResult};

/// Score a message without storing anything.
pub async fn verify(ApiJson(input): ApiJson<SignalInput>) -> ApiResult<SignalAssessment> {
    input.validate()?;
    ok("Signal analyse avec succes.", input.score())
}
