use async_trait::async_trait;

use crate::{AdvisoryRequest, Recommendation, Result};

/// Abstraction over the external advisory model.
///
/// `GeminiAdvisor` in `crates/advisor` implements this against a hosted
/// generative model. The dashboard only passes the result through; it
/// never interprets the recommendation.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Ask the model for a trading recommendation on the given market view.
    async fn recommend(&self, request: &AdvisoryRequest) -> Result<Recommendation>;
}
