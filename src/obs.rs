//! Optional observability helpers for login flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_third.flow` with the `provider` and
//!   `stage` fields.
//! - Enable `metrics` to increment the `oauth2_third_flow_total` counter for every
//!   attempt/success/failure, labeled by `provider` + `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, config::ProviderKind};

/// Steps of a login flow that are observed individually.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowStage {
	/// Authorization URL construction.
	AuthorizeUrl,
	/// Code-for-token exchange.
	ExchangeCode,
	/// Profile lookup with an access token.
	FetchUser,
	/// Tencent Cloud federation-token exchange.
	FederationToken,
	/// DingTalk one-shot code-to-profile call.
	UserFromCode,
}
impl FlowStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowStage::AuthorizeUrl => "authorize_url",
			FlowStage::ExchangeCode => "exchange_code",
			FlowStage::FetchUser => "fetch_user",
			FlowStage::FederationToken => "federation_token",
			FlowStage::UserFromCode => "user_from_code",
		}
	}
}
impl Display for FlowStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow step.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside a flow span and records attempt plus outcome counters around it.
pub(crate) async fn observe<T, F>(provider: ProviderKind, stage: FlowStage, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(provider, stage);

	record_flow_outcome(provider, stage, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_flow_outcome(provider, stage, FlowOutcome::Success),
		Err(e) => {
			record_failure(provider, stage, e);
			record_flow_outcome(provider, stage, FlowOutcome::Failure);
		},
	}

	result
}
