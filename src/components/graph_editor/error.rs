use thiserror::Error;

/// Failure reported by a consumer supplied hook or decision function.
///
/// The editor never propagates these: the call site logs the error and falls
/// back to the neutral answer for that hook.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HookError {
	#[error("hook failed: {0}")]
	Failed(String),
	#[error("hook vetoed the operation")]
	Vetoed,
}

impl HookError {
	pub fn failed(msg: impl Into<String>) -> Self {
		HookError::Failed(msg.into())
	}
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("invalid editor config json: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("invalid template `{name}`: {reason}")]
	InvalidTemplate { name: String, reason: String },
	#[error("zoom range must satisfy 0 < min <= max, got {min}..{max}")]
	InvalidZoom { min: f64, max: f64 },
}
