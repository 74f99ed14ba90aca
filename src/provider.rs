//! Concrete providers and the closed [`AnyDriver`] set the registry hands out.
//!
//! Each provider module holds one driver struct wrapping a [`DriverCore`] and implementing
//! [`Driver`]. Alipay and Tencent Cloud sign their calls (see [`crate::sign`]); the rest are plain
//! GET/POST specializations of the shared contract.

pub mod alipay;
pub mod baidu;
pub mod dingtalk;
pub mod gitee;
pub mod oschina;
pub mod qq;
pub mod tencent;
pub mod wechat;

pub use alipay::Alipay;
pub use baidu::Baidu;
pub use dingtalk::Dingtalk;
pub use gitee::Gitee;
pub use oschina::Oschina;
pub use qq::Qq;
pub use tencent::Tencent;
pub use wechat::{Wechat, WechatComponent};

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ProviderIdentity, TokenFieldNames, TokenGrant, User, UserProfile},
	config::{ProviderConfig, ProviderKind},
	driver::{Driver, DriverCore, DriverFuture},
	http::{QueryEncoding, QueryFields},
};

/// Any supported driver.
#[derive(Clone, Debug)]
pub enum AnyDriver {
	/// Alipay.
	Alipay(Alipay),
	/// Baidu.
	Baidu(Baidu),
	/// QQ.
	Qq(Qq),
	/// WeChat.
	Wechat(Wechat),
	/// Gitee.
	Gitee(Gitee),
	/// Oschina.
	Oschina(Oschina),
	/// DingTalk.
	Dingtalk(Dingtalk),
	/// Tencent Cloud.
	Tencent(Tencent),
}
impl AnyDriver {
	/// Builds the driver for `kind`, validating `config`.
	pub fn new(kind: ProviderKind, config: ProviderConfig) -> Result<Self> {
		Ok(match kind {
			ProviderKind::Alipay => Self::Alipay(Alipay::new(config)?),
			ProviderKind::Baidu => Self::Baidu(Baidu::new(config)?),
			ProviderKind::Qq => Self::Qq(Qq::new(config)?),
			ProviderKind::Wechat => Self::Wechat(Wechat::new(config)?),
			ProviderKind::Gitee => Self::Gitee(Gitee::new(config)?),
			ProviderKind::Oschina => Self::Oschina(Oschina::new(config)?),
			ProviderKind::Dingtalk => Self::Dingtalk(Dingtalk::new(config)?),
			ProviderKind::Tencent => Self::Tencent(Tencent::new(config)?),
		})
	}

	/// Borrows the wrapped driver as a trait object.
	pub fn as_dyn(&self) -> &dyn Driver {
		match self {
			Self::Alipay(driver) => driver,
			Self::Baidu(driver) => driver,
			Self::Qq(driver) => driver,
			Self::Wechat(driver) => driver,
			Self::Gitee(driver) => driver,
			Self::Oschina(driver) => driver,
			Self::Dingtalk(driver) => driver,
			Self::Tencent(driver) => driver,
		}
	}

	fn as_dyn_mut(&mut self) -> &mut dyn Driver {
		match self {
			Self::Alipay(driver) => driver,
			Self::Baidu(driver) => driver,
			Self::Qq(driver) => driver,
			Self::Wechat(driver) => driver,
			Self::Gitee(driver) => driver,
			Self::Oschina(driver) => driver,
			Self::Dingtalk(driver) => driver,
			Self::Tencent(driver) => driver,
		}
	}

	/// Returns the DingTalk driver, whose `user_from_code` entry point has no generic counterpart.
	pub fn as_dingtalk(&self) -> Option<&Dingtalk> {
		match self {
			Self::Dingtalk(driver) => Some(driver),
			_ => None,
		}
	}
}
impl Driver for AnyDriver {
	fn core(&self) -> &DriverCore {
		self.as_dyn().core()
	}

	fn core_mut(&mut self) -> &mut DriverCore {
		self.as_dyn_mut().core_mut()
	}

	fn authorize_endpoint(&self) -> &'static str {
		self.as_dyn().authorize_endpoint()
	}

	fn request_token<'a>(&'a self, code: &'a str) -> DriverFuture<'a, TokenGrant> {
		self.as_dyn().request_token(code)
	}

	fn request_user<'a>(
		&'a self,
		token: &'a AccessToken,
		identity: &'a ProviderIdentity,
	) -> DriverFuture<'a, Map<String, Value>> {
		self.as_dyn().request_user(token, identity)
	}

	fn map_user(&self, raw: &Map<String, Value>, identity: &ProviderIdentity) -> UserProfile {
		self.as_dyn().map_user(raw, identity)
	}

	fn build_user_from_grant<'a>(&'a self, grant: &'a TokenGrant) -> DriverFuture<'a, User> {
		self.as_dyn().build_user_from_grant(grant)
	}

	fn scope_separator(&self) -> &'static str {
		self.as_dyn().scope_separator()
	}

	fn query_encoding(&self) -> QueryEncoding {
		self.as_dyn().query_encoding()
	}

	fn authorize_fragment(&self) -> Option<&'static str> {
		self.as_dyn().authorize_fragment()
	}

	fn code_fields(&self, redirect_url: Option<&str>) -> Result<QueryFields> {
		self.as_dyn().code_fields(redirect_url)
	}

	fn token_field_names(&self) -> TokenFieldNames {
		self.as_dyn().token_field_names()
	}

	fn token_fields(&self, code: &str) -> QueryFields {
		self.as_dyn().token_fields(code)
	}
}
macro_rules! impl_from_driver {
	($($variant:ident),+ $(,)?) => {
		$(
			impl From<$variant> for AnyDriver {
				fn from(value: $variant) -> Self {
					Self::$variant(value)
				}
			}
		)+
	};
}
impl_from_driver!(Alipay, Baidu, Qq, Wechat, Gitee, Oschina, Dingtalk, Tencent);

/// Summarizes an OAuth-style error envelope (`error_description`, `error`, `msg`, `message`).
pub(crate) fn error_summary(body: &Map<String, Value>, fallback: &str) -> String {
	["error_description", "error_msg", "errmsg", "msg", "message", "error"]
		.into_iter()
		.find_map(|key| crate::auth::field_str(body, key))
		.unwrap_or_else(|| fallback.to_owned())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builds_every_kind() {
		for kind in ProviderKind::ALL {
			let config = ProviderConfig::new("a", "s").with_secret_key("k");
			let driver = AnyDriver::new(kind, config).expect("Every kind should build.");

			assert_eq!(driver.kind(), kind);
		}
	}

	#[test]
	fn only_dingtalk_exposes_user_from_code() {
		let config = ProviderConfig::new("a", "s");

		assert!(
			AnyDriver::new(ProviderKind::Dingtalk, config.clone())
				.expect("DingTalk should build.")
				.as_dingtalk()
				.is_some()
		);
		assert!(
			AnyDriver::new(ProviderKind::Gitee, config)
				.expect("Gitee should build.")
				.as_dingtalk()
				.is_none()
		);
	}

	#[test]
	fn error_summary_prefers_descriptions() {
		let body = serde_json::json!({ "error": "invalid_grant", "error_description": "code expired" });
		let Value::Object(body) = body else { unreachable!() };

		assert_eq!(error_summary(&body, "x"), "code expired");
		assert_eq!(error_summary(&Map::new(), "fallback"), "fallback");
	}
}
