//! Registry that resolves configured application names into ready-to-use drivers.
//!
//! [`Third`] owns the application table, the transport every driver it builds shares, and the
//! session capability used to remember the authenticated user between requests.

// self
use crate::{
	_prelude::*,
	auth::User,
	config::{ProviderKind, ThirdConfig},
	driver::Driver,
	error::ConfigError,
	http::{self, HttpTransport},
	provider::AnyDriver,
	session::{MemorySession, SessionError, SessionStore},
};

/// Driver registry plus current-user persistence.
#[derive(Clone)]
pub struct Third {
	config: ThirdConfig,
	transport: Arc<dyn HttpTransport>,
	session: Arc<dyn SessionStore>,
}
impl Third {
	/// Session key the authenticated user is stored under.
	pub const USER_KEY: &'static str = "third_user";

	/// Creates a registry using the default transport and an in-memory session.
	pub fn new(config: ThirdConfig) -> Self {
		Self {
			config,
			transport: http::default_transport(),
			session: Arc::new(MemorySession::default()),
		}
	}

	/// Replaces the transport shared by every driver this registry builds.
	pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = transport;

		self
	}

	/// Replaces the session capability.
	pub fn with_session(mut self, session: Arc<dyn SessionStore>) -> Self {
		self.session = session;

		self
	}

	/// Registry configuration.
	pub fn config(&self) -> &ThirdConfig {
		&self.config
	}

	/// Configured application names, in order.
	pub fn app_names(&self) -> impl Iterator<Item = &str> {
		self.config.apps.keys().map(String::as_str)
	}

	/// Builds a fresh driver for the application `name`.
	///
	/// The provider type is the application's `type`, or the name itself when no type is set.
	pub fn app(&self, name: &str) -> Result<AnyDriver> {
		let app = self
			.config
			.apps
			.get(name)
			.ok_or_else(|| ConfigError::UnknownProvider { name: name.to_owned() })?;
		let kind = match app.kind {
			Some(kind) => kind,
			None => name.parse::<ProviderKind>()?,
		};

		Ok(AnyDriver::new(kind, app.provider.clone())?.with_transport(self.transport.clone()))
	}

	/// Remembers `user` as the authenticated user.
	pub async fn set_user(&self, user: &User) -> Result<()> {
		self.session.set(Self::USER_KEY, Value::Object(user.to_map())).await?;

		Ok(())
	}

	/// Returns the remembered user, if any.
	pub async fn get_user(&self) -> Result<Option<User>> {
		let Some(value) = self.session.get(Self::USER_KEY).await? else {
			return Ok(None);
		};

		Ok(Some(serde_json::from_value(value).map_err(SessionError::from)?))
	}

	/// Forgets the remembered user and returns it.
	pub async fn forget_user(&self) -> Result<Option<User>> {
		let Some(value) = self.session.remove(Self::USER_KEY).await? else {
			return Ok(None);
		};

		Ok(Some(serde_json::from_value(value).map_err(SessionError::from)?))
	}
}
impl Debug for Third {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Third").field("apps", &self.config.apps.keys().collect::<Vec<_>>()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::config::ProviderConfig;

	fn registry() -> Third {
		Third::new(
			ThirdConfig::default()
				.with_app("gitee", None, ProviderConfig::new("a", "s"))
				.with_app(
					"qcloud_login",
					Some(ProviderKind::Tencent),
					ProviderConfig::new("a", "s").with_secret_key("k"),
				)
				.with_app("github", None, ProviderConfig::new("a", "s")),
		)
	}

	#[test]
	fn type_defaults_to_the_app_name() {
		let third = registry();

		assert_eq!(third.app("gitee").expect("Gitee app should build.").kind(), ProviderKind::Gitee);
		assert_eq!(
			third.app("qcloud_login").expect("Tencent app should build.").kind(),
			ProviderKind::Tencent
		);
	}

	#[test]
	fn unknown_names_and_types_are_rejected() {
		let third = registry();

		assert!(matches!(
			third.app("missing"),
			Err(Error::Config(ConfigError::UnknownProvider { ref name })) if name == "missing"
		));
		assert!(matches!(
			third.app("github"),
			Err(Error::Config(ConfigError::UnknownProvider { ref name })) if name == "github"
		));
	}
}
