//! Builds authorize URLs for every application in a registry and shows how a callback query is
//! read back before the code exchange.

// crates.io
use color_eyre::Result;
// self
use oauth2_third::{
	config::{ProviderConfig, ProviderKind, ThirdConfig},
	driver::{CallbackParams, Driver},
	third::Third,
};

fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ThirdConfig::default()
		.with_app(
			"alipay",
			None,
			ProviderConfig::new("2021001", "base64-pkcs1-private-key")
				.with_redirect_url("https://app.example.com/login/alipay"),
		)
		.with_app(
			"wechat",
			None,
			ProviderConfig::new("wx-demo", "wx-secret")
				.with_redirect_url("https://app.example.com/login/wechat")
				.with_scopes(["snsapi_userinfo"]),
		)
		.with_app(
			"qcloud_login",
			Some(ProviderKind::Tencent),
			ProviderConfig::new("tc-app", "tc-secret-id")
				.with_secret_key("tc-secret-key")
				.with_redirect_url("https://app.example.com/login/tencent"),
		);
	let third = Third::new(config);

	for name in third.app_names() {
		let driver = third.app(name)?.with_state(format!("state-{name}"));

		println!("{name} ({}): {}.", driver.kind(), driver.build_authorization_url(None)?);
	}

	// Simulate the provider redirecting back with an Alipay-style code.
	let params = CallbackParams::from_query("?auth_code=demo-code&state=state-alipay");

	println!(
		"Callback carried code {:?} and state {:?}; pass it to Driver::authenticate_callback.",
		params.code(),
		params.state
	);

	Ok(())
}
