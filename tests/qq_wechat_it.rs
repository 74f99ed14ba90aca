#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
// self
use oauth2_third::{
	auth::{AccessToken, ProviderIdentity},
	driver::Driver,
	error::Error,
	provider::{Qq, Wechat, WechatComponent},
};

#[tokio::test]
async fn qq_flow_reads_form_tokens_and_jsonp_openids() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/oauth2.0/token")
				.query_param("grant_type", "authorization_code")
				.query_param("code", "code-1")
				.query_param("client_id", "qqid");
			then.status(200).body("access_token=T&expires_in=7776000&refresh_token=R");
		})
		.await;
	let me_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/oauth2.0/me")
				.query_param("access_token", "T")
				.query_param("unionid", "1");
			then.status(200)
				.body(r#"callback( {"client_id":"qqid","openid":"o1","unionid":"u1"} );"#);
		})
		.await;
	let user_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/user/get_user_info")
				.query_param("openid", "o1")
				.query_param("oauth_consumer_key", "qqid")
				.query_param("fmt", "json");
			then.status(200).body(
				r#"{"ret":0,"msg":"","nickname":"Q","figureurl_qq_2":"https://q/avatar"}"#,
			);
		})
		.await;
	let driver = Qq::new(common::mock_config(&server, "qqid", "qqsecret"))
		.expect("QQ config should be valid.")
		.with_union_id();
	let user = driver.authenticate_with_code("code-1").await.expect("Flow should succeed.");

	token_mock.assert_async().await;
	me_mock.assert_async().await;
	user_mock.assert_async().await;

	assert_eq!(user.id(), "o1");
	assert_eq!(user.nickname(), Some("Q"));
	assert_eq!(user.avatar(), Some("https://q/avatar"));
	assert_eq!(user.raw()["unionid"], "u1");
	assert_eq!(user.expires_in(), Some(7_776_000));
	assert_eq!(user.refresh_token(), Some("R"));
}

#[tokio::test]
async fn qq_profile_errors_surface_the_message() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/oauth2.0/me");
			then.status(200).body(r#"callback( {"client_id":"qqid","openid":"o1"} );"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/user/get_user_info");
			then.status(200).body(r#"{"ret":-1,"msg":"client request's parameters are invalid"}"#);
		})
		.await;

	let driver =
		Qq::new(common::mock_config(&server, "qqid", "qqsecret")).expect("QQ config should be valid.");
	let token = AccessToken::new("T").expect("Token is valid.");
	let err = driver
		.build_user_from_token(&token, &ProviderIdentity::default())
		.await
		.expect_err("Lookup should fail.");

	assert!(
		matches!(
			err,
			Error::AuthorizeFailed { ref message, .. } if message == "client request's parameters are invalid"
		),
		"{err:?}"
	);
}

#[tokio::test]
async fn wechat_flow_threads_the_openid_into_the_profile_call() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/sns/oauth2/access_token")
				.query_param("appid", "wxid")
				.query_param("secret", "wxsecret")
				.query_param("code", "code-1")
				.query_param("grant_type", "authorization_code");
			then.status(200).body(
				r#"{"access_token":"T","expires_in":7200,"refresh_token":"R","openid":"o1","scope":"snsapi_userinfo","unionid":"u1"}"#,
			);
		})
		.await;
	let user_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/sns/userinfo")
				.query_param("access_token", "T")
				.query_param("openid", "o1")
				.query_param("lang", "zh_CN");
			then.status(200).body(
				r#"{"openid":"o1","nickname":"W","headimgurl":"https://w/avatar","unionid":"u1"}"#,
			);
		})
		.await;
	let driver = Wechat::new(common::mock_config(&server, "wxid", "wxsecret"))
		.expect("WeChat config should be valid.")
		.with_scopes(["snsapi_userinfo"]);
	let user = driver.authenticate_with_code("code-1").await.expect("Flow should succeed.");

	token_mock.assert_async().await;
	user_mock.assert_async().await;

	assert_eq!(user.id(), "o1");
	assert_eq!(user.name(), Some("W"));
	assert_eq!(user.avatar(), Some("https://w/avatar"));
	assert_eq!(user.expires_in(), Some(7200));
}

#[tokio::test]
async fn wechat_component_mode_uses_the_component_token_endpoint() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/sns/oauth2/component/access_token")
				.query_param("appid", "wxid")
				.query_param("component_appid", "cid")
				.query_param("component_access_token", "ctoken");
			then.status(200).body(r#"{"access_token":"T","openid":"o1"}"#);
		})
		.await;
	let driver = Wechat::new(common::mock_config(&server, "wxid", "wxsecret"))
		.expect("WeChat config should be valid.")
		.with_component(WechatComponent::new("cid", "ctoken"));
	let grant = driver.exchange_code_for_token("code-1").await.expect("Exchange should succeed.");

	token_mock.assert_async().await;

	assert_eq!(grant.access_token().map(AccessToken::as_str), Some("T"));
	assert_eq!(grant.identity.open_id.as_deref(), Some("o1"));
}

#[tokio::test]
async fn wechat_errcodes_become_authorize_failures() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/sns/oauth2/access_token");
			then.status(200).body(r#"{"errcode":40029,"errmsg":"invalid code"}"#);
		})
		.await;

	let driver = Wechat::new(common::mock_config(&server, "wxid", "wxsecret"))
		.expect("WeChat config should be valid.");
	let err = driver.exchange_code_for_token("bad").await.expect_err("Exchange should fail.");

	assert!(
		matches!(err, Error::AuthorizeFailed { ref message, .. } if message == "invalid code"),
		"{err:?}"
	);
}
