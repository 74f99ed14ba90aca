#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
// self
use oauth2_third::{auth::AccessToken, driver::Driver, error::Error, provider::Tencent};

fn driver(server: &MockServer) -> Tencent {
	Tencent::new(common::mock_config(server, "app", "SID").with_secret_key("SKEY"))
		.expect("Tencent config should be valid.")
}

#[tokio::test]
async fn open_id_alone_is_enough_to_build_the_user() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/").header("x-tc-action", "GetUserAccessToken");
			then.status(200).body(r#"{"UserOpenId":"o1"}"#);
		})
		.await;
	let federation_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/")
				.header("x-tc-action", "GetThirdPartyFederationToken")
				.query_param("Duration", "7200");
			then.status(200)
				.body(r#"{"Credentials":{"Token":"t","TmpSecretId":"id","TmpSecretKey":"k"}}"#);
		})
		.await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/")
				.header("x-tc-action", "GetUserBaseInfo")
				.header("x-tc-token", "t");
			then.status(200).body(r#"{"Nickname":"N"}"#);
		})
		.await;
	let user = driver(&server).authenticate_with_code("code-1").await.expect("Flow should succeed.");

	token_mock.assert_async().await;
	federation_mock.assert_async().await;
	profile_mock.assert_async().await;

	assert_eq!(user.id(), "o1");
	assert_eq!(user.name(), Some("N"));
	assert_eq!(user.nickname(), Some("N"));
	assert_eq!(user.token(), None);
	assert_eq!(user.token_response(), None);
}

#[tokio::test]
async fn identity_only_exchanges_yield_tokenless_grants() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/").header("x-tc-action", "GetUserAccessToken");
			then.status(200).body(r#"{"Response":{"UserOpenId":"o1","UserUnionId":"u1"}}"#);
		})
		.await;

	let grant = driver(&server).exchange_code_for_token("code-1").await.expect("Exchange should succeed.");

	assert_eq!(grant.access_token(), None);
	assert_eq!(grant.identity.open_id.as_deref(), Some("o1"));
	assert_eq!(grant.identity.union_id.as_deref(), Some("u1"));
}

#[tokio::test]
async fn missing_open_ids_fail_the_exchange() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/").header("x-tc-action", "GetUserAccessToken");
			then.status(200).body(r#"{"Response":{"UserAccessToken":"uat"}}"#);
		})
		.await;

	let err = driver(&server).exchange_code_for_token("code-1").await.expect_err("Exchange should fail.");

	assert!(matches!(err, Error::AuthorizeFailed { status: Some(200), .. }), "{err:?}");
}

#[tokio::test]
async fn federation_credentials_sign_the_profile_call() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/")
				.header("x-tc-action", "GetUserAccessToken")
				.header("x-tc-version", "2018-12-25")
				.query_param("UserAuthCode", "code-1");
			then.status(200).body(
				r#"{"Response":{"UserOpenId":"o1","UserUnionId":"u1","UserAccessToken":"uat","UserRefreshToken":"urt","ExpiresAt":7200,"RequestId":"r1"}}"#,
			);
		})
		.await;
	let federation_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/")
				.header("x-tc-action", "GetThirdPartyFederationToken")
				.header("x-tc-version", "2018-08-13")
				.header("x-tc-region", "ap-guangzhou")
				.query_param("UserAccessToken", "uat")
				.query_param("Duration", "7200")
				.query_param("ApiAppId", "0");
			then.status(200).body(
				r#"{"Response":{"Credentials":{"Token":"t","TmpSecretId":"id","TmpSecretKey":"k"}}}"#,
			);
		})
		.await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/")
				.header("x-tc-action", "GetUserBaseInfo")
				.header("x-tc-token", "t");
			then.status(200).body(r#"{"Response":{"Nickname":"N"}}"#);
		})
		.await;
	let user = driver(&server).authenticate_with_code("code-1").await.expect("Flow should succeed.");

	token_mock.assert_async().await;
	federation_mock.assert_async().await;
	profile_mock.assert_async().await;

	assert_eq!(user.id(), "o1");
	assert_eq!(user.name(), Some("N"));
	assert_eq!(user.token().map(|token| token.as_str()), Some("uat"));
	assert_eq!(user.refresh_token(), Some("urt"));
	assert_eq!(
		user.token_response().and_then(|response| response.raw_str("UserUnionId")).as_deref(),
		Some("u1")
	);
}

#[tokio::test]
async fn unwrapped_bodies_are_accepted() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/").header("x-tc-action", "GetUserAccessToken");
			then.status(200).body(r#"{"UserOpenId":"o1","UserAccessToken":"uat"}"#);
		})
		.await;

	let grant = driver(&server).exchange_code_for_token("code-1").await.expect("Exchange should succeed.");

	assert_eq!(grant.identity.open_id.as_deref(), Some("o1"));
	assert_eq!(grant.access_token().map(AccessToken::as_str), Some("uat"));
}

#[tokio::test]
async fn response_errors_carry_code_and_message() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/").header("x-tc-action", "GetUserAccessToken");
			then.status(200).body(
				r#"{"Response":{"Error":{"Code":"AuthFailure.SignatureFailure","Message":"bad signature"},"RequestId":"r1"}}"#,
			);
		})
		.await;

	let err = driver(&server).exchange_code_for_token("code-1").await.expect_err("Exchange should fail.");

	assert!(
		matches!(
			err,
			Error::AuthorizeFailed { ref message, .. } if message == "AuthFailure.SignatureFailure: bad signature"
		),
		"{err:?}"
	);
}

#[tokio::test]
async fn missing_federation_credentials_fail_the_lookup() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/").header("x-tc-action", "GetThirdPartyFederationToken");
			then.status(200).body(r#"{"Response":{"RequestId":"r1"}}"#);
		})
		.await;

	let err = driver(&server).federation_token("uat").await.expect_err("Federation should fail.");

	assert!(
		matches!(err, Error::AuthorizeFailed { ref message, .. } if message == "Get Federation Token failed"),
		"{err:?}"
	);
}
