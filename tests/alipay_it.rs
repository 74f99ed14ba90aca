#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::json;
use url::form_urlencoded;
// self
use common::RecordingTransport;
use oauth2_third::{
	config::ProviderConfig,
	driver::{CallbackParams, Driver},
	error::Error,
	provider::Alipay,
	sign::rsa2,
};

const PRIVATE_KEY: &str = "MIICXAIBAAKBgQDZ8qQVIaFxBFkYjTyYQkzsbkE6mRndRTLiuCi0ermq5dObiOz0tOyPbo+xPhM/IPB9geLNK/9nj44mBGDOWcqMI7H4WBozVwN6MbkQayjF+S1BrfA/Evw9T4d5dO5s9GX5QXlrpKvLTTLZ/3L9dbHYB+LJFmyNOeU56rhZj8T7zwIDAQABAoGAY/JXuLERfeiGizHJxfExoYL2Os8XA1fGfB4D3LAjEPIQVlU2hQmrKiODlb5nyR1r68JypbA1keJNR7XeRwL6VOyCHcp5C008D5ct6M/fLf9+2HM52sUwRqWUPLHKEevmFKFZkWhuUsFGB9U/l3v7WeyGRguwwO3uO24mkby6S2ECQQD/dzPI7epcZVLT4XsMZYalSKtUBkAQbjijtNVghPEd4VYl6XSgkIRXTP0BV5jQb0l5KmLlemH1bMqdegQifHQZAkEA2mdZNdz3pY/9ZXYjOxbg0sC6G/OWYgy3Zak5XbHFHC2llS5ByXzq3gpyeP4aHd4lwMmValEAztOzu2pSVRMsJwJBAK7Zr5/+90F2OFK9KbM6agYGzv0bqg2U4z9pLgJ5+24wJP6d4y1ivLHkB+c7RWSkRu2fjUDzmsiYRbWzJdFUzUECQBjq05W+mQ5tiBZsTQavzISe8lzABLc5Bi92CBJ1dqyJVKvZdC39r3oXrQm6y9X+g0YkeYSAq1vtcUL/lVcZcd8CQFo9Vpvr0Gebm5WCeIfm59Iopk3Muo8CBxDxST3HZpHts0RvDSu9IGg+cHondICFVhzih9x74r++Vvps35dU3QY=";

#[tokio::test]
async fn error_response_envelope_fails_the_exchange() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/gateway.do")
				.header("content-type", "application/x-www-form-urlencoded;charset=utf-8");
			then.status(200).body(r#"{"error_response":{"code":"1"}}"#);
		})
		.await;
	let driver = Alipay::new(common::mock_config(&server, "2021001", PRIVATE_KEY))
		.expect("Alipay config should be valid.");
	let err = driver.exchange_code_for_token("auth-code").await.expect_err("Exchange should fail.");

	mock.assert_async().await;

	assert!(matches!(err, Error::AuthorizeFailed { .. }), "{err:?}");
	assert_eq!(err.provider_body(), Some(&json!({ "error_response": { "code": "1" } })));
}

#[tokio::test]
async fn callback_flow_signs_both_gateway_calls() {
	let transport = RecordingTransport::new([
		RecordingTransport::json(
			200,
			json!({
				"alipay_system_oauth_token_response": {
					"access_token": "A",
					"refresh_token": "R",
					"expires_in": 1296000,
					"user_id": "2088",
				},
				"sign": "ignored",
			}),
		),
		RecordingTransport::json(
			200,
			json!({
				"alipay_user_info_share_response": {
					"code": "10000",
					"msg": "Success",
					"user_id": "2088",
					"nick_name": "Ali",
					"avatar": "https://a",
				},
			}),
		),
	]);
	let driver = Alipay::new(ProviderConfig::new("2021001", PRIVATE_KEY).with_redirect_url("https://cb"))
		.expect("Alipay config should be valid.")
		.with_transport(transport.clone());
	let params = CallbackParams::from_query("auth_code=auth-code&state=s");
	let user = driver.authenticate_callback(&params).await.expect("Flow should succeed.");

	assert_eq!(user.id(), "2088");
	assert_eq!(user.name(), Some("Ali"));
	assert_eq!(user.refresh_token(), Some("R"));
	assert_eq!(user.expires_in(), Some(1_296_000));

	let requests = transport.requests();

	assert_eq!(requests.len(), 2);

	for (request, method) in requests.iter().zip(["alipay.system.oauth.token", "alipay.user.info.share"]) {
		let fields = form_urlencoded::parse(request.body.as_bytes())
			.into_owned()
			.collect::<std::collections::BTreeMap<_, _>>();

		assert_eq!(request.method, "POST");
		assert_eq!(request.url.as_str(), "https://openapi.alipay.com/gateway.do");
		assert_eq!(fields["method"], method);
		assert_eq!(fields["sign_type"], "RSA2");
		assert_eq!(
			fields["sign"],
			rsa2::sign_fields(&fields, PRIVATE_KEY).expect("Recorded fields should re-sign.")
		);
	}
}

#[tokio::test]
async fn user_info_failure_codes_are_rejected() {
	let transport = RecordingTransport::new([RecordingTransport::json(
		200,
		json!({
			"alipay_user_info_share_response": {
				"code": "20001",
				"msg": "Insufficient Token Permissions",
				"sub_msg": "auth_token is invalid",
			},
		}),
	)]);
	let driver = Alipay::new(ProviderConfig::new("2021001", PRIVATE_KEY))
		.expect("Alipay config should be valid.")
		.with_transport(transport);
	let params = CallbackParams::from_query("token=A&expires_in=60");
	let err = driver.authenticate_with_token(&params).await.expect_err("Lookup should fail.");

	assert!(
		matches!(err, Error::AuthorizeFailed { ref message, .. } if message == "20001: auth_token is invalid"),
		"{err:?}"
	);
}
