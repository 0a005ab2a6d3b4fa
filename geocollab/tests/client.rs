use color_eyre::Result;
use geocollab::{ApiClient, Attachment, AuthConfig, ClientConfig, Error, UserId};
use serde_json::json;
use tracing_test::traced_test;
use wiremock::{
    matchers::{body_string_contains, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const AUTH: &str = "/auth/realms/demo/protocol/openid-connect";

fn token_body(access_token: &str) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "refresh_token": "R",
        "expires_in": 300,
        "refresh_expires_in": 1800,
    })
}

async fn mount_token(server: &MockServer, username: &str, access_token: &str) {
    Mock::given(method("POST"))
        .and(path(format!("{}/token", AUTH)))
        .and(body_string_contains(format!("username={}&", username)))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access_token)))
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> Result<ApiClient> {
    let config = ClientConfig::new(&format!("{}/api", server.uri()))?
        .with_secret("integration")
        .with_auth(AuthConfig::new(
            format!("{}{}", server.uri(), AUTH),
            "collab",
            "s3cr3t",
        ));

    Ok(ApiClient::new(config)?)
}

async fn connected_client(server: &MockServer) -> Result<ApiClient> {
    mount_token(server, "mapper", "A").await;

    let mut client = client(server)?;
    client.set_credentials("mapper", "hunter2").await?;
    client.connect().await?;
    Ok(client)
}

#[tokio::test]
async fn requests_carry_the_bearer_token() -> Result<()> {
    let server = MockServer::start().await;
    let client = connected_client(&server).await?;

    Mock::given(method("GET"))
        .and(path("/api/users/me"))
        .and(header("authorization", "Bearer A"))
        .and(query_param("fields", "username"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "username": "mapper" })))
        .expect(1)
        .mount(&server)
        .await;

    let me = client.get_user(UserId::Me, &[("fields", "username")]).await?;

    assert_eq!(me["username"], "mapper");
    Ok(())
}

#[tokio::test]
async fn reads_acquire_a_token_on_demand() -> Result<()> {
    let server = MockServer::start().await;
    mount_token(&server, "mapper", "A").await;

    Mock::given(method("GET"))
        .and(path("/api/databases"))
        .and(header("authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client(&server)?;
    client.set_credentials("mapper", "hunter2").await?;
    assert!(!client.is_connected());

    client.all_databases(&[]).await?;

    assert!(client.is_connected());
    Ok(())
}

#[tokio::test]
async fn mutations_require_a_connection() -> Result<()> {
    let server = MockServer::start().await;

    let mut client = client(&server)?;
    client.set_credentials("mapper", "hunter2").await?;

    let err = client
        .create_community(&json!({ "name": "Cartographers" }))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConnectionRequired));
    assert!(server.received_requests().await.unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_arguments_never_reach_the_network() -> Result<()> {
    let server = MockServer::start().await;

    let mut client = client(&server)?;
    client.set_credentials("mapper", "hunter2").await?;

    let err = client.all_users(&[("colour", "red")]).await.unwrap_err();
    assert!(err
        .to_string()
        .contains("Invalid parameter colour: must be in ["));

    let err = client
        .create_table(3, &json!({ "name": "roads" }))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    assert!(server.received_requests().await.unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn api_errors_carry_status_and_body() -> Result<()> {
    let server = MockServer::start().await;
    let client = connected_client(&server).await?;

    Mock::given(method("DELETE"))
        .and(path("/api/databases/3/tables/9"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such table"))
        .mount(&server)
        .await;

    let err = client.delete_table(3, 9).await.unwrap_err();

    match err {
        Error::Api { status, body } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(body, "no such table");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn empty_responses_are_null() -> Result<()> {
    let server = MockServer::start().await;
    let client = connected_client(&server).await?;

    Mock::given(method("DELETE"))
        .and(path("/api/permissions/5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.delete_permission(5).await?.is_null());
    Ok(())
}

#[tokio::test]
async fn reports_are_sent_as_multipart() -> Result<()> {
    let server = MockServer::start().await;
    let client = connected_client(&server).await?;

    Mock::given(method("POST"))
        .and(path("/api/reports"))
        .and(header("authorization", "Bearer A"))
        .and(body_string_contains(r#"name="geometry""#))
        .and(body_string_contains(r#"name="attributes[kind]""#))
        .and(body_string_contains(r#"filename="document1.png""#))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 77 })))
        .expect(1)
        .mount(&server)
        .await;

    let report = client
        .create_report(
            &json!({
                "geometry": "POINT(2.35 48.85)",
                "attributes": { "kind": "pothole" },
                "comment": "",
            }),
            vec![Attachment::new(
                "attachments[0]",
                "image/png",
                b"not really a png".to_vec(),
            )],
        )
        .await?;

    assert_eq!(report["id"], 77);
    Ok(())
}

mod when_the_user_changes {
    use super::*;

    #[tokio::test]
    async fn the_previous_session_is_revoked() -> Result<()> {
        let server = MockServer::start().await;
        let mut client = connected_client(&server).await?;
        mount_token(&server, "surveyor", "B").await;

        Mock::given(method("POST"))
            .and(path(format!("{}/revoke", AUTH)))
            .and(body_string_contains("token=A"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client.set_credentials("surveyor", "t0p0").await?;
        assert!(!client.is_connected());

        client.connect().await?;
        assert!(client.is_connected());
        Ok(())
    }

    #[tokio::test]
    async fn the_same_user_keeps_the_session() -> Result<()> {
        let server = MockServer::start().await;
        let mut client = connected_client(&server).await?;

        Mock::given(method("POST"))
            .and(path(format!("{}/revoke", AUTH)))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        client.set_credentials("mapper", "n3w-p4ss").await?;

        assert!(client.is_connected());
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn a_failed_revocation_does_not_block_the_switch() -> Result<()> {
        let server = MockServer::start().await;
        let mut client = connected_client(&server).await?;

        Mock::given(method("POST"))
            .and(path(format!("{}/revoke", AUTH)))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        client.set_credentials("surveyor", "t0p0").await?;

        assert_eq!(client.username().unwrap().as_str(), "surveyor");
        assert!(!client.is_connected());
        assert!(logs_contain("unable to revoke access token"));
        Ok(())
    }
}

mod when_auth_is_reconfigured {
    use super::*;

    #[tokio::test]
    async fn the_previous_session_is_revoked_and_forgotten() -> Result<()> {
        let server = MockServer::start().await;
        let mut client = connected_client(&server).await?;

        Mock::given(method("POST"))
            .and(path(format!("{}/revoke", AUTH)))
            .and(body_string_contains("token=A"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client
            .reconfigure_auth(Some(AuthConfig::new(
                format!("{}{}", server.uri(), AUTH),
                "collab",
                "s3cr3t",
            )))
            .await?;

        assert!(!client.is_connected());
        assert!(client.username().is_none());
        assert!(client.token_manager().is_some());
        Ok(())
    }
}
