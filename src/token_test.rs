use super::*;

#[tokio::test]
async fn no_token_yields_nothing() {
    assert_eq!(NoToken.access_token().await, None);
}

#[tokio::test]
async fn static_token_yields_token() {
    let source = StaticToken::new("jwt-123");
    assert_eq!(source.access_token().await.as_deref(), Some("jwt-123"));
}

#[tokio::test]
async fn credential_store_tracks_sign_in_and_out() {
    let auth_side = CredentialStore::new();
    let client_side = auth_side.clone();
    assert_eq!(client_side.access_token().await, None);

    auth_side.set("session-a");
    assert_eq!(client_side.access_token().await.as_deref(), Some("session-a"));

    auth_side.set("session-b");
    assert_eq!(client_side.current().as_deref(), Some("session-b"));

    auth_side.clear();
    assert_eq!(client_side.access_token().await, None);
}

#[test]
fn token_error_messages_name_the_status() {
    assert_eq!(TokenError::Status(401).to_string(), "ticket endpoint returned status 401");
}

#[tokio::test]
async fn unreachable_ticket_endpoint_degrades_to_no_token() {
    // Port 9 (discard) on loopback is not expected to run an HTTP server.
    let source = TicketEndpoint::new("http://127.0.0.1:9/ticket", None);
    assert!(source.fetch_ticket().await.is_err());
    assert_eq!(source.access_token().await, None);
}
