use super::*;

#[tokio::test]
async fn pair_links_both_directions() {
    let (mut session, mut remote) = Session::pair();

    session.outgoing.send(Outgoing::Text("hi".into())).unwrap();
    assert_eq!(remote.outgoing.recv().await, Some(Outgoing::Text("hi".into())));

    remote.incoming.send(Incoming::Closed).unwrap();
    assert_eq!(session.incoming.recv().await, Some(Incoming::Closed));

    drop(remote);
    assert_eq!(session.incoming.recv().await, None);
}

#[tokio::test]
async fn ws_connector_rejects_non_websocket_url() {
    let err = WsConnector.open("http://localhost:3001").await.unwrap_err();
    assert!(matches!(err, TransportError::InvalidUrl(_)));
}

#[tokio::test]
async fn ws_connector_reports_refused_connection() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = WsConnector.open(&format!("ws://{addr}/live")).await.unwrap_err();
    assert!(matches!(err, TransportError::Connect(_)));
    assert!(err.to_string().starts_with("websocket connect failed"));
}
