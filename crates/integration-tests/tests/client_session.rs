//! A client session against the in-process server.

#![allow(clippy::unwrap_used)]

use launchpad_client::{
    CredentialStore, LaunchClient, LoadMore, MemorySlot, MergeError, Readout, RemoteError,
    Session, SessionError, operations,
};
use launchpad_core::{Cursor, Email, LaunchId};
use launchpad_integration_tests::{RouterTransport, test_app};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

fn client() -> LaunchClient<RouterTransport> {
    LaunchClient::with_transport(RouterTransport::new(test_app()))
}

fn session() -> Session<MemorySlot> {
    Session::start(CredentialStore::new(MemorySlot::new())).unwrap()
}

fn list_len(view: &Value) -> usize {
    view["launches"]["launches"].as_array().unwrap().len()
}

#[tokio::test]
async fn test_launch_list_load_more_until_exhausted() {
    let client = client();
    let cancel = CancellationToken::new();
    let mut session = session();
    let plan = session.plan(&operations::launch_list()).unwrap();
    let field = plan.field("launches").unwrap();

    assert!(matches!(session.read(&plan), Readout::NotYetAvailable { .. }));
    assert_eq!(session.load_more(field), LoadMore::NotLoaded);

    let seq = session.begin_fetch();
    let first = client.launches(None, None, &cancel).await.unwrap();
    session.absorb(&plan, &first, seq);

    let view = session.read(&plan).ready().unwrap();
    assert_eq!(list_len(&view), 20);
    assert_eq!(view["launches"]["hasMore"], json!(true));
    assert_eq!(view["launches"]["launches"][0]["isInCart"], json!(false));

    let LoadMore::Next { after } = session.load_more(field) else {
        panic!("expected another page");
    };
    let seq = session.begin_fetch();
    let second = client
        .launches(after.as_ref().map(Cursor::as_str), None, &cancel)
        .await
        .unwrap();
    session
        .merge_page(field, after.as_ref(), Some(&second), seq)
        .unwrap();

    let view = session.read(&plan).ready().unwrap();
    assert_eq!(list_len(&view), 30);
    assert_eq!(view["launches"]["hasMore"], json!(false));
    assert_eq!(session.load_more(field), LoadMore::Exhausted);
}

#[tokio::test]
async fn test_stale_cursor_page_is_rejected() {
    let client = client();
    let cancel = CancellationToken::new();
    let mut session = session();
    let plan = session.plan(&operations::launch_list()).unwrap();
    let field = plan.field("launches").unwrap();

    let page = |after: Option<String>| {
        let client = client.clone();
        let cancel = cancel.clone();
        async move {
            client
                .fetch(
                    &operations::LAUNCH_LIST,
                    json!({ "after": after, "pageSize": 10 }),
                    None,
                    &cancel,
                )
                .await
                .unwrap()
        }
    };

    let seq = session.begin_fetch();
    session.absorb(&plan, &page(None).await, seq);
    let LoadMore::Next { after: Some(tail) } = session.load_more(field) else {
        panic!("expected another page");
    };

    // Two "load more" fetches race from the same tail.
    let (seq_a, seq_b) = (session.begin_fetch(), session.begin_fetch());
    let (a, b) = tokio::join!(
        page(Some(tail.as_str().to_string())),
        page(Some(tail.as_str().to_string())),
    );

    session.merge_page(field, Some(&tail), Some(&a), seq_a).unwrap();
    let err = session
        .merge_page(field, Some(&tail), Some(&b), seq_b)
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Merge(MergeError::StaleCursor { ref requested, .. })
            if requested.as_ref() == Some(&tail)
    ));

    // The rejected page did not duplicate items.
    assert_eq!(list_len(&session.read(&plan).ready().unwrap()), 20);
}

#[tokio::test]
async fn test_login_book_and_logout() {
    let client = client();
    let cancel = CancellationToken::new();
    let mut session = session();
    let flags = session.plan(&operations::session_flags()).unwrap();

    assert_eq!(
        session.read(&flags).ready().unwrap()["isLoggedIn"],
        json!(false)
    );

    let credential = client
        .login(&Email::parse("test@example.com").unwrap(), &cancel)
        .await
        .unwrap();
    assert_eq!(credential.expose(), "dGVzdEBleGFtcGxlLmNvbQ==");
    session.complete_login(&credential).unwrap();
    assert_eq!(
        session.read(&flags).ready().unwrap()["isLoggedIn"],
        json!(true)
    );

    // Book what is in the cart.
    session.toggle_cart(&LaunchId::from("7"));
    let cart = session.toggle_cart(&LaunchId::from("8"));
    let stored = session.credential().unwrap();
    let update = client
        .book_trips(cart.as_slice(), stored.as_ref(), &cancel)
        .await
        .unwrap();
    assert!(update.success);
    assert_eq!(update.launches.len(), 2);

    let trips = session.plan(&operations::my_trips()).unwrap();
    let seq = session.begin_fetch();
    let data = client.me(stored.as_ref(), &cancel).await.unwrap();
    session.absorb(&trips, &data, seq);
    let view = session.read(&trips).ready().unwrap();
    assert_eq!(view["me"]["email"], json!("test@example.com"));
    assert_eq!(view["me"]["trips"].as_array().unwrap().len(), 2);
    assert_eq!(view["me"]["trips"][0]["isInCart"], json!(true));

    // A fetch still in flight when the session logs out is discarded.
    let in_flight = session.begin_fetch();
    session.logout().unwrap();
    session.absorb(&trips, &data, in_flight);

    assert!(session.credential().unwrap().is_none());
    assert!(matches!(session.read(&trips), Readout::NotYetAvailable { .. }));
    let flags_view = session.read(&flags).ready().unwrap();
    assert_eq!(flags_view["isLoggedIn"], json!(false));
    assert_eq!(flags_view["cartItems"], json!([]));
}

#[tokio::test]
async fn test_invalid_email_gets_no_credential() {
    let data = client()
        .fetch(
            &operations::LOGIN,
            json!({ "email": "not-an-email" }),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(data, json!({ "login": null }));
}

#[tokio::test]
async fn test_cancelled_fetch_resolves_to_cancelled() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client().me(None, &cancel).await.unwrap_err();
    assert!(matches!(err, RemoteError::Cancelled));
}

#[tokio::test]
async fn test_launch_details_marks_cart_membership() {
    let client = client();
    let cancel = CancellationToken::new();
    let mut session = session();
    let id = LaunchId::from("12");
    let plan = session.plan(&operations::launch_details(&id)).unwrap();

    let seq = session.begin_fetch();
    let data = client.launch(&id, None, &cancel).await.unwrap();
    session.absorb(&plan, &data, seq);

    let before = session.read(&plan).ready().unwrap();
    assert_eq!(before["launch"]["isInCart"], json!(false));
    assert!(before["launch"]["mission"]["missionPatch"].is_string());

    session.toggle_cart(&id);
    let after = session.read(&plan).ready().unwrap();
    assert_eq!(after["launch"]["isInCart"], json!(true));
    assert_eq!(after["launch"]["rocket"], before["launch"]["rocket"]);
}
