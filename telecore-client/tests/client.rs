mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{eventually, within};
use telecore_client::backend::fake::FAKE_CHAT_ID;
use telecore_client::backend::LoopbackPeer;
use telecore_client::dispatcher::{delegate_fn, MessageUpdate};
use telecore_client::{
    AuthError, AuthorizationState, Client, CodeType, Config, ConnectionState, FakeBackend, FakeConfig,
    InvocationError, LoopbackBackend, TcpConfig,
};
use telecore_proto::envelope::{encode_error, encode_result};
use telecore_proto::transport::{encode_frame, FrameDecoder};
use telecore_proto::Message;
use telecore_tl::{enums, functions, types, Deserializable, Identifiable, Serializable};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn connect(config: FakeConfig) -> Client {
    within(Client::connect(Config::fake(config))).await.unwrap()
}

// ── Fake backend ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn phone_code_login_then_logout() {
    let client = connect(FakeConfig::default()).await;
    let auth = client.auth();
    assert_eq!(auth.state(), AuthorizationState::WaitingForPhoneNumber);

    within(auth.send_phone_number("+15551234567")).await.unwrap();
    match auth.state() {
        AuthorizationState::WaitingForCode(info) => assert_eq!(info.phone_number(), "+15551234567"),
        other => panic!("unexpected {other:?}"),
    }

    within(auth.verify_code("12345")).await.unwrap();
    assert_eq!(auth.state(), AuthorizationState::Authorized);
    let me = within(client.get_me()).await.unwrap();
    assert_eq!(me.phone_number, "+15551234567");

    within(auth.logout()).await.unwrap();
    assert_eq!(auth.state(), AuthorizationState::WaitingForPhoneNumber);
    assert!(!auth.is_processing());

    within(client.shutdown()).await;
    assert!(!client.rpc().is_running().await);
}

#[tokio::test]
async fn wrong_code_can_be_retried() {
    let client = connect(FakeConfig::default()).await;
    let auth = client.auth();
    within(auth.send_phone_number("+4930123456")).await.unwrap();

    assert!(matches!(within(auth.verify_code("54321")).await, Err(AuthError::InvalidCode)));
    assert!(matches!(auth.state(), AuthorizationState::WaitingForCode(_)));

    within(auth.verify_code("12345")).await.unwrap();
    assert!(auth.last_error().is_none());
    assert!(auth.state().is_authorized());
}

#[tokio::test]
async fn password_and_registration_steps() {
    let client = connect(FakeConfig {
        password:              Some("secret".into()),
        password_hint:         "usual".into(),
        registration_required: true,
        ..Default::default()
    })
    .await;
    let auth = client.auth();

    within(auth.send_phone_number("+15550001111")).await.unwrap();
    within(auth.verify_code("12345")).await.unwrap();
    assert_eq!(
        auth.state(),
        AuthorizationState::WaitingForPassword { hint: "usual".into(), has_recovery_email: false },
    );

    assert!(matches!(within(auth.verify_password("guess")).await, Err(AuthError::InvalidPassword)));
    within(auth.verify_password("secret")).await.unwrap();
    assert_eq!(auth.state(), AuthorizationState::WaitingForRegistration);

    within(auth.register_user("Ada", Some("Lovelace"))).await.unwrap();
    assert_eq!(auth.state(), AuthorizationState::Authorized);
    let me = within(client.get_me()).await.unwrap();
    assert_eq!((me.first_name.as_str(), me.last_name.as_str()), ("Ada", "Lovelace"));
}

#[tokio::test]
async fn direct_results_suffice_without_pushes() {
    let client = connect(FakeConfig { push_auth_updates: false, ..Default::default() }).await;
    let auth = client.auth();
    within(auth.send_phone_number("+15551234567")).await.unwrap();
    within(auth.verify_code("12345")).await.unwrap();
    assert_eq!(auth.state(), AuthorizationState::Authorized);
    within(auth.logout()).await.unwrap();
    assert_eq!(auth.state(), AuthorizationState::WaitingForPhoneNumber);
}

#[tokio::test]
async fn resend_switches_to_the_fallback_channel() {
    let client = connect(FakeConfig::default()).await;
    let auth = client.auth();
    within(auth.send_phone_number("+15551234567")).await.unwrap();
    within(auth.resend_code()).await.unwrap();

    eventually(|| match auth.state() {
        AuthorizationState::WaitingForCode(info) => info.code_type() == &CodeType::Call { length: 5 },
        _ => false,
    })
    .await;
    let AuthorizationState::WaitingForCode(info) = auth.state() else { unreachable!() };
    assert_eq!(info.next_type(), None);
}

#[tokio::test]
async fn connection_state_and_welcome_message_arrive() {
    let client = connect(FakeConfig::default()).await;
    let received: Arc<Mutex<Vec<(i64, String)>>> = Arc::default();
    let r = received.clone();
    client.dispatcher().set_message_delegate(Some(delegate_fn(move |e: MessageUpdate| {
        let r = r.clone();
        async move {
            if let MessageUpdate::New(m) = e {
                r.lock().unwrap().push((m.chat_id(), m.text().unwrap_or_default().to_string()));
            }
        }
    })));
    eventually(|| client.auth().connection_state() == ConnectionState::Ready).await;

    within(client.auth().send_phone_number("+15551234567")).await.unwrap();
    within(client.auth().verify_code("12345")).await.unwrap();

    eventually(|| !received.lock().unwrap().is_empty()).await;
    let (chat_id, text) = received.lock().unwrap()[0].clone();
    assert_eq!(chat_id, FAKE_CHAT_ID);
    assert!(text.starts_with("Welcome"));
}

#[tokio::test]
async fn session_survives_a_reconnect() {
    let config = Config::with_backend(Arc::new(FakeBackend::new(FakeConfig::default())));
    let client = within(Client::connect(config.clone())).await.unwrap();
    within(client.auth().send_phone_number("+15551234567")).await.unwrap();
    within(client.auth().verify_code("12345")).await.unwrap();
    within(client.shutdown()).await;

    let again = within(Client::connect(config)).await.unwrap();
    assert_eq!(again.auth().state(), AuthorizationState::Authorized);
}

/// Answer the `getAuthorizationState` every (re)connect starts with.
async fn answer_refresh(peer: &mut LoopbackPeer, state: enums::AuthorizationState) {
    let msg = within(peer.recv_request()).await.unwrap();
    assert_eq!(u32::from_bytes(&msg.body).unwrap(), functions::GetAuthorizationState::CONSTRUCTOR_ID);
    peer.respond(msg.token, &state);
}

#[tokio::test]
async fn reconnect_resumes_update_delivery() {
    let (backend, mut acceptor) = LoopbackBackend::new();
    let connecting = tokio::spawn(Client::connect(Config::with_backend(Arc::new(backend))));
    let mut peer = within(acceptor.accept()).await.unwrap();
    answer_refresh(&mut peer, types::AuthorizationStateWaitPhoneNumber {}.into()).await;
    let client = within(connecting).await.unwrap().unwrap();

    peer.close();
    within(async {
        while client.rpc().is_running().await {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;

    let c = client.clone();
    let reconnecting = tokio::spawn(async move { c.reconnect().await });
    let mut peer = within(acceptor.accept()).await.unwrap();
    answer_refresh(&mut peer, types::AuthorizationStateReady {}.into()).await;
    within(reconnecting).await.unwrap().unwrap();
    assert_eq!(client.auth().state(), AuthorizationState::Authorized);

    // Pushes on the new connection reach the delegates again.
    peer.push(&enums::Update::from(types::UpdateAuthorizationState {
        authorization_state: types::AuthorizationStateWaitPhoneNumber {}.into(),
    }));
    peer.push(&enums::Update::from(types::UpdateConnectionState {
        state: types::ConnectionStateUpdating {}.into(),
    }));
    eventually(|| client.auth().state() == AuthorizationState::WaitingForPhoneNumber).await;
    eventually(|| client.auth().connection_state() == ConnectionState::Updating).await;

    within(client.shutdown()).await;
}

#[tokio::test]
async fn get_me_requires_login() {
    let client = connect(FakeConfig::default()).await;
    match within(client.get_me()).await {
        Err(InvocationError::Rpc(e)) => assert_eq!((e.code, e.name.as_str()), (401, "AUTH_KEY_UNREGISTERED")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_operation_is_refused_with_latency() {
    let client = connect(FakeConfig { latency: Duration::from_millis(30), ..Default::default() }).await;
    let auth = client.auth().clone();
    let first = tokio::spawn(async move { auth.send_phone_number("+15551234567").await });
    eventually(|| client.auth().is_processing()).await;

    assert!(matches!(client.auth().verify_code("12345").await, Err(AuthError::AlreadyProcessing)));
    within(first).await.unwrap().unwrap();
    assert!(!client.auth().is_processing());
}

// ── TCP backend ───────────────────────────────────────────────────────────────

/// Minimal backend: knows `getAuthorizationState` and refuses the rest.
async fn serve_one(listener: TcpListener) {
    let (mut sock, _) = listener.accept().await.unwrap();
    let ready = enums::Update::from(types::UpdateConnectionState { state: types::ConnectionStateReady {}.into() });
    sock.write_all(&encode_frame(&ready.to_bytes())).await.unwrap();

    let mut decoder = FrameDecoder::accepting();
    let mut buf = vec![0u8; 4096];
    loop {
        let n = sock.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        decoder.extend(&buf[..n]);
        while let Some(frame) = decoder.next_frame().unwrap() {
            let msg = Message::from_bytes(&frame).unwrap();
            let id = u32::from_bytes(&msg.body).unwrap();
            let reply = if id == functions::GetAuthorizationState::CONSTRUCTOR_ID {
                let state = enums::AuthorizationState::from(types::AuthorizationStateWaitPhoneNumber {});
                encode_result(msg.token, &state.to_bytes())
            } else {
                encode_error(msg.token, 401, "AUTH_KEY_UNREGISTERED")
            };
            sock.write_all(&encode_frame(&reply)).await.unwrap();
        }
    }
}

#[tokio::test]
async fn tcp_backend_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let server = tokio::spawn(serve_one(listener));

    let client = within(Client::connect(Config::tcp(TcpConfig::new(addr)))).await.unwrap();
    assert_eq!(client.auth().state(), AuthorizationState::WaitingForPhoneNumber);
    eventually(|| client.auth().connection_state() == ConnectionState::Ready).await;

    let err = within(client.get_me()).await.unwrap_err();
    assert!(err.is("AUTH_KEY_UNREGISTERED"));

    within(client.shutdown()).await;
    within(server).await.unwrap();
}

#[tokio::test]
async fn tcp_connect_failure_is_an_io_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let config = TcpConfig { connect_timeout: Duration::from_secs(2), ..TcpConfig::new(addr) };
    let result = within(Client::connect(Config::tcp(config))).await;
    assert!(matches!(result, Err(InvocationError::Io(_))));
}
