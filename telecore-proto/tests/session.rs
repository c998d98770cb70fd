use std::collections::HashSet;

use telecore_proto::envelope::{
    self, encode_container, encode_error, encode_gzip, encode_result, unwrap_envelope, Inbound,
    RpcFailure,
};
use telecore_proto::transport::{encode_frame, FrameDecoder, FrameError, INIT, MAX_FRAME_LEN};
use telecore_proto::{Message, Session, Token};
use telecore_tl::{enums, functions, types, Identifiable, Serializable};

// ── Session ───────────────────────────────────────────────────────────────────

#[test]
fn tokens_are_unique_and_increasing() {
    let mut s = Session::new();
    let tokens: Vec<_> = (0..1000).map(|_| s.next_token()).collect();
    assert!(tokens.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(tokens.iter().collect::<HashSet<_>>().len(), tokens.len());
}

#[test]
fn pack_wraps_call_with_token() {
    let mut s = Session::new();
    s.next_token();
    let msg = s.pack(&functions::LogOut {});
    assert_eq!(msg.token, Token(2));

    let wire = msg.to_bytes();
    assert_eq!(&wire[..4], &functions::InvokeWithToken::<()>::CONSTRUCTOR_ID.to_le_bytes());
    assert_eq!(&wire[4..12], &2i64.to_le_bytes());
    assert_eq!(&wire[12..], &functions::LogOut::CONSTRUCTOR_ID.to_le_bytes());

    let parsed = Message::from_bytes(&wire).unwrap();
    assert_eq!(parsed.token, Token(2));
    assert_eq!(parsed.body, functions::LogOut {}.to_bytes());
}

#[test]
fn non_request_payload_is_not_a_message() {
    assert!(Message::from_bytes(&functions::GetMe {}.to_bytes()).is_err());
}

// ── Envelope ──────────────────────────────────────────────────────────────────

fn ready_push() -> Vec<u8> {
    enums::Update::from(types::UpdateConnectionState {
        state: types::ConnectionStateReady {}.into(),
    })
    .to_bytes()
}

#[test]
fn result_is_correlated() {
    let items = unwrap_envelope(encode_result(Token(5), &[1, 2, 3, 4])).unwrap();
    assert_eq!(items, vec![Inbound::Result { token: Token(5), body: Ok(vec![1, 2, 3, 4]) }]);
}

#[test]
fn rpc_error_becomes_failure() {
    let items = unwrap_envelope(encode_error(Token(6), 400, "PHONE_CODE_INVALID")).unwrap();
    assert_eq!(items, vec![Inbound::Result {
        token: Token(6),
        body:  Err(RpcFailure { code: 400, message: "PHONE_CODE_INVALID".into() }),
    }]);
}

#[test]
fn anything_else_is_a_push() {
    let push = ready_push();
    assert_eq!(unwrap_envelope(push.clone()).unwrap(), vec![Inbound::Push(push)]);
}

#[test]
fn container_preserves_order() {
    let push = ready_push();
    let payload = encode_container(&[
        push.clone(),
        encode_result(Token(2), &[9, 9, 9, 9]),
        encode_result(Token(1), &[8, 8, 8, 8]),
    ]);
    let items = unwrap_envelope(payload).unwrap();
    assert_eq!(items, vec![
        Inbound::Push(push),
        Inbound::Result { token: Token(2), body: Ok(vec![9, 9, 9, 9]) },
        Inbound::Result { token: Token(1), body: Ok(vec![8, 8, 8, 8]) },
    ]);
}

#[test]
fn gzip_is_inflated_at_top_level_and_inside_results() {
    let push = ready_push();
    let items = unwrap_envelope(encode_gzip(&push).unwrap()).unwrap();
    assert_eq!(items, vec![Inbound::Push(push.clone())]);

    let items = unwrap_envelope(encode_result(Token(3), &encode_gzip(&push).unwrap())).unwrap();
    assert_eq!(items, vec![Inbound::Result { token: Token(3), body: Ok(push) }]);
}

#[test]
fn truncated_headers_are_errors() {
    assert!(matches!(unwrap_envelope(vec![1, 2]), Err(envelope::Error::TooShort { len: 2 })));

    let mut result = encode_result(Token(1), &[]);
    result.truncate(8);
    assert!(matches!(unwrap_envelope(result), Err(envelope::Error::Malformed(_))));

    let mut container = encode_container(&[ready_push()]);
    container.truncate(container.len() - 2);
    assert!(matches!(unwrap_envelope(container), Err(envelope::Error::Malformed(_))));
}

#[test]
fn bad_bodies_stay_with_their_token() {
    let push = ready_push();
    // gzip_packed holding bytes that are neither gzip nor zlib.
    let mut garbage = envelope::ID_GZIP_PACKED.to_le_bytes().to_vec();
    garbage.extend_from_slice(&[4, 1, 2, 3, 4, 0, 0, 0]);

    let items = unwrap_envelope(encode_container(&[
        push.clone(),
        garbage.clone(),
        encode_result(Token(6), &garbage),
        encode_result(Token(2), &[9, 9, 9, 9]),
    ]))
    .unwrap();

    assert_eq!(items.len(), 3);
    assert_eq!(items[0], Inbound::Push(push));
    assert!(matches!(&items[1], Inbound::Undecodable { token: Token(6), .. }));
    assert_eq!(items[2], Inbound::Result { token: Token(2), body: Ok(vec![9, 9, 9, 9]) });
}

#[test]
fn nesting_is_bounded() {
    let mut payload = ready_push();
    for _ in 0..10 {
        payload = encode_container(&[payload]);
    }
    assert!(matches!(unwrap_envelope(payload), Err(envelope::Error::TooDeep)));
}

// ── Framing ───────────────────────────────────────────────────────────────────

#[test]
fn frames_survive_byte_by_byte_delivery() {
    let mut wire = encode_frame(b"first");
    wire.extend(encode_frame(b""));
    wire.extend(encode_frame(b"third frame"));

    let mut dec = FrameDecoder::new();
    let mut frames = Vec::new();
    for b in wire {
        dec.extend(&[b]);
        while let Some(f) = dec.next_frame().unwrap() {
            frames.push(f);
        }
    }
    assert_eq!(frames, vec![b"first".to_vec(), Vec::new(), b"third frame".to_vec()]);
    assert_eq!(dec.buffered(), 0);
}

#[test]
fn accepting_decoder_skips_init_marker() {
    let mut dec = FrameDecoder::accepting();
    dec.extend(&INIT);
    dec.extend(&encode_frame(&[7, 7, 7, 7]));
    assert_eq!(dec.next_frame().unwrap(), Some(vec![7, 7, 7, 7]));
}

#[test]
fn oversized_frame_is_rejected() {
    let mut dec = FrameDecoder::new();
    dec.extend(&((MAX_FRAME_LEN + 1) as u32).to_le_bytes());
    assert_eq!(dec.next_frame(), Err(FrameError::TooLarge { len: MAX_FRAME_LEN + 1 }));
}
