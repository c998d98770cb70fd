use telecore_tl::deserialize::Error;
use telecore_tl::{enums, functions, types, Deserializable, Identifiable, Serializable};

// ── Primitives ────────────────────────────────────────────────────────────────

#[test]
fn bool_uses_boxed_constructors() {
    assert_eq!(true.to_bytes(), 0x997275b5u32.to_le_bytes());
    assert_eq!(false.to_bytes(), 0xbc799737u32.to_le_bytes());
    assert_eq!(
        bool::from_bytes(&0xdeadbeefu32.to_le_bytes()),
        Err(Error::UnexpectedConstructor { id: 0xdeadbeef }),
    );
}

#[test]
fn strings_are_padded_to_four_bytes() {
    for len in [0usize, 1, 2, 3, 4, 253, 254, 300] {
        let s = "x".repeat(len);
        let bytes = s.to_bytes();
        assert_eq!(bytes.len() % 4, 0, "len {len} must be 4-byte aligned");
        assert_eq!(String::from_bytes(&bytes).unwrap(), s);
    }
}

#[test]
fn long_string_uses_four_byte_header() {
    let bytes = "y".repeat(254).to_bytes();
    assert_eq!(&bytes[..4], &[0xfe, 254, 0, 0]);
}

#[test]
fn invalid_utf8_is_reported() {
    let bytes = vec![0xffu8, 0xfe, 0xfd].to_bytes();
    assert_eq!(String::from_bytes(&bytes), Err(Error::InvalidUtf8));
}

#[test]
fn truncated_input_is_eof() {
    let bytes = "hello".to_string().to_bytes();
    assert_eq!(String::from_bytes(&bytes[..3]), Err(Error::UnexpectedEof));
    assert_eq!(i64::from_bytes(&[1, 2, 3]), Err(Error::UnexpectedEof));
}

#[test]
fn vector_count_larger_than_buffer_is_rejected() {
    let mut bytes = Vec::new();
    0x1cb5c415u32.serialize(&mut bytes);
    i32::MAX.serialize(&mut bytes);
    assert_eq!(Vec::<i64>::from_bytes(&bytes), Err(Error::UnexpectedEof));
}

// ── Flags ─────────────────────────────────────────────────────────────────────

fn sms_info(next: Option<enums::AuthenticationCodeType>) -> types::AuthenticationCodeInfo {
    types::AuthenticationCodeInfo {
        phone_number: "+15551234567".into(),
        r#type:       types::AuthenticationCodeTypeSms { length: 5 }.into(),
        next_type:    next,
        timeout:      60,
    }
}

#[test]
fn absent_optional_field_clears_flag_bit() {
    let bytes = sms_info(None).to_bytes();
    assert_eq!(u32::from_le_bytes(bytes[..4].try_into().unwrap()), 0);
    assert_eq!(types::AuthenticationCodeInfo::from_bytes(&bytes).unwrap(), sms_info(None));
}

#[test]
fn present_optional_field_sets_flag_bit() {
    let info = sms_info(Some(types::AuthenticationCodeTypeCall { length: 5 }.into()));
    let bytes = info.to_bytes();
    assert_eq!(u32::from_le_bytes(bytes[..4].try_into().unwrap()), 1);
    assert_eq!(types::AuthenticationCodeInfo::from_bytes(&bytes).unwrap(), info);
}

#[test]
fn true_flags_carry_no_payload() {
    let with = types::AuthorizationStateWaitPassword {
        has_recovery_email_address: true,
        password_hint:              String::new(),
    };
    let without = types::AuthorizationStateWaitPassword::default();
    assert_eq!(with.to_bytes().len(), without.to_bytes().len());
    assert!(types::AuthorizationStateWaitPassword::from_bytes(&with.to_bytes())
        .unwrap()
        .has_recovery_email_address);
}

#[test]
fn message_edit_date_uses_second_flag_bit() {
    let msg = types::Message {
        is_outgoing: false,
        id:          7,
        chat_id:     42,
        text:        "hi".into(),
        edit_date:   Some(1_700_000_000),
        ..Default::default()
    };
    let bytes = msg.to_bytes();
    assert_eq!(u32::from_le_bytes(bytes[..4].try_into().unwrap()), 0b10);
    assert_eq!(types::Message::from_bytes(&bytes).unwrap(), msg);
}

// ── Boxed enums ───────────────────────────────────────────────────────────────

#[test]
fn boxed_value_starts_with_constructor_id() {
    let state: enums::AuthorizationState = types::AuthorizationStateReady {}.into();
    assert_eq!(state.to_bytes(), types::AuthorizationStateReady::CONSTRUCTOR_ID.to_le_bytes());
    assert_eq!(enums::AuthorizationState::from_bytes(&state.to_bytes()).unwrap(), state);
}

#[test]
fn unknown_boxed_constructor_is_reported() {
    let bytes = 0x12345678u32.to_le_bytes();
    assert_eq!(
        enums::Update::from_bytes(&bytes),
        Err(Error::UnexpectedConstructor { id: 0x12345678 }),
    );
    assert!(!enums::Update::CONSTRUCTOR_IDS.contains(&0x12345678));
}

#[test]
fn nested_update_decodes() {
    let update: enums::Update = types::UpdateDeleteMessages {
        chat_id:      42,
        message_ids:  vec![1, 2, 3],
        is_permanent: true,
    }
    .into();
    let decoded = enums::Update::from_bytes(&update.to_bytes()).unwrap();
    assert_eq!(decoded, update);
}

// ── Functions ─────────────────────────────────────────────────────────────────

#[test]
fn function_writes_id_then_fields() {
    let req = functions::CheckAuthenticationCode { code: "12345".into() };
    let bytes = req.to_bytes();
    assert_eq!(&bytes[..4], &functions::CheckAuthenticationCode::CONSTRUCTOR_ID.to_le_bytes());
    assert_eq!(String::from_bytes(&bytes[4..]).unwrap(), "12345");
}

#[test]
fn invoke_with_token_wraps_query() {
    let call = functions::InvokeWithToken { token: 9, query: functions::GetMe {} };
    let bytes = call.to_bytes();
    assert_eq!(bytes.len(), 4 + 8 + 4);
    assert_eq!(&bytes[4..12], &9i64.to_le_bytes());
    assert_eq!(&bytes[12..], &functions::GetMe::CONSTRUCTOR_ID.to_le_bytes());
}
