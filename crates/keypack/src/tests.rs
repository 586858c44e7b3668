use crate::*;
use rand::Rng;

fn sample() -> Result<RpcMsg> {
    let mut msg = RpcMsg::new("memory.Read");
    msg.set_word("0", 0x10)?;
    msg.set_string("1", "gem")?;
    msg.set_word_array("2", &[1, 2, 3])?;
    msg.set_string_array("3", &["a".to_string(), "".to_string()])?;
    Ok(msg)
}

// ============================================================================
//  KEYED ACCESS
// ============================================================================

#[test]
fn test_get_each_kind() -> Result<()> {
    let msg = sample()?;
    assert_eq!(msg.method(), "memory.Read");
    assert_eq!(msg.get_word("0")?, 0x10);
    assert_eq!(msg.get_string("1")?, "gem");
    assert_eq!(msg.get_word_array("2")?, &[1, 2, 3]);
    assert_eq!(msg.get_string_array("3")?, &["a".to_string(), "".to_string()]);
    assert_eq!(msg.len(), 4);
    Ok(())
}

#[test]
fn test_missing_key_is_bad_key() {
    let msg = RpcMsg::new("m");
    assert_eq!(msg.get_word("0"), Err(Error::BadKey("0".into())));
    assert!(!msg.key_exists("0"));
}

#[test]
fn test_wrong_kind_is_type_mismatch() -> Result<()> {
    let msg = sample()?;
    match msg.get_string("0") {
        Err(Error::TypeMismatch { key, expected, found }) => {
            assert_eq!(key, "0");
            assert_eq!(expected, Kind::String);
            assert_eq!(found, Kind::Word);
        }
        other => panic!("expected TypeMismatch, got {:?}", other),
    }
    assert!(msg.get_word_array("3").is_err());
    Ok(())
}

#[test]
fn test_overwrite_replaces_value() -> Result<()> {
    let mut msg = RpcMsg::new("m");
    msg.set_word("k", 1)?;
    msg.set_string("k", "now a string")?;
    assert_eq!(msg.kind_of("k"), Some(Kind::String));
    assert_eq!(msg.len(), 1);
    assert_eq!(msg.encoded_len(), msg.encode()?.len());
    Ok(())
}

#[test]
fn test_error_messages() {
    assert_eq!(Error::BadKey("3".into()).to_string(), "bad RPC key 3");
    assert!(Error::Corrupt("x".into()).to_string().starts_with("corrupt RPC message"));
    assert!(Error::BufferTooSmall { needed: 10, limit: 5 }.to_string().starts_with("RPC buffer too small"));
}

// ============================================================================
//  LIMITS
// ============================================================================

#[test]
fn test_limit_refuses_write_and_keeps_message() -> Result<()> {
    let mut msg = RpcMsg::with_limit("m", 32);
    msg.set_word("0", 7)?;
    let before = msg.clone();

    let res = msg.set_string("error", "x".repeat(64));
    assert!(matches!(res, Err(Error::BufferTooSmall { limit: 32, .. })));
    assert_eq!(msg, before);
    assert_eq!(msg.encoded_len(), before.encoded_len());
    Ok(())
}

#[test]
fn test_clear_releases_space() -> Result<()> {
    let mut msg = RpcMsg::with_limit("m", 64);
    msg.set_word_array("0", &[0; 8])?;
    assert!(msg.set_word_array("1", &[0; 8]).is_err());
    msg.clear();
    assert!(msg.is_empty());
    msg.set_word_array("1", &[0; 8])?;
    Ok(())
}

// ============================================================================
//  CODEC
// ============================================================================

#[test]
fn test_encode_decode_message() -> Result<()> {
    let msg = sample()?;
    let bytes = msg.encode()?;
    assert_eq!(bytes.len(), msg.encoded_len());

    let decoded = RpcMsg::decode(&bytes)?;
    assert_eq!(decoded, msg);
    Ok(())
}

#[test]
fn test_empty_values_survive() -> Result<()> {
    let mut msg = RpcMsg::new("");
    msg.set_word("0", 0)?;
    msg.set_string("1", "")?;
    msg.set_word_array("2", &[])?;
    msg.set_string_array("3", &[])?;

    let decoded = RpcMsg::decode(&msg.encode()?)?;
    assert_eq!(decoded.get_word("0")?, 0);
    assert_eq!(decoded.get_string("1")?, "");
    assert!(decoded.get_word_array("2")?.is_empty());
    assert!(decoded.get_string_array("3")?.is_empty());
    Ok(())
}

#[test]
fn test_wire_layout_of_word_entry() -> Result<()> {
    let mut msg = RpcMsg::new("m");
    msg.set_word("0", 0x0403_0201)?;
    let bytes = msg.encode()?;
    assert_eq!(bytes, vec![
        0x10, 1, 0, 0, 0, b'm',
        1, 0, 0, 0,
        0x10, 1, 0, 0, 0, b'0',
        0x05, 0x01, 0x02, 0x03, 0x04,
    ]);
    Ok(())
}

#[test]
fn test_decode_truncated() -> Result<()> {
    let bytes = sample()?.encode()?;
    for cut in 0..bytes.len() {
        assert!(RpcMsg::decode(&bytes[..cut]).is_err(), "prefix of {} bytes decoded", cut);
    }
    Ok(())
}

#[test]
fn test_decode_trailing_bytes() -> Result<()> {
    let mut bytes = sample()?.encode()?;
    bytes.push(0);
    assert!(matches!(RpcMsg::decode(&bytes), Err(Error::Corrupt(_))));
    Ok(())
}

#[test]
fn test_decode_invalid_tag() {
    let bytes = [0x99, 0, 0, 0, 0];
    assert_eq!(RpcMsg::decode(&bytes), Err(Error::InvalidTag(0x99)));
}

#[test]
fn test_decode_duplicate_key() {
    let mut bytes = vec![0x10, 0, 0, 0, 0, 2, 0, 0, 0];
    for _ in 0..2 {
        bytes.extend_from_slice(&[0x10, 1, 0, 0, 0, b'0', 0x05, 1, 0, 0, 0]);
    }
    assert!(matches!(RpcMsg::decode(&bytes), Err(Error::Corrupt(_))));
}

#[test]
fn test_decode_invalid_utf8() {
    let bytes = [0x10, 1, 0, 0, 0, 0xFF, 0, 0, 0, 0];
    assert_eq!(RpcMsg::decode(&bytes), Err(Error::InvalidUtf8));
}

#[test]
fn test_decode_huge_count_does_not_allocate() {
    // claims u32::MAX entries in a 9-byte buffer
    let bytes = [0x10, 0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF];
    assert_eq!(RpcMsg::decode(&bytes), Err(Error::UnexpectedEnd));
}

#[test]
fn test_decode_random_garbage_never_panics() {
    let mut rng = rand::thread_rng();
    for _ in 0..2000 {
        let len = rng.gen_range(0..64);
        let bytes: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();
        let _ = RpcMsg::decode(&bytes);
    }
}

#[test]
fn test_random_messages_roundtrip() -> Result<()> {
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let mut msg = RpcMsg::new("fuzz");
        for key in 0..rng.gen_range(0..8u32) {
            let value = match rng.gen_range(0..4) {
                0 => Value::Word(rng.r#gen()),
                1 => Value::Str("s".repeat(rng.gen_range(0..5))),
                2 => Value::WordArray((0..rng.gen_range(0..5)).map(|_| rng.r#gen()).collect()),
                _ => Value::StrArray((0..rng.gen_range(0..3)).map(|i| i.to_string()).collect()),
            };
            msg.set(key.to_string(), value)?;
        }
        assert_eq!(RpcMsg::decode(&msg.encode()?)?, msg);
    }
    Ok(())
}
