use strict_der::der;
use strict_der::errors::ErrorCode;

fn nested_sequences(levels: usize) -> Vec<u8> {
    let mut data = vec![0x30, 0x00];
    for _ in 1..levels {
        let inner_len = data.len();
        assert!(inner_len < 128, "test helper only builds short-form lengths");
        let mut wrapped = vec![0x30, inner_len as u8];
        wrapped.extend_from_slice(&data);
        data = wrapped;
    }
    data
}

#[test]
fn test_nesting_at_limit_parses() {
    let data = nested_sequences(50);
    assert!(der::parse(&data).is_ok());
}

#[test]
fn test_nesting_beyond_limit_rejected() {
    let data = nested_sequences(51);
    let err = der::parse(&data).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidASN1Object);
    assert!(format!("{}", err).contains("Excessive stack depth"));
}

#[test]
fn test_nesting_far_beyond_limit_rejected() {
    let data = nested_sequences(60);
    let err = der::parse(&data).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidASN1Object);
}
