use chrono::{TimeDelta, TimeZone, Utc};
use myspoti::{
    error::Error,
    types::{TokenGrant, TokenRecord, parse_scopes},
};

fn grant(expires_in: i64) -> TokenGrant {
    TokenGrant {
        access_token: "x".into(),
        token_type: Some("Bearer".into()),
        scope: Some("user-top-read user-read-recently-played".into()),
        expires_in,
        refresh_token: None,
    }
}

#[test]
fn test_from_grant_stamps_expiry() {
    let issued_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let record = TokenRecord::from_grant(grant(3600), issued_at).unwrap();

    assert_eq!(record.expires_at, issued_at + TimeDelta::hours(1));
    assert_eq!(record.refresh_token, "");
    assert_eq!(
        record.scopes,
        parse_scopes("user-read-recently-played user-top-read")
    );
}

#[test]
fn test_from_grant_rejects_out_of_range_lifetime() {
    let issued_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    for expires_in in [i64::MAX, i64::MIN] {
        let err = TokenRecord::from_grant(grant(expires_in), issued_at).unwrap_err();
        assert!(matches!(err, Error::AuthExchange { status: None, .. }));
    }
}

#[test]
fn test_is_valid_at_with_huge_margin() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let record = TokenRecord::from_grant(grant(3600), now).unwrap();

    assert!(record.is_valid_at(now, TimeDelta::seconds(60)));
    assert!(!record.is_valid_at(now, TimeDelta::seconds(3600)));
    assert!(!record.is_valid_at(now, TimeDelta::MAX));
}
