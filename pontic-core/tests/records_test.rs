use pontic_core::registry::records::{Records, ResolveError, ServiceUrl};
use std::sync::Arc;

fn url(address: &str) -> ServiceUrl {
    ServiceUrl::parse(address).unwrap()
}

#[test]
fn set_then_get_returns_the_exact_address() {
    let records = Records::new();
    assert!(records.set_record("a", "v1", url("http://a.v1")));
    assert_eq!(records.get_record("a", "v1").unwrap(), url("http://a.v1"));
}

#[test]
fn blank_version_resolves_a_unique_service() {
    let records = Records::new();
    records.set_record("b", "v1", url("http://b.v1"));
    assert_eq!(records.get_record("b", "").unwrap(), url("http://b.v1"));
}

#[test]
fn blank_version_with_multiple_versions_must_be_disambiguated() {
    let records = Records::new();
    records.set_record("a", "v1", url("http://a.v1"));
    records.set_record("a", "v2", url("http://a.v2"));
    assert_eq!(
        records.get_record("a", "").unwrap_err(),
        ResolveError::VersionNotSpecified {
            service: "a".to_owned()
        }
    );
}

#[test]
fn blank_version_with_multiple_addresses_is_undecidable() {
    let records = Records::new();
    records.set_record("a", "v1", url("http://a.one"));
    records.set_record("a", "v1", url("http://a.two"));
    assert_eq!(
        records.get_record("a", "").unwrap_err(),
        ResolveError::VersionUndecidable {
            service: "a".to_owned()
        }
    );
}

#[test]
fn unknown_service_is_unresolvable() {
    let records = Records::new();
    assert_eq!(
        records.get_record("ghost", "").unwrap_err(),
        ResolveError::ServiceUnresolvable {
            service: "ghost".to_owned(),
            version: None,
        }
    );
}

#[test]
fn unknown_version_of_a_known_service_is_unresolvable() {
    let records = Records::new();
    records.set_record("a", "v1", url("http://a.v1"));
    assert_eq!(
        records.get_record("a", "v9").unwrap_err(),
        ResolveError::ServiceUnresolvable {
            service: "a".to_owned(),
            version: Some("v9".to_owned()),
        }
    );
}

#[test]
fn explicit_version_with_multiple_addresses_is_undecidable() {
    let records = Records::new();
    records.set_record("a", "v1", url("http://a.one"));
    records.set_record("a", "v1", url("http://a.two"));
    assert_eq!(
        records.get_record("a", "v1").unwrap_err(),
        ResolveError::VersionUndecidable {
            service: "a".to_owned()
        }
    );
}

#[test]
fn duplicate_registrations_accumulate() {
    // set_record never deduplicates, so a repeated registration makes the
    // version undecidable until the stale entry is removed.
    let records = Records::new();
    records.set_record("a", "v1", url("http://a.v1"));
    records.set_record("a", "v1", url("http://a.v1"));
    assert_eq!(
        records.get_record("a", "v1").unwrap_err(),
        ResolveError::VersionUndecidable {
            service: "a".to_owned()
        }
    );
    records.remove_record("a", "v1", &url("http://a.v1"));
    // Removal is by value and removes both copies.
    assert!(!records.record_exists("a", "v1"));
}

#[test]
fn remove_is_idempotent_and_prunes_empty_entries() {
    let records = Records::new();
    records.set_record("a", "v1", url("http://a.v1"));
    records.set_record("a", "v2", url("http://a.v2"));

    // Removing an absent address is a no-op.
    records.remove_record("a", "v1", &url("http://elsewhere"));
    assert!(records.record_exists("a", "v1"));
    records.remove_record("ghost", "v1", &url("http://a.v1"));
    records.remove_record("a", "v9", &url("http://a.v1"));

    // Removing the last address prunes the version.
    records.remove_record("a", "v1", &url("http://a.v1"));
    assert!(!records.record_exists("a", "v1"));
    assert!(records.is_service_unique("a"));

    // Removing the last version prunes the service entirely.
    records.remove_record("a", "v2", &url("http://a.v2"));
    assert_eq!(
        records.get_record("a", "v2").unwrap_err(),
        ResolveError::ServiceUnresolvable {
            service: "a".to_owned(),
            version: None,
        }
    );
}

#[test]
fn is_service_unique_tracks_the_version_count() {
    let records = Records::new();
    assert!(!records.is_service_unique("a"));
    records.set_record("a", "v1", url("http://a.v1"));
    assert!(records.is_service_unique("a"));
    records.set_record("a", "v2", url("http://a.v2"));
    assert!(!records.is_service_unique("a"));
    records.remove_record("a", "v2", &url("http://a.v2"));
    assert!(records.is_service_unique("a"));
}

#[test]
fn clear_records_drops_everything() {
    let records = Records::new();
    records.set_record("a", "v1", url("http://a.v1"));
    records.set_record("b", "v1", url("http://b.v1"));
    records.clear_records();
    assert!(!records.record_exists("a", "v1"));
    assert!(!records.record_exists("b", "v1"));
}

#[test]
fn records_are_shareable_across_threads() {
    let records = Arc::new(Records::new());
    records.set_record("a", "v1", url("http://a.v1"));

    let writer = {
        let records = Arc::clone(&records);
        std::thread::spawn(move || {
            for i in 0..100 {
                records.set_record("b", &format!("v{i}"), url("http://b"));
            }
        })
    };
    for _ in 0..100 {
        assert_eq!(records.get_record("a", "v1").unwrap(), url("http://a.v1"));
    }
    writer.join().unwrap();
    assert!(records.record_exists("b", "v99"));
}
