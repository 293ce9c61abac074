//! Integration tests for the linkage engine over the `SQLite` identity store.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::too_many_lines,
    clippy::doc_markdown
)]

use aadhaar_linkage::config::{LinkageConfig, PseudonymizerAlgorithm};
use aadhaar_linkage::models::{ResponseStatus, SOURCE_NOT_AVAILABLE};
use aadhaar_linkage::{
    IdentityStore, LinkageGateway, LinkageKey, LinkageRequest, LinkageService, Pseudonymizer,
    Sha256Pseudonymizer, SourceType, SqliteIdentityStore,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::thread;

fn gateway(path: &Path) -> LinkageGateway<SqliteIdentityStore, Sha256Pseudonymizer> {
    let store = SqliteIdentityStore::new(path).unwrap();
    LinkageGateway::new(LinkageService::new(store, Sha256Pseudonymizer))
}

fn call(gw: &LinkageGateway<SqliteIdentityStore, Sha256Pseudonymizer>, body: &str) -> Value {
    serde_json::from_str(&gw.handle_json(body).unwrap()).unwrap()
}

fn str_field<'a>(value: &'a Value, field: &str) -> &'a str {
    value["data"][field].as_str().unwrap()
}

#[test]
fn test_worked_example_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("identities.sqlite");

    let (k1, k2) = {
        let gw = gateway(&db);

        let r1 = call(
            &gw,
            r#"{"action":"INSERT","source":"Aadhaar","data":{"forename":"Asha","dob":"1990-01-01","aadhaar_number":"1234"}}"#,
        );
        assert_eq!(r1["status"], "SUCCESS");
        assert_eq!(r1["message"], "Record inserted successfully");
        assert_eq!(str_field(&r1, "aadhaarCounter"), "1");
        assert_eq!(str_field(&r1, "panCounter"), SOURCE_NOT_AVAILABLE);
        let k1 = str_field(&r1, "aadhaarLinkageKey").to_string();

        let r2 = call(
            &gw,
            r#"{"action":"INSERT","source":"PAN","data":{"forename":"asha ","dob":"1990-01-01","pan_number":"5678"}}"#,
        );
        assert_eq!(r2["message"], "Record updated with new source");
        assert_eq!(str_field(&r2, "aadhaarLinkageKey"), k1);
        assert_eq!(str_field(&r2, "panCounter"), "1");

        let r3 = call(
            &gw,
            &format!(
                r#"{{"action":"UPDATE","source":"PAN","priorKey":"{k1}","data":{{"forename":"Asha","dob":"1990-01-01","pan_number":"9999"}}}}"#
            ),
        );
        assert_eq!(r3["status"], "SUCCESS");
        assert_eq!(r3["message"], "Record forked; previous record retained");
        let k2 = str_field(&r3, "newKey").to_string();
        assert_ne!(k1, k2);

        (k1, k2)
    };

    let gw = gateway(&db);

    let s2 = call(
        &gw,
        &format!(r#"{{"action":"SEARCH","source":"PAN","priorKey":"{k2}"}}"#),
    );
    assert_eq!(s2["message"], "Record found");
    assert_eq!(str_field(&s2, "panCounter"), "2");
    assert_eq!(str_field(&s2, "aadhaarCounter"), "1");

    let s1 = call(
        &gw,
        &format!(r#"{{"action":"SEARCH","source":"PAN","priorKey":"{k1}"}}"#),
    );
    assert_eq!(str_field(&s1, "panCounter"), SOURCE_NOT_AVAILABLE);
    assert_eq!(str_field(&s1, "aadhaarCounter"), "1");

    let store = gw.service().store();
    assert_eq!(store.count().unwrap(), 2);
    let forked = store.get(&LinkageKey::new(&k2)).unwrap().unwrap();
    assert_eq!(forked.forked_from, Some(LinkageKey::new(&k1)));
}

#[test]
fn test_only_masked_values_are_stored() {
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(&dir.path().join("ids.sqlite"));

    let response = gw
        .handle(
            &LinkageRequest::new("INSERT", "Voter")
                .with_attribute("forename", " Asha")
                .with_attribute("lastname", "Rao")
                .with_attribute("dob", "1990-01-01")
                .with_attribute("gender", "F")
                .with_attribute("voter_id", "XYZ123"),
        )
        .unwrap();
    let key = LinkageKey::new(response.data_str("aadhaarLinkageKey").unwrap());

    let record = gw.service().store().get(&key).unwrap().unwrap();
    let p = Sha256Pseudonymizer;
    assert_eq!(record.attributes.forename, Some(p.mask("asha")));
    assert_eq!(record.attributes.lastname, Some(p.mask("RAO")));
    assert_eq!(record.attributes.dob, Some(p.mask("1990-01-01")));
    assert_eq!(record.document(SourceType::Voter), Some(p.mask("xyz123").as_str()));
    assert_eq!(record.gender.as_deref(), Some("F"));
    assert!(record.created_at.is_some_and(|t| t <= chrono::Utc::now()));
}

#[test]
fn test_fork_chain_and_retirement() {
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(&dir.path().join("ids.sqlite"));
    let service = gw.service();

    let person = |dob: &str| -> HashMap<String, String> {
        [("forename", "Ravi"), ("dob", dob)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    };

    let k1 = service
        .insert(SourceType::Driving, Some(&person("1985-05-05")))
        .unwrap()
        .summary
        .key;
    let f1 = service
        .update(&k1, SourceType::Driving, Some(&person("1985-05-06")))
        .unwrap();
    assert!(f1.previous_retired);

    let f2 = service
        .update(&f1.new_key, SourceType::Driving, Some(&person("1985-05-07")))
        .unwrap();
    assert!(f2.previous_retired);

    let store = service.store();
    assert_eq!(store.list_keys().unwrap(), vec![f2.new_key.clone()]);
    let latest = store.get(&f2.new_key).unwrap().unwrap();
    assert_eq!(latest.counter(SourceType::Driving), 3);
    assert_eq!(latest.forked_from.as_ref(), Some(&f1.new_key));

    let removed = call(
        &gw,
        &format!(
            r#"{{"action":"DELETE","source":"Driving","priorKey":"{}"}}"#,
            f2.new_key
        ),
    );
    assert_eq!(removed["message"], "Record removed; no linked sources remain");
    assert_eq!(str_field(&removed, "aadhaarLinkageKey"), f2.new_key.as_str());
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_rejected_requests_leave_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(&dir.path().join("ids.sqlite"));

    let bodies = [
        r#"{"action":"MERGE","source":"PAN"}"#,
        r#"{"action":"INSERT","source":"PAN"}"#,
        r#"{"action":"INSERT","source":"PAN","data":{"forename":"Asha"}}"#,
        r#"{"action":"INSERT","source":"Passport","data":{"forename":"Asha","dob":"1990-01-01"}}"#,
        r#"{"action":"UPDATE","source":"PAN","data":{"forename":"Asha","dob":"1990-01-01"}}"#,
        r#"{"action":"UPDATE","source":"PAN","priorKey":"ghost","data":{"forename":"Asha","dob":"1990-01-01"}}"#,
        r#"{"action":"DELETE","source":"PAN","priorKey":"ghost"}"#,
        r#"{"action":"SEARCH","source":"PAN","priorKey":"  "}"#,
        r#"{"action":"","source":"PAN"}"#,
    ];

    for body in bodies {
        let response = call(&gw, body);
        assert_eq!(response["status"], "ERROR", "{body}");
        assert!(response["data"].is_null(), "{body}");
    }
    assert_eq!(gw.service().store().count().unwrap(), 0);
}

#[test]
fn test_concurrent_inserts_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteIdentityStore::new(dir.path().join("ids.sqlite")).unwrap();
    let service = Arc::new(LinkageService::new(store, Sha256Pseudonymizer));

    let handles: Vec<_> = SourceType::all()
        .iter()
        .copied()
        .cycle()
        .take(12)
        .map(|source| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                let request = LinkageRequest::new("INSERT", source.as_str())
                    .with_attribute("forename", "Meera")
                    .with_attribute("dob", "2000-02-29");
                service.process(&request).unwrap()
            })
        })
        .collect();

    let keys: Vec<String> = handles
        .into_iter()
        .map(|h| {
            let response = h.join().unwrap();
            assert_eq!(response.status, ResponseStatus::Success);
            response.data_str("aadhaarLinkageKey").unwrap().to_string()
        })
        .collect();

    assert!(keys.iter().all(|k| *k == keys[0]));
    let store = service.store();
    assert_eq!(store.count().unwrap(), 1);
    let record = store.get(&LinkageKey::new(&keys[0])).unwrap().unwrap();
    for source in SourceType::all() {
        assert_eq!(record.counter(*source), 1);
    }
}

#[test]
fn test_configured_hmac_service() {
    let dir = tempfile::tempdir().unwrap();
    let config = LinkageConfig::default()
        .with_data_dir(dir.path())
        .with_algorithm(PseudonymizerAlgorithm::Hmac);

    let pseudonymizer = config
        .build_pseudonymizer_with(|name| {
            (name == "LINKAGE_PSEUDONYM_KEY").then(|| "pepper".to_string())
        })
        .unwrap();
    let store = config.open_store().unwrap();
    let gw = LinkageGateway::new(
        LinkageService::new(store, pseudonymizer).with_lease_timeout(config.lease_timeout),
    );

    let response = gw
        .handle(
            &LinkageRequest::new("INSERT", "Aadhaar")
                .with_attribute("forename", "Asha")
                .with_attribute("dob", "1990-01-01"),
        )
        .unwrap();
    assert!(response.is_success());

    let key = LinkageKey::new(response.data_str("aadhaarLinkageKey").unwrap());
    let record = gw.service().store().get(&key).unwrap().unwrap();
    assert_ne!(record.attributes.forename, Some(Sha256Pseudonymizer.mask("asha")));
    assert_eq!(
        record.attributes.forename,
        Some(gw.service().pseudonymizer().mask("ASHA"))
    );
    assert!(config.database_path().exists());
}

#[test]
fn test_process_lines_over_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let gw = gateway(&dir.path().join("ids.sqlite"));

    let input = [
        r#"{"action":"INSERT","source":"PAN","data":{"forename":"Kiran","dob":"1970-07-07"}}"#,
        r#"{"action":"INSERT","source":"PAN","data":{"forename":"Kiran","dob":"1970-07-07"}}"#,
        r#"{"action":"INSERT","source":"Voter","data":{"forename":"Kiran","dob":"1970-07-07"}}"#,
    ]
    .join("\n");
    let mut output = Vec::new();

    let stats = gw.process_lines(input.as_bytes(), &mut output).unwrap();
    assert_eq!(stats.processed, 3);
    assert_eq!(stats.succeeded, 3);

    let responses: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses[1]["message"], "Source already linked; no changes applied");
    assert_eq!(responses[2]["message"], "Record updated with new source");
    assert_eq!(str_field(&responses[2], "panCounter"), "1");
    assert_eq!(str_field(&responses[2], "voterIdCounter"), "1");
}
