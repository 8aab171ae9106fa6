use std::fs;

use alloy_json_abi::JsonAbi;
use alloy_primitives::address;
use raffle_deploy::{
    bindings::IRaffle,
    deploy::front_end::{update_abi, update_contract_address, AddressRegistry},
    Error,
};
use serde_json::json;

fn read_registry(path: &std::path::Path) -> AddressRegistry {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// Test a new chain id gets its own list
#[test]
fn test_new_chain_is_initialized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contractAddress.json");
    fs::write(&path, r#"{"4":["0x6168499c0cFfCaCD319c818142124B7A15E857ab"]}"#).unwrap();

    let raffle = address!("5fbdb2315678afecb367f032d93f642f64180aa3");
    update_contract_address(&path, 31337, raffle).unwrap();

    let registry = read_registry(&path);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry["31337"], json!(["0x5FbDB2315678afecb367f032d93F642f64180aa3"]));
    assert_eq!(registry["4"], json!(["0x6168499c0cFfCaCD319c818142124B7A15E857ab"]));
}

// Test addresses are appended once per chain
#[test]
fn test_addresses_are_appended_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contractAddress.json");
    fs::write(&path, r#"{"31337":["0x5fbdb2315678afecb367f032d93f642f64180aa3"]}"#).unwrap();

    // Same address with another casing
    update_contract_address(&path, 31337, address!("5fbdb2315678afecb367f032d93f642f64180aa3")).unwrap();
    assert_eq!(read_registry(&path)["31337"].as_array().unwrap().len(), 1);

    update_contract_address(&path, 31337, address!("e7f1725e7734ce288f8367e1bb143e90bb3f0512")).unwrap();
    let registry = read_registry(&path);
    assert_eq!(
        registry["31337"],
        json!([
            "0x5fbdb2315678afecb367f032d93f642f64180aa3",
            "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512",
        ])
    );
}

// Test the address file is rewritten compactly
#[test]
fn test_address_file_is_compact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contractAddress.json");
    fs::write(&path, "{\n}\n").unwrap();

    update_contract_address(&path, 31337, address!("5fbdb2315678afecb367f032d93f642f64180aa3")).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        r#"{"31337":["0x5FbDB2315678afecb367f032d93F642f64180aa3"]}"#
    );
}

// Test chain ids keep the order they have in the file
#[test]
fn test_registry_keeps_key_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contractAddress.json");
    fs::write(
        &path,
        r#"{"5":["0x6168499c0cFfCaCD319c818142124B7A15E857ab"],"31337":[],"4":["0x6168499c0cFfCaCD319c818142124B7A15E857ab"]}"#,
    )
    .unwrap();

    update_contract_address(&path, 31337, address!("5fbdb2315678afecb367f032d93f642f64180aa3")).unwrap();
    update_contract_address(&path, 1337, address!("5fbdb2315678afecb367f032d93f642f64180aa3")).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        concat!(
            r#"{"5":["0x6168499c0cFfCaCD319c818142124B7A15E857ab"],"#,
            r#""31337":["0x5FbDB2315678afecb367f032d93F642f64180aa3"],"#,
            r#""4":["0x6168499c0cFfCaCD319c818142124B7A15E857ab"],"#,
            r#""1337":["0x5FbDB2315678afecb367f032d93F642f64180aa3"]}"#,
        )
    );
}

// Test an entry that is not a list of addresses is an error
#[test]
fn test_malformed_chain_entry_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contractAddress.json");
    fs::write(&path, r#"{"31337":"0x5FbDB2315678afecb367f032d93F642f64180aa3"}"#).unwrap();

    let err = update_contract_address(&path, 31337, address!("5fbdb2315678afecb367f032d93f642f64180aa3"))
        .unwrap_err();
    assert!(matches!(err, Error::Json { .. }));
}

// Test a missing address file is an error
#[test]
fn test_missing_address_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contractAddress.json");

    let err = update_contract_address(&path, 31337, address!("5fbdb2315678afecb367f032d93f642f64180aa3"))
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert!(!path.exists());
}

// Test a malformed address file is an error and is left alone
#[test]
fn test_malformed_address_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contractAddress.json");
    fs::write(&path, "not json").unwrap();

    let err = update_contract_address(&path, 31337, address!("5fbdb2315678afecb367f032d93f642f64180aa3"))
        .unwrap_err();
    assert!(matches!(err, Error::Json { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), "not json");
}

// Test the ABI file is overwritten with the contract interface
#[test]
fn test_abi_file_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("abi.json");
    fs::write(&path, "stale").unwrap();

    update_abi(&path, &IRaffle::abi::contract()).unwrap();

    let abi: JsonAbi = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(abi, IRaffle::abi::contract());
    assert!(abi.function("getRecentWinner").is_some());
}
