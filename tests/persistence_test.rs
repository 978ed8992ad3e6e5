#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("payments_db");
    let evidence = dir.path().join("evidence.txt");
    common::write_evidence(&evidence).unwrap();
    let evidence = evidence.to_string_lossy().into_owned();

    // First run: open the period and verify terms.
    let commands1 = dir.path().join("run1.csv");
    common::write_commands(
        &commands1,
        &[
            "open,1,10,2026,3,20,30",
            "verify,1,,,,,,3000,USD,25000,percentage,100,,160",
        ],
    )
    .unwrap();

    let output1 = Command::new(cargo_bin!("partnerpay"))
        .arg(&commands1)
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("1,10,2026-03,verified,percentage,75000000,,,"));

    // Second run against the same database: the verified terms were
    // recovered, so the calculation can proceed to payment.
    let rows = vec![
        format!("attach,1,,,,,,,,,,,,,,,,,ACCEPTANCE,partner,{evidence},alice"),
        "calculate,1,,,,,,,,,,,,,220".to_string(),
        "approve,1".to_string(),
        format!("attach,1,,,,,,,,,,,,,,,,,INVOICE,accountant,{evidence},bob"),
        format!("attach,1,,,,,,,,,,,,,,,,,RECEIPT,accountant,{evidence},bob"),
        "pay,1,,,,,,,,,,,,,,,110156250,2026-03-25".to_string(),
    ];
    let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let commands2 = dir.path().join("run2.csv");
    common::write_commands(&commands2, &row_refs).unwrap();

    let output2 = Command::new(cargo_bin!("partnerpay"))
        .arg(&commands2)
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(
        predicate::str::contains(
            "1,10,2026-03,paid,percentage,75000000,110156250,110156250,1.46875"
        )
        .eval(&stdout2)
    );
}
