use std::sync::Arc;

use anyhow::Result;
use bankroll::clock::FixedClock;
use bankroll::config::ResolvedConfig;
use bankroll::pipeline::{BankOutcome, Pipeline, PipelineContext};
use bankroll::storage::{JsonFileSnapshotStore, SnapshotStore};
use chrono::NaiveDate;
use tempfile::TempDir;

const CONFIG: &str = r#"
data_dir = "data"

[[banks]]
id = "hdfc-mummyji"
name = "HDFC"
holder_name = "Mummyji"
adapter = { kind = "file" }

[[banks.accounts]]
account_number = "50100000001234"

[[banks]]
id = "pnb-papaji"
name = "PNB"
holder_name = "Papaji"
fd_attribution = "per_account"
adapter = { kind = "file", path = "exports/pnb.json" }

[[banks.accounts]]
account_number = "0123000100009999"

[[banks.accounts]]
account_number = "0123000100008888"
label = "Papaji PNB Current"

[[banks]]
id = "sbi-papaji"
name = "SBI"
holder_name = "Papaji"
adapter = { kind = "file" }
"#;

const HDFC_EXTRACTION: &str = r#"{
  "accounts": [
    {"type": "Savings", "account_number": "XXXXXXXXXX1234", "balance": "₹4,90,793.29"},
    {"type": "Term Deposit", "account_number": "", "fds": [
      {"principal": "1,37,905.18 Cr.", "maturity_date": "11 Jun 2026"}
    ]}
  ]
}"#;

const PNB_EXTRACTION: &str = r#"{
  "accounts": [
    {"type": "Savings", "account_number": "****9999", "balance": 1200,
     "fds": [{"principal": 25000, "maturity_date": "01-02-2026"}]},
    {"type": "Current", "account_number": "****8888", "balance": 300.75}
  ]
}"#;

#[tokio::test]
async fn file_adapters_feed_the_on_disk_snapshot() -> Result<()> {
    let dir = TempDir::new()?;
    let config_path = dir.path().join("bankroll.toml");
    std::fs::write(&config_path, CONFIG)?;

    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(data_dir.join("extractions"))?;
    std::fs::create_dir_all(data_dir.join("exports"))?;
    std::fs::write(data_dir.join("extractions/hdfc-mummyji.json"), HDFC_EXTRACTION)?;
    std::fs::write(data_dir.join("exports/pnb.json"), PNB_EXTRACTION)?;
    // No file for SBI: that bank fails and the run continues.

    let config = ResolvedConfig::load(&config_path)?;
    let date = NaiveDate::from_ymd_opt(2026, 3, 18).unwrap();
    let context = PipelineContext::from_config(&config).with_clock(Arc::new(FixedClock::on(date)));
    let pipeline = Pipeline::new(config.banks.clone(), context);

    let report = pipeline.run(&[]).await?;
    assert_eq!(report.processed().count(), 2);
    assert!(matches!(
        report.outcomes.last(),
        Some(BankOutcome::Failed { bank, .. }) if bank.as_str() == "sbi-papaji"
    ));

    let store = JsonFileSnapshotStore::new(&config.data_dir);
    assert!(store.snapshot_file(date).exists());
    let snapshot = store.get(date).await?.expect("snapshot on disk");

    let hdfc = snapshot.get("50100000001234").expect("hdfc entry");
    assert_eq!(hdfc.balance, 490793);
    assert_eq!(hdfc.fds.len(), 1);
    assert_eq!(hdfc.fds[0].principal, 137905);
    assert_eq!(hdfc.fds[0].maturity_date, "2026-06-11");

    let savings = snapshot.get("0123000100009999").expect("pnb savings");
    assert_eq!(savings.fds.len(), 1);
    assert_eq!(savings.fds[0].maturity_date, "2026-02-01");
    let current = snapshot.get("0123000100008888").expect("pnb current");
    assert_eq!(current.balance, 300);
    assert!(current.fds.is_empty());

    let pnb = report
        .processed()
        .find(|r| r.bank_id.as_str() == "pnb-papaji")
        .expect("pnb report");
    let labels: Vec<&str> = pnb.reconciled.iter().map(|a| a.label.as_str()).collect();
    assert_eq!(labels, vec!["Papaji Savings", "Papaji PNB Current"]);

    let matured = snapshot.matured_fds();
    assert_eq!(matured.len(), 1);
    assert_eq!(matured[0].1.principal, 25000);

    Ok(())
}

#[tokio::test]
async fn file_adapter_never_resolves_the_bank_password() -> Result<()> {
    let dir = TempDir::new()?;
    let config_path = dir.path().join("bankroll.toml");
    std::fs::write(
        &config_path,
        r#"
data_dir = "data"

[[banks]]
id = "hdfc-mummyji"
name = "HDFC"
holder_name = "Mummyji"
username = "mummyji"
password = { env = "BANKROLL_TEST_UNSET_HDFC_PASSWORD" }
adapter = { kind = "file" }

[[banks.accounts]]
account_number = "50100000001234"
"#,
    )?;
    let extractions = dir.path().join("data/extractions");
    std::fs::create_dir_all(&extractions)?;
    std::fs::write(extractions.join("hdfc-mummyji.json"), HDFC_EXTRACTION)?;

    let config = ResolvedConfig::load(&config_path)?;
    let date = NaiveDate::from_ymd_opt(2026, 3, 18).unwrap();
    let context = PipelineContext::from_config(&config).with_clock(Arc::new(FixedClock::on(date)));
    let report = Pipeline::new(config.banks.clone(), context).run(&[]).await?;

    assert_eq!(report.failed().count(), 0);
    let snapshot = JsonFileSnapshotStore::new(&config.data_dir)
        .get(date)
        .await?
        .expect("snapshot on disk");
    assert_eq!(snapshot.get("50100000001234").map(|a| a.balance), Some(490793));
    Ok(())
}
