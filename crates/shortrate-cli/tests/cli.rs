//! End-to-end tests of the `shortrate` binary.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn shortrate() -> Command {
    let mut cmd = Command::cargo_bin("shortrate").unwrap();
    cmd.env_remove("SHORTRATE_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn tree_table_shows_root_rate() {
    shortrate()
        .args(["tree", "--rate", "5", "--volatility", "10", "--steps", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rate Tree"))
        .stdout(predicate::str::contains("5.0000%"));
}

#[test]
fn tree_json_has_every_column() {
    let output = shortrate()
        .args(["tree", "--steps", "4", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rates = json["rates"].as_array().unwrap();
    assert_eq!(rates.len(), 4);
    assert_eq!(rates[3].as_array().unwrap().len(), 4);
    assert_eq!(json["model"], "Binomial (lognormal)");
}

#[test]
fn flat_tree_zcb_minimal() {
    shortrate()
        .args([
            "price", "zcb", "--maturity", "2", "--model", "factors", "--up", "1", "--down", "1",
            "--rate", "5", "-f", "minimal",
        ])
        .assert()
        .success()
        .stdout("90.702948\n");
}

#[test]
fn three_step_hand_example() {
    shortrate()
        .args([
            "price", "zcb", "--maturity", "3", "--steps", "3", "--rate", "5", "--volatility",
            "10", "-f", "minimal",
        ])
        .assert()
        .success()
        .stdout("86.329849\n");
}

#[test]
fn swaption_json_reports_instrument() {
    shortrate()
        .args([
            "price", "swaption", "--maturity", "4", "--fixed-rate", "5", "--expiry", "2", "-f",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"swaption\""))
        .stdout(predicate::str::contains("\"model\": \"Binomial (lognormal)\""));
}

#[test]
fn forward_lattice_as_csv() {
    shortrate()
        .args([
            "price", "forward", "--maturity", "4", "--coupon", "5", "--delivery", "2",
            "--show-lattice", "-f", "csv",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("t,i,value"));
}

#[test]
fn price_on_calibrated_tree() {
    shortrate()
        .args([
            "price", "zcb", "--maturity", "3", "--face", "100", "--rates", "1:4,2:4.2,3:4.4",
            "--volatility", "1", "-f", "minimal",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("87.88"));
}

const BDT_PUT: [&str; 17] = [
    "price", "option", "--type", "put", "--maturity", "5", "--coupon", "4", "--strike", "99",
    "--expiry", "2", "--rates", "1:4,2:4.2,3:4.4,5:4.6", "--volatility", "20", "-f",
];

fn minimal_value(cmd: &mut Command) -> f64 {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout).unwrap().trim().parse().unwrap()
}

#[test]
fn calibrated_option_depends_on_q_up() {
    let even = minimal_value(shortrate().args(BDT_PUT).arg("minimal"));
    let skewed = minimal_value(
        shortrate()
            .args(BDT_PUT)
            .arg("minimal")
            .args(["--q-up", "0.3"]),
    );
    assert!(even > 0.0);
    assert!((even - skewed).abs() > 1e-4, "q_up ignored: {even} vs {skewed}");
}

#[test]
fn calibrated_option_reads_q_up_from_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[tree]\nq_up = 0.3\n").unwrap();

    let from_flag = minimal_value(
        shortrate()
            .args(BDT_PUT)
            .arg("minimal")
            .args(["--q-up", "0.3"]),
    );
    let from_config = minimal_value(
        shortrate()
            .args(BDT_PUT)
            .arg("minimal")
            .arg("--config")
            .arg(file.path()),
    );
    assert!((from_flag - from_config).abs() < 1e-9);
}

#[test]
fn calibrated_tree_shorter_than_instrument_fails() {
    shortrate()
        .args([
            "price", "zcb", "--maturity", "5", "--steps", "3", "--rates", "1:4,2:4.2,3:4.4",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Shape mismatch"));
}

#[test]
fn calibrate_inline_rates_reprices_ladder() {
    let output = shortrate()
        .args([
            "calibrate", "--rates", "1:4,2:4.2,3:4.4", "--horizon", "3", "--volatility", "1",
            "-f", "minimal",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let prices: Vec<f64> = stdout.lines().map(|l| l.parse().unwrap()).collect();
    assert_eq!(prices.len(), 3);
    assert!((prices[0] - 100.0 / 1.04).abs() < 1e-6);
    assert!((prices[1] - 100.0 / 1.042_f64.powi(2)).abs() < 1e-6);
    assert!((prices[2] - 100.0 / 1.044_f64.powi(3)).abs() < 1e-6);
}

#[test]
fn calibrate_from_rates_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "maturity,rate").unwrap();
    writeln!(file, "1,3.59").unwrap();
    writeln!(file, "2,3.50").unwrap();
    writeln!(file, "5,3.60").unwrap();

    shortrate()
        .args(["calibrate", "--horizon", "5", "--solver", "newton", "-f", "json"])
        .arg("--rates-file")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"solver\": \"Newton (bracketed)\""))
        .stdout(predicate::str::contains("\"maturity\": 5"));
}

#[test]
fn calibrate_table_reports_success() {
    shortrate()
        .args(["calibrate", "--rates", "1:4,2:4.2", "--horizon", "2", "--show-tree"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Repricing"))
        .stdout(predicate::str::contains("Short-Rate Tree"))
        .stdout(predicate::str::contains("Calibrated 2 periods"));
}

#[test]
fn config_file_supplies_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[tree]
model = "factors"
up = 1.0
down = 1.0
rate = 5.0

[output]
format = "minimal"
precision = 4
"#
    )
    .unwrap();

    shortrate()
        .args(["price", "zcb", "--maturity", "2"])
        .arg("--config")
        .arg(file.path())
        .assert()
        .success()
        .stdout("90.7029\n");
}

#[test]
fn calibrate_without_market_data_fails() {
    shortrate()
        .arg("calibrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing market data"));
}

#[test]
fn malformed_rate_point_fails() {
    shortrate()
        .args(["calibrate", "--rates", "1:4,2-4.2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid rate point: 2-4.2"));
}

#[test]
fn instrument_longer_than_tree_fails() {
    shortrate()
        .args(["price", "zcb", "--maturity", "5", "--steps", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Shape mismatch"));
}

#[test]
fn option_expiring_at_maturity_fails() {
    shortrate()
        .args([
            "price", "option", "--maturity", "4", "--strike", "95", "--expiry", "4",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid parameter expiry"));
}
