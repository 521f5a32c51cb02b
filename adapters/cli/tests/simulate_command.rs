use std::process::Command;

#[test]
fn simulate_prints_a_json_summary() {
    let output = Command::new(env!("CARGO_BIN_EXE_siege"))
        .args(["simulate", "--max-ticks", "40", "--seed", "3"])
        .output()
        .expect("failed to run the siege binary");

    assert!(
        output.status.success(),
        "simulate failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("summary is json");
    assert_eq!(summary["ticks"], 40);
    assert_eq!(summary["currency"], 100);
    assert_eq!(summary["lives"], 20);
    assert!(summary["outcome"].is_null());
}

#[test]
fn simulate_rejects_a_missing_script() {
    let output = Command::new(env!("CARGO_BIN_EXE_siege"))
        .args(["simulate", "--script", "/nonexistent/script.json"])
        .output()
        .expect("failed to run the siege binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read script"), "{stderr}");
}
