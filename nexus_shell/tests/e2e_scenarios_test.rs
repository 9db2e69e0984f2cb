// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # End-to-End Scenario Tests
//!
//! The core request-lifecycle scenarios, exercised through the kernel
//! façade exactly as an interactive session would drive them:
//!
//! - traditional pipelines over external binaries
//! - scripted evaluation with capability auditing
//! - transactional `cd` with rollback
//! - sandbox-policy denial of `proc.kill`
//! - recording persistence shape
//! - quoted-token parsing

use nexus_shell::infrastructure::config::ShellConfig;
use nexus_shell::infrastructure::parser::InputParser;
use nexus_shell::Kernel;
use nexus_shell_domain::InputMode;

fn kernel_with_policy(dir: &std::path::Path, policy: &str) -> Kernel {
    let mut config = ShellConfig::default();
    config.security.default_policy = policy.to_string();
    config.security.audit_logging = false;
    Kernel::init_at(config, dir.to_path_buf()).unwrap()
}

#[test]
fn scenario_external_pipeline_echo_wc() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = kernel_with_policy(dir.path(), "developer");

    let result = kernel.execute_blocking("echo hello | wc -c").unwrap();
    let map = result.as_map().unwrap();
    assert_eq!(map.get("code").unwrap().as_int(), Some(0));
    assert_eq!(map.get("stdout").unwrap().as_str().map(str::trim), Some("6"));
    assert_eq!(map.get("stderr").unwrap().as_str(), Some(""));
    assert_eq!(map.get("success").unwrap().as_bool(), Some(true));
}

#[test]
fn scenario_scripted_directory_listing_is_audited() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("big.dat"), vec![0u8; 4096]).unwrap();
    std::fs::write(dir.path().join("tiny.dat"), vec![0u8; 8]).unwrap();

    // The classifier treats the arrow-function dialect as scripted without
    // evaluating it.
    let parser = InputParser::new();
    let js_style = "fs.dir(\".\").filter(f => f.size > 1024).map(f => f.name)";
    assert_eq!(parser.parse(js_style).unwrap().mode(), InputMode::Scripted);

    // The embedded dialect expresses the same chain with closures.
    let kernel = kernel_with_policy(dir.path(), "developer");
    let result = kernel
        .execute_blocking("fs.dir(\".\").filter(|f| f.size > 1024).map(|f| f.name)")
        .unwrap();
    let names = result.as_list().unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].as_str(), Some("big.dat"));

    // The read was capability-checked, allowed, and audited.
    let reads: Vec<_> = kernel
        .audit_entries()
        .into_iter()
        .filter(|e| e.action == "fs:read")
        .collect();
    assert_eq!(reads.len(), 1);
    assert!(reads[0].granted);
}

#[test]
fn scenario_cd_in_transaction_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("scratch");
    std::fs::create_dir(&sub).unwrap();
    let kernel = kernel_with_policy(dir.path(), "developer");

    let tx = kernel.begin_transaction();
    kernel
        .execute_blocking(&format!("cd {}", sub.display()))
        .unwrap();
    assert_eq!(kernel.state().read().cwd(), sub);

    // A context created after the cd observes the new cwd.
    let pwd = kernel.execute_blocking("pwd").unwrap();
    assert_eq!(pwd.as_str(), Some(sub.to_string_lossy().as_ref()));

    kernel.rollback_transaction(tx).unwrap();
    assert_eq!(kernel.state().read().cwd(), dir.path());
}

#[test]
fn scenario_proc_kill_denied_under_sandbox_policy() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = kernel_with_policy(dir.path(), "sandbox");

    let err = kernel.execute_blocking("proc.kill(1)").unwrap_err();
    assert_eq!(err.kind(), "PermissionDenied");

    let kills: Vec<_> = kernel
        .audit_entries()
        .into_iter()
        .filter(|e| e.action == "proc:kill")
        .collect();
    assert_eq!(kills.len(), 1);
    assert!(!kills[0].granted);
    assert_eq!(kills[0].resource, "1");
}

#[tokio::test]
async fn scenario_recording_two_commands_file_shape() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = kernel_with_policy(dir.path(), "developer");

    kernel.start_recording(Some("r1".to_string())).unwrap();
    kernel.execute_blocking("pwd").unwrap();
    kernel.execute_blocking("date").unwrap();
    kernel.stop_recording().await.unwrap();

    let raw =
        std::fs::read_to_string(dir.path().join(".nexus/recordings/r1.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();

    let commands = doc["commands"].as_array().unwrap();
    assert_eq!(commands.len(), 2);
    for entry in commands {
        assert!(!entry["input"].as_str().unwrap().is_empty());
        assert!(entry.get("result").is_some());
        assert!(entry["executionTime"].as_u64().is_some());
    }
    assert_eq!(commands[0]["input"], "pwd");
    assert_eq!(commands[1]["input"], "date");
}

#[test]
fn scenario_quoted_token_is_one_argument() {
    let parser = InputParser::new();
    let plan = parser.parse("ls \"a b\".txt").unwrap();
    assert_eq!(plan.mode(), InputMode::Traditional);
    let cmd = &plan.commands()[0];
    assert_eq!(cmd.name(), "ls");
    assert_eq!(cmd.args(), ["a b.txt"]);
}
