//! Integration tests for error handling

mod integration_test_helpers;

use integration_test_helpers::*;

#[test]
fn test_no_cluster_requires_no_network() {
    let project = TestProject::new();
    let output = project.run_command_failure(&["--no-cluster", "--output", "stack.yaml"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("✗ Template generation failed"));
    assert!(stderr.contains("  Error: "));
    assert!(stderr.contains("--no-network"));
    assert!(output.stdout.is_empty());
    assert!(!project.file_exists("stack.yaml"));
    assert_eq!(project.entry_count(), 0);
}

#[test]
fn test_unknown_launch_type() {
    let project = TestProject::new();
    let output = project.run_command_failure(&["--launch-type", "LAMBDA"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("LAMBDA"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_subnets_out_of_range() {
    let project = TestProject::new();
    for count in ["0", "17"] {
        let output = project.run_command_failure(&["-s", count]);
        assert_eq!(output.status.code(), Some(1), "{count}");
        assert!(output.stdout.is_empty());

        let output = project.run_command_failure(&["-N", "-s", count]);
        assert_eq!(output.status.code(), Some(1), "{count} with --no-network");
        assert!(output.stdout.is_empty());
    }
}

#[test]
fn test_unknown_format() {
    let project = TestProject::new();
    let output = project.run_command_failure(&["--format", "xml", "-o", "stack.xml"]);
    assert!(String::from_utf8_lossy(&output.stderr).contains("xml"));
    assert!(!project.file_exists("stack.xml"));
}

#[test]
fn test_invalid_instance_catalog() {
    let project = TestProject::new();
    project.write_file("catalog.yaml", "version: \"2.0.0\"\ndefaultInstanceType: x\narchitectures: []\n");
    let output = project.run_command_failure(&["--instance-catalog", "catalog.yaml", "-o", "stack.yaml"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!project.file_exists("stack.yaml"));
}

#[test]
fn test_missing_instance_catalog() {
    let project = TestProject::new();
    let output = project.run_command_failure(&["--instance-catalog", "missing.yaml"]);
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.yaml"));
}

#[test]
fn test_unsupported_completion_shell() {
    let project = TestProject::new();
    let output = project.run_command_failure(&["--completions", "powershell"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("✗ Completion generation failed"));
    assert!(stderr.contains("Unsupported shell"));
}
