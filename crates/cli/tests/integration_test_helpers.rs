//! Test helpers for integration tests

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

// CARGO_BIN_EXE_imgproxy-stack is set by Cargo when running integration tests
const BINARY_NAME: &str = env!("CARGO_BIN_EXE_imgproxy-stack");

/// Scratch directory the binary runs in
pub struct TestProject {
    #[allow(dead_code)] // Used to keep temp directory alive during tests
    pub temp_dir: TempDir,
    pub project_path: PathBuf,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let project_path = temp_dir.path().to_path_buf();
        Self {
            temp_dir,
            project_path,
        }
    }

    /// Get path to a file in the project
    #[allow(dead_code)] // Used across multiple test files
    pub fn path(&self, relative_path: &str) -> PathBuf {
        self.project_path.join(relative_path)
    }

    #[allow(dead_code)] // Used across multiple test files
    pub fn file_exists(&self, relative_path: &str) -> bool {
        self.path(relative_path).exists()
    }

    #[allow(dead_code)] // Used across multiple test files
    pub fn read_file(&self, relative_path: &str) -> String {
        fs::read_to_string(self.path(relative_path)).unwrap()
    }

    #[allow(dead_code)] // Used across multiple test files
    pub fn write_file(&self, relative_path: &str, content: &str) {
        let path = self.path(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Number of entries in the project directory
    #[allow(dead_code)] // Used across multiple test files
    pub fn entry_count(&self) -> usize {
        fs::read_dir(&self.project_path).unwrap().count()
    }

    /// Run imgproxy-stack and return output
    pub fn run_command(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(BINARY_NAME);
        cmd.current_dir(&self.project_path);
        cmd.env_remove("RUST_LOG");
        cmd.args(args);
        cmd.output().unwrap()
    }

    /// Run imgproxy-stack, assert success and return stdout
    #[allow(dead_code)] // Used across multiple test files
    pub fn run_command_success(&self, args: &[&str]) -> String {
        let output = self.run_command(args);
        if !output.status.success() {
            eprintln!("Command failed: imgproxy-stack {}", args.join(" "));
            eprintln!("stdout: {}", String::from_utf8_lossy(&output.stdout));
            eprintln!("stderr: {}", String::from_utf8_lossy(&output.stderr));
            panic!("Command failed with exit code: {:?}", output.status.code());
        }
        String::from_utf8(output.stdout).unwrap()
    }

    /// Run imgproxy-stack and assert failure
    #[allow(dead_code)] // Used across multiple test files
    pub fn run_command_failure(&self, args: &[&str]) -> Output {
        let output = self.run_command(args);
        assert!(!output.status.success(), "Command should have failed");
        output
    }
}

/// A catalog with a single ARM64 architecture
#[allow(dead_code)] // Used across multiple test files
pub fn arm_only_catalog() -> String {
    r#"version: "1.2.0"
defaultInstanceType: c7g.large
architectures:
  - name: ARM64
    platform: ARM64
    imageId: "{{resolve:ssm:/aws/service/bottlerocket/aws-ecs-1/arm64/latest/image_id}}"
    instanceTypes:
      - c7g.large
      - c7g.xlarge
"#
    .to_string()
}
