/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Generate command implementation
 */

use crate::error::{CliError, CliResult};
use imgproxy_stack_compiler::{generate, CompilerError, Encoders, InstanceCatalog, OutputFormat, RawFlags};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct Options {
    pub format: String,
    pub output: Option<String>,
    pub launch_type: String,
    pub subnets_number: u32,
    pub no_network: bool,
    pub no_cluster: bool,
    pub instance_catalog: Option<String>,
    pub lower_membership: bool,
}

impl Options {
    fn flags(&self) -> RawFlags {
        RawFlags {
            launch_type: self.launch_type.clone(),
            subnets_number: self.subnets_number,
            no_network: self.no_network,
            no_cluster: self.no_cluster,
        }
    }

    fn encoders(&self) -> Encoders {
        if self.lower_membership {
            Encoders::portable()
        } else {
            Encoders::standard()
        }
    }
}

pub fn run(options: &Options) -> i32 {
    match run_inner(options) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("✗ Template generation failed");
            eprintln!("  Error: {e}");
            1
        }
    }
}

fn run_inner(options: &Options) -> CliResult<()> {
    let format: OutputFormat = options.format.parse().map_err(CompilerError::from)?;
    let catalog = load_catalog(options.instance_catalog.as_deref())?;

    let document = generate(&options.flags(), &catalog, format, &options.encoders())?;

    match &options.output {
        Some(output) => {
            let path = PathBuf::from(output);
            write_atomically(&path, &document)?;
            println!("✓ Template written to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(document.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn load_catalog(path: Option<&str>) -> CliResult<InstanceCatalog> {
    let Some(path) = path else {
        return InstanceCatalog::embedded().map_err(|e| CliError::Compiler(e.into()));
    };
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::Message(format!("Failed to read instance catalog {path}: {e}")))?;
    let catalog = InstanceCatalog::parse(&content, Some(path)).map_err(CompilerError::from)?;
    tracing::debug!(path, version = %catalog.version, "loaded instance catalog");
    Ok(catalog)
}

/// Write through a temporary file in the target directory so a failed run
/// never leaves a partial document behind.
fn write_atomically(path: &Path, content: &str) -> CliResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    file.persist(path).map_err(|e| CliError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options() -> Options {
        Options {
            format: "yaml".to_string(),
            output: None,
            launch_type: "FARGATE".to_string(),
            subnets_number: 3,
            no_network: false,
            no_cluster: false,
            instance_catalog: None,
            lower_membership: false,
        }
    }

    #[test]
    fn test_writes_output_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stack.json");
        let opts = Options {
            format: "json".to_string(),
            output: Some(path.to_string_lossy().into_owned()),
            ..options()
        };
        run_inner(&opts).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with('{'));
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_creates_missing_output_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("stack.yaml");
        let opts = Options {
            output: Some(path.to_string_lossy().into_owned()),
            ..options()
        };
        run_inner(&opts).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_rejected_flags_write_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stack.yaml");
        let opts = Options {
            output: Some(path.to_string_lossy().into_owned()),
            no_cluster: true,
            ..options()
        };
        let err = run_inner(&opts).unwrap_err();
        assert!(err.to_string().contains("--no-network"));
        assert!(!path.exists());
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unknown_format() {
        let opts = Options {
            format: "toml".to_string(),
            ..options()
        };
        let err = run_inner(&opts).unwrap_err();
        assert!(err.to_string().contains("toml"));
    }

    #[test]
    fn test_missing_catalog_file() {
        let opts = Options {
            instance_catalog: Some("does-not-exist.yaml".to_string()),
            ..options()
        };
        let err = run_inner(&opts).unwrap_err();
        assert!(matches!(err, CliError::Message(ref msg) if msg.contains("does-not-exist.yaml")));
    }

    #[test]
    fn test_custom_catalog_file() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = temp_dir.path().join("catalog.yaml");
        fs::write(
            &catalog,
            "version: \"1.0.0\"\ndefaultInstanceType: t4g.micro\narchitectures:\n  - name: ARM64\n    platform: ARM64\n    imageId: /aws/service/bottlerocket/aws-ecs-2/arm64/latest/image_id\n    instanceTypes: [t4g.micro, t4g.small]\n",
        )
        .unwrap();
        let output = temp_dir.path().join("stack.yaml");
        let opts = Options {
            launch_type: "EC2".to_string(),
            instance_catalog: Some(catalog.to_string_lossy().into_owned()),
            output: Some(output.to_string_lossy().into_owned()),
            ..options()
        };
        run_inner(&opts).unwrap();

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.contains("testArm64InstanceType"));
        assert!(!content.contains("testAmd64InstanceType"));
    }
}
