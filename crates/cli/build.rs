use std::env;
use std::fs;
use std::path::PathBuf;

/// Prefer the repository's VERSION file over the Cargo.toml version.
fn main() {
    let cargo_version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let mut version = cargo_version.clone();

    let version_path = env::var("CARGO_MANIFEST_DIR")
        .ok()
        .map(PathBuf::from)
        .and_then(|dir| dir.parent().and_then(|p| p.parent()).map(|root| root.join("VERSION")));

    if let Some(version_path) = version_path.filter(|path| path.exists()) {
        println!("cargo:rerun-if-changed={}", version_path.display());
        if let Ok(file_version) = fs::read_to_string(&version_path) {
            let file_version = file_version.trim();
            if file_version.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                version = file_version.to_string();
            }
        }
    } else {
        println!("cargo:rerun-if-changed=build.rs");
    }

    println!("cargo:rustc-env=IMGPROXY_STACK_VERSION={version}");

    if version != cargo_version {
        println!("cargo:warning=Using version {version} from VERSION file (Cargo.toml has {cargo_version})");
    }
}
