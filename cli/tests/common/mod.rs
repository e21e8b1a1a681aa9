//! Common test utilities and fixtures
//!
//! Builds a throwaway workspace with a maven-layout artifact repository,
//! catalog and request files, and a `deplan` command pointed at it.
#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn repo(&self) -> PathBuf {
        self.path().join("repo")
    }

    /// Write `content` to the maven path of `g/a/v`
    pub fn add_artifact(&self, coordinates: &str, content: &str) -> PathBuf {
        let parts: Vec<&str> = coordinates.split('/').collect();
        let (group, artifact, version) = (parts[0], parts[1], parts[2]);
        let mut path = self.repo();
        path.extend(group.split('.'));
        let path = path
            .join(artifact)
            .join(version)
            .join(format!("{}-{}.jar", artifact, version));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    /// A bundle with a minimal manifest plus any extra header lines
    pub fn add_bundle(&self, coordinates: &str, bsn: &str, version: &str, extra: &[&str]) {
        let mut manifest = format!(
            "Manifest-Version: 1.0\nBundle-SymbolicName: {}\nBundle-Version: {}\n",
            bsn, version
        );
        for line in extra {
            manifest.push_str(line);
            manifest.push('\n');
        }
        self.add_artifact(coordinates, &manifest);
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// `deplan` with HOME redirected into the workspace
    pub fn deplan(&self) -> Command {
        let mut cmd = Command::cargo_bin("deplan").unwrap();
        cmd.env("HOME", self.path())
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("XDG_DATA_HOME")
            .env_remove("RUST_LOG")
            .current_dir(self.path());
        cmd
    }
}

pub const CATALOG: &str = r#"
[[feature]]
name = "web"
version = "1.0.0"
dependencies = [{ name = "http" }]
bundles = [{ location = "mvn:org.acme/web/1.0.0" }]

[[feature.conditional]]
condition = ["security"]
bundles = [{ location = "mvn:org.acme/web-security/1.0.0" }]

[[feature]]
name = "http"
version = "2.1.0"
bundles = [{ location = "mvn:org.acme/http/2.1.0" }]

[[feature]]
name = "security"
version = "1.0.0"
bundles = [{ location = "mvn:org.acme/security/1.0.0" }]
"#;

/// A workspace holding `CATALOG` as `features.toml` and every bundle it names
pub fn web_workspace() -> Workspace {
    let ws = Workspace::new();
    ws.write("features.toml", CATALOG);
    ws.add_bundle("org.acme/web/1.0.0", "org.acme.web", "1.0.0", &["Import-Package: org.acme.http"]);
    ws.add_bundle(
        "org.acme/http/2.1.0",
        "org.acme.http",
        "2.1.0",
        &["Export-Package: org.acme.http;version=\"2.1\""],
    );
    ws.add_bundle("org.acme/web-security/1.0.0", "org.acme.web.security", "1.0.0", &[]);
    ws.add_bundle("org.acme/security/1.0.0", "org.acme.security", "1.0.0", &[]);
    ws
}
