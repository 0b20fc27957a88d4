//! `fetchy check` – validate a manifest offline.

use anyhow::{bail, Result};
use fetchy_core::manifest::Manifest;
use std::path::Path;

pub fn run_check(path: &Path) -> Result<()> {
    let manifest = Manifest::load(path)?;
    let results = manifest.check();
    if results.is_empty() {
        println!("No requests in manifest.");
        return Ok(());
    }

    let mut invalid = 0usize;
    for (id, result) in &results {
        match result {
            Ok(prepared) => println!("ok       {}  {} {}", id, prepared.method, prepared.url),
            Err(e) => {
                invalid += 1;
                println!("invalid  {}  {}", id, e);
            }
        }
    }
    if invalid > 0 {
        bail!("{} of {} request(s) invalid", invalid, results.len());
    }
    println!("{} request(s) ok", results.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn manifest_file(toml: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(toml.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn valid_manifest_passes() {
        let f = manifest_file(
            r#"
            [[requests]]
            id = "a"
            url = "https://example.com/a"
            "#,
        );
        assert!(run_check(f.path()).is_ok());
    }

    #[test]
    fn invalid_descriptor_fails() {
        let f = manifest_file(
            r#"
            [[requests]]
            id = "a"
            url = "https://example.com/a"

            [[requests]]
            id = "b"
            url = "ftp://example.com/b"
            "#,
        );
        let err = run_check(f.path()).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 request(s) invalid");
    }

    #[test]
    fn duplicate_ids_fail() {
        let f = manifest_file(
            r#"
            [[requests]]
            id = "a"
            url = "https://example.com/a"

            [[requests]]
            id = "a"
            url = "https://example.com/b"
            "#,
        );
        assert!(run_check(f.path()).is_err());
    }
}
