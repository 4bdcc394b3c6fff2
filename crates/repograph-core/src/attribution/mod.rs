//! Authorship attribution from version-control history.
//!
//! `git blame --line-porcelain` output is harvested for the distinct
//! author names and emails seen against a file's lines. Pairing names
//! with emails is a cross product, an explicit heuristic with no
//! guarantee of correct identity binding. Any failure to invoke or
//! parse git yields an empty list, never an error.

use std::collections::BTreeSet;
use std::path::Path;

use tokio::process::Command;

/// One candidate author for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeveloperRecord {
    pub name: Option<String>,
    pub email: Option<String>,
    pub team: Option<String>,
}

impl DeveloperRecord {
    /// Unique key for the Developer node: email, falling back to name,
    /// falling back to the literal `unknown`.
    pub fn key(&self) -> &str {
        self.email
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("unknown")
    }
}

/// Derive candidate authors for one file from blame history.
pub async fn resolve_authors(file_path: &Path) -> Vec<DeveloperRecord> {
    let (dir, file_name) = match (file_path.parent(), file_path.file_name()) {
        (Some(dir), Some(name)) => (dir, name),
        _ => return Vec::new(),
    };

    let output = match Command::new("git")
        .arg("blame")
        .arg("--line-porcelain")
        .arg(file_name)
        .current_dir(dir)
        .output()
        .await
    {
        Ok(output) if output.status.success() => output.stdout,
        Ok(_) | Err(_) => {
            tracing::debug!("No blame history for {}", file_path.display());
            return Vec::new();
        }
    };

    parse_blame_porcelain(&String::from_utf8_lossy(&output))
}

/// Parse `--line-porcelain` output into cross-product developer records.
pub fn parse_blame_porcelain(output: &str) -> Vec<DeveloperRecord> {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    let mut emails: BTreeSet<&str> = BTreeSet::new();

    for line in output.lines() {
        if let Some(name) = line.strip_prefix("author ") {
            names.insert(name.trim());
        } else if let Some(email) = line.strip_prefix("author-mail ") {
            emails.insert(email.trim().trim_start_matches('<').trim_end_matches('>'));
        }
    }

    let mut developers = Vec::new();

    match (names.is_empty(), emails.is_empty()) {
        (false, false) => {
            // Cross product: every observed name paired with every
            // observed email
            for name in &names {
                for email in &emails {
                    developers.push(DeveloperRecord {
                        name: Some(name.to_string()),
                        email: Some(email.to_string()),
                        team: None,
                    });
                }
            }
        }
        (false, true) => {
            for name in &names {
                developers.push(DeveloperRecord {
                    name: Some(name.to_string()),
                    email: None,
                    team: None,
                });
            }
        }
        (true, false) => {
            for email in &emails {
                developers.push(DeveloperRecord {
                    name: None,
                    email: Some(email.to_string()),
                    team: None,
                });
            }
        }
        (true, true) => {}
    }

    developers
}
