use std::path::{Path, PathBuf};

use policyd_core::Rule;

use crate::error::StoreError;
use crate::rule_xml::{parse_rule_xml, write_rule_xml};

/// File-backed rule persistence: one rule per `<rulesRoot>/<applicationName>/<name>.xml`.
///
/// `RuleStore` is a thin, stateless wrapper around the filesystem — it does
/// not cache anything and does not validate rule semantics beyond what the
/// XML codec requires. The engine is the source of truth for in-memory state;
/// the store exists purely so that state survives a restart.
pub struct RuleStore {
    root: PathBuf,
}

impl RuleStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn rule_path(&self, application_name: &str, name: &str) -> PathBuf {
        self.root.join(application_name).join(format!("{name}.xml"))
    }

    /// Write (creating or overwriting) the rule's XML file. Called on every
    /// lifecycle transition — add, enable, disable, delete-and-recreate — not
    /// on every invocation, so runtime counters persist coarsely.
    pub fn write_rule(&self, rule: &Rule) -> Result<(), StoreError> {
        let path = self.rule_path(&rule.application_name, &rule.name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let xml = write_rule_xml(rule)?;
        std::fs::write(&path, xml).map_err(|source| StoreError::Io { path, source })?;

        tracing::debug!(application_name = %rule.application_name, name = %rule.name, "wrote rule to disk");
        Ok(())
    }

    /// Remove a rule's XML file. A missing file is not an error: deleting an
    /// already-absent rule is idempotent.
    pub fn delete_rule(&self, application_name: &str, name: &str) -> Result<(), StoreError> {
        let path = self.rule_path(application_name, name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Enumerate every `.xml` file under the store root, in arbitrary order.
    #[must_use]
    pub fn scan(&self) -> Vec<PathBuf> {
        walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| path.extension().is_some_and(|ext| ext == "xml"))
            .collect()
    }

    /// Scan and parse every rule file under the store root. A file that
    /// fails to parse is logged and skipped rather than aborting the boot
    /// sequence — one malformed rule must not prevent every other rule from
    /// loading.
    #[must_use]
    pub fn load_all(&self) -> Vec<Rule> {
        self.scan()
            .into_iter()
            .filter_map(|path| match std::fs::read(&path) {
                Ok(bytes) => match parse_rule_xml(&bytes) {
                    Ok(rule) => Some(rule),
                    Err(err) => {
                        tracing::error!(path = %path.display(), error = %err, "skipping unparsable rule file");
                        None
                    }
                },
                Err(err) => {
                    tracing::error!(path = %path.display(), error = %err, "skipping unreadable rule file");
                    None
                }
            })
            .collect()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
