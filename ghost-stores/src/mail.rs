/*!
Apple Mail: the account list document and per-account mailbox caches.

Mail keeps its data in `~/Library/Mail/V<N>`, where `N` grows with each
storage format revision. The newest directory is the live one.
*/

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use plist::{Dictionary, Value};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::fsops;
use crate::preserve::PreservationRules;

const ACCOUNTS_KEY: &str = "MailAccounts";
const ACCOUNTS_DOCUMENT: &str = "MailData/Accounts.plist";

/// Bundle name of the Mail application.
pub const MAIL_APPLICATION: &str = "Mail";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAccount {
    pub id: String,
    pub name: String,
    pub addresses: Vec<String>,
    /// Locally cached mailboxes, when they live inside the Mail directory.
    pub mailbox: Option<PathBuf>,
}

impl MailAccount {
    pub fn has_address(&self, identity: &str) -> bool {
        self.addresses
            .iter()
            .any(|address| address.eq_ignore_ascii_case(identity))
    }
}

#[derive(Debug, Clone)]
pub struct MailStore {
    home: PathBuf,
    version_dir: PathBuf,
}

impl MailStore {
    /// Find the live `V<N>` directory. `None` when Mail was never set up.
    pub fn locate(home: &Path) -> StoreResult<Option<Self>> {
        let mail_root = home.join("Library/Mail");
        let entries = match fs::read_dir(&mail_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&mail_root, e)),
        };

        let newest = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                let version = name.to_str()?.strip_prefix('V')?.parse::<u32>().ok()?;
                Some((version, entry.path()))
            })
            .max_by_key(|(version, _)| *version);

        Ok(newest.map(|(version, version_dir)| {
            debug!("Using Mail storage V{} at {}", version, version_dir.display());
            Self {
                home: home.to_path_buf(),
                version_dir,
            }
        }))
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.version_dir.join(ACCOUNTS_DOCUMENT)
    }

    fn load(&self) -> StoreResult<Option<Value>> {
        let path = self.accounts_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Value::from_file(&path)?))
    }

    /// Every configured account.
    pub fn accounts(&self) -> StoreResult<Vec<MailAccount>> {
        let Some(document) = self.load()? else {
            return Ok(Vec::new());
        };
        let accounts = document
            .as_dictionary()
            .and_then(|root| root.get(ACCOUNTS_KEY))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(accounts
            .iter()
            .filter_map(Value::as_dictionary)
            .filter_map(|entry| self.read_account(entry))
            .collect())
    }

    fn read_account(&self, entry: &Dictionary) -> Option<MailAccount> {
        let id = account_id(entry)?;
        let name = entry
            .get("AccountName")
            .and_then(Value::as_string)
            .unwrap_or(id.as_str())
            .to_string();
        let addresses = entry
            .get("EmailAddresses")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_string)
            .map(str::to_string)
            .collect();
        let mailbox = match entry.get("AccountPath").and_then(Value::as_string) {
            Some(account_path) => self.expand(account_path),
            None => Some(self.version_dir.join(&id)),
        }
        .filter(|path| self.is_mailbox_path(path));

        Some(MailAccount {
            id,
            name,
            addresses,
            mailbox,
        })
    }

    fn expand(&self, raw: &str) -> Option<PathBuf> {
        if let Some(rest) = raw.strip_prefix("~/") {
            Some(self.home.join(rest))
        } else if raw.starts_with('/') {
            Some(PathBuf::from(raw))
        } else {
            None
        }
    }

    /// A mailbox must sit strictly inside `~/Library/Mail/V<N>`; anything
    /// else (the version directory itself, a path escaping it) is refused.
    fn is_mailbox_path(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.version_dir) else {
            return false;
        };
        let mut components = relative.components();
        matches!(components.next(), Some(Component::Normal(_)))
            && components.all(|component| matches!(component, Component::Normal(_)))
    }

    /// Remove the account with `id` from the account list. Returns whether an
    /// entry was removed.
    pub fn remove_account(&self, rules: &PreservationRules, id: &str) -> StoreResult<bool> {
        let Some(mut document) = self.load()? else {
            return Ok(false);
        };
        let Some(accounts) = document
            .as_dictionary_mut()
            .and_then(|root| root.get_mut(ACCOUNTS_KEY))
            .and_then(Value::as_array_mut)
        else {
            return Ok(false);
        };

        let before = accounts.len();
        accounts.retain(|entry| {
            entry
                .as_dictionary()
                .and_then(account_id)
                .is_none_or(|entry_id| entry_id != id)
        });
        if accounts.len() == before {
            return Ok(false);
        }

        let mut bytes = Vec::new();
        document.to_writer_xml(&mut bytes)?;
        fsops::rewrite_file(rules, &self.accounts_path(), &bytes)?;
        Ok(true)
    }
}

fn account_id(entry: &Dictionary) -> Option<String> {
    entry
        .get("uniqueId")
        .or_else(|| entry.get("AccountName"))
        .and_then(Value::as_string)
        .map(str::to_string)
}
