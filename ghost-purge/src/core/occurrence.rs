/*!
Where an identity was found: adapter kinds, categories, locations and the
occurrence that ties them together.
*/

use std::fmt;
use std::path::PathBuf;

use ghost_stores::accounts::SystemAccount;
use ghost_stores::appdata::{Hit, Match};
use ghost_stores::browser::{Browser, Evidence, Profile};
use ghost_stores::documents::display_key_path;
use ghost_stores::keychain::{Certificate, KeychainItem};
use ghost_stores::mail::MailAccount;
use ghost_stores::ssh::KeyPair;

/// Preview and deletion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Keychain,
    Browser,
    Mail,
    AppData,
    Ssh,
    SystemAccount,
    CloudConfig,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Keychain,
        Category::Browser,
        Category::Mail,
        Category::AppData,
        Category::Ssh,
        Category::SystemAccount,
        Category::CloudConfig,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Keychain => "keychain",
            Category::Browser => "browser",
            Category::Mail => "mail",
            Category::AppData => "application-data",
            Category::Ssh => "ssh",
            Category::SystemAccount => "system-account",
            Category::CloudConfig => "cloud-config",
        }
    }

    /// What is lost, or what is left to the user, when this category is purged.
    pub fn risk(&self) -> Option<&'static str> {
        match self {
            Category::Mail => Some("permanent data loss: cached messages are deleted"),
            Category::Browser => Some("profile and bookmark loss"),
            Category::Ssh => Some("irreversible key loss"),
            Category::SystemAccount | Category::CloudConfig => Some("manual removal required"),
            Category::Keychain | Category::AppData => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The adapter responsible for an occurrence. Every adapter has exactly one
/// kind, so an occurrence always routes back to the adapter that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdapterKind {
    Keychain,
    Browser(Browser),
    Mail,
    AppData,
    Ssh,
    SystemAccounts,
    CloudConfig,
}

impl AdapterKind {
    pub fn category(&self) -> Category {
        match self {
            AdapterKind::Keychain => Category::Keychain,
            AdapterKind::Browser(_) => Category::Browser,
            AdapterKind::Mail => Category::Mail,
            AdapterKind::AppData => Category::AppData,
            AdapterKind::Ssh => Category::Ssh,
            AdapterKind::SystemAccounts => Category::SystemAccount,
            AdapterKind::CloudConfig => Category::CloudConfig,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdapterKind::Keychain => "keychain",
            AdapterKind::Browser(browser) => browser.name(),
            AdapterKind::Mail => "Mail",
            AdapterKind::AppData => "application data",
            AdapterKind::Ssh => "SSH",
            AdapterKind::SystemAccounts => "Internet Accounts",
            AdapterKind::CloudConfig => "cloud sync settings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    KeychainItem(KeychainItem),
    Certificate(Certificate),
    BrowserProfile {
        profile: Profile,
        evidence: Evidence,
    },
    MailAccount {
        /// The account list document the entry lives in.
        accounts: PathBuf,
        account: MailAccount,
    },
    SshKey(KeyPair),
    SshHostBlock {
        config: PathBuf,
        header: String,
    },
    AppData(Hit),
    SystemAccount {
        database: PathBuf,
        account: SystemAccount,
    },
    CloudDocument {
        service: &'static str,
        path: PathBuf,
        key_paths: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub kind: AdapterKind,
    pub location: Location,
}

impl Occurrence {
    pub fn new(kind: AdapterKind, location: Location) -> Self {
        Self { kind, location }
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Short descriptor, e.g. `browser-profile:Chrome/Work`.
    pub fn tag(&self) -> String {
        match &self.location {
            Location::KeychainItem(item) => format!(
                "keychain:{}:{}",
                item.class.as_str(),
                item.label.as_deref().unwrap_or(item.service.as_str())
            ),
            Location::Certificate(certificate) => format!(
                "keychain:certificate:{}",
                certificate
                    .label
                    .as_deref()
                    .or(certificate.alias.as_deref())
                    .unwrap_or(certificate.sha1.as_str())
            ),
            Location::BrowserProfile { profile, .. } => {
                format!("browser-profile:{}/{}", profile.browser.name(), profile.display_name)
            }
            Location::MailAccount { account, .. } => format!("mail-account:{}", account.name),
            Location::SshKey(pair) => format!("ssh-key:{}", pair.name()),
            Location::SshHostBlock { header, .. } => format!("ssh-config:{header}"),
            Location::AppData(hit) => format!("app-data:{}", hit.path.display()),
            Location::SystemAccount { account, .. } => format!("system-account:{}", account.label()),
            Location::CloudDocument { service, path, .. } => format!(
                "cloud-config:{}:{}",
                service,
                path.file_name().unwrap_or_default().to_string_lossy()
            ),
        }
    }

    /// Why this location matched, when there is more to say than the tag.
    pub fn detail(&self) -> Option<String> {
        match &self.location {
            Location::KeychainItem(item) => Some(format!("service {}", item.service)),
            Location::Certificate(certificate) => Some(format!("SHA-1 {}", certificate.sha1)),
            Location::BrowserProfile { profile, evidence } => {
                Some(format!("{}, {}", evidence.describe(), profile.path.display()))
            }
            Location::MailAccount { account, .. } => account
                .mailbox
                .as_ref()
                .map(|mailbox| format!("mailboxes in {}", mailbox.display())),
            Location::SshKey(pair) => Some(format!("{} {}", pair.key_type, pair.comment)),
            Location::SshHostBlock { config, .. } => Some(config.display().to_string()),
            Location::AppData(hit) => Some(match (&hit.found, hit.preserved) {
                (_, true) => "name matches, preserved".to_string(),
                (Match::Name, false) => "name matches".to_string(),
                (Match::Content(keys), false) if keys.is_empty() => "content matches".to_string(),
                (Match::Content(keys), false) => format!("content matches at {}", join_keys(keys)),
            }),
            Location::SystemAccount { account, .. } => account.username.clone(),
            Location::CloudDocument { key_paths, .. } => Some(format!("at {}", join_keys(key_paths))),
        }
    }

    /// Filesystem paths a deletion would remove or rewrite.
    pub fn paths(&self) -> Vec<PathBuf> {
        match &self.location {
            Location::KeychainItem(_) | Location::Certificate(_) => Vec::new(),
            Location::BrowserProfile { profile, .. } => vec![profile.path.clone()],
            Location::MailAccount { accounts, account } => {
                let mut paths = vec![accounts.clone()];
                paths.extend(account.mailbox.clone());
                paths
            }
            Location::SshKey(pair) => {
                let mut paths = vec![pair.public.clone()];
                paths.extend(pair.private.clone());
                paths
            }
            Location::SshHostBlock { config, .. } => vec![config.clone()],
            Location::AppData(hit) => vec![hit.path.clone()],
            Location::SystemAccount { database, .. } => vec![database.clone()],
            Location::CloudDocument { path, .. } => vec![path.clone()],
        }
    }
}

fn join_keys(keys: &[String]) -> String {
    keys.iter()
        .map(|key| display_key_path(key))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            Some(detail) => write!(f, "{} ({})", self.tag(), detail),
            None => f.write_str(&self.tag()),
        }
    }
}
