/*!
The login keychain, driven through the `security` command.
*/

mod dump;

use std::path::PathBuf;

use tracing::debug;

use crate::command::{CommandOutput, CommandRunner};
use crate::error::StoreResult;
use crate::fsops::Removal;
use crate::text::contains_ignore_case;

const SECURITY: &str = "security";

/// `errSecItemNotFound` as reported by the `security` exit status.
const ITEM_NOT_FOUND: i32 = 44;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemClass {
    /// `genp`: application passwords
    Generic,
    /// `inet`: website and server passwords
    Internet,
}

impl ItemClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemClass::Generic => "generic",
            ItemClass::Internet => "internet",
        }
    }
}

/// A stored password, identified by class, account and service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeychainItem {
    pub keychain: Option<PathBuf>,
    pub class: ItemClass,
    pub account: String,
    /// `svce` for generic items, `srvr` for internet items.
    pub service: String,
    pub label: Option<String>,
}

impl KeychainItem {
    fn same_entry(&self, other: &KeychainItem) -> bool {
        self.class == other.class && self.account == other.account && self.service == other.service
    }
}

/// An installed certificate, identified by its SHA-1 hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Certificate {
    pub keychain: Option<PathBuf>,
    pub sha1: String,
    pub alias: Option<String>,
    pub label: Option<String>,
    pub subject: Option<String>,
}

impl Certificate {
    /// Whether the email alias, label or subject mentions `identity`.
    pub fn mentions(&self, identity: &str) -> bool {
        [&self.alias, &self.label, &self.subject]
            .into_iter()
            .flatten()
            .any(|field| contains_ignore_case(field, identity))
    }
}

pub struct Keychain<R: CommandRunner> {
    runner: R,
    /// Restrict every command to one keychain file instead of the search list.
    keychain: Option<PathBuf>,
}

impl<R: CommandRunner> Keychain<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            keychain: None,
        }
    }

    pub fn with_keychain(mut self, keychain: PathBuf) -> Self {
        self.keychain = Some(keychain);
        self
    }

    fn security(&self, args: &[&str]) -> StoreResult<CommandOutput> {
        let keychain = self.keychain.as_ref().map(|path| path.to_string_lossy().into_owned());
        let mut full: Vec<&str> = args.to_vec();
        if let Some(keychain) = keychain.as_deref() {
            full.push(keychain);
        }
        self.runner.run(SECURITY, &full)
    }

    /// Every password item in the keychain (metadata only; no secrets are
    /// decrypted).
    pub fn items(&self) -> StoreResult<Vec<KeychainItem>> {
        let output = self.security(&["dump-keychain"])?.check(SECURITY)?;
        let items = dump::parse_items(&output.stdout);
        debug!("Keychain dump listed {} password items", items.len());
        Ok(items)
    }

    /// Password items whose account is exactly `identity` (ignoring case).
    pub fn items_for(&self, identity: &str) -> StoreResult<Vec<KeychainItem>> {
        Ok(self
            .items()?
            .into_iter()
            .filter(|item| item.account.eq_ignore_ascii_case(identity))
            .collect())
    }

    /// Certificates whose email, label or subject mention `identity`.
    pub fn certificates_for(&self, identity: &str) -> StoreResult<Vec<Certificate>> {
        let output = self.security(&["find-certificate", "-a", "-e", identity, "-Z"])?;
        if output.status == Some(ITEM_NOT_FOUND) {
            return Ok(Vec::new());
        }
        let output = output.check(SECURITY)?;
        Ok(dump::parse_certificates(&output.stdout)
            .into_iter()
            .filter(|certificate| certificate.mentions(identity))
            .collect())
    }

    /// Whether `item` is still stored.
    pub fn contains(&self, item: &KeychainItem) -> StoreResult<bool> {
        Ok(self.items()?.iter().any(|stored| stored.same_entry(item)))
    }

    /// Delete exactly one password item.
    pub fn delete_item(&self, item: &KeychainItem) -> StoreResult<Removal> {
        let command = match item.class {
            ItemClass::Generic => "delete-generic-password",
            ItemClass::Internet => "delete-internet-password",
        };
        let output = self.security(&[command, "-a", &item.account, "-s", &item.service])?;
        removal_from(output)
    }

    /// Delete exactly one certificate, by hash.
    pub fn delete_certificate(&self, certificate: &Certificate) -> StoreResult<Removal> {
        let output = self.security(&["delete-certificate", "-Z", &certificate.sha1])?;
        removal_from(output)
    }
}

fn removal_from(output: CommandOutput) -> StoreResult<Removal> {
    if output.status == Some(ITEM_NOT_FOUND) {
        return Ok(Removal::AlreadyAbsent);
    }
    output.check(SECURITY).map(|_| Removal::Removed)
}

/// The shell command an operator can run to delete `item` by hand.
pub fn manual_delete_command(item: &KeychainItem) -> String {
    let command = match item.class {
        ItemClass::Generic => "delete-generic-password",
        ItemClass::Internet => "delete-internet-password",
    };
    format!(
        "security {command} -a '{}' -s '{}'",
        item.account.replace('\'', r"'\''"),
        item.service.replace('\'', r"'\''")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::cell::RefCell;

    /// Answers `security` invocations from a fixed table.
    struct FakeSecurity {
        dump: String,
        certificates: CommandOutput,
        delete_status: i32,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl FakeSecurity {
        fn new(dump: &str) -> Self {
            Self {
                dump: dump.to_string(),
                certificates: CommandOutput {
                    status: Some(ITEM_NOT_FOUND),
                    ..CommandOutput::default()
                },
                delete_status: 0,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for FakeSecurity {
        fn run(&self, program: &str, args: &[&str]) -> StoreResult<CommandOutput> {
            assert_eq!(program, SECURITY);
            self.calls
                .borrow_mut()
                .push(args.iter().map(|arg| arg.to_string()).collect());
            Ok(match args[0] {
                "dump-keychain" => CommandOutput {
                    status: Some(0),
                    stdout: self.dump.clone(),
                    stderr: String::new(),
                },
                "find-certificate" => self.certificates.clone(),
                _ => CommandOutput {
                    status: Some(self.delete_status),
                    ..CommandOutput::default()
                },
            })
        }
    }

    const ONE_ITEM: &str = r#"keychain: "/Users/me/Library/Keychains/login.keychain-db"
class: "genp"
attributes:
    "acct"<blob>="User@Example.com"
    "svce"<blob>="com.example.sync"
keychain: "/Users/me/Library/Keychains/login.keychain-db"
class: "genp"
attributes:
    "acct"<blob>="someone@else.org"
    "svce"<blob>="com.example.sync"
"#;

    #[test]
    fn test_items_for_matches_account_ignoring_case() {
        let fake = FakeSecurity::new(ONE_ITEM);
        let keychain = Keychain::new(&fake);
        let items = keychain.items_for("user@example.com").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].service, "com.example.sync");
    }

    #[test]
    fn test_delete_item_issues_targeted_command() {
        let fake = FakeSecurity::new(ONE_ITEM);
        let keychain = Keychain::new(&fake);
        let item = keychain.items_for("user@example.com").unwrap().remove(0);

        assert_eq!(keychain.delete_item(&item).unwrap(), Removal::Removed);
        let calls = fake.calls.borrow();
        assert_eq!(
            calls.last().unwrap(),
            &["delete-generic-password", "-a", "User@Example.com", "-s", "com.example.sync"]
        );
    }

    #[test]
    fn test_item_not_found_is_already_absent() {
        let mut fake = FakeSecurity::new(ONE_ITEM);
        fake.delete_status = ITEM_NOT_FOUND;
        let keychain = Keychain::new(&fake);
        let item = keychain.items_for("user@example.com").unwrap().remove(0);
        assert_eq!(keychain.delete_item(&item).unwrap(), Removal::AlreadyAbsent);
    }

    #[test]
    fn test_other_failures_are_errors() {
        let mut fake = FakeSecurity::new(ONE_ITEM);
        fake.delete_status = 51;
        let keychain = Keychain::new(&fake);
        let item = keychain.items_for("user@example.com").unwrap().remove(0);
        assert!(matches!(
            keychain.delete_item(&item),
            Err(StoreError::CommandFailed { status: 51, .. })
        ));
    }

    #[test]
    fn test_no_certificates_is_empty() {
        let fake = FakeSecurity::new("");
        let keychain = Keychain::new(&fake);
        assert!(keychain.certificates_for("user@example.com").unwrap().is_empty());
    }

    #[test]
    fn test_keychain_path_is_appended() {
        let fake = FakeSecurity::new("");
        let keychain = Keychain::new(&fake).with_keychain(PathBuf::from("/tmp/test.keychain-db"));
        keychain.items().unwrap();
        assert_eq!(
            fake.calls.borrow()[0],
            vec!["dump-keychain".to_string(), "/tmp/test.keychain-db".to_string()]
        );
    }

    #[test]
    fn test_manual_command_quotes_arguments() {
        let item = KeychainItem {
            keychain: None,
            class: ItemClass::Internet,
            account: "user@example.com".to_string(),
            service: "o'brien.example.com".to_string(),
            label: None,
        };
        assert_eq!(
            manual_delete_command(&item),
            r"security delete-internet-password -a 'user@example.com' -s 'o'\''brien.example.com'"
        );
    }
}
