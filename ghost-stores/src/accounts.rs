/*!
The system account database behind Internet Accounts
(`~/Library/Accounts/Accounts4.sqlite`), read from a snapshot.
*/

use std::path::{Path, PathBuf};

use rusqlite::params;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::snapshot::Snapshot;

const DATABASE: &str = "Library/Accounts/Accounts4.sqlite";

const ACCOUNTS_WITH_TYPE: &str = "
SELECT a.Z_PK, a.ZUSERNAME, a.ZACCOUNTDESCRIPTION, t.ZACCOUNTTYPEDESCRIPTION
FROM ZACCOUNT a
LEFT JOIN ZACCOUNTTYPE t ON a.ZACCOUNTTYPE = t.Z_PK
WHERE a.ZUSERNAME = ?1 COLLATE NOCASE
   OR instr(lower(a.ZACCOUNTDESCRIPTION), lower(?1)) > 0
ORDER BY a.Z_PK";

const ACCOUNTS: &str = "
SELECT Z_PK, ZUSERNAME, ZACCOUNTDESCRIPTION, NULL
FROM ZACCOUNT
WHERE ZUSERNAME = ?1 COLLATE NOCASE
   OR instr(lower(ZACCOUNTDESCRIPTION), lower(?1)) > 0
ORDER BY Z_PK";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemAccount {
    pub id: i64,
    pub username: Option<String>,
    pub description: Option<String>,
    /// E.g. `iCloud`, `Google`, `Exchange`.
    pub account_type: Option<String>,
}

impl SystemAccount {
    pub fn label(&self) -> String {
        match (&self.account_type, &self.description) {
            (Some(kind), Some(description)) => format!("{kind} ({description})"),
            (Some(label), None) | (None, Some(label)) => label.clone(),
            (None, None) => format!("account {}", self.id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    pub fn locate(home: &Path) -> Option<Self> {
        let path = home.join(DATABASE);
        path.exists().then_some(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accounts whose user name is the identity, or whose description
    /// mentions it.
    pub fn accounts_for(&self, identity: &str) -> StoreResult<Vec<SystemAccount>> {
        let snapshot = Snapshot::of(&self.path)?;
        if !snapshot.has_table("ZACCOUNT")? {
            return Err(StoreError::Malformed {
                what: "account database",
                detail: format!("{} has no ZACCOUNT table", self.path.display()),
            });
        }
        let query = if snapshot.has_table("ZACCOUNTTYPE")? {
            ACCOUNTS_WITH_TYPE
        } else {
            ACCOUNTS
        };

        let mut statement = snapshot.connection().prepare(query)?;
        let accounts = statement
            .query_map(params![identity], |row| {
                Ok(SystemAccount {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    description: row.get(2)?,
                    account_type: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        debug!("{} system accounts match in {}", accounts.len(), self.path.display());
        Ok(accounts)
    }
}
