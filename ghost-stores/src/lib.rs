/*!
Readers and guarded mutators for the macOS data stores that keep traces of an
email account: the login keychain, Chromium-family browser profiles, Apple
Mail, `~/.ssh`, application support data, Internet Accounts and cloud sync
preferences.

Nothing in this crate decides *whether* something should be removed. It only
knows how to find an address inside each store and how to remove a located
item, and every destructive filesystem call goes through [`fsops`], which
refuses paths covered by the [`preserve::PreservationRules`].
*/

pub mod accounts;
pub mod appdata;
pub mod browser;
pub mod command;
pub mod documents;
pub mod error;
pub mod fsops;
pub mod keychain;
pub mod mail;
pub mod preserve;
pub mod process;
pub mod snapshot;
pub mod ssh;
pub mod text;

pub use error::{StoreError, StoreResult};
pub use preserve::PreservationRules;
