/*!
`~/.ssh`: key pairs identified by their public key comment, and `Host` /
`Match` blocks of the client configuration.
*/

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::fsops::{self, Removal};
use crate::preserve::PreservationRules;
use crate::text::contains_ignore_case;

/// A public key file and, when present next to it, its private half.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPair {
    pub public: PathBuf,
    pub private: Option<PathBuf>,
    pub key_type: String,
    pub comment: String,
}

impl KeyPair {
    pub fn mentions(&self, identity: &str) -> bool {
        contains_ignore_case(&self.comment, identity)
    }

    /// File name of the private key, e.g. `id_ed25519`.
    pub fn name(&self) -> String {
        self.public
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One `Host` or `Match` section of `~/.ssh/config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBlock {
    /// The header line, trimmed, e.g. `Host github-work`.
    pub header: String,
    /// Zero-based line index of the header.
    pub start: usize,
    /// The header and every line up to the next section.
    pub lines: Vec<String>,
}

impl HostBlock {
    pub fn mentions(&self, identity: &str) -> bool {
        self.lines.iter().any(|line| contains_ignore_case(line, identity))
    }
}

#[derive(Debug, Clone)]
pub struct SshDir {
    dir: PathBuf,
}

impl SshDir {
    pub fn new(home: &Path) -> Self {
        Self {
            dir: home.join(".ssh"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join("config")
    }

    /// Every readable `*.pub` file. A missing `~/.ssh` is an empty list.
    pub fn key_pairs(&self) -> StoreResult<Vec<KeyPair>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut pairs = Vec::new();
        for entry in entries {
            let public = entry.map_err(|e| StoreError::io(&self.dir, e))?.path();
            if public.extension().is_none_or(|ext| ext != "pub") || !public.is_file() {
                continue;
            }
            match read_public_key(&public) {
                Ok(Some(pair)) => pairs.push(pair),
                Ok(None) => debug!("{} is not a public key", public.display()),
                Err(e) => debug!("Skipping unreadable {}: {}", public.display(), e),
            }
        }
        pairs.sort_by(|a, b| a.public.cmp(&b.public));
        Ok(pairs)
    }

    /// Sections of the client configuration. A missing file has none.
    pub fn host_blocks(&self) -> StoreResult<Vec<HostBlock>> {
        match self.read_config()? {
            Some(text) => Ok(parse_host_blocks(&text)),
            None => Ok(Vec::new()),
        }
    }

    fn read_config(&self) -> StoreResult<Option<String>> {
        let path = self.config_path();
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Remove the first section with this header that still mentions
    /// `identity`. Returns whether the configuration changed.
    pub fn remove_host_block(
        &self,
        rules: &PreservationRules,
        header: &str,
        identity: &str,
    ) -> StoreResult<bool> {
        let Some(text) = self.read_config()? else {
            return Ok(false);
        };
        let Some(block) = parse_host_blocks(&text)
            .into_iter()
            .find(|block| block.header == header && block.mentions(identity))
        else {
            return Ok(false);
        };

        let end = block.start + block.lines.len();
        let kept: Vec<&str> = text
            .lines()
            .enumerate()
            .filter(|(index, _)| *index < block.start || *index >= end)
            .map(|(_, line)| line)
            .collect();
        let mut rewritten = kept.join("\n");
        if text.ends_with('\n') && !rewritten.is_empty() {
            rewritten.push('\n');
        }

        fsops::rewrite_file(rules, &self.config_path(), rewritten.as_bytes())?;
        Ok(true)
    }
}

/// Delete a key pair, private half first so a failure never leaves a private
/// key without the public file that identifies it.
pub fn remove_key_pair(rules: &PreservationRules, pair: &KeyPair) -> StoreResult<Removal> {
    let private = match &pair.private {
        Some(private) => fsops::remove_file(rules, private)?,
        None => Removal::AlreadyAbsent,
    };
    let public = fsops::remove_file(rules, &pair.public)?;

    if private == Removal::Removed || public == Removal::Removed {
        Ok(Removal::Removed)
    } else {
        Ok(Removal::AlreadyAbsent)
    }
}

/// Re-read the key pair at `public`, e.g. to re-verify it before deletion.
pub fn read_public_key(public: &Path) -> StoreResult<Option<KeyPair>> {
    let text = fs::read_to_string(public).map_err(|e| StoreError::io(public, e))?;
    let Some(line) = text.lines().map(str::trim).find(|line| !line.is_empty()) else {
        return Ok(None);
    };

    let mut fields = line.split_whitespace();
    let (Some(key_type), Some(_key)) = (fields.next(), fields.next()) else {
        return Ok(None);
    };
    let comment = fields.collect::<Vec<_>>().join(" ");

    let private = public.with_extension("");
    Ok(Some(KeyPair {
        public: public.to_path_buf(),
        private: private.is_file().then_some(private),
        key_type: key_type.to_string(),
        comment,
    }))
}

fn is_section_header(line: &str) -> bool {
    let keyword = line
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '=')
        .next()
        .unwrap_or_default();
    keyword.eq_ignore_ascii_case("host") || keyword.eq_ignore_ascii_case("match")
}

fn parse_host_blocks(text: &str) -> Vec<HostBlock> {
    let mut blocks: Vec<HostBlock> = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if is_section_header(line) {
            blocks.push(HostBlock {
                header: line.trim().to_string(),
                start: index,
                lines: vec![line.to_string()],
            });
        } else if let Some(block) = blocks.last_mut() {
            block.lines.push(line.to_string());
        }
    }
    blocks
}
