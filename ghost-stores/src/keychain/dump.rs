/*!
Text extraction for `security` output.

`dump-keychain` and `find-certificate` have no structured output mode, so
this is the one place that reads a store by parsing text. Keep it isolated:
callers only see [`KeychainItem`] and [`Certificate`].

The format is one record per `keychain:` header, e.g.

```text
keychain: "/Users/me/Library/Keychains/login.keychain-db"
version: 512
class: "genp"
attributes:
    0x00000007 <blob>="Chrome Safe Storage"
    "acct"<blob>="user@example.com"
    "svce"<blob>=0x4368726F6D65  "Chrome"
```
*/

use std::path::PathBuf;

use super::{Certificate, ItemClass, KeychainItem};

/// Attribute id of the label in `dump-keychain` output.
const LABEL_ATTRIBUTE: &str = "0x00000007";

#[derive(Default)]
struct Record {
    keychain: Option<PathBuf>,
    class: Option<String>,
    sha1: Option<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Record {
    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| value.clone())
    }

    fn into_item(self) -> Option<KeychainItem> {
        let (class, service_key) = match self.class.as_deref()? {
            "genp" => (ItemClass::Generic, "svce"),
            "inet" => (ItemClass::Internet, "srvr"),
            _ => return None,
        };
        Some(KeychainItem {
            account: self.attribute("acct")?,
            service: self.attribute(service_key).unwrap_or_default(),
            label: self
                .attribute(LABEL_ATTRIBUTE)
                .or_else(|| self.attribute("labl")),
            keychain: self.keychain,
            class,
        })
    }

    fn into_certificate(self) -> Option<Certificate> {
        Some(Certificate {
            alias: self.attribute("alis"),
            label: self.attribute("labl"),
            subject: self.attribute("subj"),
            keychain: self.keychain,
            sha1: self.sha1?,
        })
    }
}

/// Password items (`genp`, `inet`) from `security dump-keychain`.
pub(crate) fn parse_items(text: &str) -> Vec<KeychainItem> {
    let mut items = Vec::new();
    let mut current: Option<Record> = None;

    for line in text.lines() {
        if let Some(path) = line.strip_prefix("keychain: ") {
            if let Some(item) = current.take().and_then(Record::into_item) {
                items.push(item);
            }
            current = Some(Record {
                keychain: Some(PathBuf::from(unquote(path))),
                ..Record::default()
            });
            continue;
        }
        if let Some(record) = current.as_mut() {
            read_line(record, line);
        }
    }
    if let Some(item) = current.and_then(Record::into_item) {
        items.push(item);
    }
    items
}

/// Certificates from `security find-certificate -a -Z`. Each record starts
/// at its `SHA-1 hash:` line.
pub(crate) fn parse_certificates(text: &str) -> Vec<Certificate> {
    let mut certificates = Vec::new();
    let mut current: Option<Record> = None;

    for line in text.lines() {
        if let Some(hash) = line.strip_prefix("SHA-1 hash: ") {
            if let Some(certificate) = current.take().and_then(Record::into_certificate) {
                certificates.push(certificate);
            }
            current = Some(Record {
                sha1: Some(hash.trim().to_string()),
                ..Record::default()
            });
            continue;
        }
        if let Some(record) = current.as_mut() {
            if let Some(path) = line.strip_prefix("keychain: ") {
                record.keychain = Some(PathBuf::from(unquote(path)));
            } else {
                read_line(record, line);
            }
        }
    }
    if let Some(certificate) = current.and_then(Record::into_certificate) {
        certificates.push(certificate);
    }
    certificates
}

fn read_line(record: &mut Record, line: &str) {
    if let Some(class) = line.strip_prefix("class: ") {
        record.class = Some(unquote(class.trim()).to_string());
        return;
    }
    if let Some((name, value)) = parse_attribute(line) {
        record.attributes.push((name, value));
    }
}

/// `    "acct"<blob>="x"` or `    0x00000007 <blob>=...` into name and value.
fn parse_attribute(line: &str) -> Option<(String, Option<String>)> {
    let line = line.trim_start();
    let (name, rest) = if let Some(rest) = line.strip_prefix('"') {
        let end = rest.find('"')?;
        (&rest[..end], &rest[end + 1..])
    } else if line.starts_with("0x") {
        let end = line.find(|c: char| c.is_whitespace() || c == '<')?;
        (&line[..end], &line[end..])
    } else {
        return None;
    };

    let (_, raw) = rest.split_once('=')?;
    Some((name.to_string(), parse_value(raw.trim())))
}

fn parse_value(raw: &str) -> Option<String> {
    if raw == "<NULL>" || raw.is_empty() {
        return None;
    }
    if let Some(hex) = raw.strip_prefix("0x") {
        // The hex form is authoritative; the quoted rendering after it
        // mangles non-printable bytes.
        let hex = hex.split_whitespace().next()?;
        return decode_hex(hex).map(|bytes| {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            text.trim_end_matches('\0').to_string()
        });
    }
    if raw.starts_with('"') {
        return Some(unescape(unquote(raw)));
    }
    Some(raw.to_string())
}

fn unquote(raw: &str) -> &str {
    let raw = raw.trim();
    match (raw.find('"'), raw.rfind('"')) {
        (Some(start), Some(end)) if end > start => &raw[start + 1..end],
        _ => raw,
    }
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

/// Undo the `\ooo` octal and `\\` escapes `security` applies to quoted values.
fn unescape(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let octal = bytes.get(i + 1..i + 4).filter(|digits| {
                digits.iter().all(|d| (b'0'..=b'7').contains(d))
            });
            if let Some(digits) = octal {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(byte) = u8::try_from(value) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
            if bytes.get(i + 1) == Some(&b'\\') {
                out.push(b'\\');
                i += 2;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out)
        .trim_end_matches('\0')
        .to_string()
}
