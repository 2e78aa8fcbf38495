// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document arguments: a local path or `s3://bucket/key`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use textwerk_core::error::Result;
use textwerk_core::model::{Document, QueriesConfig, Query};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Local(PathBuf),
    S3 { bucket: String, name: String },
}

impl FromStr for Input {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let Some(rest) = raw.strip_prefix("s3://") else {
            if raw.is_empty() {
                return Err("empty document path".into());
            }
            return Ok(Self::Local(PathBuf::from(raw)));
        };
        match rest.split_once('/') {
            Some((bucket, name)) if !bucket.is_empty() && !name.is_empty() => Ok(Self::S3 {
                bucket: bucket.to_owned(),
                name: name.to_owned(),
            }),
            _ => Err(format!("'{raw}' is not of the form s3://bucket/key")),
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::S3 { bucket, name } => write!(f, "s3://{bucket}/{name}"),
        }
    }
}

impl Input {
    /// Inline bytes for a local file, an S3 reference otherwise.
    pub fn document(&self) -> Result<Document> {
        match self {
            Self::Local(path) => {
                let bytes = std::fs::read(path)?;
                debug!(path = %path.display(), bytes = bytes.len(), "document read");
                Ok(Document::from_bytes(bytes))
            }
            Self::S3 { bucket, name } => Ok(Document::from_s3(bucket.as_str(), name.as_str())),
        }
    }

    /// Object name a local file gets when uploaded to the stub.
    pub fn object_name(&self) -> String {
        match self {
            Self::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".into()),
            Self::S3 { name, .. } => name.clone(),
        }
    }
}

/// `--query` values: `question` or `ALIAS=question`.
pub fn queries_config(raw: &[String]) -> Option<QueriesConfig> {
    if raw.is_empty() {
        return None;
    }
    let queries = raw
        .iter()
        .map(|q| match q.split_once('=') {
            Some((alias, text)) if !alias.contains(' ') && !alias.is_empty() => {
                Query::new(text.trim()).with_alias(alias)
            }
            _ => Query::new(q.trim()),
        })
        .collect();
    Some(QueriesConfig { queries })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_s3_and_local() {
        assert_eq!(
            "s3://bucket/path/to/doc.pdf".parse::<Input>(),
            Ok(Input::S3 {
                bucket: "bucket".into(),
                name: "path/to/doc.pdf".into()
            })
        );
        assert_eq!(
            "scans/page1.png".parse::<Input>(),
            Ok(Input::Local(PathBuf::from("scans/page1.png")))
        );
        assert!("s3://bucket".parse::<Input>().is_err());
        assert!("s3:///key".parse::<Input>().is_err());
    }

    #[test]
    fn local_file_is_sent_inline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("note.txt");
        std::fs::write(&path, b"hello").expect("write");

        let input = Input::Local(path);
        assert_eq!(input.document().expect("read").bytes.as_deref(), Some(&b"hello"[..]));
        assert_eq!(input.object_name(), "note.txt");
    }

    #[test]
    fn missing_file_is_io_error() {
        let input = Input::Local(PathBuf::from("/definitely/not/here.pdf"));
        assert!(matches!(
            input.document(),
            Err(textwerk_core::error::TextwerkError::Io(_))
        ));
    }

    #[test]
    fn query_aliases() {
        let config = queries_config(&[
            "TOTAL=What is the total?".into(),
            "Who signed = the form?".into(),
        ])
        .expect("config");
        assert_eq!(config.queries[0].alias.as_deref(), Some("TOTAL"));
        assert_eq!(config.queries[0].text, "What is the total?");
        assert_eq!(config.queries[1].alias, None);
        assert!(queries_config(&[]).is_none());
    }
}
