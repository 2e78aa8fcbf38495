// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client-side request validation.
//
// Every request is checked before it is encoded, so a malformed field fails
// fast without a network round trip.  The limits mirror the service's
// published constraints; the first violation found is reported.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::model::{
    AdaptersConfig, Document, DocumentLocation, HumanLoopConfig, NotificationChannel,
    OutputConfig, QueriesConfig, S3Object,
};

pub type ValidationResult = std::result::Result<(), ValidationError>;

/// Implemented by every request type.
pub trait Validate {
    fn validate(&self) -> ValidationResult;
}

/// Largest inline document accepted by the synchronous operations.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

pub const MAX_QUERIES: usize = 15;
pub const MAX_ADAPTERS: usize = 100;
pub const MAX_TAGS: usize = 200;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static validation pattern")
}

static PAGES: LazyLock<Regex> = LazyLock::new(|| compile(r"^[0-9*-]+$"));
static TOKEN: LazyLock<Regex> = LazyLock::new(|| compile(r"^[a-zA-Z0-9-_]+$"));
static JOB_TAG: LazyLock<Regex> = LazyLock::new(|| compile(r"^[a-zA-Z0-9_.\-:]+$"));
static QUERY_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    compile(r##"^[a-zA-Z0-9\s!"#$%'&()*+,\-./:;=?@\[\\\]^_`{|}~><]+$"##)
});
static KMS_KEY: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[A-Za-z0-9][A-Za-z0-9:_/+=,@.-]*$"));
static SNS_ARN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^arn:([a-z\d-]+):sns:[a-zA-Z\d-]{1,20}:\w{12}:.+$"));
static ROLE_ARN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^arn:([a-z\d-]+):iam::\d{12}:role/?[a-zA-Z_0-9+=,.@\-/]+$"));
static BUCKET: LazyLock<Regex> = LazyLock::new(|| compile(r"^[0-9A-Za-z.\-_]*$"));
static HUMAN_LOOP_NAME: LazyLock<Regex> = LazyLock::new(|| compile(r"^[a-z0-9](-*[a-z0-9])*$"));
static TAG_TEXT: LazyLock<Regex> = LazyLock::new(|| compile(r"^[\p{L}\p{Z}\p{N}_.:/=+\-@]*$"));

// ---------------------------------------------------------------------------
// Primitive constraints
// ---------------------------------------------------------------------------

/// Length in characters within `min..=max`.
pub fn length(field: &str, value: &str, min: usize, max: usize) -> ValidationResult {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::new(
            field,
            format!("length {len} outside {min}-{max}"),
        ));
    }
    Ok(())
}

pub fn pattern(field: &str, value: &str, re: &Regex) -> ValidationResult {
    if !re.is_match(value) {
        return Err(ValidationError::new(
            field,
            format!("'{value}' does not match {}", re.as_str()),
        ));
    }
    Ok(())
}

pub fn non_blank(field: &str, value: &str) -> ValidationResult {
    if value.chars().all(char::is_whitespace) {
        return Err(ValidationError::new(field, "must contain a non-whitespace character"));
    }
    Ok(())
}

pub fn range(field: &str, value: u32, min: u32, max: u32) -> ValidationResult {
    if value < min || value > max {
        return Err(ValidationError::new(
            field,
            format!("{value} outside {min}-{max}"),
        ));
    }
    Ok(())
}

/// Number of list entries within `min..=max`.
pub fn count(field: &str, len: usize, min: usize, max: usize) -> ValidationResult {
    if len < min || len > max {
        return Err(ValidationError::new(
            field,
            format!("{len} entries, expected {min}-{max}"),
        ));
    }
    Ok(())
}

pub fn required<'a, T>(field: &str, value: Option<&'a T>) -> Result<&'a T, ValidationError> {
    value.ok_or_else(|| ValidationError::new(field, "is required"))
}

// ---------------------------------------------------------------------------
// Page selectors
// ---------------------------------------------------------------------------

/// One parsed entry of a `Pages` list.  Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelector {
    /// `*`
    All,
    /// `N`
    Single(u32),
    /// `N-M`
    Range(u32, u32),
    /// `N-*`
    From(u32),
}

impl PageSelector {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw == "*" {
            return Ok(Self::All);
        }
        match raw.split_once('-') {
            None => parse_page_number(raw).map(Self::Single),
            Some((start, "*")) => parse_page_number(start).map(Self::From),
            Some((start, end)) => {
                let start = parse_page_number(start)?;
                let end = parse_page_number(end)?;
                if end < start {
                    return Err(format!("range {start}-{end} runs backwards"));
                }
                Ok(Self::Range(start, end))
            }
        }
    }

    pub fn contains(&self, page: u32) -> bool {
        match *self {
            Self::All => true,
            Self::Single(n) => page == n,
            Self::Range(start, end) => (start..=end).contains(&page),
            Self::From(start) => page >= start,
        }
    }
}

impl fmt::Display for PageSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}-{end}"),
            Self::From(start) => write!(f, "{start}-*"),
        }
    }
}

fn parse_page_number(raw: &str) -> Result<u32, String> {
    let n: u32 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a page number"))?;
    if n == 0 {
        return Err("pages are numbered from 1".into());
    }
    Ok(n)
}

/// Whether `page` is selected by a `Pages` list; an absent list selects all.
pub fn pages_select(pages: Option<&[String]>, page: u32) -> bool {
    match pages {
        None => true,
        Some(pages) => pages
            .iter()
            .filter_map(|p| PageSelector::parse(p).ok())
            .any(|sel| sel.contains(page)),
    }
}

/// Validate a `Pages` list: `*` alone, or entries of the form `N`, `N-M`, `N-*`.
pub fn pages(field: &str, pages: &[String]) -> ValidationResult {
    count(field, pages.len(), 1, usize::MAX)?;
    if pages.len() > 1 && pages.iter().any(|p| p == "*") {
        return Err(ValidationError::new(field, "\"*\" must be the only entry"));
    }
    for (i, page) in pages.iter().enumerate() {
        let entry = format!("{field}[{i}]");
        length(&entry, page, 1, 9)?;
        pattern(&entry, page, &PAGES)?;
        PageSelector::parse(page).map_err(|reason| ValidationError::new(&entry, reason))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared members
// ---------------------------------------------------------------------------

pub fn client_request_token(field: &str, token: Option<&String>) -> ValidationResult {
    if let Some(token) = token {
        length(field, token, 1, 64)?;
        pattern(field, token, &TOKEN)?;
    }
    Ok(())
}

pub fn job_id(field: &str, id: &str) -> ValidationResult {
    length(field, id, 1, 64)?;
    pattern(field, id, &TOKEN)
}

pub fn job_tag(field: &str, tag: Option<&String>) -> ValidationResult {
    if let Some(tag) = tag {
        length(field, tag, 1, 64)?;
        pattern(field, tag, &JOB_TAG)?;
    }
    Ok(())
}

pub fn next_token(field: &str, token: Option<&String>) -> ValidationResult {
    if let Some(token) = token {
        length(field, token, 1, 255)?;
        non_blank(field, token)?;
    }
    Ok(())
}

pub fn max_results(field: &str, value: Option<u32>, max: u32) -> ValidationResult {
    match value {
        Some(value) => range(field, value, 1, max),
        None => Ok(()),
    }
}

pub fn kms_key_id(field: &str, key: Option<&String>) -> ValidationResult {
    if let Some(key) = key {
        length(field, key, 1, 2048)?;
        pattern(field, key, &KMS_KEY)?;
    }
    Ok(())
}

pub fn s3_object(field: &str, object: &S3Object) -> ValidationResult {
    if let Some(bucket) = &object.bucket {
        let f = format!("{field}.Bucket");
        length(&f, bucket, 3, 255)?;
        pattern(&f, bucket, &BUCKET)?;
    }
    if let Some(name) = &object.name {
        let f = format!("{field}.Name");
        length(&f, name, 1, 1024)?;
        non_blank(&f, name)?;
    }
    if let Some(version) = &object.version {
        let f = format!("{field}.Version");
        length(&f, version, 1, 1024)?;
        non_blank(&f, version)?;
    }
    Ok(())
}

pub fn document(field: &str, document: &Document) -> ValidationResult {
    match (&document.bytes, &document.s3_object) {
        (Some(_), Some(_)) => Err(ValidationError::new(
            field,
            "set either Bytes or S3Object, not both",
        )),
        (None, None) => Err(ValidationError::new(field, "Bytes or S3Object is required")),
        (Some(bytes), None) => {
            if bytes.is_empty() || bytes.len() > MAX_DOCUMENT_BYTES {
                return Err(ValidationError::new(
                    format!("{field}.Bytes"),
                    format!("{} bytes, expected 1-{MAX_DOCUMENT_BYTES}", bytes.len()),
                ));
            }
            Ok(())
        }
        (None, Some(object)) => s3_object(&format!("{field}.S3Object"), object),
    }
}

pub fn document_location(field: &str, location: &DocumentLocation) -> ValidationResult {
    let f = format!("{field}.S3Object");
    let object = required(&f, location.s3_object.as_ref())?;
    required(&format!("{f}.Bucket"), object.bucket.as_ref())?;
    required(&format!("{f}.Name"), object.name.as_ref())?;
    s3_object(&f, object)
}

pub fn notification_channel(field: &str, channel: Option<&NotificationChannel>) -> ValidationResult {
    if let Some(channel) = channel {
        let f = format!("{field}.SNSTopicArn");
        length(&f, &channel.sns_topic_arn, 20, 1024)?;
        pattern(&f, &channel.sns_topic_arn, &SNS_ARN)?;
        let f = format!("{field}.RoleArn");
        length(&f, &channel.role_arn, 20, 2048)?;
        pattern(&f, &channel.role_arn, &ROLE_ARN)?;
    }
    Ok(())
}

pub fn output_config(field: &str, config: Option<&OutputConfig>) -> ValidationResult {
    if let Some(config) = config {
        let f = format!("{field}.S3Bucket");
        length(&f, &config.s3_bucket, 3, 255)?;
        pattern(&f, &config.s3_bucket, &BUCKET)?;
        if let Some(prefix) = &config.s3_prefix {
            let f = format!("{field}.S3Prefix");
            length(&f, prefix, 1, 1024)?;
            non_blank(&f, prefix)?;
        }
    }
    Ok(())
}

pub fn human_loop_config(field: &str, config: Option<&HumanLoopConfig>) -> ValidationResult {
    if let Some(config) = config {
        let f = format!("{field}.HumanLoopName");
        length(&f, &config.human_loop_name, 1, 63)?;
        pattern(&f, &config.human_loop_name, &HUMAN_LOOP_NAME)?;
        length(
            &format!("{field}.FlowDefinitionArn"),
            &config.flow_definition_arn,
            1,
            256,
        )?;
    }
    Ok(())
}

pub fn queries_config(field: &str, config: &QueriesConfig) -> ValidationResult {
    let f = format!("{field}.Queries");
    count(&f, config.queries.len(), 1, MAX_QUERIES)?;
    for (i, query) in config.queries.iter().enumerate() {
        let q = format!("{f}[{i}]");
        length(&format!("{q}.Text"), &query.text, 1, 200)?;
        pattern(&format!("{q}.Text"), &query.text, &QUERY_TEXT)?;
        if let Some(alias) = &query.alias {
            length(&format!("{q}.Alias"), alias, 1, 200)?;
            pattern(&format!("{q}.Alias"), alias, &QUERY_TEXT)?;
        }
        if let Some(selected) = &query.pages {
            pages(&format!("{q}.Pages"), selected)?;
        }
    }
    Ok(())
}

pub fn adapter_id(field: &str, id: &str) -> ValidationResult {
    length(field, id, 12, 1011)?;
    pattern(field, id, &TOKEN)
}

pub fn adapter_version(field: &str, version: &str) -> ValidationResult {
    length(field, version, 1, 128)?;
    pattern(field, version, &TOKEN)
}

pub fn adapters_config(field: &str, config: &AdaptersConfig) -> ValidationResult {
    let f = format!("{field}.Adapters");
    count(&f, config.adapters.len(), 1, MAX_ADAPTERS)?;
    for (i, adapter) in config.adapters.iter().enumerate() {
        let a = format!("{f}[{i}]");
        adapter_id(&format!("{a}.AdapterId"), &adapter.adapter_id)?;
        adapter_version(&format!("{a}.Version"), &adapter.version)?;
        if let Some(selected) = &adapter.pages {
            pages(&format!("{a}.Pages"), selected)?;
        }
    }
    Ok(())
}

pub fn adapter_name(field: &str, name: &str) -> ValidationResult {
    length(field, name, 1, 128)?;
    pattern(field, name, &TOKEN)
}

pub fn description(field: &str, description: Option<&String>) -> ValidationResult {
    if let Some(description) = description {
        length(field, description, 1, 256)?;
        pattern(field, description, &QUERY_TEXT)?;
    }
    Ok(())
}

pub fn resource_arn(field: &str, arn: &str) -> ValidationResult {
    length(field, arn, 1, 1011)
}

pub fn tag_key(field: &str, key: &str) -> ValidationResult {
    length(field, key, 1, 128)?;
    pattern(field, key, &TAG_TEXT)?;
    if key.starts_with("aws:") {
        return Err(ValidationError::new(field, "the aws: prefix is reserved"));
    }
    Ok(())
}

pub fn tags(field: &str, tags: &BTreeMap<String, String>) -> ValidationResult {
    count(field, tags.len(), 0, MAX_TAGS)?;
    for (key, value) in tags {
        tag_key(&format!("{field}.{key}"), key)?;
        let f = format!("{field}.{key}.value");
        length(&f, value, 0, 256)?;
        pattern(&f, value, &TAG_TEXT)?;
    }
    Ok(())
}

/// Reject repeated entries in an enum list.
pub fn distinct<T: Eq + std::hash::Hash + fmt::Display>(field: &str, items: &[T]) -> ValidationResult {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item) {
            return Err(ValidationError::new(field, format!("{item} listed twice")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Adapter, Query};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn star_alone_is_accepted() {
        assert!(pages("Pages", &strings(&["*"])).is_ok());
    }

    #[test]
    fn star_with_other_entries_is_rejected() {
        let err = pages("Pages", &strings(&["*", "2"])).unwrap_err();
        assert_eq!(err.field, "Pages");
        assert!(pages("Pages", &strings(&["1", "*"])).is_err());
    }

    #[test]
    fn open_ended_range_is_accepted() {
        assert!(pages("Pages", &strings(&["4-*"])).is_ok());
        assert!(pages("Pages", &strings(&["1", "3-5", "7-*"])).is_ok());
    }

    #[test]
    fn page_zero_is_rejected() {
        let err = pages("Pages", &strings(&["0"])).unwrap_err();
        assert_eq!(err.field, "Pages[0]");
        assert!(pages("Pages", &strings(&["0-3"])).is_err());
    }

    #[test]
    fn malformed_selectors_are_rejected() {
        for bad in ["*-3", "-3", "3-", "1-2-3", "5-2", "a", "", "1234567890"] {
            assert!(pages("Pages", &strings(&[bad])).is_err(), "{bad} accepted");
        }
        assert!(pages("Pages", &[]).is_err());
    }

    #[test]
    fn selectors_match_pages() {
        assert!(PageSelector::parse("4-*").expect("valid").contains(9));
        assert!(!PageSelector::parse("4-*").expect("valid").contains(3));
        assert!(PageSelector::parse("2-3").expect("valid").contains(3));
        assert!(pages_select(None, 42));
        assert!(pages_select(Some(&strings(&["1", "5"])), 5));
        assert!(!pages_select(Some(&strings(&["1", "5"])), 2));
    }

    #[test]
    fn selector_display_round_trips() {
        for raw in ["*", "3", "2-4", "6-*"] {
            let sel = PageSelector::parse(raw).expect("valid");
            assert_eq!(sel.to_string(), raw);
        }
    }

    #[test]
    fn adapter_id_length_bounds() {
        assert!(adapter_id("AdapterId", &"a".repeat(11)).is_err());
        assert!(adapter_id("AdapterId", &"a".repeat(12)).is_ok());
        assert!(adapter_id("AdapterId", &"a".repeat(1011)).is_ok());
        assert!(adapter_id("AdapterId", &"a".repeat(1012)).is_err());
    }

    #[test]
    fn adapters_config_reports_entry_path() {
        let config = AdaptersConfig {
            adapters: vec![
                Adapter::new("abcdefghijkl", "1"),
                Adapter::new("abcdefghijkl", "1").with_pages(["0"]),
            ],
        };
        let err = adapters_config("AdaptersConfig", &config).unwrap_err();
        assert_eq!(err.field, "AdaptersConfig.Adapters[1].Pages[0]");
    }

    #[test]
    fn query_limits() {
        let long = "x".repeat(201);
        let config = QueriesConfig {
            queries: vec![Query::new(long)],
        };
        assert!(queries_config("QueriesConfig", &config).is_err());

        let config = QueriesConfig {
            queries: vec![Query::new("What is the total?").with_alias("TOTAL")],
        };
        assert!(queries_config("QueriesConfig", &config).is_ok());

        assert!(queries_config("QueriesConfig", &QueriesConfig::default()).is_err());
    }

    #[test]
    fn request_token_pattern() {
        assert!(client_request_token("T", Some(&"job-1_a".to_string())).is_ok());
        assert!(client_request_token("T", Some(&"has space".to_string())).is_err());
        assert!(client_request_token("T", Some(&"x".repeat(65))).is_err());
        assert!(client_request_token("T", None).is_ok());
    }

    #[test]
    fn document_requires_exactly_one_source() {
        assert!(document("Document", &Document::default()).is_err());
        assert!(document("Document", &Document::from_bytes(b"x".to_vec())).is_ok());
        let both = Document {
            bytes: Some(b"x".to_vec()),
            s3_object: Some(S3Object::new("bucket", "key")),
        };
        assert!(document("Document", &both).is_err());
        assert!(document("Document", &Document::from_bytes(Vec::new())).is_err());
    }

    #[test]
    fn notification_channel_arns() {
        let good = NotificationChannel {
            sns_topic_arn: "arn:aws:sns:us-east-1:123456789012:textract-done".into(),
            role_arn: "arn:aws:iam::123456789012:role/TextractRole".into(),
        };
        assert!(notification_channel("NotificationChannel", Some(&good)).is_ok());

        let bad = NotificationChannel {
            sns_topic_arn: "not-an-arn-at-all-but-long".into(),
            ..good
        };
        let err = notification_channel("NotificationChannel", Some(&bad)).unwrap_err();
        assert_eq!(err.field, "NotificationChannel.SNSTopicArn");
    }

    #[test]
    fn reserved_tag_prefix() {
        let mut tags_map = BTreeMap::new();
        tags_map.insert("aws:owner".to_string(), "me".to_string());
        assert!(tags("Tags", &tags_map).is_err());

        let mut tags_map = BTreeMap::new();
        tags_map.insert("team".to_string(), "docs".to_string());
        assert!(tags("Tags", &tags_map).is_ok());
    }

    #[test]
    fn distinct_rejects_duplicates() {
        use crate::model::FeatureType;
        let features = vec![FeatureType::Tables, FeatureType::Tables];
        assert!(distinct("FeatureTypes", &features).is_err());
    }
}
