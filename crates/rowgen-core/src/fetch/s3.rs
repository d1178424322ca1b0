//! Credentialed object-store reads for `s3:` resources.
//!
//! The crate ships no S3 client. Callers plug one in through [`ObjectStore`]
//! and supply credentials through a [`CredentialProvider`] keyed by bucket.

use crate::error::{Result, RowgenError};
use serde::Deserialize;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

/// Raw credentials as a provider returns them. Either key may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    #[serde(default, alias = "access_key")]
    pub access: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

/// Validated credentials for one bucket.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub access: String,
    pub secret: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("access", &self.access)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// `(netloc) -> credentials`; `None` when nothing is known for that bucket.
pub type CredentialProvider = Arc<dyn Fn(&str) -> Option<Credentials> + Send + Sync>;

/// Reads objects from a bucket on behalf of the fetcher.
pub trait ObjectStore: Send + Sync {
    /// Opens `key` in `bucket`. An `io::ErrorKind::NotFound` error means the
    /// object does not exist.
    fn get(&self, bucket: &str, key: &str, account: &Account) -> io::Result<Box<dyn Read + Send>>;
}

/// Asks `provider` for the credentials of `netloc`, failing with the names
/// of any missing keys.
pub fn get_credentials(provider: Option<&CredentialProvider>, netloc: &str) -> Result<Account> {
    let creds = provider.and_then(|p| (**p)(netloc)).unwrap_or_default();
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());

    let mut missing = Vec::new();
    if !present(&creds.access) {
        missing.push("access".to_string());
    }
    if !present(&creds.secret) {
        missing.push("secret".to_string());
    }
    match (creds.access, creds.secret) {
        (Some(access), Some(secret)) if missing.is_empty() => Ok(Account { access, secret }),
        _ => Err(RowgenError::MissingCredentials {
            netloc: netloc.to_string(),
            missing,
        }),
    }
}

/// Splits `s3://bucket/key` into `(bucket, key)`.
pub(crate) fn split_s3_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("s3://")?;
    let (bucket, key) = rest.split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }
    Some((bucket, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(creds: Option<Credentials>) -> CredentialProvider {
        Arc::new(move |_netloc: &str| creds.clone())
    }

    #[test]
    fn full_credentials() {
        let p = provider(Some(Credentials {
            access: Some("AK".into()),
            secret: Some("SK".into()),
        }));
        let acct = get_credentials(Some(&p), "bucket").unwrap();
        assert_eq!(acct.access, "AK");
        assert!(!format!("{:?}", acct).contains("SK"));
    }

    #[test]
    fn missing_secret_is_named() {
        let p = provider(Some(Credentials {
            access: Some("AK".into()),
            secret: None,
        }));
        match get_credentials(Some(&p), "bucket") {
            Err(RowgenError::MissingCredentials { netloc, missing }) => {
                assert_eq!(netloc, "bucket");
                assert_eq!(missing, vec!["secret".to_string()]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn no_provider_misses_everything() {
        let err = get_credentials(None, "b").unwrap_err();
        assert!(err.to_string().contains("access, secret"));
    }

    #[test]
    fn access_key_alias() {
        let c: Credentials =
            serde_json::from_str(r#"{"access_key": "AK", "secret": "SK"}"#).unwrap();
        assert_eq!(c.access.as_deref(), Some("AK"));
    }

    #[test]
    fn split_bucket_and_key() {
        assert_eq!(split_s3_url("s3://b/dir/k.csv"), Some(("b", "dir/k.csv")));
        assert_eq!(split_s3_url("s3://b"), None);
        assert_eq!(split_s3_url("https://b/k"), None);
    }
}
