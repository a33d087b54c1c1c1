//! Remote object store for generated datasets.
//!
//! The pipeline only talks to [`RemoteStore`]. `S3Store` targets S3 and
//! S3-compatible endpoints; `LocalDirStore` mirrors the same contract on a
//! local directory for offline runs and tests. Failures are classified as
//! configuration, connectivity or service errors and never retried.

use crate::config::RemoteSettings;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

/// Placeholder values shipped in sample configs; treated as "not configured".
const PLACEHOLDERS: [&str; 3] = [
    "YOUR_AWS_ACCESS_KEY_ID",
    "YOUR_AWS_SECRET_ACCESS_KEY",
    "YOUR_S3_BUCKET_NAME",
];

/// Location of an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocator {
    pub bucket: String,
    pub key: String,
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Post-upload metadata reported by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMetadata {
    pub size: u64,
    /// ETag for S3, BLAKE3 hex digest for local stores
    pub checksum: String,
    pub last_modified: Option<DateTime<Utc>>,
}

pub trait RemoteStore {
    /// Check that the bucket exists and is accessible.
    fn check_access(&self) -> Result<()>;

    fn put(&self, local_path: &Path, key: &str) -> Result<ObjectLocator>;

    fn verify(&self, locator: &ObjectLocator) -> Result<ObjectMetadata>;

    /// Browser URL for the object, when the store has one.
    fn console_url(&self, _locator: &ObjectLocator) -> Option<String> {
        None
    }
}

/// Object key for a local file: `prefix` followed by the file name.
pub fn object_key(prefix: &str, local_path: &Path) -> Result<String> {
    let name = local_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            Error::RemoteConfig(format!("cannot derive object key from {}", local_path.display()))
        })?;
    Ok(format!("{}{}", prefix, name))
}

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Upload `local_path` under `prefix` and verify the stored object.
///
/// The remote size must equal the local size; anything else is reported as a
/// service error.
pub fn upload_and_verify(
    store: &dyn RemoteStore,
    local_path: &Path,
    prefix: &str,
) -> Result<(ObjectLocator, ObjectMetadata)> {
    let local_size = std::fs::metadata(local_path)
        .map_err(|e| Error::DataSource {
            path: local_path.to_path_buf(),
            reason: format!("{} (generate the dataset before uploading)", e),
        })?
        .len();

    store.check_access()?;

    let key = object_key(prefix, local_path)?;
    tracing::info!("File size: {:.2} MB", megabytes(local_size));
    let locator = store.put(local_path, &key)?;
    tracing::info!("Successfully uploaded to {}", locator);

    tracing::info!("Verifying upload...");
    let metadata = store.verify(&locator)?;
    if metadata.size != local_size {
        return Err(Error::RemoteService {
            code: "SizeMismatch".to_string(),
            message: format!(
                "{} has {} bytes, local file has {}",
                locator, metadata.size, local_size
            ),
        });
    }

    tracing::info!("Verification successful!");
    tracing::info!("  Size: {:.2} MB", megabytes(metadata.size));
    if let Some(ts) = metadata.last_modified {
        tracing::info!("  Last Modified: {}", ts);
    }
    tracing::info!("  Checksum: {}", metadata.checksum);
    if let Some(url) = store.console_url(&locator) {
        tracing::info!("Console URL: {}", url);
    }

    Ok((locator, metadata))
}

// ============================================================================
// Local Directory Store
// ============================================================================

/// Store backed by a local directory; the directory plays the bucket.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket(&self) -> String {
        self.root.display().to_string()
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(Error::RemoteConfig(format!("invalid object key '{}'", key)));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(context: &str, err: std::io::Error) -> Error {
    Error::RemoteService {
        code: format!("{:?}", err.kind()),
        message: format!("{}: {}", context, err),
    }
}

impl RemoteStore for LocalDirStore {
    fn check_access(&self) -> Result<()> {
        tracing::info!("Verifying bucket exists: {}", self.bucket());
        if !self.root.is_dir() {
            return Err(Error::RemoteConfig(format!(
                "bucket directory '{}' does not exist",
                self.bucket()
            )));
        }
        tracing::info!("Bucket '{}' is accessible", self.bucket());
        Ok(())
    }

    fn put(&self, local_path: &Path, key: &str) -> Result<ObjectLocator> {
        let target = self.object_path(key)?;
        tracing::info!("Uploading {} to {}", local_path.display(), target.display());
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error("create key prefix", e))?;
        }
        std::fs::copy(local_path, &target).map_err(|e| io_error("copy object", e))?;
        Ok(ObjectLocator {
            bucket: self.bucket(),
            key: key.to_string(),
        })
    }

    fn verify(&self, locator: &ObjectLocator) -> Result<ObjectMetadata> {
        let path = self.object_path(&locator.key)?;
        let meta = std::fs::metadata(&path).map_err(|e| io_error("stat object", e))?;
        let bytes = std::fs::read(&path).map_err(|e| io_error("read object", e))?;
        Ok(ObjectMetadata {
            size: meta.len(),
            checksum: blake3::hash(&bytes).to_hex().to_string(),
            last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

// ============================================================================
// S3 Store
// ============================================================================

/// Static credentials taken from the environment.
#[derive(Clone)]
pub struct RemoteCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

impl RemoteCredentials {
    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
    /// `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let creds = Self {
            access_key_id: var("AWS_ACCESS_KEY_ID").ok_or_else(|| {
                Error::RemoteConfig("AWS credentials not configured: set AWS_ACCESS_KEY_ID".into())
            })?,
            secret_access_key: var("AWS_SECRET_ACCESS_KEY").ok_or_else(|| {
                Error::RemoteConfig("AWS credentials not configured: set AWS_SECRET_ACCESS_KEY".into())
            })?,
            session_token: var("AWS_SESSION_TOKEN"),
        };
        creds.validate()?;
        Ok(creds)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("AWS_ACCESS_KEY_ID", &self.access_key_id),
            ("AWS_SECRET_ACCESS_KEY", &self.secret_access_key),
        ] {
            if value.trim().is_empty() || PLACEHOLDERS.contains(&value.as_str()) {
                return Err(Error::RemoteConfig(format!(
                    "AWS credentials not configured: {} is missing or a placeholder",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Reject empty or placeholder bucket settings before any network call.
pub fn validate_remote_settings(settings: &RemoteSettings) -> Result<()> {
    let bucket = settings.bucket.trim();
    if bucket.is_empty() || PLACEHOLDERS.contains(&bucket) {
        return Err(Error::RemoteConfig(
            "S3 bucket not configured: set remote.bucket or --bucket".into(),
        ));
    }
    if settings.region.trim().is_empty() {
        return Err(Error::RemoteConfig("AWS region not configured".into()));
    }
    Ok(())
}

type S3Error<E> = aws_sdk_s3::error::SdkError<E, aws_sdk_s3::config::http::HttpResponse>;

/// Map an SDK failure onto the remote error taxonomy.
fn classify<E>(context: &str, err: S3Error<E>) -> Error
where
    E: aws_sdk_s3::error::ProvideErrorMetadata + std::error::Error + 'static,
{
    use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

    match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => Error::RemoteConnectivity(
            format!("{}: {}", context, DisplayErrorContext(&err)),
        ),
        SdkError::ServiceError(service) => {
            let status = service.raw().status().as_u16();
            let code = service
                .err()
                .code()
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            let message = service
                .err()
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} failed with HTTP {}", context, status));
            Error::RemoteService { code, message }
        }
        _ => Error::RemoteService {
            code: "Unknown".to_string(),
            message: format!("{}: {}", context, DisplayErrorContext(&err)),
        },
    }
}

/// Bucket probe failures: 404 and 403 mean the settings are wrong, anything
/// else goes through `classify`.
fn classify_bucket_check<E>(bucket: &str, err: S3Error<E>) -> Error
where
    E: aws_sdk_s3::error::ProvideErrorMetadata + std::error::Error + 'static,
{
    if let aws_sdk_s3::error::SdkError::ServiceError(service) = &err {
        match service.raw().status().as_u16() {
            404 => return Error::RemoteConfig(format!("S3 bucket '{}' not found", bucket)),
            403 => return Error::RemoteConfig(format!("Access denied to S3 bucket '{}'", bucket)),
            _ => {}
        }
    }
    classify("head bucket", err)
}

fn to_chrono(ts: &aws_smithy_types::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos())
}

/// S3 (or S3-compatible) store. Owns a current-thread runtime so callers
/// stay synchronous.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    runtime: tokio::runtime::Runtime,
}

impl S3Store {
    pub fn from_settings(settings: &RemoteSettings) -> Result<Self> {
        validate_remote_settings(settings)?;
        let creds = RemoteCredentials::from_env()?;
        Self::connect(settings, creds)
    }

    pub fn connect(settings: &RemoteSettings, creds: RemoteCredentials) -> Result<Self> {
        validate_remote_settings(settings)?;
        creds.validate()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::RemoteConfig(format!("cannot start I/O runtime: {}", e)))?;

        tracing::info!("Creating S3 client (region {})", settings.region);
        let credentials = aws_credential_types::Credentials::new(
            creds.access_key_id,
            creds.secret_access_key,
            creds.session_token,
            None,
            "streamsynth-env",
        );
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(settings.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = runtime.block_on(loader.load());

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.endpoint_url.is_some())
            .build();

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: settings.bucket.trim().to_string(),
            runtime,
        })
    }
}

impl RemoteStore for S3Store {
    fn check_access(&self) -> Result<()> {
        tracing::info!("Verifying bucket exists: {}", self.bucket);
        let result = self
            .runtime
            .block_on(self.client.head_bucket().bucket(&self.bucket).send());

        match result {
            Ok(_) => {
                tracing::info!("Bucket '{}' is accessible", self.bucket);
                Ok(())
            }
            Err(e) => Err(classify_bucket_check(&self.bucket, e)),
        }
    }

    fn put(&self, local_path: &Path, key: &str) -> Result<ObjectLocator> {
        let locator = ObjectLocator {
            bucket: self.bucket.clone(),
            key: key.to_string(),
        };
        tracing::info!("Uploading {} to {}", local_path.display(), locator);

        self.runtime.block_on(async {
            let body = aws_sdk_s3::primitives::ByteStream::from_path(local_path)
                .await
                .map_err(|e| Error::DataSource {
                    path: local_path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(|e| classify("put object", e))?;
            Ok::<_, Error>(())
        })?;

        Ok(locator)
    }

    fn verify(&self, locator: &ObjectLocator) -> Result<ObjectMetadata> {
        let head = self
            .runtime
            .block_on(
                self.client
                    .head_object()
                    .bucket(&locator.bucket)
                    .key(&locator.key)
                    .send(),
            )
            .map_err(|e| classify("head object", e))?;

        Ok(ObjectMetadata {
            size: head.content_length().unwrap_or_default().max(0) as u64,
            checksum: head.e_tag().unwrap_or_default().to_string(),
            last_modified: head.last_modified().and_then(to_chrono),
        })
    }

    fn console_url(&self, locator: &ObjectLocator) -> Option<String> {
        Some(format!(
            "https://s3.console.aws.amazon.com/s3/object/{}?prefix={}",
            locator.bucket, locator.key
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(bucket: &str) -> RemoteSettings {
        RemoteSettings {
            bucket: bucket.to_string(),
            ..RemoteSettings::default()
        }
    }

    #[test]
    fn test_object_key() {
        let key = object_key("streaming-data/", Path::new("/tmp/out/streaming_data.csv")).unwrap();
        assert_eq!(key, "streaming-data/streaming_data.csv");
        assert_eq!(object_key("", Path::new("a.csv")).unwrap(), "a.csv");
    }

    #[test]
    fn test_locator_display() {
        let locator = ObjectLocator {
            bucket: "music".to_string(),
            key: "streaming-data/x.csv".to_string(),
        };
        assert_eq!(locator.to_string(), "s3://music/streaming-data/x.csv");
    }

    #[test]
    fn test_placeholder_settings_rejected() {
        assert!(matches!(
            validate_remote_settings(&settings("")).unwrap_err(),
            Error::RemoteConfig(_)
        ));
        assert!(matches!(
            validate_remote_settings(&settings("YOUR_S3_BUCKET_NAME")).unwrap_err(),
            Error::RemoteConfig(_)
        ));
        assert!(validate_remote_settings(&settings("music-analytics")).is_ok());
    }

    #[test]
    fn test_placeholder_credentials_rejected() {
        let creds = RemoteCredentials {
            access_key_id: "YOUR_AWS_ACCESS_KEY_ID".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
        };
        let err = creds.validate().unwrap_err();
        assert!(err.to_string().contains("AWS_ACCESS_KEY_ID"));
        assert_eq!(err.kind(), "remote_config");
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = RemoteCredentials {
            access_key_id: "AKIA123".to_string(),
            secret_access_key: "topsecret".to_string(),
            session_token: None,
        };
        assert!(!format!("{:?}", creds).contains("topsecret"));
    }

    #[test]
    fn test_local_upload_and_verify() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = dir.path().join("bucket");
        std::fs::create_dir(&bucket).unwrap();
        let local = dir.path().join("streaming_data.csv");
        std::fs::write(&local, "date,track_id\n2023-01-01,abc\n").unwrap();

        let store = LocalDirStore::new(&bucket);
        let (locator, metadata) = upload_and_verify(&store, &local, "streaming-data/").unwrap();

        assert_eq!(locator.key, "streaming-data/streaming_data.csv");
        assert_eq!(metadata.size, std::fs::metadata(&local).unwrap().len());
        assert_eq!(
            metadata.checksum,
            blake3::hash(&std::fs::read(&local).unwrap()).to_hex().to_string()
        );
        assert!(bucket.join("streaming-data/streaming_data.csv").exists());
    }

    #[test]
    fn test_local_missing_bucket_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("data.csv");
        std::fs::write(&local, "x").unwrap();
        let store = LocalDirStore::new(dir.path().join("missing"));
        let err = upload_and_verify(&store, &local, "").unwrap_err();
        assert!(matches!(err, Error::RemoteConfig(_)));
    }

    #[test]
    fn test_missing_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());
        let err = upload_and_verify(&store, &dir.path().join("absent.csv"), "").unwrap_err();
        assert!(matches!(err, Error::DataSource { .. }));
    }

    #[test]
    fn test_local_verify_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());
        let locator = ObjectLocator {
            bucket: store.bucket(),
            key: "nothing.csv".to_string(),
        };
        assert!(matches!(store.verify(&locator).unwrap_err(), Error::RemoteService { .. }));
    }

    #[test]
    fn test_local_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());
        assert!(store.object_path("../outside.csv").is_err());
        assert!(store.object_path("/abs.csv").is_err());
        assert!(store.object_path("prefix/ok.csv").is_ok());
    }

    mod classification {
        use super::*;
        use aws_sdk_s3::config::http::HttpResponse;
        use aws_sdk_s3::error::SdkError;
        use aws_smithy_types::error::ErrorMetadata;
        use aws_sdk_s3::operation::head_bucket::HeadBucketError;
        use aws_smithy_runtime_api::client::result::ConnectorError;
        use aws_smithy_runtime_api::http::StatusCode;
        use aws_smithy_types::body::SdkBody;

        fn response(status: u16) -> HttpResponse {
            HttpResponse::new(StatusCode::try_from(status).unwrap(), SdkBody::empty())
        }

        fn service_error(status: u16, code: Option<&str>) -> S3Error<HeadBucketError> {
            let mut meta = ErrorMetadata::builder();
            if let Some(code) = code {
                meta = meta.code(code).message("rejected by service");
            }
            SdkError::service_error(HeadBucketError::generic(meta.build()), response(status))
        }

        #[test]
        fn test_timeout_is_connectivity() {
            let err: S3Error<HeadBucketError> = SdkError::timeout_error("deadline elapsed");
            assert!(matches!(classify("put object", err), Error::RemoteConnectivity(_)));
        }

        #[test]
        fn test_dispatch_failure_is_connectivity() {
            let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
            let err: S3Error<HeadBucketError> =
                SdkError::dispatch_failure(ConnectorError::io(Box::new(io)));
            let classified = classify("put object", err);
            assert_eq!(classified.kind(), "remote_connectivity");
        }

        #[test]
        fn test_service_error_keeps_code() {
            match classify("put object", service_error(503, Some("SlowDown"))) {
                Error::RemoteService { code, message } => {
                    assert_eq!(code, "SlowDown");
                    assert_eq!(message, "rejected by service");
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn test_service_error_without_code_uses_status() {
            match classify("head object", service_error(500, None)) {
                Error::RemoteService { code, message } => {
                    assert_eq!(code, "500");
                    assert!(message.contains("head object"));
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        #[test]
        fn test_bucket_not_found_and_denied_are_config() {
            let missing = classify_bucket_check("music", service_error(404, None));
            assert!(matches!(&missing, Error::RemoteConfig(m) if m.contains("not found")));
            let denied = classify_bucket_check("music", service_error(403, None));
            assert!(matches!(&denied, Error::RemoteConfig(m) if m.contains("Access denied")));
            let other = classify_bucket_check("music", service_error(500, Some("InternalError")));
            assert_eq!(other.kind(), "remote_service");
        }
    }
}
