//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from s3ops-core.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_smithy_types::error::display::DisplayErrorContext;
use tokio::io::AsyncWriteExt;

use s3ops_core::{
    DeleteFailure, DeleteOutcome, Error, ListPage, ListRequest, ObjectKey, ObjectStore,
    ObjectSummary, Result, StorageConfig,
};

/// S3 client bound to one bucket
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from storage settings
    pub async fn new(storage: &StorageConfig) -> Result<Self> {
        storage.validate()?;

        let credentials = aws_credential_types::Credentials::new(
            storage.access_key.clone(),
            storage.secret_key.clone(),
            None, // session token
            None, // expiry
            "s3ops-static-credentials",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(storage.region.clone()))
            .endpoint_url(&storage.endpoint)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(storage.force_path_style())
            .build();

        tracing::debug!(
            endpoint = %storage.endpoint,
            bucket = %storage.bucket,
            path_style = storage.force_path_style(),
            "created S3 client"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: storage.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_objects(&self, request: ListRequest) -> Result<ListPage> {
        let response = self
            .inner
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(request.prefix)
            .set_continuation_token(request.continuation_token)
            .max_keys(request.max_keys)
            .send()
            .await
            .map_err(|e| classify("list objects", e))?;

        Ok(page_from_output(&response))
    }

    async fn put_object(&self, key: &ObjectKey, source: &Path) -> Result<()> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| Error::General(format!("cannot read {}: {e}", source.display())))?;
        let content_type = mime_guess::from_path(source).first_or_octet_stream();

        self.inner
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .content_type(content_type.essence_str())
            .body(body)
            .send()
            .await
            .map_err(|e| classify(&format!("put {key}"), e))?;

        Ok(())
    }

    async fn get_object(&self, key: &str, destination: &Path) -> Result<()> {
        let response = self
            .inner
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(&format!("get {key}"), e))?;

        let body = response.body.into_async_read();
        tokio::pin!(body);
        let partial = partial_path(destination);
        let mut file = tokio::fs::File::create(&partial).await?;
        let copied = match tokio::io::copy(&mut body, &mut file).await {
            Ok(n) => file.flush().await.map(|()| n),
            Err(e) => Err(e),
        };
        drop(file);

        let finished = match copied {
            Ok(bytes) => tokio::fs::rename(&partial, destination).await.map(|()| bytes),
            Err(e) => Err(e),
        };

        match finished {
            Ok(bytes) => {
                tracing::debug!(key, bytes, "wrote {}", destination.display());
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    tracing::warn!("cannot remove partial file {}: {cleanup}", partial.display());
                }
                Err(Error::StorageUnavailable(format!("get {key}: {e}")))
            }
        }
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<DeleteOutcome> {
        if keys.is_empty() {
            return Ok(DeleteOutcome::default());
        }

        let objects = keys
            .iter()
            .map(|key| {
                ObjectIdentifier::builder()
                    .key(key)
                    .build()
                    .map_err(|e| Error::General(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(false)
            .build()
            .map_err(|e| Error::General(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| classify("delete objects", e))?;

        let errors: Vec<DeleteFailure> = response
            .errors()
            .iter()
            .map(|e| DeleteFailure {
                key: e.key().unwrap_or_default().to_string(),
                message: delete_error_message(e.code(), e.message()),
            })
            .collect();

        if !errors.is_empty() {
            tracing::warn!("failed to delete {} of {} objects", errors.len(), keys.len());
        }

        Ok(DeleteOutcome {
            deleted: response.deleted().len(),
            errors,
        })
    }
}

/// Convert one listing response into a page
fn page_from_output(output: &ListObjectsV2Output) -> ListPage {
    let objects = output
        .contents()
        .iter()
        .filter_map(|object| {
            let key = object.key()?;
            let mut summary =
                ObjectSummary::new(key, u64::try_from(object.size().unwrap_or(0)).unwrap_or(0));
            summary.last_modified = object
                .last_modified()
                .and_then(|modified| jiff::Timestamp::from_second(modified.secs()).ok());
            Some(summary)
        })
        .collect();

    let next_token = if output.is_truncated().unwrap_or(false) {
        output.next_continuation_token().map(str::to_string)
    } else {
        None
    };

    ListPage {
        objects,
        next_token,
    }
}

/// Sibling file a download is written to before it replaces `destination`
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(destination.file_name().unwrap_or_default());
    name.push(".s3ops-part");
    destination.with_file_name(name)
}

fn delete_error_message(code: Option<&str>, message: Option<&str>) -> String {
    match (code, message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(text), None) | (None, Some(text)) => text.to_string(),
        (None, None) => "unknown error".to_string(),
    }
}

/// Map an SDK error onto the engine's error kinds using its service code
fn classify<E, R>(context: &str, err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = format!("{context}: {}", DisplayErrorContext(&err));
    classify_code(err.code(), message)
}

fn classify_code(code: Option<&str>, message: String) -> Error {
    match code {
        Some(
            "AccessDenied"
            | "InvalidAccessKeyId"
            | "SignatureDoesNotMatch"
            | "ExpiredToken"
            | "InvalidToken",
        ) => Error::Auth(message),
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound") => Error::NotFound(message),
        _ => Error::StorageUnavailable(message),
    }
}
