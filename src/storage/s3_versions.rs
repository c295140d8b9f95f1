// s3-undelete/src/storage/s3_versions.rs
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tracing::{debug, warn};

use super::{DeleteMarkerEntry, ListingCursor, VersionPage, VersionStore};
use crate::config::StorageConfig;
use crate::errors::{AppError, Result};

const AUTH_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "InvalidToken",
    "TokenRefreshRequired",
];

const TRANSIENT_CODES: &[&str] = &[
    "SlowDown",
    "Throttling",
    "ThrottlingException",
    "RequestTimeout",
    "RequestTimeTooSkewed",
    "InternalError",
    "ServiceUnavailable",
];

/// Version store backed by an S3-compatible service (AWS, Spaces, MinIO, ...).
pub struct S3VersionStore {
    client: s3::Client,
    page_size: Option<i32>,
}

impl S3VersionStore {
    /// Builds the SDK client. Static credentials are used when both halves are
    /// configured, otherwise the default AWS provider chain applies.
    pub async fn connect(storage_config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .region(Region::new(storage_config.region.clone()));

        if let Some(endpoint) = &storage_config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(key_id), Some(secret)) = (
            &storage_config.access_key_id,
            &storage_config.secret_access_key,
        ) {
            loader = loader.credentials_provider(s3::config::Credentials::new(
                key_id,
                secret,
                None,     // session_token
                None,     // expiry
                "Static", // provider_name
            ));
        }

        let sdk_config = loader.load().await;
        let s3_config = s3::config::Builder::from(&sdk_config)
            .force_path_style(storage_config.force_path_style)
            .build();

        debug!(
            region = %storage_config.region,
            endpoint = ?storage_config.endpoint_url,
            "S3 client configured"
        );

        Self {
            client: s3::Client::from_conf(s3_config),
            page_size: storage_config.page_size,
        }
    }
}

#[async_trait]
impl VersionStore for S3VersionStore {
    async fn check_bucket(&self, bucket: &str) -> Result<()> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    return Err(AppError::NotFound(format!("bucket '{}' does not exist", bucket)));
                }
                let status = err.raw_response().map(|r| r.status().as_u16());
                Err(classify_sdk_error(err, status, format!("HeadBucket on '{}'", bucket)))
            }
        }
    }

    async fn list_versions_page(
        &self,
        bucket: &str,
        prefix: &str,
        cursor: Option<&ListingCursor>,
    ) -> Result<VersionPage> {
        let mut request = self
            .client
            .list_object_versions()
            .bucket(bucket)
            .prefix(prefix)
            .set_max_keys(self.page_size);
        if let Some(cursor) = cursor {
            request = request
                .key_marker(&cursor.key_marker)
                .set_version_id_marker(cursor.version_id_marker.clone());
        }

        let output = request.send().await.map_err(|err| {
            let status = err.raw_response().map(|r| r.status().as_u16());
            classify_sdk_error(
                err,
                status,
                format!("ListObjectVersions s3://{}/{}", bucket, prefix),
            )
        })?;

        let delete_markers = output
            .delete_markers()
            .iter()
            .filter_map(|marker| {
                Some(DeleteMarkerEntry {
                    key: marker.key()?.to_string(),
                    version_id: marker.version_id()?.to_string(),
                    is_latest: marker.is_latest().unwrap_or(false),
                })
            })
            .collect();

        let next = if output.is_truncated().unwrap_or(false) {
            let next = output.next_key_marker().map(|key_marker| ListingCursor {
                key_marker: key_marker.to_string(),
                version_id_marker: output.next_version_id_marker().map(str::to_string),
            });
            if next.is_none() {
                warn!(bucket, prefix, "listing truncated without a continuation marker");
            }
            next
        } else {
            None
        };

        Ok(VersionPage {
            delete_markers,
            next,
        })
    }

    async fn delete_marker(&self, bucket: &str, key: &str, version_id: &str) -> Result<()> {
        let result = self
            .client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .version_id(version_id)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                let code = err.as_service_error().and_then(|e| e.code());
                let status = err.raw_response().map(|r| r.status().as_u16());
                if marker_already_gone(code) {
                    debug!(key, version_id, "delete marker already gone");
                    return Ok(());
                }
                Err(classify_sdk_error(
                    err,
                    status,
                    format!("DeleteObject s3://{}/{}?versionId={}", bucket, key, version_id),
                ))
            }
        }
    }
}

/// A versioned delete that finds nothing to remove means the marker is already
/// gone. Only the key/version codes count; a bare 404 may be a missing bucket.
fn marker_already_gone(code: Option<&str>) -> bool {
    matches!(code, Some("NoSuchKey" | "NoSuchVersion"))
}

/// Maps an SDK failure onto the storage error taxonomy using the service
/// error code first and the HTTP status second.
fn classify_sdk_error<E, R>(err: SdkError<E, R>, status: Option<u16>, what: String) -> AppError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = err
        .as_service_error()
        .and_then(|e| e.code())
        .map(str::to_string);
    let connection_level = matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ResponseError(_)
    );
    let detail = format!("{}: {}", what, DisplayErrorContext(&err));

    classify(code.as_deref(), status, connection_level, detail)
}

fn classify(code: Option<&str>, status: Option<u16>, connection_level: bool, detail: String) -> AppError {
    if code.is_some_and(|c| AUTH_CODES.contains(&c)) || matches!(status, Some(401 | 403)) {
        AppError::Auth(detail)
    } else if code == Some("NoSuchBucket") {
        AppError::NotFound(detail)
    } else if code.is_some_and(|c| TRANSIENT_CODES.contains(&c))
        || matches!(status, Some(429 | 500..=599))
        || connection_level
    {
        AppError::TransientStorage(detail)
    } else {
        AppError::Storage(detail)
    }
}
