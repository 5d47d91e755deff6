use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream as AwsByteStream, Client};
use bytes::BytesMut;
use futures_util::StreamExt;
use tracing::info;

use crate::{BlobError, BlobInfo, BlobMetadata, BlobResult, BlobStore, ByteStream, PutResult};

/// Connection settings for an S3-compatible bucket
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Custom endpoint (MinIO, RustFS, ...); path-style addressing is used when set
    pub endpoint_url: Option<String>,
    /// Base of the publicly readable URL objects are served from
    pub public_base_url: String,
}

/// Blob store backed by an S3-compatible bucket with public reads
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3CompatibleStore {
    pub async fn connect(config: S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "wed-blob",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&shared)
                .force_path_style(config.endpoint_url.is_some())
                .build(),
        );

        info!("S3 photo store ready: bucket={}", config.bucket);

        Self {
            client,
            bucket: config.bucket,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn collect_stream(stream: &mut ByteStream) -> BlobResult<bytes::Bytes> {
        let mut data = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        Ok(data.freeze())
    }
}

/// User metadata travels as HTTP headers, which only carry US-ASCII.
fn encode_metadata_value(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Values that are not valid percent-encoding (written by other clients)
/// are returned unchanged.
fn decode_metadata_value(value: &str) -> String {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

#[async_trait]
impl BlobStore for S3CompatibleStore {
    async fn put(
        &self,
        key: &str,
        metadata: BlobMetadata,
        mut stream: ByteStream,
    ) -> BlobResult<PutResult> {
        let data = Self::collect_stream(&mut stream).await?;
        let size_bytes = data.len() as u64;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(AwsByteStream::from(data));

        if let Some(ct) = &metadata.content_type {
            request = request.content_type(ct);
        }
        // S3 user metadata keys are case-insensitive; store them lower-cased
        for (k, v) in &metadata.custom {
            request = request.metadata(k.to_ascii_lowercase(), encode_metadata_value(v));
        }

        let result = request.send().await.map_err(BlobError::backend)?;

        Ok(PutResult {
            etag: result.e_tag,
            size_bytes,
        })
    }

    async fn download_url(&self, key: &str) -> BlobResult<String> {
        Ok(format!("{}/{}", self.public_base_url, key))
    }

    async fn list(&self, prefix: &str) -> BlobResult<Vec<BlobInfo>> {
        let mut blobs = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = continuation.take() {
                request = request.continuation_token(token);
            }

            let page = request.send().await.map_err(BlobError::backend)?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    blobs.push(BlobInfo {
                        key: key.to_string(),
                        size_bytes: object.size().unwrap_or(0).max(0) as u64,
                    });
                }
            }

            match page.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }

        Ok(blobs)
    }

    async fn head(&self, key: &str) -> BlobResult<BlobMetadata> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    BlobError::not_found(key)
                } else {
                    BlobError::backend(service_error)
                }
            })?;

        let custom = result
            .metadata()
            .map(|m| {
                m.iter()
                    .map(|(k, v)| (k.clone(), decode_metadata_value(v)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(BlobMetadata {
            content_type: result.content_type().map(|s| s.to_string()),
            size_bytes: result.content_length().unwrap_or(0).max(0) as u64,
            updated_at: result.last_modified().map(|dt| dt.secs() * 1000),
            custom,
        })
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(BlobError::backend)?;
        Ok(())
    }
}
