use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_smithy_types::byte_stream::ByteStream;
use vbc_orchestrator::format_err_chain;

use crate::error::StorageError;

/// Result of a GET operation, including the body and ETag.
pub struct GetObjectOutput {
    pub body: Vec<u8>,
    pub etag: Option<String>,
}

/// Write precondition for [`put_object`].
#[derive(Debug, Clone, Copy)]
pub enum Precondition<'a> {
    None,
    /// Only overwrite the object with this ETag.
    IfMatch(&'a str),
    /// Only create; fail if any object exists at the key.
    IfAbsent,
}

/// Get an object from S3.
pub async fn get_object(
    client: &Client,
    bucket: &str,
    key: &str,
) -> Result<GetObjectOutput, StorageError> {
    let resp = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| {
            let err = e.into_service_error();
            if err.is_no_such_key() {
                StorageError::NotFound {
                    key: key.to_string(),
                }
            } else {
                StorageError::GetObject(format_err_chain(&err))
            }
        })?;

    let etag = resp.e_tag().map(|s| s.to_string());
    let body = resp
        .body
        .collect()
        .await
        .map_err(|e| StorageError::GetObject(e.to_string()))?
        .into_bytes()
        .to_vec();

    Ok(GetObjectOutput { body, etag })
}

/// Like [`get_object`], with a missing key mapped to `None`.
pub async fn get_object_optional(
    client: &Client,
    bucket: &str,
    key: &str,
) -> Result<Option<GetObjectOutput>, StorageError> {
    match get_object(client, bucket, key).await {
        Ok(output) => Ok(Some(output)),
        Err(StorageError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Put an object to S3. Returns the new ETag, or
/// `StorageError::PreconditionFailed` if the precondition does not hold.
pub async fn put_object(
    client: &Client,
    bucket: &str,
    key: &str,
    body: Vec<u8>,
    content_type: Option<&str>,
    precondition: Precondition<'_>,
) -> Result<String, StorageError> {
    let mut req = client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body));

    if let Some(ct) = content_type {
        req = req.content_type(ct);
    }
    req = match precondition {
        Precondition::None => req,
        Precondition::IfMatch(etag) => req.if_match(etag),
        Precondition::IfAbsent => req.if_none_match("*"),
    };

    let resp = req.send().await.map_err(|e| {
        let err = e.into_service_error();
        // 412 when the precondition fails, 409 when a concurrent
        // conditional write won the race.
        match err.code() {
            Some("PreconditionFailed") | Some("ConditionalRequestConflict") => {
                StorageError::PreconditionFailed {
                    key: key.to_string(),
                }
            }
            _ => StorageError::PutObject(format_err_chain(&err)),
        }
    })?;

    Ok(resp.e_tag().unwrap_or_default().to_string())
}

/// List objects under a prefix. Returns keys.
pub async fn list_objects(
    client: &Client,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<String>, StorageError> {
    let mut keys = Vec::new();
    let mut continuation_token: Option<String> = None;

    loop {
        let mut req = client.list_objects_v2().bucket(bucket).prefix(prefix);

        if let Some(token) = &continuation_token {
            req = req.continuation_token(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| StorageError::ListObjects(format_err_chain(&e.into_service_error())))?;

        for obj in resp.contents() {
            if let Some(key) = obj.key() {
                keys.push(key.to_string());
            }
        }

        if resp.is_truncated() == Some(true) {
            continuation_token = resp.next_continuation_token().map(|s| s.to_string());
        } else {
            break;
        }
    }

    Ok(keys)
}
