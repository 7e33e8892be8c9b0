use aws_sdk_s3::Client;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::StorageError;
use crate::objects::{self, Precondition};

/// Load a JSON object from S3 with its ETag, or `None` if the key is absent.
pub async fn load_json<T: DeserializeOwned>(
    client: &Client,
    bucket: &str,
    key: &str,
) -> Result<Option<(T, String)>, StorageError> {
    let Some(output) = objects::get_object_optional(client, bucket, key).await? else {
        return Ok(None);
    };
    let value: T = serde_json::from_slice(&output.body)?;
    Ok(Some((value, output.etag.unwrap_or_default())))
}

/// Save a JSON object to S3. Returns the new ETag.
pub async fn save_json<T: Serialize>(
    client: &Client,
    bucket: &str,
    key: &str,
    value: &T,
    precondition: Precondition<'_>,
) -> Result<String, StorageError> {
    let body = serde_json::to_vec_pretty(value)?;
    objects::put_object(
        client,
        bucket,
        key,
        body,
        Some("application/json"),
        precondition,
    )
    .await
}
