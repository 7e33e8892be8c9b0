use aws_sdk_s3::Client;

/// Build an S3 client from the default credential chain.
///
/// `endpoint_url` targets an S3-compatible service instead of AWS; those
/// generally need path-style addressing.
pub async fn build_client(region: Option<&str>, endpoint_url: Option<&str>) -> Client {
    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = region {
        builder = builder.region(aws_config::Region::new(region.to_string()));
    }
    let sdk_config = builder.load().await;

    let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
    if let Some(url) = endpoint_url {
        s3_config = s3_config.endpoint_url(url).force_path_style(true);
    }
    Client::from_conf(s3_config.build())
}
