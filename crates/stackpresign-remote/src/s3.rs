use crate::{CredentialSource, ObjectStore, RemoteError, S3Config};
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::ResponseChecksumValidation;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use stackpresign_schema::S3Location;
use std::io::Write;
use std::time::Duration;
use tokio::runtime::Runtime;

/// S3 backend on the AWS SDK.
///
/// The store interface is synchronous, so the client owns a current-thread
/// runtime and blocks on each SDK call.
pub struct S3Client {
    client: aws_sdk_s3::Client,
    runtime: Runtime,
    config: S3Config,
}

impl S3Client {
    /// Build a client and load credentials from `source` once, so a bad
    /// profile or key pair fails here instead of on the first signature.
    pub fn new(config: S3Config, source: &CredentialSource) -> Result<Self, RemoteError> {
        config.validate()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(source.load())?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(source.provider())
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(config.timeout_secs))
                    .build(),
            );
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = runtime.block_on(loader.load());

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.endpoint.is_some())
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();
        tracing::debug!("S3 client for region {} ({source})", config.region);
        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            runtime,
            config,
        })
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }
}

impl ObjectStore for S3Client {
    fn presign_get(&self, location: &S3Location, expires_secs: u64) -> Result<String, RemoteError> {
        tracing::debug!("presign {location} ({expires_secs}s)");
        let signing = |message: String| RemoteError::Signing {
            location: location.clone(),
            message,
        };
        let presigning = PresigningConfig::expires_in(Duration::from_secs(expires_secs))
            .map_err(|e| signing(e.to_string()))?;
        let request = self
            .runtime
            .block_on(
                self.client
                    .get_object()
                    .bucket(&location.bucket)
                    .key(&location.key)
                    .presigned(presigning),
            )
            .map_err(|e| signing(DisplayErrorContext(&e).to_string()))?;
        Ok(request.uri().to_owned())
    }

    fn download(&self, location: &S3Location, sink: &mut dyn Write) -> Result<u64, RemoteError> {
        tracing::debug!("GET {location}");
        self.runtime.block_on(async {
            let response = self
                .client
                .get_object()
                .bucket(&location.bucket)
                .key(&location.key)
                .send()
                .await
                .map_err(|e| sdk_error(location, &e))?;

            let mut body = response.body;
            let mut written = 0u64;
            while let Some(chunk) = body.try_next().await.map_err(|e| RemoteError::Http {
                location: location.clone(),
                message: e.to_string(),
            })? {
                sink.write_all(&chunk)?;
                written += chunk.len() as u64;
            }
            tracing::debug!("GET {location}: {written} bytes");
            Ok(written)
        })
    }
}

/// An HTTP status from the service becomes `Status`; anything that never got
/// a response (connect, timeout, dispatch) becomes `Http`.
fn sdk_error<E>(location: &S3Location, err: &SdkError<E, HttpResponse>) -> RemoteError
where
    E: std::error::Error + 'static,
{
    match err.raw_response() {
        Some(raw) => RemoteError::Status {
            code: raw.status().as_u16(),
            location: location.clone(),
        },
        None => RemoteError::Http {
            location: location.clone(),
            message: DisplayErrorContext(err).to_string(),
        },
    }
}
