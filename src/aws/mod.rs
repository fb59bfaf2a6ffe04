//! Shared setup for the S3, Textract and Bedrock clients.
//!
//! The AWS SDK clients are async while the crate's storage, analysis and
//! model traits are blocking. [`AwsContext`] loads the SDK configuration
//! once and owns a small tokio runtime the clients block on.
//!
//! Credentials come from the SDK's default provider chain:
//! 1. Environment variables (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`)
//! 2. Shared config and credentials files (`~/.aws/config`, `~/.aws/credentials`)
//! 3. Container or instance role

use std::future::Future;
use std::sync::Arc;

use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tokio::runtime::{Builder, Runtime};

use crate::error::Result;

/// Region used when neither the environment nor the profile names one.
pub const DEFAULT_REGION: &str = "us-east-1";

const RUNTIME_THREADS: usize = 2;

/// Loaded AWS configuration plus the runtime SDK calls are driven on.
///
/// Cloning is cheap; clones share the runtime.
#[derive(Debug, Clone)]
pub struct AwsContext {
    config: SdkConfig,
    runtime: Arc<Runtime>,
}

impl AwsContext {
    /// Load configuration from the default provider chain.
    ///
    /// The region is resolved from `AWS_REGION`, then the active profile,
    /// then [`DEFAULT_REGION`]. Credentials are resolved lazily on the first
    /// request, so a missing profile surfaces as a service error there.
    pub fn load() -> Result<Self> {
        Self::load_with_region(None)
    }

    /// Like [`load`](Self::load), but `region` wins over the provider chain.
    pub fn load_with_region(region: Option<String>) -> Result<Self> {
        let runtime = build_runtime()?;
        let region = RegionProviderChain::first_try(region.map(Region::new))
            .or_default_provider()
            .or_else(DEFAULT_REGION);
        let config = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load(),
        );
        log::debug!(
            "Loaded AWS configuration for region {}",
            config.region().map(|r| r.as_ref()).unwrap_or("<none>")
        );
        Ok(Self {
            config,
            runtime: Arc::new(runtime),
        })
    }

    /// Wrap an already built SDK configuration.
    pub fn from_sdk_config(config: SdkConfig) -> Result<Self> {
        Ok(Self {
            config,
            runtime: Arc::new(build_runtime()?),
        })
    }

    /// The SDK configuration clients are built from.
    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    /// Resolved region, if any.
    pub fn region(&self) -> Option<&str> {
        self.config.region().map(|r| r.as_ref())
    }

    /// Drive `future` to completion on the owned runtime.
    ///
    /// Must not be called from inside an async context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn build_runtime() -> Result<Runtime> {
    Ok(Builder::new_multi_thread()
        .worker_threads(RUNTIME_THREADS)
        .thread_name("unscan-aws")
        .enable_all()
        .build()?)
}

/// Context with a fixed region and no credentials, for client tests.
#[cfg(test)]
pub(crate) fn offline_context(region: &'static str) -> AwsContext {
    let config = SdkConfig::builder()
        .region(Region::new(region))
        .behavior_version(BehaviorVersion::latest())
        .build();
    AwsContext::from_sdk_config(config).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_region() {
        let aws = offline_context("eu-west-1");
        assert_eq!(aws.region(), Some("eu-west-1"));
    }

    #[test]
    fn test_block_on_shared_between_clones() {
        let aws = offline_context("us-east-1");
        let clone = aws.clone();
        assert_eq!(aws.block_on(async { 1 + 1 }), 2);
        assert_eq!(clone.block_on(async { "done" }), "done");
    }
}
