// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One CLI invocation's client: configuration layered from file, environment
// and flags, pointed either at a real endpoint or at an in-process stub.

use std::path::PathBuf;
use std::sync::Arc;

use textwerk_client::TextwerkClient;
use textwerk_core::config::{self, ClientConfig};
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::model::DocumentLocation;
use textwerk_stub::{InProcessTransport, StubConfig, StubService};
use tracing::{debug, info};

use super::input::Input;

/// Bucket local files are uploaded to when running against the stub.
pub const LOCAL_BUCKET: &str = "local";

/// Connection settings taken from global command-line flags.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    pub config_path: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub stub: bool,
}

impl ConnectOptions {
    pub fn config_path(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(config::default_config_path)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    client: TextwerkClient,
    stub: Option<Arc<StubService>>,
}

impl Session {
    /// Build the client.  Precedence, lowest first: defaults, config file,
    /// `TEXTWERK_*` environment, command-line flags.
    pub fn init(options: &ConnectOptions) -> Result<Self> {
        let config = resolve_config(options)?;

        if options.stub {
            info!("using in-process stub service");
            let service = Arc::new(StubService::new(StubConfig {
                polls_before_complete: 1,
                ..StubConfig::default()
            }));
            let transport = Arc::new(InProcessTransport::new(Arc::clone(&service)));
            let config = ClientConfig {
                poll_interval_ms: 10,
                ..config
            };
            return Ok(Self {
                client: TextwerkClient::with_transport(transport, config),
                stub: Some(service),
            });
        }

        info!(endpoint = %config.endpoint, region = %config.region, "connecting");
        Ok(Self {
            client: TextwerkClient::new(config)?,
            stub: None,
        })
    }

    pub fn client(&self) -> &TextwerkClient {
        &self.client
    }

    /// The in-process service, when running with `--stub`.
    pub fn stub(&self) -> Option<&Arc<StubService>> {
        self.stub.as_ref()
    }

    /// Where an asynchronous job should read `input` from.  Local files
    /// only work against the stub, which is given a copy first.
    pub fn location(&self, input: &Input) -> Result<DocumentLocation> {
        match (input, self.stub()) {
            (Input::S3 { bucket, name }, _) => {
                Ok(DocumentLocation::s3(bucket.as_str(), name.as_str()))
            }
            (Input::Local(path), Some(service)) => {
                let bytes = std::fs::read(path)?;
                let name = input.object_name();
                service.put_object(LOCAL_BUCKET, &name, bytes);
                debug!(path = %path.display(), object = %name, "uploaded to stub");
                Ok(DocumentLocation::s3(LOCAL_BUCKET, name))
            }
            (Input::Local(path), None) => Err(TextwerkError::Config(format!(
                "asynchronous jobs read from S3; upload {} and pass s3://bucket/key",
                path.display()
            ))),
        }
    }
}

/// Effective configuration without connecting.
pub fn resolve_config(options: &ConnectOptions) -> Result<ClientConfig> {
    let path = options.config_path();
    let mut config = ClientConfig::load_or_default(&path)?.apply_env()?;
    if let Some(region) = &options.region {
        config.endpoint = config::endpoint_for_region(region);
        config.region = region.clone();
    }
    if let Some(endpoint) = &options.endpoint {
        config.endpoint = endpoint.clone();
    }
    config.validate()?;
    debug!(path = %path.display(), endpoint = %config.endpoint, "configuration resolved");
    Ok(config)
}
