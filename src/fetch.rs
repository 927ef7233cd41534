use std::fs::File;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::{PipelineError, Result};

/// Retrieval of a remote audio asset into the local scratch area.
pub trait AudioFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Streams the HTTP body straight to disk; recordings can be large and are
/// never needed whole in memory.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(60))
                .build(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| PipelineError::Download(format!("GET {url} failed: {err}")))?;

        let mut reader = response.into_reader();
        let mut file = File::create(dest).map_err(|err| {
            PipelineError::Download(format!("failed to create {}: {err}", dest.display()))
        })?;
        let written = std::io::copy(&mut reader, &mut file)
            .map_err(|err| PipelineError::Download(format!("stream from {url} failed: {err}")))?;
        if written == 0 {
            return Err(PipelineError::Download(format!("{url} returned an empty body")));
        }
        debug!(url, bytes = written, dest = %dest.display(), "audio downloaded");
        Ok(())
    }
}
