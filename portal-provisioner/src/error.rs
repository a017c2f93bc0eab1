use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("{task} failed: {source}")]
    Task {
        task: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}
