use thiserror::Error;

#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Scrip master fetch failed: {0}")]
    Fetch(String),

    #[error("Scrip master parse failed: {0}")]
    Parse(String),
}
