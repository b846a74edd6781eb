mod http;
mod stub;

pub use http::HttpReconstruction;
pub use stub::StubReconstruction;

use crate::error::ConvertError;
use crate::types::{ImageBytes, ModelBytes};

/// Length of the fixed glTF-binary header.
pub(crate) const GLB_HEADER_LEN: usize = 12;

/// Boundary to the black-box blueprint-to-model transform.
///
/// Implementations take the raw image bytes and answer with the model
/// bytes; everything else about the transform is opaque. What they must
/// get right is the [`ConvertError`] classification, because the retry
/// policy trusts it.
#[async_trait::async_trait]
pub trait ReconstructionAdapter: Send + Sync + 'static {
    async fn convert(&self, input: ImageBytes) -> Result<ModelBytes, ConvertError>;
}
