use miette::Diagnostic;
use thiserror::Error;

#[derive(Diagnostic, Debug, Error)]
#[diagnostic()]
pub enum HostError {
    #[error("host does not expose a usable marker layer. required capabilities: {0}")]
    #[diagnostic(code(host_error::no_accessor))]
    NoCompatibleAccessor(String),
    #[error("marker layer is not available yet")]
    #[diagnostic(code(host_error::layer_unavailable))]
    LayerUnavailable,
    #[error("host rejected marker creation: {0}")]
    #[diagnostic(code(host_error::create_marker))]
    CreateMarker(String),
    #[error("failed to rasterize label text")]
    #[diagnostic(code(host_error::rasterize))]
    Rasterize,
    #[error("failed to write player attribute {key}")]
    #[diagnostic(code(host_error::attribute_write))]
    AttributeWrite { key: String },
}
