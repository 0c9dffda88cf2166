//! Session descriptions: SDP text, the offers/answers built from it and the
//! summary an endpoint reads out of a peer's description.
pub mod attribute;
pub mod description_builder;
pub mod description_summary;
pub mod media;
pub mod origin;
pub mod sdp_error;
pub mod sdp_type;
pub mod sdpc;
pub mod session_description;
mod util;

pub use sdp_error::SdpError;
pub use sdp_type::SdpType;
pub use sdpc::Sdp;
pub use session_description::SessionDescription;
