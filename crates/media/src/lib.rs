//! Media side of the share pipeline: container placement, file naming, MIME
//! lookup, video introspection, and thumbnail rendering.

pub mod error;
pub mod image_ops;
pub mod introspect;
pub mod mime;
pub mod naming;
pub mod store;

pub use {
    error::{Error, Result},
    introspect::{FfmpegIntrospector, MediaIntrospector, PreviewRequest, duration_millis},
    store::ContainerStore,
};
