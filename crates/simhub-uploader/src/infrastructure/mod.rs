//! Infrastructure layer: the HTTP implementation of the upload API.

pub mod api;
