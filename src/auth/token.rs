//! Access tokens, normalized token responses, and the grant threaded between flow steps.

pub mod access;
pub mod grant;
pub mod response;
