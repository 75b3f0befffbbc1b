//! HTTP plumbing for the data store.
//!
//! This module provides the transport seam and the addressing types:
//!
//! - [`QueryString`] and [`CanonicalUri`]: deterministic request addressing
//! - [`Canonicalizer`]: resolves relative hrefs and merges query parameters
//! - [`Request`] / [`Response`]: the values exchanged with a transport
//! - [`RequestExecutor`]: the transport trait, with [`ReqwestRequestExecutor`]
//!   as the default blocking implementation
//! - [`RequestSigner`]: request authentication, with [`Sauthc1Signer`] as default

mod errors;
mod executor;
mod query;
mod request;
mod response;
mod signer;
mod uri;

pub use errors::{InvalidHrefError, TransportError};
pub use executor::{user_agent, ReqwestRequestExecutor, RequestExecutor, MAX_REDIRECTS, SDK_VERSION};
pub use query::QueryString;
pub use request::{HttpHeaders, HttpMethod, Request};
pub use response::{Response, REQUEST_ID_HEADER};
pub use signer::{RequestSigner, Sauthc1Signer, DATE_HEADER};
pub use uri::{CanonicalUri, Canonicalizer};
