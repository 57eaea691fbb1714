//! # Archytas Test
//!
//! Test utilities for Archytas, all in memory:
//!
//! - [`TestBed`] runs one middleware (plus optional followers) in front of a
//!   handler and reports what the chain returned and wrote
//! - [`TestClient`] sends requests to a whole service
//! - [`TestRequestBuilder`] and [`TestResponse`] build requests and inspect
//!   responses
//!
//! ## Example
//!
//! ```ignore
//! use archytas_middleware::RequestObjectMapper;
//! use archytas_test::{TestBed, TestRequestBuilder};
//!
//! let outcome = TestBed::new(RequestObjectMapper::new(), |req: Box<UpdateTodo>| {
//!     assert_eq!(req.id, 5);
//! })
//! .request(TestRequestBuilder::post("/api/todo/5?offset=10").body(r#"{"text":"Hi!"}"#))
//! .path_param("id", "5")
//! .run()
//! .await?;
//! assert!(outcome.invoked);
//! ```

#![doc(html_root_url = "https://docs.rs/archytas-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bed;
mod client;
mod error;
mod request;
mod response;

pub use bed::{TestBed, TestOutcome};
pub use client::{TestClient, TestClientRequest, TestService};
pub use error::TestError;
pub use request::TestRequestBuilder;
pub use response::TestResponse;
