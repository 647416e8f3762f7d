//! Blocking API client for the Agenda UML REST backend.
//!
//! # Overview
//! Builds `HttpRequest` values, executes each through a [`Transport`]
//! (exactly one round-trip per call), and parses the `HttpResponse` into the
//! backend's `{success, message?, data?, pagination?}` [`Envelope`]. The
//! bearer session token comes from a [`Session`] store that login fills and
//! logout clears.
//!
//! # Design
//! - `AgendaClient::request` is the single point of HTTP access; everything
//!   else (resources, auth, diagnostics, stats) is built on it.
//! - Request building and response parsing are pure functions over plain
//!   data, so header, query, and status rules are testable without I/O.
//! - CRUD methods come from one generic [`ResourceClient`] specialised per
//!   collection.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod query;
pub mod resource;
pub mod session;
pub mod stats;
pub mod transport;
pub mod types;

pub use auth::DomainPolicy;
pub use client::{Ack, AgendaClient, RequestOptions, DEFAULT_BASE_URL};
pub use config::ClientConfig;
pub use envelope::{Envelope, Outcome, Pagination};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use resource::{Careers, Groups, Invitations, Members, ResourceClient, Users};
pub use session::{Detached, FileStorage, MemoryStorage, Session, Storage};
pub use stats::DashboardStats;
pub use transport::{Transport, UreqTransport};
pub use types::*;
