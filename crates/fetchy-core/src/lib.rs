//! Declarative, concurrency-bounded HTTP request scheduling.
//!
//! Declare a list of [`RequestDescriptor`]s, hand them to a [`FetchScheduler`]
//! with a [`Transport`] and drive it with [`FetchScheduler::step`]. Per-id
//! state is read through [`FetchScheduler::states`] or a watch subscription.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod handle;
pub mod logging;
pub mod manifest;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod state;
pub mod transport;

pub use descriptor::{Method, PreparedRequest, Query, RequestDescriptor};
pub use error::FetchError;
pub use scheduler::{AdmissionReport, FetchScheduler, Update, UpdateKind};
pub use state::{Progress, RequestState, Response, StatesSnapshot};
pub use transport::{CurlTransport, Reporter, Transport};
