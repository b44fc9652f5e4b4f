//! Launchpad client - session cache in front of the remote graph endpoint.
//!
//! # Architecture
//!
//! - [`Session`] is the one mutable object per user session. It owns the
//!   [`EntityCache`] and the [`CredentialStore`] and is passed explicitly to
//!   everything that reads or writes session state.
//! - Queries are described as [`Query`] selection trees and compiled into a
//!   [`QueryPlan`] against the [`LocalFieldRegistry`], which binds every local
//!   field (`isLoggedIn`, `cartItems`, `Launch.isInCart`) to a pure function.
//! - [`LaunchClient`] talks to the graph endpoint. It borrows nothing from the
//!   session, so cached reads continue while a fetch is in flight; results are
//!   written back with [`Session::absorb`] or [`Session::merge_page`].
//!
//! # Example
//!
//! ```rust,ignore
//! let mut session = Session::start(CredentialStore::new(FileSlot::new(dir)))?;
//! let plan = session.plan(&operations::launch_list())?;
//!
//! let seq = session.begin_fetch();
//! let data = client
//!     .fetch(&operations::LAUNCH_LIST, json!({}), session.credential()?.as_ref(), &cancel)
//!     .await?;
//! session.absorb(&plan, &data, seq);
//!
//! session.toggle_cart(&LaunchId::from("109"));
//! let view = session.read(&plan);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod cart;
pub mod config;
pub mod credentials;
pub mod local;
pub mod pagination;
pub mod query;
pub mod remote;
pub mod session;

pub use cache::{
    CartItems, Entity, EntityCache, EntityKey, FetchSeq, FlagsPatch, Readout, SessionFlags,
};
pub use config::{ClientConfig, ConfigError};
pub use credentials::{CredentialStore, CredentialStoreError, FileSlot, KeyValueSlot, MemorySlot};
pub use local::LocalFieldRegistry;
pub use pagination::{LoadMore, MergeError};
pub use query::{Origin, PlanError, Query, QueryPlan, Selection};
pub use remote::{
    GraphQLError, HttpTransport, LaunchClient, RemoteError, Transport, TripUpdate, operations,
};
pub use session::{Session, SessionError};
