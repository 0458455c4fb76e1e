//! # fxiaoke - An authenticated client for the Fxiaoke CRM open platform
//!
//! This crate signs every call with a corporate access token, fetching and
//! refreshing that token transparently, retries transient network failures
//! with exponential backoff, and exposes typed operations over CRM object
//! data.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fxiaoke::{Client, Namespace, QueryDescriptor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fxiaoke::Error> {
//!     let client = Client::new(
//!         "FSAID_xxx",     // app id
//!         "app-secret",    // app secret
//!         "permanent",     // permanent code
//!         "FSUID_xxx",     // acting user
//!         "FSCID_xxx",     // corp id
//!     )?;
//!
//!     // The first authenticated call fetches an access token.
//!     let user = client.get_user_by_open_id("FSUID_xxx").await?;
//!     println!("Hello, {}", user.name);
//!
//!     // Pages through every account, 100 at a time.
//!     let accounts = client
//!         .list_all_objects(Namespace::Package, "AccountObj", QueryDescriptor::default())
//!         .await?;
//!     println!("{} accounts", accounts.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Request pipeline
//!
//! - **Token management** - the token is cached in memory and refreshed
//!   before any call once it expires; concurrent callers share one refresh
//! - **Retries** - request bodies are buffered and replayed; waits start at
//!   200ms, grow by 1.5x with jitter, cap at 5s, and stop after 20s
//! - **Classification** - a call succeeds only with HTTP 200 and
//!   `errorCode == 0`; anything else is an [`Error::Request`] carrying the
//!   endpoint, status and raw body
//! - **Logging** - structured events through `tracing`
//!
//! ## Error Handling
//!
//! ```no_run
//! use fxiaoke::{Client, Error, Namespace};
//!
//! # async fn example(client: Client) {
//! match client.get_object(Namespace::Custom, "object_x1__c", "5f1a").await {
//!     Ok(record) => println!("{record}"),
//!     Err(Error::Request { error_code: Some(code), error_message, .. }) => {
//!         eprintln!("platform rejected the call: {code} {error_message:?}");
//!     }
//!     Err(Error::Transport { attempts, last_error }) => {
//!         eprintln!("gave up after {attempts} attempts: {last_error}");
//!     }
//!     Err(e) => eprintln!("other error: {e}"),
//! }
//! # }
//! ```

mod client;
pub mod endpoint;
mod error;
pub mod object;
mod payload;
mod request;
mod response;
pub mod retry;
pub mod token;
pub mod transport;
mod user;

pub use client::{Client, ClientBuilder, Credentials, DEFAULT_TIMEOUT};
pub use endpoint::{Action, Namespace};
pub use error::{Error, Result};
pub use object::{ChangeOwnerData, FilterOperator, QueryDescriptor, QueryResult};
pub use payload::Payload;
pub use request::HttpRequest;
pub use response::HttpResponse;
pub use retry::ExponentialBackoff;
pub use transport::{HttpSend, ReqwestSender, RetryingTransport};
pub use user::User;
