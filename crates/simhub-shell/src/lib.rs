//! simhub-shell library crate.
//!
//! The shell is the host page of the SimHub console: it owns the module
//! registry that composes three independent sources of truth into one
//! navigation surface, and it embeds guest applications through the
//! bridge crate.
//!
//! # Sources of truth
//!
//! ```text
//! compiled implementations ─┐
//! plugin registrations ─────┼──► reconcile ──► active modules ──► routes + menus
//! server module catalog ────┘
//! ```
//!
//! - **Compiled implementations**: modules linked into the shell itself,
//!   shipping their own routes and menu entry.
//! - **Plugin registrations**: views, actions, and viewers registered at
//!   runtime by guest code through the host API.
//! - **Server catalog**: the declarative module list fetched from the
//!   backend, which decides what is actually active and can override the
//!   display metadata of everything else.
//!
//! # Layout
//!
//! ```text
//! [simhub-shell]
//!   ├── application/
//!   │     ├── registry/        view/action/viewer registries + resolution
//!   │     ├── reconcile/       catalog × implementations → active modules
//!   │     └── module_manager/  the composition engine (load_config, install, menus)
//!   └── infrastructure/
//!         ├── config_client/   ConfigFetcher trait + reqwest implementation
//!         ├── router/          route table the shell navigates with
//!         ├── storage/         TOML shell configuration on disk
//!         └── auth/            in-memory TokenStore for the host bridge
//! ```

pub mod application;
pub mod infrastructure;

pub use application::module_manager::ModuleManager;
pub use application::reconcile::{ActiveModule, MenuEntry, ModuleImplementation, ModuleSource, RouteDef};
pub use application::registry::{ActionHandler, Registries, RegisteredAction};
pub use infrastructure::config_client::{ConfigFetcher, FetchError, HttpConfigFetcher};
pub use infrastructure::router::RouteTable;
