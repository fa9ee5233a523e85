//! Site file orchestration.
//!
//! # Data Flow
//! ```text
//! list:     sites-available/*.conf + conf.d/*.conf
//!               → site::parse (unparsable files skipped)
//!               → enabled = activation link present (conf.d: always)
//!
//! enable:   symlink sites-enabled/<name>.conf → sites-available/<name>.conf → reload
//! disable:  unlink sites-enabled/<name>.conf → reload
//! create/update: site::render → write <class>/<name>.conf → reload
//! delete:   unlink <class>/<name>.conf (+ activation link, if any) → reload
//! tls:      certificate issuer(name, email) → reload
//! ```
//!
//! # Design Decisions
//! - The filesystem is the system of record; nothing is cached
//! - `enabled` is recomputed from link presence on every read
//! - Writes are not transactional; a failed reload leaves the new file in place
//! - Filesystem and command failures propagate, nothing is retried

pub mod control;
pub mod error;
pub mod site_store;

pub use control::{CertbotIssuer, CertificateIssuer, CommandError, NginxControl, ServerControl};
pub use error::{StoreError, StoreResult};
pub use site_store::{ConfigStore, SitePaths};
