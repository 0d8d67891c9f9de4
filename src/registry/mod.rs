//! Domain registration lookups.

mod domain;
mod extract;
mod rdap;
mod resolver;
mod whois;

pub use domain::registrable_domain;
pub use extract::{find_labeled_expiry, find_loose_expiry};
pub use rdap::{RdapClient, RegistryEvent, StructuredRegistry};
pub use resolver::{DomainExpiryResolver, ExpirySource};
pub use whois::{FreeTextRegistry, WhoisCommand};
