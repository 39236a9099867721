//! Static structural knowledge shared by the convenience selectors.

pub mod identifiers;
