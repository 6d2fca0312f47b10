//! Copy-on-write working variants of a baseline network.
//!
//! Each contingency case runs on its own [`WorkingVariant`]. Reads go to the
//! baseline until the first mutation clones it; dropping the variant discards
//! every change, whichever way the case ends.

use std::borrow::Cow;

use crate::network::Network;

#[derive(Debug)]
pub struct WorkingVariant<'a> {
    name: String,
    state: Cow<'a, Network>,
}

impl<'a> WorkingVariant<'a> {
    pub fn new(baseline: &'a Network, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Cow::Borrowed(baseline),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn network(&self) -> &Network {
        &self.state
    }

    /// Mutable access, cloning the baseline on first use.
    pub fn network_mut(&mut self) -> &mut Network {
        self.state.to_mut()
    }

    /// Whether the variant diverged from its baseline.
    pub fn is_modified(&self) -> bool {
        matches!(self.state, Cow::Owned(_))
    }
}
