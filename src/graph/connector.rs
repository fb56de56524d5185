// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::graph::port::{PortAddr, PortSpec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directed typed edge from one output port to one input port.
///
/// Structural invariants (different processes, single upstream per input,
/// type compatibility, no duplicates) are enforced when the connector is
/// registered with its owning protocol, which is the only place both
/// endpoints can be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connector {
    pub from: PortAddr,
    pub to: PortAddr,
}

impl Connector {
    pub fn new(from: PortAddr, to: PortAddr) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Returns the first source type the target does not accept, if any.
///
/// A connector is type-compatible only when every type the source may emit
/// is assignable to the target's accept set; otherwise a run could deliver a
/// resource the target would reject at set-time.
pub fn incompatible_type(from: &PortSpec, to: &PortSpec) -> Option<String> {
    from.accepts
        .iter()
        .find(|t| !to.accepts_type(t))
        .map(|t| t.name().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::resource::ResourceType;

    #[test]
    fn compatibility_requires_every_source_type_accepted() {
        let text_out = PortSpec::typed("out", "text");
        let text_in = PortSpec::typed("in", "text");
        let any_in = PortSpec::any("in");
        let mixed_out = PortSpec::new(
            "out",
            vec![ResourceType::new("text"), ResourceType::new("table")],
        );

        assert_eq!(incompatible_type(&text_out, &text_in), None);
        assert_eq!(incompatible_type(&text_out, &any_in), None);
        assert_eq!(
            incompatible_type(&mixed_out, &text_in),
            Some("table".to_string())
        );
    }
}
