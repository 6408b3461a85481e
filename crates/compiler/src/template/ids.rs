/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Typed identifier handles, one per template section.
 */

use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub(crate) fn new(id: &str) -> Self {
                Self(id.to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

handle!(
    /// Handle of a declared parameter.
    ParameterId
);
handle!(
    /// Handle of a declared condition.
    ConditionId
);
handle!(
    /// Handle of a declared mapping.
    MappingId
);
handle!(
    /// Handle of a declared rule.
    RuleId
);
handle!(
    /// Handle of a declared resource.
    ResourceId
);
handle!(
    /// Handle of a declared output.
    OutputId
);
