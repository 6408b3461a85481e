/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Deploy-time rules for cross-parameter constraints of the EC2 cluster.
 */

use crate::catalog::InstanceCatalog;
use crate::error::DeclarationError;
use crate::template::value::{contains, equals, not, reference};
use crate::template::{ParameterId, Rule, RuleId, Template};

/// Cluster parameters the rules constrain.
#[derive(Debug, Clone, Copy)]
pub struct ClusterRuleInputs<'a> {
    pub on_demand_percentage: &'a ParameterId,
    pub add_warm_pool: &'a ParameterId,
    pub cpu_architecture: &'a ParameterId,
    pub instance_type: &'a ParameterId,
}

/// Declare the warm pool rule and one instance type rule per catalog architecture.
///
/// # Errors
///
/// Returns `DeclarationError` if a rule id is already taken.
pub fn declare_cluster_rules(
    template: &mut Template,
    inputs: &ClusterRuleInputs<'_>,
    catalog: &InstanceCatalog,
) -> Result<Vec<RuleId>, DeclarationError> {
    let mut rules = Vec::with_capacity(catalog.architectures.len() + 1);

    rules.push(template.declare_rule(
        "testWarmPoolAndNoSpot",
        Rule::new(not(equals(reference(inputs.on_demand_percentage), "100"))).assert(
            not(equals(reference(inputs.add_warm_pool), "Yes")),
            "Can't use a warm pool if ClusterOnDemandPercentage is below 100",
        ),
    )?);

    for architecture in &catalog.architectures {
        let id = format!("test{}InstanceType", title_case(&architecture.name));
        let rule = Rule::new(equals(reference(inputs.cpu_architecture), architecture.name.as_str()))
            .assert(
                contains(&architecture.instance_types, reference(inputs.instance_type)),
                &format!(
                    "{name} service requires {name}-compatible instance type",
                    name = architecture.name
                ),
            );
        rules.push(template.declare_rule(&id, rule)?);
    }

    tracing::debug!(count = rules.len(), "declared cluster rules");
    Ok(rules)
}

/// `ARM64` to `Arm64`.
fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
