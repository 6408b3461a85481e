/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Conditional graph assembler - builds the imgproxy template for one configuration
 *
 * This module handles:
 * - Topology decisions (`topology`): which subgraphs exist at all
 * - Parameters, conditions and the architecture mapping
 * - Resources, in dependency order: logs, network, cluster, IAM, task,
 *   load balancing, service, autoscaling, caching edge
 *
 * An [`Assembly`] owns the template under construction and is threaded
 * through every step; [`assemble`] finishes it once.
 */

pub mod cluster;
pub mod conditions;
pub mod edge;
pub mod iam;
pub mod kinds;
pub mod load_balancer;
pub mod network;
pub mod parameters;
pub mod scaling;
pub mod service;
pub mod task;
pub mod topology;

#[cfg(test)]
mod tests;

pub use topology::{Cluster, Compute, Network, TaskNetworking, Topology};

use crate::catalog::InstanceCatalog;
use crate::config::DeploymentConfig;
use crate::error::CompilerError;
use crate::rules::{declare_cluster_rules, ClusterRuleInputs};
use crate::template::value::{join, reference};
use crate::template::{Properties, Pseudo, Template, Value};

/// Template description.
pub const DESCRIPTION: &str = "imgproxy running in ECS";

/// Assembly context: the template under construction plus the fixed inputs.
#[derive(Debug)]
pub struct Assembly<'a> {
    topology: Topology,
    catalog: &'a InstanceCatalog,
    template: Template,
}

impl<'a> Assembly<'a> {
    #[must_use]
    pub fn new(config: &DeploymentConfig, catalog: &'a InstanceCatalog) -> Self {
        Self {
            topology: Topology::decide(config),
            catalog,
            template: Template::new(DESCRIPTION),
        }
    }

    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    fn finish(self) -> Template {
        tracing::info!(
            parameters = self.template.parameters().len(),
            conditions = self.template.conditions().len(),
            rules = self.template.rules().len(),
            resources = self.template.resources().len(),
            outputs = self.template.outputs().len(),
            "assembled template"
        );
        self.template
    }
}

/// Build the complete template for `config`.
///
/// # Errors
///
/// Returns `CompilerError` if a step declares an entity twice or wires an edge
/// to an absent resource. Both are defects, not user errors.
pub fn assemble(config: &DeploymentConfig, catalog: &InstanceCatalog) -> Result<Template, CompilerError> {
    let mut assembly = Assembly::new(config, catalog);

    let inputs = parameters::declare(&mut assembly)?;
    let architectures = conditions::declare_architectures(&mut assembly)?;
    let gates = conditions::declare(&mut assembly, &inputs)?;

    if let Some(cluster) = &inputs.cluster {
        let rule_inputs = ClusterRuleInputs {
            on_demand_percentage: &cluster.on_demand_percentage,
            add_warm_pool: &cluster.add_warm_pool,
            cpu_architecture: &inputs.service.cpu_architecture,
            instance_type: &cluster.instance_type,
        };
        declare_cluster_rules(&mut assembly.template, &rule_inputs, catalog)?;
    }

    let log_group = task::declare_log_group(&mut assembly)?;
    let network = network::declare(&mut assembly, &inputs)?;
    let cluster = cluster::declare(&mut assembly, &inputs, &gates, &network, &architectures)?;
    let roles = iam::declare(&mut assembly, &inputs, &gates)?;
    let task_definition =
        task::declare_task_definition(&mut assembly, &inputs, &gates, &roles, &log_group, &architectures)?;
    let routing = load_balancer::declare(&mut assembly, &inputs, &gates, &network)?;
    let service = service::declare(&mut assembly, &inputs, &network, &cluster, &routing, &task_definition)?;
    scaling::declare(&mut assembly, &inputs, &cluster, &service)?;
    edge::declare(&mut assembly, &inputs, &gates, &routing)?;

    Ok(assembly.finish())
}

/// `Ref AWS::StackName`
pub(crate) fn stack_name() -> Value {
    reference(Pseudo::StackName)
}

/// `<stack name>-<suffix>`
pub(crate) fn stack_prefixed(suffix: &str) -> Value {
    join("-", vec![stack_name(), Value::from(suffix)])
}

/// A single `Name` tag valued `<stack name>-<suffix>`.
pub(crate) fn name_tags(suffix: &str) -> Value {
    Value::List(vec![Properties::new()
        .with("Key", "Name")
        .with("Value", stack_prefixed(suffix))
        .into()])
}
