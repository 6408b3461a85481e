/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * The ECS service running the imgproxy task behind the target group.
 */

use crate::assembler::cluster::ClusterRefs;
use crate::assembler::load_balancer::Routing;
use crate::assembler::network::NetworkRefs;
use crate::assembler::parameters::Inputs;
use crate::assembler::task::{CONTAINER_NAME, CONTAINER_PORT};
use crate::assembler::topology::TaskNetworking;
use crate::assembler::{kinds, stack_name, Assembly};
use crate::error::{CompilerError, ReferentialIntegrityError};
use crate::template::value::reference;
use crate::template::{Properties, Resource, ResourceId, Value};

/// # Errors
///
/// Returns `CompilerError` on an identifier clash, or when `awsvpc` tasks have
/// no placement to run in.
pub fn declare(
    assembly: &mut Assembly<'_>,
    inputs: &Inputs,
    network: &NetworkRefs,
    cluster: &ClusterRefs,
    routing: &Routing,
    task_definition: &ResourceId,
) -> Result<ResourceId, CompilerError> {
    // Bridge tasks inherit the instance's network.
    let network_configuration = match assembly.topology.task_networking() {
        TaskNetworking::Bridge => None,
        TaskNetworking::Awsvpc => {
            let placement =
                network
                    .placement
                    .as_ref()
                    .ok_or_else(|| ReferentialIntegrityError::DanglingReference {
                        owner: "ECSService".to_string(),
                        kind: "parameter",
                        target: "SubnetIds".to_string(),
                    })?;
            Some(
                Properties::new().with(
                    "AwsvpcConfiguration",
                    Properties::new()
                        .with("AssignPublicIp", "ENABLED")
                        .with(
                            "SecurityGroups",
                            Value::List(vec![reference(placement.host_security_group.clone())]),
                        )
                        .with("Subnets", placement.subnets.clone()),
                ),
            )
        }
    };

    let mut resource = Resource::new(
        kinds::ECS_SERVICE,
        Properties::new()
            .with("ServiceName", stack_name())
            .with("Cluster", reference(cluster.cluster.clone()))
            .with("DesiredCount", reference(&inputs.service.task_desired_count))
            .with("TaskDefinition", reference(task_definition))
            .with_opt("NetworkConfiguration", network_configuration)
            .with(
                "LoadBalancers",
                Value::List(vec![Properties::new()
                    .with("ContainerName", CONTAINER_NAME)
                    .with("ContainerPort", CONTAINER_PORT)
                    .with("TargetGroupArn", reference(&routing.target_group))
                    .into()]),
            ),
    )
    .depends_on(&routing.listener_rule);
    if let Some(associations) = &cluster.associations {
        resource = resource.depends_on(associations);
    }

    assembly.template.declare_resource("ECSService", resource)
}
