/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Application load balancer, target group and the listener rule that routes
 * to the service. Without an owned network the rule attaches to the
 * caller-supplied listener.
 */

use crate::assembler::conditions::Gates;
use crate::assembler::network::{Ingress, NetworkRefs};
use crate::assembler::parameters::Inputs;
use crate::assembler::{kinds, name_tags, stack_name, stack_prefixed, Assembly};
use crate::error::CompilerError;
use crate::template::value::{join, reference, when};
use crate::template::{Properties, Resource, ResourceId, Target, Value};

/// Header carrying the shared authorization token.
pub const AUTHORIZATION_HEADER: &str = "X-Imgproxy-Auth";

const HTTP_PORT: i64 = 80;

/// What the service and the edge hang off.
#[derive(Debug, Clone)]
pub struct Routing {
    /// Present only with an owned network.
    pub load_balancer: Option<ResourceId>,
    pub target_group: ResourceId,
    pub listener_rule: ResourceId,
}

/// # Errors
///
/// Returns `CompilerError` on an identifier clash.
pub fn declare(
    assembly: &mut Assembly<'_>,
    inputs: &Inputs,
    gates: &Gates,
    network: &NetworkRefs,
) -> Result<Routing, CompilerError> {
    let target_type = assembly.topology.target_type();
    let template = &mut assembly.template;
    let path_prefix = || reference(&inputs.endpoint.path_prefix);

    let (load_balancer, listener) = match &network.ingress {
        Ingress::Owned {
            security_group,
            subnets,
        } => {
            let load_balancer = template.declare_resource(
                "LoadBalancer",
                Resource::new(
                    kinds::LOAD_BALANCER,
                    Properties::new()
                        .with("Name", stack_prefixed("ALB"))
                        .with("Subnets", subnets.clone())
                        .with("SecurityGroups", Value::List(vec![reference(security_group)]))
                        .with("Tags", name_tags("ALB")),
                ),
            )?;

            let listener = template.declare_resource(
                "LoadBalancerListener",
                Resource::new(
                    kinds::LISTENER,
                    Properties::new()
                        .with("LoadBalancerArn", reference(&load_balancer))
                        .with("Port", HTTP_PORT)
                        .with("Protocol", "HTTP")
                        .with(
                            "DefaultActions",
                            Value::List(vec![Properties::new()
                                .with("Type", "fixed-response")
                                .with(
                                    "FixedResponseConfig",
                                    Properties::new()
                                        .with("ContentType", "text/plain")
                                        .with("MessageBody", "Not found")
                                        .with("StatusCode", "404"),
                                )
                                .into()]),
                        ),
                ),
            )?;

            (Some(load_balancer), Target::from(&listener))
        }
        Ingress::External { listener } => (None, Target::from(listener)),
    };

    let target_group = template.declare_resource(
        "LoadBalancerTargetGroup",
        Resource::new(
            kinds::TARGET_GROUP,
            Properties::new()
                .with("Name", stack_name())
                .with("VpcId", reference(network.vpc.clone()))
                .with("Port", HTTP_PORT)
                .with("Protocol", "HTTP")
                .with("TargetType", target_type)
                .with(
                    "TargetGroupAttributes",
                    Value::List(vec![Properties::new()
                        .with("Key", "load_balancing.algorithm.type")
                        .with("Value", "least_outstanding_requests")
                        .into()]),
                )
                .with("HealthCheckIntervalSeconds", 5)
                .with("HealthCheckPath", join("/", vec![path_prefix(), Value::from("health")]))
                .with("HealthCheckProtocol", "HTTP")
                .with("HealthCheckTimeoutSeconds", 2)
                .with("HealthyThresholdCount", 2),
        ),
    )?;

    let listener_rule = template.declare_resource(
        "LoadBalancerListenerRule",
        Resource::new(
            kinds::LISTENER_RULE,
            Properties::new()
                .with("ListenerArn", reference(listener))
                .with("Priority", 1)
                .with(
                    "Conditions",
                    Value::List(vec![
                        Properties::new()
                            .with("Field", "path-pattern")
                            .with(
                                "Values",
                                Value::List(vec![join("/", vec![path_prefix(), Value::from("*")])]),
                            )
                            .into(),
                        when(
                            &gates.have_authorization_token,
                            Properties::new().with("Field", "http-header").with(
                                "HttpHeaderConfig",
                                Properties::new()
                                    .with("HttpHeaderName", AUTHORIZATION_HEADER)
                                    .with(
                                        "Values",
                                        Value::List(vec![reference(&inputs.endpoint.authorization_token)]),
                                    ),
                            ),
                        ),
                    ]),
                )
                .with(
                    "Actions",
                    Value::List(vec![Properties::new()
                        .with("Type", "forward")
                        .with("TargetGroupArn", reference(&target_group))
                        .into()]),
                ),
        ),
    )?;

    Ok(Routing {
        load_balancer,
        target_group,
        listener_rule,
    })
}
