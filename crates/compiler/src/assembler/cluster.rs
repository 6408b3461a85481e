/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * ECS cluster and its capacity: the built-in FARGATE provider, or
 * template-managed EC2 instances behind an auto scaling group.
 */

use crate::assembler::conditions::{ClusterGates, Gates, IMAGE_ATTRIBUTE};
use crate::assembler::network::NetworkRefs;
use crate::assembler::parameters::{ClusterInputs, Inputs};
use crate::assembler::topology::Compute;
use crate::assembler::{iam, kinds, stack_name, stack_prefixed, Assembly};
use crate::error::{CompilerError, ReferentialIntegrityError};
use crate::template::value::{base64, find_in_map, get_att, join, reference, sub, unless, when};
use crate::template::{MappingId, Properties, Pseudo, Resource, ResourceId, Target, Value};

/// Built-in capacity provider name.
pub const FARGATE_PROVIDER: &str = "FARGATE";

const CLUSTER_ID: &str = "ECSCluster";
const AUTO_SCALING_GROUP_ID: &str = "EC2AutoScalingGroup";

/// Signal timeout of new instances and rolling-update pause.
const INSTANCE_SIGNAL_TIMEOUT: &str = "PT15M";

/// References into the cluster, owned or not.
#[derive(Debug, Clone)]
pub struct ClusterRefs {
    pub cluster: Target,
    /// Present when the cluster is owned; the service must wait for it.
    pub associations: Option<ResourceId>,
}

/// # Errors
///
/// Returns `CompilerError` on an identifier clash or a missing dependency.
pub fn declare(
    assembly: &mut Assembly<'_>,
    inputs: &Inputs,
    gates: &Gates,
    network: &NetworkRefs,
    architectures: &MappingId,
) -> Result<ClusterRefs, CompilerError> {
    if !assembly.topology.owns_cluster() {
        let name = required(&inputs.service.cluster_name, "ClusterName")?;
        return Ok(ClusterRefs {
            cluster: Target::from(name),
            associations: None,
        });
    }

    let cluster = assembly.template.declare_resource(
        CLUSTER_ID,
        Resource::new(
            kinds::ECS_CLUSTER,
            Properties::new().with("ClusterName", stack_prefixed("Cluster")),
        ),
    )?;

    let provider: Value = match assembly.topology.compute {
        Compute::ManagedInstances => {
            let cluster_inputs = required(&inputs.cluster, "ClusterInstanceType")?;
            let cluster_gates = required(&gates.cluster, "ClusterUseSpot")?;
            let provider = declare_instances(
                assembly,
                inputs,
                cluster_inputs,
                cluster_gates,
                network,
                architectures,
            )?;
            reference(&provider)
        }
        Compute::Fargate | Compute::ExternalInstances => Value::from(FARGATE_PROVIDER),
    };

    let associations = assembly.template.declare_resource(
        "ECSClusterCapacityProviderAssociations",
        Resource::new(
            kinds::CAPACITY_PROVIDER_ASSOCIATIONS,
            Properties::new()
                .with("Cluster", reference(&cluster))
                .with("CapacityProviders", Value::List(vec![provider.clone()]))
                .with(
                    "DefaultCapacityProviderStrategy",
                    Value::List(vec![Properties::new()
                        .with("Base", 1)
                        .with("Weight", 10)
                        .with("CapacityProvider", provider)
                        .into()]),
                ),
        ),
    )?;

    Ok(ClusterRefs {
        cluster: Target::from(&cluster),
        associations: Some(associations),
    })
}

/// Instance role and profile, launch template, auto scaling group, warm pool
/// and the capacity provider bound to the group. Returns the provider.
fn declare_instances(
    assembly: &mut Assembly<'_>,
    inputs: &Inputs,
    cluster: &ClusterInputs,
    gates: &ClusterGates,
    network: &NetworkRefs,
    architectures: &MappingId,
) -> Result<ResourceId, CompilerError> {
    let placement = required(&network.placement, "SubnetIds")?;
    let template = &mut assembly.template;

    let role = template.declare_resource(
        "EC2InstanceRole",
        Resource::new(
            kinds::IAM_ROLE,
            Properties::new()
                .with("RoleName", stack_prefixed("ec2-instance"))
                .with("Path", "/")
                .with(
                    "AssumeRolePolicyDocument",
                    iam::policy_document(vec![iam::assume_role_statement("ec2.amazonaws.com").into()]),
                )
                .with(
                    "ManagedPolicyArns",
                    vec!["arn:aws:iam::aws:policy/service-role/AmazonEC2ContainerServiceforEC2Role"],
                )
                .with(
                    "Policies",
                    Value::List(vec![iam::policy(
                        "cloudformation-signal",
                        vec![iam::allow(
                            &["cloudformation:DescribeStackResource", "cloudformation:SignalResource"],
                            vec![join(
                                "",
                                vec![
                                    Value::from("arn:aws:cloudformation:"),
                                    reference(Pseudo::Region),
                                    Value::from(":"),
                                    reference(Pseudo::AccountId),
                                    Value::from(":stack/"),
                                    stack_name(),
                                    Value::from("/*"),
                                ],
                            )],
                        )],
                    )]),
                ),
        ),
    )?;

    let profile = template.declare_resource(
        "EC2InstanceProfile",
        Resource::new(
            kinds::INSTANCE_PROFILE,
            Properties::new()
                .with("Path", "/")
                .with("Roles", Value::List(vec![reference(&role)])),
        ),
    )?;

    let launch_template = template.declare_resource(
        "EC2LaunchTemplate",
        Resource::new(
            kinds::LAUNCH_TEMPLATE,
            Properties::new()
                .with("LaunchTemplateName", stack_prefixed("Launch-Template"))
                .with(
                    "LaunchTemplateData",
                    Properties::new()
                        .with(
                            "ImageId",
                            find_in_map(
                                architectures,
                                reference(&inputs.service.cpu_architecture),
                                IMAGE_ATTRIBUTE,
                            ),
                        )
                        .with(
                            "SecurityGroupIds",
                            Value::List(vec![reference(placement.host_security_group.clone())]),
                        )
                        .with("InstanceType", reference(&cluster.instance_type))
                        .with(
                            "IamInstanceProfile",
                            Properties::new().with("Name", reference(&profile)),
                        )
                        .with("UserData", base64(sub(&bottlerocket_settings()))),
                ),
        ),
    )?;

    let launch_template_spec = Properties::new()
        .with("LaunchTemplateId", reference(&launch_template))
        .with("Version", get_att(&launch_template, "LatestVersionNumber"));

    let auto_scaling_group = template.declare_resource(
        AUTO_SCALING_GROUP_ID,
        Resource::new(
            kinds::AUTO_SCALING_GROUP,
            Properties::new()
                .with("VPCZoneIdentifier", placement.subnets.clone())
                .with(
                    "MixedInstancesPolicy",
                    when(
                        &gates.use_spot,
                        Properties::new()
                            .with(
                                "LaunchTemplate",
                                Properties::new()
                                    .with("LaunchTemplateSpecification", launch_template_spec.clone()),
                            )
                            .with(
                                "InstancesDistribution",
                                Properties::new()
                                    .with("OnDemandBaseCapacity", 1)
                                    .with(
                                        "OnDemandPercentageAboveBaseCapacity",
                                        reference(&cluster.on_demand_percentage),
                                    )
                                    .with("SpotAllocationStrategy", "price-capacity-optimized"),
                            ),
                    ),
                )
                .with("LaunchTemplate", unless(&gates.use_spot, launch_template_spec))
                .with("MinSize", reference(&cluster.min_size))
                .with("MaxSize", reference(&cluster.max_size))
                .with("DesiredCapacity", reference(&cluster.desired_size))
                .with(
                    "Tags",
                    Value::List(vec![Properties::new()
                        .with("Key", "Name")
                        .with("Value", stack_prefixed("ECS-ASG"))
                        .with("PropagateAtLaunch", true)
                        .into()]),
                ),
        )
        .creation_policy(
            Properties::new().with(
                "ResourceSignal",
                Properties::new().with("Timeout", INSTANCE_SIGNAL_TIMEOUT),
            ),
        )
        .update_policy(Properties::new().with(
            "AutoScalingRollingUpdate",
            Properties::new()
                .with("MinInstancesInService", 1)
                .with("MaxBatchSize", 1)
                .with("PauseTime", INSTANCE_SIGNAL_TIMEOUT)
                .with(
                    "SuspendProcesses",
                    vec![
                        "HealthCheck",
                        "ReplaceUnhealthy",
                        "AZRebalance",
                        "AlarmNotification",
                        "ScheduledActions",
                    ],
                )
                .with("WaitOnResourceSignals", true),
        )),
    )?;

    template.declare_resource(
        "EC2AutoScalingGroupWarmPool",
        Resource::new(
            kinds::WARM_POOL,
            Properties::new()
                .with("AutoScalingGroupName", reference(&auto_scaling_group))
                .with(
                    "InstanceReusePolicy",
                    Properties::new().with("ReuseOnScaleIn", true),
                ),
        )
        .gated_by(&gates.add_warm_pool),
    )?;

    let provider = template.declare_resource(
        "ECSCapacityProvider",
        Resource::new(
            kinds::CAPACITY_PROVIDER,
            Properties::new().with(
                "AutoScalingGroupProvider",
                Properties::new()
                    .with("AutoScalingGroupArn", reference(&auto_scaling_group))
                    .with(
                        "ManagedScaling",
                        Properties::new()
                            .with("MaximumScalingStepSize", 4)
                            .with("MinimumScalingStepSize", 1)
                            .with("Status", "ENABLED")
                            .with("TargetCapacity", reference(&cluster.target_capacity_utilization)),
                    ),
            ),
        ),
    )?;

    tracing::debug!("declared managed EC2 capacity");
    Ok(provider)
}

/// Bottlerocket settings joining the cluster and signalling the auto scaling group.
fn bottlerocket_settings() -> String {
    format!(
        "[settings.ecs]\n\
         cluster = \"${{{CLUSTER_ID}}}\"\n\
         \n\
         [settings.cloudformation]\n\
         should-signal = true\n\
         stack-name = \"${{AWS::StackName}}\"\n\
         logical-resource-id = \"{AUTO_SCALING_GROUP_ID}\""
    )
}

fn required<'a, T>(value: &'a Option<T>, name: &str) -> Result<&'a T, ReferentialIntegrityError> {
    value
        .as_ref()
        .ok_or_else(|| ReferentialIntegrityError::DanglingReference {
            owner: "Cluster".to_string(),
            kind: "parameter",
            target: name.to_string(),
        })
}
