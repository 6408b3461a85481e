/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Step scaling of the service task count, driven by imgproxy's concurrency
 * utilization metric.
 *
 * EC2 capacity takes longer to arrive than FARGATE capacity, so the EC2
 * variant reacts slower and waits longer between steps.
 */

use crate::assembler::cluster::ClusterRefs;
use crate::assembler::parameters::Inputs;
use crate::assembler::{kinds, stack_name, stack_prefixed, Assembly};
use crate::config::LaunchType;
use crate::error::CompilerError;
use crate::template::value::{get_att, join, reference};
use crate::template::{Properties, Pseudo, Resource, ResourceId, Value};

/// Namespace imgproxy publishes its metrics under.
pub const METRIC_NAMESPACE: &str = "imgproxy";
pub const METRIC_NAME: &str = "ConcurrencyUtilization";

const SERVICE_LINKED_ROLE: &str = "role/aws-service-role/ecs.application-autoscaling.amazonaws.com/AWSServiceRoleForApplicationAutoScaling_ECSService";

/// Scale-out steps: `(lower, upper, percent change)`; the last is open-ended.
const SCALE_OUT_STEPS: [(i64, Option<i64>, i64); 5] = [
    (0, Some(25), 20),
    (25, Some(50), 40),
    (50, Some(75), 60),
    (75, Some(100), 80),
    (100, None, 100),
];

const SCALE_IN_ADJUSTMENT: i64 = -10;

/// Timings that depend on the launch type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub scale_out_cooldown: i64,
    pub scale_in_cooldown: i64,
    pub high_alarm_period: i64,
    pub low_alarm_evaluation_periods: i64,
}

impl Timings {
    #[must_use]
    pub fn for_launch_type(launch_type: LaunchType) -> Self {
        match launch_type {
            LaunchType::Ec2 => Self {
                scale_out_cooldown: 120,
                scale_in_cooldown: 600,
                high_alarm_period: 30,
                low_alarm_evaluation_periods: 20,
            },
            LaunchType::Fargate => Self {
                scale_out_cooldown: 30,
                scale_in_cooldown: 300,
                high_alarm_period: 10,
                low_alarm_evaluation_periods: 10,
            },
        }
    }
}

fn step_policy(name: &str, target: &ResourceId, cooldown: i64, steps: Vec<Value>) -> Properties {
    Properties::new()
        .with("PolicyName", stack_prefixed(name))
        .with("PolicyType", "StepScaling")
        .with("ScalingTargetId", reference(target))
        .with(
            "StepScalingPolicyConfiguration",
            Properties::new()
                .with("AdjustmentType", "PercentChangeInCapacity")
                .with("Cooldown", cooldown)
                .with("MetricAggregationType", "Average")
                .with("StepAdjustments", Value::List(steps)),
        )
}

struct AlarmSpec<'a> {
    label: &'a str,
    summary: &'a str,
    period: i64,
    evaluation_periods: i64,
    threshold: i64,
    comparison: &'a str,
    action: &'a ResourceId,
}

fn alarm(service: &ResourceId, spec: &AlarmSpec<'_>) -> Properties {
    let service_name = || get_att(service, "Name");
    Properties::new()
        .with("AlarmName", join("-", vec![service_name(), Value::from(spec.label)]))
        .with(
            "AlarmDescription",
            join(
                " ",
                vec![
                    Value::from(spec.summary),
                    service_name(),
                    Value::from("in environment"),
                    stack_name(),
                ],
            ),
        )
        .with("MetricName", METRIC_NAME)
        .with("Namespace", METRIC_NAMESPACE)
        .with(
            "Dimensions",
            Value::List(vec![Properties::new()
                .with("Name", "ServiceName")
                .with("Value", service_name())
                .into()]),
        )
        .with("Statistic", "Average")
        .with("Period", spec.period)
        .with("EvaluationPeriods", spec.evaluation_periods)
        .with("Threshold", spec.threshold)
        .with("ComparisonOperator", spec.comparison)
        .with("AlarmActions", Value::List(vec![reference(spec.action)]))
}

/// # Errors
///
/// Returns `CompilerError` on an identifier clash.
pub fn declare(
    assembly: &mut Assembly<'_>,
    inputs: &Inputs,
    cluster: &ClusterRefs,
    service: &ResourceId,
) -> Result<(), CompilerError> {
    let timings = Timings::for_launch_type(assembly.topology.launch_type);
    let template = &mut assembly.template;

    let scalable_target = template.declare_resource(
        "AutoscalingScalableTarget",
        Resource::new(
            kinds::SCALABLE_TARGET,
            Properties::new()
                .with("MaxCapacity", reference(&inputs.service.task_max_count))
                .with("MinCapacity", reference(&inputs.service.task_min_count))
                .with(
                    "ResourceId",
                    join(
                        "/",
                        vec![
                            Value::from("service"),
                            reference(cluster.cluster.clone()),
                            get_att(service, "Name"),
                        ],
                    ),
                )
                .with(
                    "RoleARN",
                    join(
                        ":",
                        vec![
                            Value::from("arn:aws:iam:"),
                            reference(Pseudo::AccountId),
                            Value::from(SERVICE_LINKED_ROLE),
                        ],
                    ),
                )
                .with("ScalableDimension", "ecs:service:DesiredCount")
                .with("ServiceNamespace", "ecs"),
        ),
    )?;

    let out_steps: Vec<Value> = SCALE_OUT_STEPS
        .iter()
        .map(|&(lower, upper, adjustment)| {
            Value::from(
                Properties::new()
                    .with("MetricIntervalLowerBound", lower)
                    .with_opt("MetricIntervalUpperBound", upper)
                    .with("ScalingAdjustment", adjustment),
            )
        })
        .collect();

    let scale_out = template.declare_resource(
        "AutoscalingScalingOutPolicy",
        Resource::new(
            kinds::SCALING_POLICY,
            step_policy(
                "Scaling-Out-Policy",
                &scalable_target,
                timings.scale_out_cooldown,
                out_steps,
            ),
        ),
    )?;

    let scale_in = template.declare_resource(
        "AutoscalingScalingInPolicy",
        Resource::new(
            kinds::SCALING_POLICY,
            step_policy(
                "Scaling-In-Policy",
                &scalable_target,
                timings.scale_in_cooldown,
                vec![Properties::new()
                    .with("MetricIntervalUpperBound", 0)
                    .with("ScalingAdjustment", SCALE_IN_ADJUSTMENT)
                    .into()],
            ),
        ),
    )?;

    template.declare_resource(
        "AutoscalingHighConcurrencyUsageAlarm",
        Resource::new(
            kinds::ALARM,
            alarm(
                service,
                &AlarmSpec {
                    label: "High-Concurrency-Usage",
                    summary: "High concurrency utilization for service",
                    period: timings.high_alarm_period,
                    evaluation_periods: 2,
                    threshold: 80,
                    comparison: "GreaterThanThreshold",
                    action: &scale_out,
                },
            ),
        ),
    )?;

    template.declare_resource(
        "AutoscalingLowConcurrencyUsageAlarm",
        Resource::new(
            kinds::ALARM,
            alarm(
                service,
                &AlarmSpec {
                    label: "Low-Concurrency-Usage",
                    summary: "Low concurrency utilization for service",
                    period: 30,
                    evaluation_periods: timings.low_alarm_evaluation_periods,
                    threshold: 50,
                    comparison: "LessThanThreshold",
                    action: &scale_in,
                },
            ),
        ),
    )?;

    tracing::debug!(?timings, "declared service autoscaling");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ec2_reacts_slower_than_fargate() {
        let ec2 = Timings::for_launch_type(LaunchType::Ec2);
        let fargate = Timings::for_launch_type(LaunchType::Fargate);
        assert!(ec2.scale_out_cooldown > fargate.scale_out_cooldown);
        assert!(ec2.scale_in_cooldown > fargate.scale_in_cooldown);
        assert_eq!(fargate.high_alarm_period, 10);
        assert_eq!(ec2.low_alarm_evaluation_periods, 20);
    }

    #[test]
    fn test_scale_out_steps_are_contiguous() {
        for pair in SCALE_OUT_STEPS.windows(2) {
            assert_eq!(pair[0].1, Some(pair[1].0));
        }
        assert_eq!(SCALE_OUT_STEPS.last().map(|step| step.1), Some(None));
    }
}
