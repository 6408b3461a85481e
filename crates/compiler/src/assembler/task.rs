/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Log group and the imgproxy task definition.
 */

use crate::assembler::conditions::{Gates, ARCH_ATTRIBUTE};
use crate::assembler::iam::Roles;
use crate::assembler::parameters::Inputs;
use crate::assembler::topology::TaskNetworking;
use crate::assembler::{kinds, stack_name, Assembly};
use crate::error::CompilerError;
use crate::template::value::{find_in_map, get_att, reference, when};
use crate::template::{ConditionId, MappingId, Properties, Pseudo, Resource, ResourceId, Value};

pub const CONTAINER_NAME: &str = "imgproxy";
pub const CONTAINER_PORT: i64 = 8080;

const LOG_RETENTION_DAYS: i64 = 365;

/// # Errors
///
/// Returns `CompilerError` on an identifier clash.
pub fn declare_log_group(assembly: &mut Assembly<'_>) -> Result<ResourceId, CompilerError> {
    assembly.template.declare_resource(
        "CloudWatchLogGroup",
        Resource::new(
            kinds::LOG_GROUP,
            Properties::new()
                .with("LogGroupName", stack_name())
                .with("RetentionInDays", LOG_RETENTION_DAYS),
        ),
    )
}

fn variable(name: &str, value: impl Into<Value>) -> Value {
    Properties::new().with("Name", name).with("Value", value).into()
}

/// A variable that is only set when `condition` holds.
fn variable_when(condition: &ConditionId, name: &str, value: impl Into<Value>) -> Value {
    when(condition, variable(name, value))
}

/// Container environment; optional features only appear when enabled.
fn environment(inputs: &Inputs, gates: &Gates) -> Value {
    let region = || reference(Pseudo::Region);
    Value::List(vec![
        variable("AWS_REGION", region()),
        variable("IMGPROXY_BIND", ":8080"),
        variable("IMGPROXY_LOG_FORMAT", "structured"),
        variable_when(
            &gates.have_environment_secret,
            "IMGPROXY_ENV_AWS_SECRET_ID",
            reference(&inputs.environment.secret_arn),
        ),
        variable_when(
            &gates.have_environment_secret,
            "IMGPROXY_ENV_AWS_SECRET_VERSION_ID",
            reference(&inputs.environment.secret_version_id),
        ),
        variable_when(
            &gates.have_ssm_parameters_path,
            "IMGPROXY_ENV_AWS_SSM_PARAMETERS_PATH",
            reference(&inputs.environment.ssm_parameters_path),
        ),
        variable("IMGPROXY_USE_S3", "1"),
        variable_when(
            &gates.have_s3_assume_role,
            "IMGPROXY_S3_ASSUME_ROLE_ARN",
            reference(&inputs.s3.assume_role_arn),
        ),
        variable_when(&gates.s3_multi_region, "IMGPROXY_S3_MULTI_REGION", "1"),
        variable_when(
            &gates.s3_client_side_decryption,
            "IMGPROXY_S3_USE_DECRYPTION_CLIENT",
            "1",
        ),
        variable_when(
            &gates.have_path_prefix,
            "IMGPROXY_PATH_PREFIX",
            reference(&inputs.endpoint.path_prefix),
        ),
        variable("IMGPROXY_CLOUD_WATCH_SERVICE_NAME", stack_name()),
        variable("IMGPROXY_CLOUD_WATCH_NAMESPACE", "imgproxy"),
        variable("IMGPROXY_CLOUD_WATCH_REGION", region()),
    ])
}

/// # Errors
///
/// Returns `CompilerError` on an identifier clash.
pub fn declare_task_definition(
    assembly: &mut Assembly<'_>,
    inputs: &Inputs,
    gates: &Gates,
    roles: &Roles,
    log_group: &ResourceId,
    architectures: &MappingId,
) -> Result<ResourceId, CompilerError> {
    let networking = assembly.topology.task_networking();
    let launch_type = assembly.topology.launch_type;
    let service = &inputs.service;

    // awsvpc tasks reserve memory per task, bridge tasks per container.
    let (task_memory, container_memory) = match networking {
        TaskNetworking::Awsvpc => (Some(reference(&service.container_memory)), None),
        TaskNetworking::Bridge => (None, Some(reference(&service.container_memory))),
    };

    let container = Properties::new()
        .with("Name", CONTAINER_NAME)
        .with("Essential", true)
        .with("Image", reference(&service.docker_image))
        .with("Cpu", reference(&service.container_cpu))
        .with_opt("MemoryReservation", container_memory)
        .with("Environment", environment(inputs, gates))
        .with(
            "PortMappings",
            Value::List(vec![Properties::new().with("ContainerPort", CONTAINER_PORT).into()]),
        )
        .with(
            "HealthCheck",
            Properties::new()
                .with("Command", vec!["CMD-SHELL", "imgproxy health"])
                .with("Interval", 10)
                .with("Retries", 3)
                .with("Timeout", 2)
                .with("StartPeriod", 5),
        )
        .with(
            "LogConfiguration",
            Properties::new().with("LogDriver", "awslogs").with(
                "Options",
                Properties::new()
                    .with("awslogs-group", reference(log_group))
                    .with("awslogs-region", reference(Pseudo::Region))
                    .with("awslogs-stream-prefix", stack_name()),
            ),
        );

    assembly.template.declare_resource(
        "ECSTaskDefinition",
        Resource::new(
            kinds::TASK_DEFINITION,
            Properties::new()
                .with("Family", stack_name())
                .with("Cpu", reference(&service.container_cpu))
                .with_opt("Memory", task_memory)
                .with(
                    "RuntimePlatform",
                    Properties::new()
                        .with(
                            "CpuArchitecture",
                            find_in_map(
                                architectures,
                                reference(&service.cpu_architecture),
                                ARCH_ATTRIBUTE,
                            ),
                        )
                        .with("OperatingSystemFamily", "LINUX"),
                )
                .with("NetworkMode", networking.as_str())
                .with("RequiresCompatibilities", vec![launch_type.as_str()])
                .with("TaskRoleArn", get_att(&roles.task, "Arn"))
                .with("ExecutionRoleArn", get_att(&roles.execution, "Arn"))
                .with("ContainerDefinitions", Value::List(vec![container.into()])),
        ),
    )
}
