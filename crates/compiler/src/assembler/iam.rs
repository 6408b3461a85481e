/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * IAM roles of the ECS tasks.
 *
 * The task role carries one inline policy per enabled feature; each optional
 * policy sits behind the feature's condition and disappears entirely when
 * the condition is false.
 */

use crate::assembler::conditions::Gates;
use crate::assembler::parameters::Inputs;
use crate::assembler::{kinds, stack_prefixed, Assembly};
use crate::error::CompilerError;
use crate::template::value::{join, reference, when};
use crate::template::{Properties, Pseudo, Resource, ResourceId, Value};

pub const POLICY_VERSION: &str = "2012-10-17";

const TASKS_SERVICE: &str = "ecs-tasks.amazonaws.com";

/// Task and execution roles.
#[derive(Debug, Clone)]
pub struct Roles {
    pub task: ResourceId,
    pub execution: ResourceId,
}

/// `{"Version": ..., "Statement": [...]}`
pub fn policy_document(statements: Vec<Value>) -> Value {
    Properties::new()
        .with("Version", POLICY_VERSION)
        .with("Statement", Value::List(statements))
        .into()
}

/// Allow a service principal to assume the role.
pub fn assume_role_statement(service: &str) -> Properties {
    Properties::new()
        .with("Effect", "Allow")
        .with("Principal", Properties::new().with("Service", vec![service]))
        .with("Action", vec!["sts:AssumeRole"])
}

/// Allow `actions` on `resource`.
pub fn allow(actions: &[&str], resource: impl Into<Value>) -> Value {
    Properties::new()
        .with("Effect", "Allow")
        .with("Action", actions.to_vec())
        .with("Resource", resource)
        .into()
}

/// A named inline policy.
pub fn policy(name: &str, statements: Vec<Value>) -> Value {
    Properties::new()
        .with("PolicyName", name)
        .with("PolicyDocument", policy_document(statements))
        .into()
}

/// # Errors
///
/// Returns `CompilerError` on an identifier clash.
pub fn declare(assembly: &mut Assembly<'_>, inputs: &Inputs, gates: &Gates) -> Result<Roles, CompilerError> {
    let template = &mut assembly.template;

    let account = || reference(Pseudo::AccountId);
    let region = || reference(Pseudo::Region);

    let trust = assume_role_statement(TASKS_SERVICE).with(
        "Condition",
        Properties::new()
            .with(
                "ArnLike",
                Properties::new().with(
                    "aws:SourceArn",
                    join(":", vec![Value::from("arn:aws:ecs"), region(), account(), Value::from("*")]),
                ),
            )
            .with(
                "StringEquals",
                Properties::new().with("aws:SourceAccount", account()),
            ),
    );

    let policies = vec![
        policy(
            "cloudwatch",
            vec![allow(
                &[
                    "logs:CreateLogStream",
                    "logs:PutLogEvents",
                    "cloudwatch:PutMetricData",
                    "cloudwatch:PutMetricStream",
                ],
                vec!["*"],
            )],
        ),
        when(
            &gates.have_environment_secret,
            policy(
                "secrets_manager-access",
                vec![allow(
                    &["secretsmanager:GetSecretValue", "secretsmanager:ListSecretVersionIds"],
                    vec![reference(&inputs.environment.secret_arn)],
                )],
            ),
        ),
        when(
            &gates.have_ssm_parameters_path,
            policy(
                "systems_manager-access",
                vec![allow(
                    &["ssm:GetParametersByPath"],
                    vec![join(
                        "",
                        vec![
                            Value::from("arn:aws:ssm:"),
                            region(),
                            Value::from(":"),
                            account(),
                            Value::from(":parameter"),
                            reference(&inputs.environment.ssm_parameters_path),
                        ],
                    )],
                )],
            ),
        ),
        when(
            &gates.have_s3_objects,
            policy(
                "s3-access",
                vec![allow(
                    &["s3:GetObject", "s3:GetObjectVersion"],
                    reference(&inputs.s3.objects),
                )],
            ),
        ),
        when(
            &gates.have_s3_assume_role,
            policy(
                "iam_role-assume",
                vec![allow(&["sts:AssumeRole"], reference(&inputs.s3.assume_role_arn))],
            ),
        ),
        when(
            &gates.s3_client_side_decryption,
            policy(
                "kms-decrypt",
                vec![allow(
                    &["kms:Decrypt"],
                    join(":", vec![Value::from("arn:aws:kms:*"), account(), Value::from("key/*")]),
                )],
            ),
        ),
    ];

    let task = template.declare_resource(
        "ECSTaskRole",
        Resource::new(
            kinds::IAM_ROLE,
            Properties::new()
                .with("RoleName", stack_prefixed("ecs-task"))
                .with("Path", "/")
                .with("AssumeRolePolicyDocument", policy_document(vec![trust.into()]))
                .with("Policies", Value::List(policies)),
        ),
    )?;

    let execution = template.declare_resource(
        "ECSTaskExecutionRole",
        Resource::new(
            kinds::IAM_ROLE,
            Properties::new()
                .with("RoleName", stack_prefixed("ecs-task-execution"))
                .with("Path", "/")
                .with(
                    "AssumeRolePolicyDocument",
                    policy_document(vec![assume_role_statement(TASKS_SERVICE).into()]),
                )
                .with(
                    "ManagedPolicyArns",
                    vec![
                        "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy",
                        "arn:aws:iam::aws:policy/CloudWatchAgentServerPolicy",
                    ],
                ),
        ),
    )?;

    Ok(Roles { task, execution })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_statement_shape() {
        let statement = allow(&["s3:GetObject"], vec!["*"]);
        let map = statement.as_map().unwrap();
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Effect", "Action", "Resource"]);
        assert_eq!(map.get("Action"), Some(&Value::from(vec!["s3:GetObject"])));
    }

    #[test]
    fn test_policy_document_version() {
        let document = policy_document(Vec::new());
        assert_eq!(
            document.as_map().and_then(|m| m.get("Version")),
            Some(&Value::from(POLICY_VERSION))
        );
    }
}
