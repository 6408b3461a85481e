/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Value conditioning: deploy-time conditions over parameters, and the static
 * architecture mapping.
 */

use crate::assembler::parameters::Inputs;
use crate::assembler::Assembly;
use crate::error::DeclarationError;
use crate::template::value::{equals, join, not, not_empty, reference};
use crate::template::{Condition, ConditionId, Mapping, MappingId, ParameterId, Properties};

/// Mapping attribute holding the ECS platform name.
pub const ARCH_ATTRIBUTE: &str = "Arch";
/// Mapping attribute holding the machine image.
pub const IMAGE_ATTRIBUTE: &str = "ImageId";

/// Conditions of the template-managed cluster.
#[derive(Debug, Clone)]
pub struct ClusterGates {
    pub use_spot: ConditionId,
    pub add_warm_pool: ConditionId,
}

/// Handles of every declared condition.
#[derive(Debug, Clone)]
pub struct Gates {
    pub cluster: Option<ClusterGates>,
    pub have_environment_secret: ConditionId,
    pub have_ssm_parameters_path: ConditionId,
    pub have_s3_objects: ConditionId,
    pub have_s3_assume_role: ConditionId,
    pub s3_multi_region: ConditionId,
    pub s3_client_side_decryption: ConditionId,
    pub have_path_prefix: ConditionId,
    pub deploy_cloudfront: Option<ConditionId>,
    pub have_authorization_token: ConditionId,
}

fn is_yes(parameter: &ParameterId) -> Condition {
    Condition::new(equals(reference(parameter), "Yes"))
}

fn is_set(parameter: &ParameterId) -> Condition {
    Condition::new(not_empty(reference(parameter)))
}

/// # Errors
///
/// Returns `DeclarationError` on an identifier clash.
pub fn declare(assembly: &mut Assembly<'_>, inputs: &Inputs) -> Result<Gates, DeclarationError> {
    let template = &mut assembly.template;

    let cluster = match &inputs.cluster {
        Some(cluster) => Some(ClusterGates {
            use_spot: template.declare_condition(
                "ClusterUseSpot",
                Condition::new(not(equals(reference(&cluster.on_demand_percentage), "100"))),
            )?,
            add_warm_pool: template
                .declare_condition("ClusterShouldAddWarmPool", is_yes(&cluster.add_warm_pool))?,
        }),
        None => None,
    };

    let have_environment_secret = template.declare_condition(
        "HaveEnvironmentSecretArn",
        is_set(&inputs.environment.secret_arn),
    )?;
    let have_ssm_parameters_path = template.declare_condition(
        "HaveEnvironmentSystemsManagerParametersPath",
        is_set(&inputs.environment.ssm_parameters_path),
    )?;
    // A list parameter is compared through its joined form.
    let have_s3_objects = template.declare_condition(
        "HaveS3Objects",
        Condition::new(not_empty(join("", reference(&inputs.s3.objects)))),
    )?;
    let have_s3_assume_role =
        template.declare_condition("HaveS3AssumeRole", is_set(&inputs.s3.assume_role_arn))?;
    let s3_multi_region =
        template.declare_condition("EnableS3MultiRegion", is_yes(&inputs.s3.multi_region))?;
    let s3_client_side_decryption = template.declare_condition(
        "EnableS3ClientSideDecryption",
        is_yes(&inputs.s3.client_side_decryption),
    )?;
    let have_path_prefix =
        template.declare_condition("HavePathPrefix", is_set(&inputs.endpoint.path_prefix))?;
    let deploy_cloudfront = match &inputs.endpoint.create_cloudfront {
        Some(create) => Some(template.declare_condition("DeployCloudFront", is_yes(create))?),
        None => None,
    };
    let have_authorization_token = template.declare_condition(
        "HaveAuthorizationToken",
        is_set(&inputs.endpoint.authorization_token),
    )?;

    tracing::debug!(count = template.conditions().len(), "declared conditions");
    Ok(Gates {
        cluster,
        have_environment_secret,
        have_ssm_parameters_path,
        have_s3_objects,
        have_s3_assume_role,
        s3_multi_region,
        s3_client_side_decryption,
        have_path_prefix,
        deploy_cloudfront,
        have_authorization_token,
    })
}

/// Architecture name to ECS platform and machine image, from the catalog.
///
/// # Errors
///
/// Returns `DeclarationError` on an identifier clash.
pub fn declare_architectures(assembly: &mut Assembly<'_>) -> Result<MappingId, DeclarationError> {
    let mapping = assembly
        .catalog
        .architectures
        .iter()
        .fold(Mapping::new(), |mapping, architecture| {
            mapping.entry(
                &architecture.name,
                Properties::new()
                    .with(ARCH_ATTRIBUTE, architecture.platform.as_str())
                    .with(IMAGE_ATTRIBUTE, architecture.image_id.as_str()),
            )
        });
    assembly.template.declare_mapping("Architectures", mapping)
}
