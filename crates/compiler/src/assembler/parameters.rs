/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Deploy-time inputs. Which parameters exist depends on the topology; every
 * declared parameter is consumed by a later assembly step.
 */

use crate::assembler::topology::{Compute, Network};
use crate::assembler::Assembly;
use crate::config::LaunchType;
use crate::error::DeclarationError;
use crate::template::{Parameter, ParameterId, ParameterType};

pub const YES_NO: [&str; 2] = ["Yes", "No"];

const NETWORK_GROUP: &str = "Network";
const CLUSTER_GROUP: &str = "Cluster";
const SERVICE_GROUP: &str = "Service";
const SECRET_GROUP: &str = "Load environment from an AWS Secrets Manager secret";
const SSM_GROUP: &str = "Load environment from AWS Systems Manager Parameter Store";
const S3_GROUP: &str = "S3 integration";
const ENDPOINT_GROUP: &str = "Endpoint";

/// Caller-supplied network.
#[derive(Debug, Clone)]
pub struct NetworkInputs {
    pub vpc: ParameterId,
    pub listener: ParameterId,
    pub placement: Option<PlacementInputs>,
}

/// Subnets and security group for tasks or instances in a caller-supplied network.
#[derive(Debug, Clone)]
pub struct PlacementInputs {
    pub subnets: ParameterId,
    pub host_security_group: ParameterId,
}

/// Sizing of template-managed cluster instances.
#[derive(Debug, Clone)]
pub struct ClusterInputs {
    pub instance_type: ParameterId,
    pub desired_size: ParameterId,
    pub min_size: ParameterId,
    pub max_size: ParameterId,
    pub target_capacity_utilization: ParameterId,
    pub on_demand_percentage: ParameterId,
    pub add_warm_pool: ParameterId,
}

#[derive(Debug, Clone)]
pub struct ServiceInputs {
    pub cluster_name: Option<ParameterId>,
    pub cpu_architecture: ParameterId,
    pub docker_image: ParameterId,
    pub container_cpu: ParameterId,
    pub container_memory: ParameterId,
    pub task_desired_count: ParameterId,
    pub task_min_count: ParameterId,
    pub task_max_count: ParameterId,
}

#[derive(Debug, Clone)]
pub struct EnvironmentInputs {
    pub secret_arn: ParameterId,
    pub secret_version_id: ParameterId,
    pub ssm_parameters_path: ParameterId,
}

#[derive(Debug, Clone)]
pub struct S3Inputs {
    pub objects: ParameterId,
    pub assume_role_arn: ParameterId,
    pub multi_region: ParameterId,
    pub client_side_decryption: ParameterId,
}

#[derive(Debug, Clone)]
pub struct EndpointInputs {
    pub path_prefix: ParameterId,
    pub create_cloudfront: Option<ParameterId>,
    pub authorization_token: ParameterId,
}

/// Handles of every declared parameter.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub network: Option<NetworkInputs>,
    pub cluster: Option<ClusterInputs>,
    pub service: ServiceInputs,
    pub environment: EnvironmentInputs,
    pub s3: S3Inputs,
    pub endpoint: EndpointInputs,
}

/// Declare all parameters in UI order.
///
/// # Errors
///
/// Returns `DeclarationError` on an identifier clash.
pub fn declare(assembly: &mut Assembly<'_>) -> Result<Inputs, DeclarationError> {
    let network = network(assembly)?;
    let cluster = cluster(assembly)?;
    let service = service(assembly)?;
    let environment = environment(assembly)?;
    let s3 = s3(assembly)?;
    let endpoint = endpoint(assembly)?;

    tracing::debug!(count = assembly.template.parameters().len(), "declared parameters");
    Ok(Inputs {
        network,
        cluster,
        service,
        environment,
        s3,
        endpoint,
    })
}

fn network(assembly: &mut Assembly<'_>) -> Result<Option<NetworkInputs>, DeclarationError> {
    let Network::External { needs_placement } = assembly.topology.network else {
        return Ok(None);
    };
    let template = &mut assembly.template;

    let vpc = template.declare_parameter(
        "VpcId",
        Parameter::new(ParameterType::VpcId, "ID of VPC to deploy imgproxy into")
            .labelled(NETWORK_GROUP, "VPC ID"),
    )?;

    let placement = if needs_placement {
        let subnets = template.declare_parameter(
            "SubnetIds",
            Parameter::new(ParameterType::SubnetIdList, "IDs of Subnets to deploy imgproxy into")
                .labelled(NETWORK_GROUP, "Subnet IDs"),
        )?;
        let host_security_group = template.declare_parameter(
            "ECSHostSecurityGroupId",
            Parameter::new(
                ParameterType::SecurityGroupId,
                "ID of security group to use for ECS hosts. Should allow access from the load balancer",
            )
            .labelled(NETWORK_GROUP, "ECS host security group ID"),
        )?;
        Some(PlacementInputs {
            subnets,
            host_security_group,
        })
    } else {
        None
    };

    let listener = template.declare_parameter(
        "LoadBalancerListenerArn",
        Parameter::new(
            ParameterType::String,
            "ARN of the load balancer listener to use for imgproxy",
        )
        .allowed_pattern(
            "arn:aws:elasticloadbalancing:[a-z0-9-]+:[0-9]+:listener/app/[a-z0-9-]+/[a-z0-9-]+/[a-z0-9]+",
            "Must be a valid load balancer listener ARN",
        )
        .labelled(NETWORK_GROUP, "Load balancer listener ARN"),
    )?;

    Ok(Some(NetworkInputs {
        vpc,
        listener,
        placement,
    }))
}

fn cluster(assembly: &mut Assembly<'_>) -> Result<Option<ClusterInputs>, DeclarationError> {
    if assembly.topology.compute != Compute::ManagedInstances {
        return Ok(None);
    }
    let catalog = assembly.catalog;
    let template = &mut assembly.template;

    let instance_types: Vec<&str> = catalog.all_instance_types().collect();
    let instance_type = template.declare_parameter(
        "ClusterInstanceType",
        Parameter::new(ParameterType::String, "EC2 instance type to use in your ECS cluster")
            .default_value(catalog.default_instance_type.as_str())
            .allowed_values(&instance_types)
            .labelled(CLUSTER_GROUP, "EC2 instance type"),
    )?;

    let desired_size = template.declare_parameter(
        "ClusterDesiredSize",
        Parameter::new(
            ParameterType::Number,
            "Number of EC2 instances to initially launch in your ECS cluster",
        )
        .default_value(2)
        .min(1)
        .labelled(CLUSTER_GROUP, "Desired number of instances"),
    )?;

    let min_size = template.declare_parameter(
        "ClusterMinSize",
        Parameter::new(
            ParameterType::Number,
            "The minimum number of EC2 instances to launch in your ECS cluster",
        )
        .default_value(1)
        .min(1)
        .labelled(CLUSTER_GROUP, "Minimum number of instances"),
    )?;

    let max_size = template.declare_parameter(
        "ClusterMaxSize",
        Parameter::new(
            ParameterType::Number,
            "The maximum number of EC2 instances to launch in your ECS cluster",
        )
        .default_value(5)
        .min(1)
        .labelled(CLUSTER_GROUP, "Maximum number of instances"),
    )?;

    let target_capacity_utilization = template.declare_parameter(
        "ClusterTargetCapacityUtilization",
        Parameter::new(
            ParameterType::Number,
            "The target capacity utilization as a percentage for the EC2 Auto Scaling group. \
             For example, if you want the Auto Scaling group to maintain 10% spare capacity, then that means the \
             utilization is 90%, so use a value of 90. \
             The value of 100 percent results in the Amazon EC2 instances in your Auto Scaling group being \
             completely used",
        )
        .default_value(100)
        .min(1)
        .max(100)
        .labelled(CLUSTER_GROUP, "Target capacity utilization"),
    )?;

    let on_demand_percentage = template.declare_parameter(
        "ClusterOnDemandPercentage",
        Parameter::new(
            ParameterType::Number,
            "Controls the percentages of On-Demand Instances and Spot Instances in the EC2 Auto Scaling group. \
             If set to 100, only On-Demand Instances are used",
        )
        .default_value(100)
        .min(1)
        .max(100)
        .labelled(CLUSTER_GROUP, "On-Demand instances percentage"),
    )?;

    let add_warm_pool = template.declare_parameter(
        "ClusterAddWarmPool",
        Parameter::new(
            ParameterType::String,
            "Create a pool of pre-initialized EC2 instances that sits alongside the EC2 Auto Scaling group. \
             Whenever your application needs to scale out, the Auto Scaling group can draw on the warm pool \
             to meet its new desired capacity. \
             Can not be used if ClusterOnDemandPercentage is below 100",
        )
        .default_value("Yes")
        .allowed_values(&YES_NO)
        .labelled(CLUSTER_GROUP, "Add warm pool"),
    )?;

    Ok(Some(ClusterInputs {
        instance_type,
        desired_size,
        min_size,
        max_size,
        target_capacity_utilization,
        on_demand_percentage,
        add_warm_pool,
    }))
}

fn service(assembly: &mut Assembly<'_>) -> Result<ServiceInputs, DeclarationError> {
    let owns_cluster = assembly.topology.owns_cluster();
    let launch_type = assembly.topology.launch_type;
    let catalog = assembly.catalog;
    let template = &mut assembly.template;

    let cluster_name = if owns_cluster {
        None
    } else {
        Some(template.declare_parameter(
            "ClusterName",
            Parameter::new(
                ParameterType::String,
                "Name (not ARN!) of ECS cluster to deploy imgproxy into",
            )
            .allowed_pattern("[a-zA-Z0-9-_]+", "Must be a valid ECS cluster name")
            .labelled(SERVICE_GROUP, "ECS cluster name"),
        )?)
    };

    let architectures: Vec<&str> = catalog.architecture_names().collect();
    let default_architecture = catalog.default_architecture().name.as_str();
    let cpu_architecture = template.declare_parameter(
        "CpuArchitecture",
        Parameter::new(
            ParameterType::String,
            &format!("CPU architecture of the Docker image. {default_architecture} is highly recommended"),
        )
        .default_value(default_architecture)
        .allowed_values(&architectures)
        .labelled(SERVICE_GROUP, "CPU architecture"),
    )?;

    let docker_image = template.declare_parameter(
        "DockerImage",
        Parameter::new(
            ParameterType::String,
            "The imgproxy or imgproxy Pro Docker image name stored in a public registry or your ECR registry",
        )
        .default_value("darthsim/imgproxy:v3")
        .labelled(SERVICE_GROUP, "Docker image"),
    )?;

    let container_cpu = template.declare_parameter(
        "ContainerCpu",
        Parameter::new(
            ParameterType::Number,
            "Amount of CPU to give to the container. 1024 is 1 CPU",
        )
        .default_value(1024)
        .min(1024)
        .labelled(SERVICE_GROUP, "CPU per task"),
    )?;

    // FARGATE reserves memory per task, EC2 per container.
    let (memory_default, memory_min) = match launch_type {
        LaunchType::Fargate => (2048, 2048),
        LaunchType::Ec2 => (1536, 512),
    };
    let container_memory = template.declare_parameter(
        "ContainerMemory",
        Parameter::new(
            ParameterType::Number,
            "Amount of memory in megabytes to give to the container",
        )
        .default_value(memory_default)
        .min(memory_min)
        .labelled(SERVICE_GROUP, "Memory per task"),
    )?;

    let task_desired_count = template.declare_parameter(
        "TaskDesiredCount",
        Parameter::new(
            ParameterType::Number,
            "Number of imgproxy instances to initially launch in your service",
        )
        .default_value(2)
        .min(1)
        .labelled(SERVICE_GROUP, "Desired number of tasks"),
    )?;

    let task_min_count = template.declare_parameter(
        "TaskMinCount",
        Parameter::new(
            ParameterType::Number,
            "Minimum number of imgproxy instances we can launch in your service",
        )
        .default_value(2)
        .labelled(SERVICE_GROUP, "Minimum number of tasks"),
    )?;

    let task_max_count = template.declare_parameter(
        "TaskMaxCount",
        Parameter::new(
            ParameterType::Number,
            "Maximum number of imgproxy instances we can launch in your service",
        )
        .default_value(8)
        .labelled(SERVICE_GROUP, "Maximum number of tasks"),
    )?;

    Ok(ServiceInputs {
        cluster_name,
        cpu_architecture,
        docker_image,
        container_cpu,
        container_memory,
        task_desired_count,
        task_min_count,
        task_max_count,
    })
}

fn environment(assembly: &mut Assembly<'_>) -> Result<EnvironmentInputs, DeclarationError> {
    let template = &mut assembly.template;

    let secret_arn = template.declare_parameter(
        "EnvironmentSecretARN",
        Parameter::new(
            ParameterType::String,
            "ARN of an AWS Secrets Manager secret containing environment variables. \
             See https://docs.imgproxy.net/latest/configuration/loading_environment_variables#environment-file-syntax \
             for the secret syntax. \
             See https://docs.imgproxy.net/configuration for supported environment variables",
        )
        .default_value("")
        .labelled(SECRET_GROUP, "Secrets Manager secret ARN (optional)"),
    )?;

    let secret_version_id = template.declare_parameter(
        "EnvironmentSecretVersionID",
        Parameter::new(
            ParameterType::String,
            "Version ID of the AWS Secrets Manager secret containing environment variables. \
             If not set, the latest version is used",
        )
        .default_value("")
        .labelled(SECRET_GROUP, "Secrets Manager secret version ID (optional)"),
    )?;

    let ssm_parameters_path = template.declare_parameter(
        "EnvironmentSystemsManagerParametersPath",
        Parameter::new(
            ParameterType::String,
            "A path of AWS Systems Manager Parameter Store parameters containing the environment variables. \
             The path should start with a slash (/) but should not have a slash (/) at the end. \
             See https://docs.imgproxy.net/latest/configuration/loading_environment_variables#aws-systems-manager-path \
             to learn how imgproxy maps AWS Systems Manager Parameter Store parameters to environment variables. \
             See https://docs.imgproxy.net/configuration for supported environment variables",
        )
        .default_value("")
        .labelled(SSM_GROUP, "Systems Manager Parameter Store parameters path (optional)"),
    )?;

    Ok(EnvironmentInputs {
        secret_arn,
        secret_version_id,
        ssm_parameters_path,
    })
}

fn s3(assembly: &mut Assembly<'_>) -> Result<S3Inputs, DeclarationError> {
    let template = &mut assembly.template;

    let objects = template.declare_parameter(
        "S3Objects",
        Parameter::new(
            ParameterType::CommaDelimitedList,
            "ARNs of S3 objects (comma delimited) that imgproxy should have access to. \
             You can grant access to multiple objects with a single ARN by using wildcards. \
             Example: arn:aws:s3:::my-images-bucket/*,arn:aws:s3:::my-assets-bucket/images/*",
        )
        .default_value("")
        .labelled(S3_GROUP, "S3 objects (optional)"),
    )?;

    let assume_role_arn = template.declare_parameter(
        "S3AssumeRoleARN",
        Parameter::new(
            ParameterType::String,
            "ARN of IAM Role that S3 client should assume. This allows you to provide imgproxy access to \
             third-party S3 buckets that the assumed IAM Role has access to",
        )
        .default_value("")
        .labelled(S3_GROUP, "IAM Role ARN to assume (optional)"),
    )?;

    let multi_region = template.declare_parameter(
        "S3MultiRegion",
        Parameter::new(
            ParameterType::String,
            "Should imgproxy be able to access S3 buckets in other regions? \
             By default, imgproxy can access only S3 buckets located in the same region as imgproxy",
        )
        .default_value("No")
        .allowed_values(&YES_NO)
        .labelled(S3_GROUP, "Enable multi-region mode"),
    )?;

    let client_side_decryption = template.declare_parameter(
        "S3ClientSideDecryption",
        Parameter::new(
            ParameterType::String,
            "Should imgproxy use S3 decryption client? \
             The decryption client will be used for all objects in all S3 buckets, so unencrypted objects won't \
             be accessible",
        )
        .default_value("No")
        .allowed_values(&YES_NO)
        .labelled(S3_GROUP, "Enable client-side decryption"),
    )?;

    Ok(S3Inputs {
        objects,
        assume_role_arn,
        multi_region,
        client_side_decryption,
    })
}

fn endpoint(assembly: &mut Assembly<'_>) -> Result<EndpointInputs, DeclarationError> {
    let has_caching_edge = assembly.topology.has_caching_edge();
    let template = &mut assembly.template;

    let path_prefix = template.declare_parameter(
        "PathPrefix",
        Parameter::new(
            ParameterType::String,
            "Path prefix, beginning with a slash (/). Do not add a slash (/) at the end of the path",
        )
        .default_value("")
        .labelled(ENDPOINT_GROUP, "Path prefix (optional)"),
    )?;

    let create_cloudfront = if has_caching_edge {
        Some(template.declare_parameter(
            "CreateCloudFrontDistribution",
            Parameter::new(
                ParameterType::String,
                "Should caching CloudFront distribution be created? \
                 This CloudFront distribution will automatically add the path prefix when requesting the origin. \
                 Also, it will automatically add X-Imgproxy-Auth header with the provided authorization token",
            )
            .default_value("Yes")
            .allowed_values(&YES_NO)
            .labelled(ENDPOINT_GROUP, "Create CloudFront distribution?"),
        )?)
    } else {
        None
    };

    let authorization_token = template.declare_parameter(
        "AuthorizationToken",
        Parameter::new(
            ParameterType::String,
            "The authorization token that should be provided via the X-Imgproxy-Auth header to get access \
             to imgproxy. \
             Allows to prevent access to imgproxy bypassing CDN. \
             The X-Imgproxy-Auth header will be checked by the load balancer listener rule",
        )
        .default_value("")
        .labelled(ENDPOINT_GROUP, "Authorization token (optional)"),
    )?;

    Ok(EndpointInputs {
        path_prefix,
        create_cloudfront,
        authorization_token,
    })
}
