/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Owned network: VPC, internet gateway, public route, subnets and security
 * groups. For a caller-supplied network only the references are collected.
 */

use crate::assembler::kinds;
use crate::assembler::parameters::Inputs;
use crate::assembler::topology::Network;
use crate::assembler::{name_tags, Assembly};
use crate::error::{CompilerError, ReferentialIntegrityError};
use crate::template::value::{availability_zones, reference, select};
use crate::template::{ParameterId, Properties, Resource, ResourceId, Target, Value};

/// VPC address block; subnets are carved out of it in /20 steps.
pub const VPC_CIDR: &str = "10.0.0.0/16";

/// Where tasks and cluster instances are placed.
#[derive(Debug, Clone)]
pub struct Placement {
    /// List of subnet ids.
    pub subnets: Value,
    pub host_security_group: Target,
}

/// How traffic reaches the service.
#[derive(Debug, Clone)]
pub enum Ingress {
    /// A load balancer is to be created in these subnets behind this security group.
    Owned {
        security_group: ResourceId,
        subnets: Value,
    },
    /// An existing listener.
    External { listener: ParameterId },
}

/// References into the network, owned or not.
#[derive(Debug, Clone)]
pub struct NetworkRefs {
    pub vpc: Target,
    pub placement: Option<Placement>,
    pub ingress: Ingress,
}

/// Address block of subnet `index`.
#[must_use]
pub fn subnet_cidr(index: u32) -> String {
    format!("10.0.{}.0/20", index * 16)
}

/// # Errors
///
/// Returns `CompilerError` on an identifier clash or a missing dependency.
pub fn declare(assembly: &mut Assembly<'_>, inputs: &Inputs) -> Result<NetworkRefs, CompilerError> {
    match (assembly.topology.network, &inputs.network) {
        (Network::Owned { subnets }, _) => declare_owned(assembly, subnets),
        (Network::External { .. }, Some(network)) => Ok(NetworkRefs {
            vpc: Target::from(&network.vpc),
            placement: network.placement.as_ref().map(|placement| Placement {
                subnets: reference(&placement.subnets),
                host_security_group: Target::from(&placement.host_security_group),
            }),
            ingress: Ingress::External {
                listener: network.listener.clone(),
            },
        }),
        (Network::External { .. }, None) => Err(ReferentialIntegrityError::DanglingReference {
            owner: "Network".to_string(),
            kind: "parameter",
            target: "VpcId".to_string(),
        }
        .into()),
    }
}

fn declare_owned(assembly: &mut Assembly<'_>, subnet_count: u32) -> Result<NetworkRefs, CompilerError> {
    let template = &mut assembly.template;

    let vpc = template.declare_resource(
        "VPC",
        Resource::new(
            kinds::VPC,
            Properties::new()
                .with("EnableDnsSupport", true)
                .with("EnableDnsHostnames", true)
                .with("CidrBlock", VPC_CIDR)
                .with("Tags", name_tags("VPC")),
        ),
    )?;

    let gateway = template.declare_resource(
        "InternetGateway",
        Resource::new(
            kinds::INTERNET_GATEWAY,
            Properties::new().with("Tags", name_tags("Internet-Gateway")),
        ),
    )?;

    let attachment = template.declare_resource(
        "GatewayAttachment",
        Resource::new(
            kinds::GATEWAY_ATTACHMENT,
            Properties::new()
                .with("VpcId", reference(&vpc))
                .with("InternetGatewayId", reference(&gateway)),
        ),
    )?;

    let route_table = template.declare_resource(
        "PublicRouteTable",
        Resource::new(
            kinds::ROUTE_TABLE,
            Properties::new()
                .with("VpcId", reference(&vpc))
                .with("Tags", name_tags("Routes")),
        ),
    )?;

    template.declare_resource(
        "PublicRoute",
        Resource::new(
            kinds::ROUTE,
            Properties::new()
                .with("RouteTableId", reference(&route_table))
                .with("DestinationCidrBlock", "0.0.0.0/0")
                .with("GatewayId", reference(&gateway)),
        )
        .depends_on(&attachment),
    )?;

    let mut subnets = Vec::with_capacity(subnet_count as usize);
    for n in 0..subnet_count {
        let subnet = template.declare_resource(
            &format!("PublicSubnet{n}"),
            Resource::new(
                kinds::SUBNET,
                Properties::new()
                    .with("AvailabilityZone", select(n, availability_zones()))
                    .with("VpcId", reference(&vpc))
                    .with("CidrBlock", subnet_cidr(n))
                    .with("MapPublicIpOnLaunch", true)
                    .with("Tags", name_tags(&format!("Subnet-{n}"))),
            ),
        )?;

        template.declare_resource(
            &format!("PublicSubnet{n}RouteTableAssociation"),
            Resource::new(
                kinds::SUBNET_ROUTE_TABLE_ASSOCIATION,
                Properties::new()
                    .with("SubnetId", reference(&subnet))
                    .with("RouteTableId", reference(&route_table)),
            ),
        )?;

        subnets.push(reference(&subnet));
    }
    let subnets = Value::List(subnets);

    // Open to the internet; the ECS hosts only accept traffic from here.
    let load_balancer_security_group = template.declare_resource(
        "LoadBalancerSecurityGroup",
        Resource::new(
            kinds::SECURITY_GROUP,
            Properties::new()
                .with("VpcId", reference(&vpc))
                .with("GroupDescription", "Access to the load balancer that sits in front of ECS")
                .with(
                    "SecurityGroupIngress",
                    Value::List(vec![Properties::new()
                        .with("CidrIp", "0.0.0.0/0")
                        .with("IpProtocol", -1)
                        .into()]),
                )
                .with("Tags", name_tags("SG-LoadBalancers")),
        ),
    )?;

    let host_security_group = template.declare_resource(
        "ECSHostSecurityGroup",
        Resource::new(
            kinds::SECURITY_GROUP,
            Properties::new()
                .with("VpcId", reference(&vpc))
                .with(
                    "GroupDescription",
                    "Access to the ECS hosts and the tasks/containers that run on them",
                )
                .with(
                    "SecurityGroupIngress",
                    Value::List(vec![Properties::new()
                        .with("SourceSecurityGroupId", reference(&load_balancer_security_group))
                        .with("IpProtocol", -1)
                        .into()]),
                )
                .with("Tags", name_tags("SG-ECS-Hosts")),
        ),
    )?;

    tracing::debug!(subnets = subnet_count, "declared owned network");
    Ok(NetworkRefs {
        vpc: Target::from(&vpc),
        placement: Some(Placement {
            subnets: subnets.clone(),
            host_security_group: Target::from(&host_security_group),
        }),
        ingress: Ingress::Owned {
            security_group: load_balancer_security_group,
            subnets,
        },
    })
}
