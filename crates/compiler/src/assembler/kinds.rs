/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Resource type names.
 */

pub const LOG_GROUP: &str = "AWS::Logs::LogGroup";

pub const VPC: &str = "AWS::EC2::VPC";
pub const INTERNET_GATEWAY: &str = "AWS::EC2::InternetGateway";
pub const GATEWAY_ATTACHMENT: &str = "AWS::EC2::VPCGatewayAttachment";
pub const ROUTE_TABLE: &str = "AWS::EC2::RouteTable";
pub const ROUTE: &str = "AWS::EC2::Route";
pub const SUBNET: &str = "AWS::EC2::Subnet";
pub const SUBNET_ROUTE_TABLE_ASSOCIATION: &str = "AWS::EC2::SubnetRouteTableAssociation";
pub const SECURITY_GROUP: &str = "AWS::EC2::SecurityGroup";
pub const LAUNCH_TEMPLATE: &str = "AWS::EC2::LaunchTemplate";

pub const IAM_ROLE: &str = "AWS::IAM::Role";
pub const INSTANCE_PROFILE: &str = "AWS::IAM::InstanceProfile";

pub const AUTO_SCALING_GROUP: &str = "AWS::AutoScaling::AutoScalingGroup";
pub const WARM_POOL: &str = "AWS::AutoScaling::WarmPool";

pub const ECS_CLUSTER: &str = "AWS::ECS::Cluster";
pub const CAPACITY_PROVIDER: &str = "AWS::ECS::CapacityProvider";
pub const CAPACITY_PROVIDER_ASSOCIATIONS: &str = "AWS::ECS::ClusterCapacityProviderAssociations";
pub const TASK_DEFINITION: &str = "AWS::ECS::TaskDefinition";
pub const ECS_SERVICE: &str = "AWS::ECS::Service";

pub const LOAD_BALANCER: &str = "AWS::ElasticLoadBalancingV2::LoadBalancer";
pub const LISTENER: &str = "AWS::ElasticLoadBalancingV2::Listener";
pub const TARGET_GROUP: &str = "AWS::ElasticLoadBalancingV2::TargetGroup";
pub const LISTENER_RULE: &str = "AWS::ElasticLoadBalancingV2::ListenerRule";

pub const SCALABLE_TARGET: &str = "AWS::ApplicationAutoScaling::ScalableTarget";
pub const SCALING_POLICY: &str = "AWS::ApplicationAutoScaling::ScalingPolicy";
pub const ALARM: &str = "AWS::CloudWatch::Alarm";

pub const CACHE_POLICY: &str = "AWS::CloudFront::CachePolicy";
pub const DISTRIBUTION: &str = "AWS::CloudFront::Distribution";
