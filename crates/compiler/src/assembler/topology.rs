/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Build-time topology decisions.
 *
 * Every "does this subgraph exist at all" question is answered here, once,
 * from the deployment configuration. Nothing downstream inspects the raw
 * configuration again.
 */

use crate::config::{ClusterMode, DeploymentConfig, LaunchType, NetworkMode};

/// Network subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// VPC, gateway, routes, `subnets` public subnets, security groups and load balancer.
    Owned { subnets: u32 },
    /// Caller-supplied VPC and listener. Subnets and the host security group are
    /// only requested when something in the template places tasks or instances.
    External { needs_placement: bool },
}

/// Cluster subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cluster {
    /// `ECSCluster` plus capacity provider associations.
    Owned,
    /// Caller-supplied cluster name.
    External,
}

/// Where tasks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compute {
    /// Built-in FARGATE provider, `awsvpc` task networking.
    Fargate,
    /// Instances managed by this template: role, launch template, ASG, warm
    /// pool, capacity provider.
    ManagedInstances,
    /// Instances of a caller-supplied cluster, `bridge` task networking.
    ExternalInstances,
}

/// Task networking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskNetworking {
    Awsvpc,
    Bridge,
}

impl TaskNetworking {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Awsvpc => "awsvpc",
            Self::Bridge => "bridge",
        }
    }
}

/// All topology decisions for one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    pub network: Network,
    pub cluster: Cluster,
    pub compute: Compute,
    pub launch_type: LaunchType,
}

impl Topology {
    #[must_use]
    pub fn decide(config: &DeploymentConfig) -> Self {
        let cluster = match config.cluster_mode() {
            ClusterMode::Managed => Cluster::Owned,
            ClusterMode::External => Cluster::External,
        };
        let compute = match (config.launch_type(), cluster) {
            (LaunchType::Fargate, _) => Compute::Fargate,
            (LaunchType::Ec2, Cluster::Owned) => Compute::ManagedInstances,
            (LaunchType::Ec2, Cluster::External) => Compute::ExternalInstances,
        };
        let network = match config.network_mode() {
            NetworkMode::Embedded => Network::Owned {
                subnets: config.subnet_count(),
            },
            NetworkMode::External => Network::External {
                needs_placement: compute != Compute::ExternalInstances,
            },
        };

        let topology = Self {
            network,
            cluster,
            compute,
            launch_type: config.launch_type(),
        };
        tracing::debug!(?topology, "decided topology");
        topology
    }

    #[must_use]
    pub fn owns_network(&self) -> bool {
        matches!(self.network, Network::Owned { .. })
    }

    #[must_use]
    pub fn owns_cluster(&self) -> bool {
        self.cluster == Cluster::Owned
    }

    #[must_use]
    pub fn manages_instances(&self) -> bool {
        self.compute == Compute::ManagedInstances
    }

    /// The CloudFront edge exists only in front of an owned load balancer.
    #[must_use]
    pub fn has_caching_edge(&self) -> bool {
        self.owns_network()
    }

    #[must_use]
    pub fn task_networking(&self) -> TaskNetworking {
        match self.compute {
            Compute::Fargate => TaskNetworking::Awsvpc,
            Compute::ManagedInstances | Compute::ExternalInstances => TaskNetworking::Bridge,
        }
    }

    /// Target group target type matching the task networking.
    #[must_use]
    pub fn target_type(&self) -> &'static str {
        match self.task_networking() {
            TaskNetworking::Awsvpc => "ip",
            TaskNetworking::Bridge => "instance",
        }
    }
}
