/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Flag resolution: raw command-line flags to a validated deployment configuration.
 */

use std::fmt;

use crate::error::ConfigurationError;

/// Largest subnet count that still fits into the VPC without overlapping blocks.
///
/// The `1..=MAX_SUBNETS` range is enforced for every network mode, including
/// an external network where the count goes unused.
pub const MAX_SUBNETS: u32 = 16;

/// Subnet count used when none is given.
pub const DEFAULT_SUBNETS: u32 = 3;

/// Who owns the network the service runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkMode {
    /// The template creates its own VPC, subnets and load balancer.
    Embedded,
    /// The caller supplies VPC, subnets, security group and listener.
    External,
}

/// Who owns the ECS cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClusterMode {
    Managed,
    External,
}

/// ECS launch type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaunchType {
    Fargate,
    Ec2,
}

impl LaunchType {
    /// The platform spelling of the launch type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fargate => "FARGATE",
            Self::Ec2 => "EC2",
        }
    }
}

impl fmt::Display for LaunchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LaunchType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FARGATE" => Ok(Self::Fargate),
            "EC2" => Ok(Self::Ec2),
            _ => Err(ConfigurationError::UnknownLaunchType(s.to_string())),
        }
    }
}

/// Flags as they arrive from the command line, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFlags {
    pub launch_type: String,
    pub subnets_number: u32,
    pub no_network: bool,
    pub no_cluster: bool,
}

impl Default for RawFlags {
    fn default() -> Self {
        Self {
            launch_type: LaunchType::Fargate.as_str().to_string(),
            subnets_number: DEFAULT_SUBNETS,
            no_network: false,
            no_cluster: false,
        }
    }
}

/// Validated deployment configuration. Fixed once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeploymentConfig {
    network_mode: NetworkMode,
    cluster_mode: ClusterMode,
    launch_type: LaunchType,
    subnet_count: u32,
}

impl DeploymentConfig {
    /// Build a configuration from already typed values, enforcing the same
    /// constraints as [`resolve`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if the combination is invalid.
    pub fn new(
        network_mode: NetworkMode,
        cluster_mode: ClusterMode,
        launch_type: LaunchType,
        subnet_count: u32,
    ) -> Result<Self, ConfigurationError> {
        if cluster_mode == ClusterMode::External && network_mode != NetworkMode::External {
            return Err(ConfigurationError::ClusterRequiresExternalNetwork);
        }
        if subnet_count == 0 || subnet_count > MAX_SUBNETS {
            return Err(ConfigurationError::SubnetCountOutOfRange {
                count: subnet_count,
                max: MAX_SUBNETS,
            });
        }
        Ok(Self {
            network_mode,
            cluster_mode,
            launch_type,
            subnet_count,
        })
    }

    #[must_use]
    pub fn network_mode(&self) -> NetworkMode {
        self.network_mode
    }

    #[must_use]
    pub fn cluster_mode(&self) -> ClusterMode {
        self.cluster_mode
    }

    #[must_use]
    pub fn launch_type(&self) -> LaunchType {
        self.launch_type
    }

    #[must_use]
    pub fn subnet_count(&self) -> u32 {
        self.subnet_count
    }

    /// Every configuration the resolver accepts for subnet counts `1..=max_subnets`.
    pub fn all(max_subnets: u32) -> impl Iterator<Item = Self> {
        let networks = [NetworkMode::Embedded, NetworkMode::External];
        let clusters = [ClusterMode::Managed, ClusterMode::External];
        let launches = [LaunchType::Fargate, LaunchType::Ec2];

        networks
            .into_iter()
            .flat_map(move |n| clusters.into_iter().map(move |c| (n, c)))
            .flat_map(move |(n, c)| launches.into_iter().map(move |l| (n, c, l)))
            .flat_map(move |(n, c, l)| (1..=max_subnets).map(move |s| (n, c, l, s)))
            .filter_map(|(n, c, l, s)| Self::new(n, c, l, s).ok())
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            network_mode: NetworkMode::Embedded,
            cluster_mode: ClusterMode::Managed,
            launch_type: LaunchType::Fargate,
            subnet_count: DEFAULT_SUBNETS,
        }
    }
}

/// Resolve raw flags into a deployment configuration.
///
/// # Errors
///
/// Returns `ConfigurationError` naming the violated constraint.
pub fn resolve(flags: &RawFlags) -> Result<DeploymentConfig, ConfigurationError> {
    let launch_type: LaunchType = flags.launch_type.parse()?;
    let network_mode = if flags.no_network {
        NetworkMode::External
    } else {
        NetworkMode::Embedded
    };
    let cluster_mode = if flags.no_cluster {
        ClusterMode::External
    } else {
        ClusterMode::Managed
    };

    let config = DeploymentConfig::new(network_mode, cluster_mode, launch_type, flags.subnets_number)?;
    tracing::debug!(?config, "resolved deployment flags");
    Ok(config)
}
