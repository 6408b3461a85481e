//! Assembly tests across the whole configuration space

use crate::assembler::{assemble, kinds};
use crate::catalog::InstanceCatalog;
use crate::config::{ClusterMode, DeploymentConfig, LaunchType, NetworkMode, MAX_SUBNETS};
use crate::render::{render, Encoders, OutputFormat};
use crate::template::integrity;
use crate::template::{Expr, Target, Template, Value};
use yaml_rust::YamlLoader;

fn catalog() -> InstanceCatalog {
    InstanceCatalog::embedded().unwrap()
}

fn config(network: NetworkMode, cluster: ClusterMode, launch: LaunchType, subnets: u32) -> DeploymentConfig {
    DeploymentConfig::new(network, cluster, launch, subnets).unwrap()
}

fn build(config: &DeploymentConfig) -> Template {
    assemble(config, &catalog()).unwrap()
}

fn property<'a>(template: &'a Template, resource: &str, key: &str) -> Option<&'a Value> {
    template.resources().get(resource)?.properties.get(key)
}

fn ref_to(value: &Value) -> Option<&str> {
    match value.as_expr()? {
        Expr::Ref(target) => Some(target.name()),
        _ => None,
    }
}

#[test]
fn test_every_configuration_passes_integrity() {
    let catalog = catalog();
    let mut count = 0;
    for config in DeploymentConfig::all(MAX_SUBNETS) {
        let template = assemble(&config, &catalog).unwrap();
        if let Err(e) = integrity::check(&template) {
            panic!("{config:?}: {e}");
        }
        count += 1;
    }
    // 2 launch types x 16 subnet counts with an owned network, plus
    // 2 cluster modes x 2 launch types x 16 without.
    assert_eq!(count, 96);
}

#[test]
fn test_rendering_is_deterministic() {
    let catalog = catalog();
    let encoders = Encoders::standard();
    for config in DeploymentConfig::all(4) {
        for format in [OutputFormat::Yaml, OutputFormat::Json] {
            let first = render(&assemble(&config, &catalog).unwrap(), format, &encoders).unwrap();
            let second = render(&assemble(&config, &catalog).unwrap(), format, &encoders).unwrap();
            assert_eq!(first, second, "{config:?} {format}");
            assert!(first.ends_with('\n'));
        }
    }
}

#[test]
fn test_external_network_declares_no_network_resources() {
    for config in DeploymentConfig::all(2).filter(|c| c.network_mode() == NetworkMode::External) {
        let template = build(&config);
        for kind in [
            kinds::VPC,
            kinds::SUBNET,
            kinds::INTERNET_GATEWAY,
            kinds::GATEWAY_ATTACHMENT,
            kinds::ROUTE_TABLE,
            kinds::SECURITY_GROUP,
            kinds::LOAD_BALANCER,
            kinds::LISTENER,
            kinds::DISTRIBUTION,
            kinds::CACHE_POLICY,
        ] {
            assert_eq!(template.resources_of_kind(kind).count(), 0, "{config:?} declares {kind}");
        }
        assert!(template.parameters().contains("VpcId"));
        assert!(template.parameters().contains("LoadBalancerListenerArn"));
        assert!(!template.parameters().contains("CreateCloudFrontDistribution"));
        assert!(template.outputs().is_empty());
        assert!(!template.conditions().contains("DeployCloudFront"));
    }
}

#[test]
fn test_placement_parameters_only_when_something_is_placed() {
    let bridge_on_foreign_cluster = build(&config(
        NetworkMode::External,
        ClusterMode::External,
        LaunchType::Ec2,
        1,
    ));
    assert!(!bridge_on_foreign_cluster.parameters().contains("SubnetIds"));
    assert!(!bridge_on_foreign_cluster.parameters().contains("ECSHostSecurityGroupId"));
    assert!(property(&bridge_on_foreign_cluster, "ECSService", "NetworkConfiguration").is_none());

    for (cluster, launch) in [
        (ClusterMode::External, LaunchType::Fargate),
        (ClusterMode::Managed, LaunchType::Fargate),
        (ClusterMode::Managed, LaunchType::Ec2),
    ] {
        let template = build(&config(NetworkMode::External, cluster, launch, 1));
        assert!(template.parameters().contains("SubnetIds"), "{cluster:?} {launch}");
        assert!(template.parameters().contains("ECSHostSecurityGroupId"), "{cluster:?} {launch}");
    }
}

#[test]
fn test_subnet_multiplicity() {
    for subnets in 1..=MAX_SUBNETS {
        let template = build(&config(NetworkMode::Embedded, ClusterMode::Managed, LaunchType::Fargate, subnets));
        let expected = subnets as usize;
        assert_eq!(template.resources_of_kind(kinds::SUBNET).count(), expected);
        assert_eq!(
            template.resources_of_kind(kinds::SUBNET_ROUTE_TABLE_ASSOCIATION).count(),
            expected
        );

        let balancer_subnets = property(&template, "LoadBalancer", "Subnets")
            .and_then(Value::as_list)
            .unwrap();
        let names: Vec<&str> = balancer_subnets.iter().filter_map(ref_to).collect();
        let wanted: Vec<String> = (0..subnets).map(|n| format!("PublicSubnet{n}")).collect();
        assert_eq!(names, wanted);
    }
}

#[test]
fn test_owned_network_resource_order() {
    let template = build(&config(NetworkMode::Embedded, ClusterMode::Managed, LaunchType::Fargate, 2));
    let ids: Vec<&str> = template.resources().ids().collect();
    assert_eq!(
        &ids[..12],
        &[
            "CloudWatchLogGroup",
            "VPC",
            "InternetGateway",
            "GatewayAttachment",
            "PublicRouteTable",
            "PublicRoute",
            "PublicSubnet0",
            "PublicSubnet0RouteTableAssociation",
            "PublicSubnet1",
            "PublicSubnet1RouteTableAssociation",
            "LoadBalancerSecurityGroup",
            "ECSHostSecurityGroup",
        ]
    );
    let route = template.resources().get("PublicRoute").unwrap();
    assert_eq!(route.depends_on.len(), 1);
    assert_eq!(route.depends_on[0].as_str(), "GatewayAttachment");
}

#[test]
fn test_fargate_uses_builtin_provider() {
    let template = build(&config(NetworkMode::Embedded, ClusterMode::Managed, LaunchType::Fargate, 3));
    let providers = property(&template, "ECSClusterCapacityProviderAssociations", "CapacityProviders").unwrap();
    assert_eq!(providers, &Value::from(vec!["FARGATE"]));

    for kind in [kinds::AUTO_SCALING_GROUP, kinds::LAUNCH_TEMPLATE, kinds::CAPACITY_PROVIDER, kinds::WARM_POOL] {
        assert_eq!(template.resources_of_kind(kind).count(), 0);
    }
    assert!(template.rules().is_empty());
    assert!(!template.parameters().contains("ClusterInstanceType"));

    assert_eq!(property(&template, "ECSTaskDefinition", "NetworkMode"), Some(&Value::from("awsvpc")));
    assert!(property(&template, "ECSTaskDefinition", "Memory").is_some());
    assert_eq!(property(&template, "LoadBalancerTargetGroup", "TargetType"), Some(&Value::from("ip")));
    assert!(property(&template, "ECSService", "NetworkConfiguration").is_some());
}

#[test]
fn test_managed_ec2_wiring() {
    let template = build(&config(NetworkMode::Embedded, ClusterMode::Managed, LaunchType::Ec2, 3));

    for id in [
        "EC2InstanceRole",
        "EC2InstanceProfile",
        "EC2LaunchTemplate",
        "EC2AutoScalingGroup",
        "ECSCapacityProvider",
    ] {
        assert!(template.resources().contains(id), "missing {id}");
    }

    let warm_pool = template.resources().get("EC2AutoScalingGroupWarmPool").unwrap();
    assert_eq!(
        warm_pool.condition.as_ref().map(|c| c.as_str()),
        Some("ClusterShouldAddWarmPool")
    );

    let providers = property(&template, "ECSClusterCapacityProviderAssociations", "CapacityProviders")
        .and_then(Value::as_list)
        .unwrap();
    assert_eq!(providers.len(), 1);
    assert_eq!(ref_to(&providers[0]), Some("ECSCapacityProvider"));

    assert_eq!(property(&template, "ECSTaskDefinition", "NetworkMode"), Some(&Value::from("bridge")));
    assert!(property(&template, "ECSTaskDefinition", "Memory").is_none());
    assert_eq!(
        property(&template, "LoadBalancerTargetGroup", "TargetType"),
        Some(&Value::from("instance"))
    );
    assert!(property(&template, "ECSService", "NetworkConfiguration").is_none());

    let rule_ids: Vec<&str> = template.rules().ids().collect();
    assert_eq!(rule_ids[0], "testWarmPoolAndNoSpot");
    assert!(rule_ids.contains(&"testArm64InstanceType"));
    assert!(rule_ids.contains(&"testAmd64InstanceType"));

    let service = template.resources().get("ECSService").unwrap();
    let dependencies: Vec<&str> = service.depends_on.iter().map(|d| d.as_str()).collect();
    assert_eq!(
        dependencies,
        vec!["LoadBalancerListenerRule", "ECSClusterCapacityProviderAssociations"]
    );
}

#[test]
fn test_spot_switches_launch_template_placement() {
    let template = build(&config(NetworkMode::Embedded, ClusterMode::Managed, LaunchType::Ec2, 1));
    let mixed = property(&template, "EC2AutoScalingGroup", "MixedInstancesPolicy").unwrap();
    let direct = property(&template, "EC2AutoScalingGroup", "LaunchTemplate").unwrap();

    match (mixed.as_expr(), direct.as_expr()) {
        (
            Some(Expr::If {
                condition: spot_on,
                then: Some(_),
                otherwise: None,
            }),
            Some(Expr::If {
                condition: spot_off,
                then: None,
                otherwise: Some(_),
            }),
        ) => {
            assert_eq!(spot_on.as_str(), "ClusterUseSpot");
            assert_eq!(spot_off.as_str(), "ClusterUseSpot");
        }
        other => panic!("unexpected launch template wiring: {other:?}"),
    }
}

#[test]
fn test_external_cluster_is_referenced_by_name() {
    let template = build(&config(NetworkMode::External, ClusterMode::External, LaunchType::Fargate, 1));
    assert_eq!(template.resources_of_kind(kinds::ECS_CLUSTER).count(), 0);
    assert_eq!(template.resources_of_kind(kinds::CAPACITY_PROVIDER_ASSOCIATIONS).count(), 0);

    let cluster = property(&template, "ECSService", "Cluster").unwrap();
    assert!(matches!(cluster.as_expr(), Some(Expr::Ref(Target::Parameter(_)))));
    assert_eq!(ref_to(cluster), Some("ClusterName"));

    let service = template.resources().get("ECSService").unwrap();
    assert_eq!(service.depends_on.len(), 1);
}

#[test]
fn test_s3_policy_is_conditional() {
    let template = build(&DeploymentConfig::default());
    let policies = property(&template, "ECSTaskRole", "Policies")
        .and_then(Value::as_list)
        .unwrap();

    let gated: Vec<&str> = policies
        .iter()
        .filter_map(|policy| match policy.as_expr() {
            Some(Expr::If {
                condition,
                otherwise: None,
                ..
            }) => Some(condition.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        gated,
        vec![
            "HaveEnvironmentSecretArn",
            "HaveEnvironmentSystemsManagerParametersPath",
            "HaveS3Objects",
            "HaveS3AssumeRole",
            "EnableS3ClientSideDecryption",
        ]
    );
    // cloudwatch is unconditional
    assert!(policies[0].as_map().is_some());
}

#[test]
fn test_caching_edge_follows_deploy_condition() {
    let template = build(&DeploymentConfig::default());
    for id in ["CloudFrontCachePolicy", "CloudFrontDistribution"] {
        let resource = template.resources().get(id).unwrap();
        assert_eq!(resource.condition.as_ref().map(|c| c.as_str()), Some("DeployCloudFront"));
    }

    let outputs: Vec<&str> = template.outputs().ids().collect();
    assert_eq!(outputs, vec!["DirectURL", "CloudFrontURL"]);
    let cloudfront_url = template.outputs().get("CloudFrontURL").unwrap();
    assert_eq!(
        cloudfront_url.condition.as_ref().map(|c| c.as_str()),
        Some("DeployCloudFront")
    );
    assert!(template.outputs().get("DirectURL").unwrap().condition.is_none());
}

#[test]
fn test_architecture_mapping_matches_catalog() {
    let catalog = catalog();
    let template = build(&DeploymentConfig::default());
    let mapping = template.mappings().get("Architectures").unwrap();
    let keys: Vec<&str> = mapping.entries().map(|(key, _)| key).collect();
    let names: Vec<&str> = catalog.architecture_names().collect();
    assert_eq!(keys, names);
    assert!(mapping.has_attribute("Arch"));
    assert!(mapping.has_attribute("ImageId"));
}

#[test]
fn test_json_output_parses_with_ordered_sections() {
    let template = build(&config(NetworkMode::Embedded, ClusterMode::Managed, LaunchType::Ec2, 3));
    let out = render(&template, OutputFormat::Json, &Encoders::standard()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["AWSTemplateFormatVersion"], "2010-09-09");
    assert_eq!(parsed["Description"], "imgproxy running in ECS");
    assert!(parsed["Resources"]["ECSService"].is_object());

    let sections = [
        "\"AWSTemplateFormatVersion\"",
        "\"Description\"",
        "\"Metadata\"",
        "\"Parameters\"",
        "\"Conditions\"",
        "\"Mappings\"",
        "\"Rules\"",
        "\"Resources\"",
        "\"Outputs\"",
    ];
    let positions: Vec<usize> = sections.iter().map(|s| out.find(s).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
}

#[test]
fn test_yaml_output_parses() {
    for config in DeploymentConfig::all(1) {
        let template = build(&config);
        let out = render(&template, OutputFormat::Yaml, &Encoders::standard()).unwrap();
        let docs = YamlLoader::load_from_str(&out).unwrap();
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc["Description"].as_str(), Some("imgproxy running in ECS"));
        assert!(!doc["Resources"]["ECSTaskDefinition"].is_badvalue());
        // Yes/No must stay strings, not booleans
        if config.launch_type() == LaunchType::Ec2 && config.cluster_mode() == ClusterMode::Managed {
            assert_eq!(doc["Parameters"]["ClusterAddWarmPool"]["Default"].as_str(), Some("Yes"));
        }
    }
}

#[test]
fn test_portable_encoders_lower_membership_tests() {
    let template = build(&config(NetworkMode::Embedded, ClusterMode::Managed, LaunchType::Ec2, 1));

    let native = render(&template, OutputFormat::Json, &Encoders::standard()).unwrap();
    assert!(native.contains("Fn::Contains"));

    let portable = render(&template, OutputFormat::Json, &Encoders::portable()).unwrap();
    assert!(!portable.contains("Fn::Contains"));
    assert!(portable.contains("Fn::Or"));
}

#[test]
fn test_unknown_expression_kind_fails_render() {
    let template = build(&config(NetworkMode::Embedded, ClusterMode::Managed, LaunchType::Ec2, 1));
    assert!(render(&template, OutputFormat::Json, &Encoders::empty()).is_err());
}
