/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * CloudFront caching edge in front of the owned load balancer, and the
 * stack outputs pointing at both.
 */

use crate::assembler::conditions::Gates;
use crate::assembler::load_balancer::{Routing, AUTHORIZATION_HEADER};
use crate::assembler::parameters::Inputs;
use crate::assembler::{kinds, stack_prefixed, Assembly};
use crate::error::{CompilerError, ReferentialIntegrityError};
use crate::template::value::{get_att, reference, when};
use crate::template::{Output, Properties, Pseudo, Resource, Value};

/// One year.
const MAX_TTL: i64 = 31_536_000;

/// # Errors
///
/// Returns `CompilerError` on an identifier clash or when the edge has no
/// load balancer to front.
pub fn declare(
    assembly: &mut Assembly<'_>,
    inputs: &Inputs,
    gates: &Gates,
    routing: &Routing,
) -> Result<(), CompilerError> {
    if !assembly.topology.has_caching_edge() {
        return Ok(());
    }
    let missing = |target: &str| ReferentialIntegrityError::DanglingReference {
        owner: "CloudFrontDistribution".to_string(),
        kind: "resource",
        target: target.to_string(),
    };
    let load_balancer = routing.load_balancer.as_ref().ok_or_else(|| missing("LoadBalancer"))?;
    let deploy = gates
        .deploy_cloudfront
        .as_ref()
        .ok_or_else(|| missing("DeployCloudFront"))?;
    let template = &mut assembly.template;

    let cache_policy = template.declare_resource(
        "CloudFrontCachePolicy",
        Resource::new(
            kinds::CACHE_POLICY,
            Properties::new().with(
                "CachePolicyConfig",
                Properties::new()
                    .with("Name", stack_prefixed("cache-policy"))
                    .with("DefaultTTL", MAX_TTL)
                    .with("MaxTTL", MAX_TTL)
                    .with("MinTTL", 0)
                    .with(
                        "ParametersInCacheKeyAndForwardedToOrigin",
                        Properties::new()
                            .with("CookiesConfig", Properties::new().with("CookieBehavior", "none"))
                            .with("EnableAcceptEncodingBrotli", false)
                            .with("EnableAcceptEncodingGzip", false)
                            .with(
                                "HeadersConfig",
                                Properties::new()
                                    .with("HeaderBehavior", "whitelist")
                                    .with("Headers", vec!["Accept"]),
                            )
                            .with(
                                "QueryStringsConfig",
                                Properties::new().with("QueryStringBehavior", "none"),
                            ),
                    ),
            ),
        )
        .gated_by(deploy),
    )?;

    let origin_id = || stack_prefixed("origin");
    let origin = Properties::new()
        .with("DomainName", get_att(load_balancer, "DNSName"))
        .with("Id", origin_id())
        .with(
            "CustomOriginConfig",
            Properties::new()
                .with("HTTPPort", 80)
                .with("OriginProtocolPolicy", "http-only"),
        )
        .with("OriginPath", reference(&inputs.endpoint.path_prefix))
        .with(
            "OriginCustomHeaders",
            when(
                &gates.have_authorization_token,
                Value::List(vec![Properties::new()
                    .with("HeaderName", AUTHORIZATION_HEADER)
                    .with("HeaderValue", reference(&inputs.endpoint.authorization_token))
                    .into()]),
            ),
        )
        .with(
            "OriginShield",
            Properties::new()
                .with("Enabled", true)
                .with("OriginShieldRegion", reference(Pseudo::Region)),
        );

    let distribution = template.declare_resource(
        "CloudFrontDistribution",
        Resource::new(
            kinds::DISTRIBUTION,
            Properties::new().with(
                "DistributionConfig",
                Properties::new()
                    .with("Enabled", true)
                    .with("Origins", Value::List(vec![origin.into()]))
                    .with(
                        "DefaultCacheBehavior",
                        Properties::new()
                            .with("TargetOriginId", origin_id())
                            .with("CachePolicyId", reference(&cache_policy))
                            .with("ViewerProtocolPolicy", "redirect-to-https"),
                    )
                    .with("PriceClass", "PriceClass_All")
                    .with(
                        "ViewerCertificate",
                        Properties::new().with("CloudFrontDefaultCertificate", true),
                    ),
            ),
        )
        .gated_by(deploy),
    )?;

    template.declare_output(
        "DirectURL",
        Output::new(
            "The direct URL endpoint for imgproxy",
            get_att(load_balancer, "DNSName"),
        ),
    )?;
    template.declare_output(
        "CloudFrontURL",
        Output::new(
            "The CloudFront endpoint for imgproxy",
            get_att(&distribution, "DomainName"),
        )
        .gated_by(deploy),
    )?;

    Ok(())
}
