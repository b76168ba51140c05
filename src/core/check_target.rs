use std::collections::HashSet;
use crate::error::ConfigError;
use crate::models::api_endpoint::EndpointSpec;
use crate::models::profile::RunConfig;
use crate::models::setup::TargetConfig;
use crate::models::step_option::StepOption;

/// Reject target descriptions and run plans that cannot produce a meaningful report.
pub fn check_target(target: &TargetConfig, run: &RunConfig) -> Result<(), ConfigError> {
    if !(target.base_url.starts_with("http://") || target.base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(target.base_url.clone()));
    }
    check_endpoints_names(&target.public_endpoints)?;
    check_endpoints_names(&target.authenticated_endpoints)?;

    let mut roles = HashSet::new();
    for credential in &target.roster {
        if !roles.insert(credential.role_name.as_str()) {
            return Err(ConfigError::DuplicateRole(credential.role_name.clone()));
        }
    }

    if run.stress.enabled {
        check_step("http", &run.stress.http)?;
        check_step("duplex", &run.stress.duplex)?;
    }
    Ok(())
}

// names must be present and unique within a group; paths must be absolute
fn check_endpoints_names(endpoints: &[EndpointSpec]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for endpoint in endpoints {
        if endpoint.display_name.trim().is_empty() {
            return Err(ConfigError::EmptyName(endpoint.path.clone()));
        }
        if !names.insert(endpoint.display_name.as_str()) {
            return Err(ConfigError::DuplicateName(endpoint.display_name.clone()));
        }
        if !endpoint.path.starts_with('/') {
            return Err(ConfigError::InvalidPath(endpoint.path.clone()));
        }
    }
    Ok(())
}

fn check_step(which: &'static str, plan: &StepOption) -> Result<(), ConfigError> {
    if plan.start == 0 {
        return Err(ConfigError::InvalidStressPlan(which, "start must be at least 1".to_string()));
    }
    if plan.increase_step == 0 {
        return Err(ConfigError::InvalidStressPlan(which, "step must be at least 1".to_string()));
    }
    if plan.start > plan.max {
        return Err(ConfigError::InvalidStressPlan(
            which,
            format!("start {} exceeds max {}", plan.start, plan.max),
        ));
    }
    Ok(())
}
