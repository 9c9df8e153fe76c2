//! Canonical tree paths for every document kind.
//!
//! All paths are relative to the session root:
//!
//! ```text
//! /                                   authority root
//! /output                             sink config subtree
//! /output/<destination>/<sinkType>    one document per sink
//! /<cluster>/global                   global template array
//! /<cluster>/input/<service>          input document
//! /<cluster>/loglevelfilter/<logId>   filter document
//! ```


use crate::constants::GLOBAL_NODE;
use crate::constants::INPUT_NODE;
use crate::constants::LOG_LEVEL_FILTER_NODE;
use crate::constants::OUTPUT_NODE;
use crate::Error;
use crate::Result;

pub const ROOT_PATH: &str = "/";

/// Rejects identifiers that would escape or split their path segment
pub fn validate_segment(segment: &str) -> Result<&str> {
    if segment.is_empty() || segment.contains('/') || segment == "." || segment == ".." {
        return Err(Error::InvalidPath(format!(
            "'{segment}' is not a valid node name"
        )));
    }
    Ok(segment)
}

pub fn cluster_path(cluster: &str) -> Result<String> {
    Ok(format!("/{}", validate_segment(cluster)?))
}

pub fn global_config_path(cluster: &str) -> Result<String> {
    Ok(format!("{}/{GLOBAL_NODE}", cluster_path(cluster)?))
}

pub fn input_parent_path(cluster: &str) -> Result<String> {
    Ok(format!("{}/{INPUT_NODE}", cluster_path(cluster)?))
}

pub fn input_config_path(
    cluster: &str,
    service: &str,
) -> Result<String> {
    Ok(format!(
        "{}/{}",
        input_parent_path(cluster)?,
        validate_segment(service)?
    ))
}

pub fn log_level_filter_parent_path(cluster: &str) -> Result<String> {
    Ok(format!("{}/{LOG_LEVEL_FILTER_NODE}", cluster_path(cluster)?))
}

pub fn log_level_filter_path(
    cluster: &str,
    log_id: &str,
) -> Result<String> {
    Ok(format!(
        "{}/{}",
        log_level_filter_parent_path(cluster)?,
        validate_segment(log_id)?
    ))
}

pub fn output_root_path() -> String {
    format!("/{OUTPUT_NODE}")
}

pub fn output_sink_path(
    destination: &str,
    sink_type: &str,
) -> Result<String> {
    Ok(format!(
        "{}/{}/{}",
        output_root_path(),
        validate_segment(destination)?,
        validate_segment(sink_type)?
    ))
}

/// Prefix shared by every input document of a cluster, trailing slash
/// included so the parent node itself never matches
pub(crate) fn input_prefix(cluster: &str) -> String {
    format!("/{cluster}/{INPUT_NODE}/")
}

pub(crate) fn log_level_filter_prefix(cluster: &str) -> String {
    format!("/{cluster}/{LOG_LEVEL_FILTER_NODE}/")
}

/// Last segment of a path; `/` yields an empty name
pub fn node_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Parent of a path; `None` for `/`
pub fn parent_path(path: &str) -> Option<&str> {
    if path == ROOT_PATH || path.is_empty() {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT_PATH),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Appends `child` to `parent` without doubling the separator
pub fn join_path(
    parent: &str,
    child: &str,
) -> String {
    if parent.ends_with('/') {
        format!("{parent}{child}")
    } else {
        format!("{parent}/{child}")
    }
}
