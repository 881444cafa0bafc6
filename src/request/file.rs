use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::request::types::{RawRequestDescriptor, RequestDescriptor, UnrecognizedPolicyHandling};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RequestFile {
    Many(Vec<RawRequestDescriptor>),
    One(RawRequestDescriptor),
}

pub fn parse_requests(
    content: &str,
    handling: UnrecognizedPolicyHandling,
) -> Result<Vec<RequestDescriptor>> {
    let raw = match json5::from_str::<RequestFile>(content).context("failed to parse requests")? {
        RequestFile::Many(requests) => requests,
        RequestFile::One(request) => vec![request],
    };

    raw.into_iter()
        .enumerate()
        .map(|(index, request)| {
            let contract_id = request.contract_id.clone();
            RequestDescriptor::from_raw(request, handling)
                .with_context(|| format!("invalid request #{index} ({contract_id})"))
        })
        .collect()
}

pub fn load_requests(
    path: &Path,
    handling: UnrecognizedPolicyHandling,
) -> Result<Vec<RequestDescriptor>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_requests(&content, handling)
        .with_context(|| format!("failed to load requests from {}", path.display()))
}
