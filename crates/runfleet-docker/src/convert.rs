//! Conversions between runtime contracts and engine models.
use std::collections::HashMap;

use bollard::auth::DockerCredentials;
use bollard::models::{
    ContainerCreateBody, ContainerSummary as EngineContainer, CreateImageInfo, HostConfig,
    Mount as EngineMount, MountTypeEnum, Volume as EngineVolume,
};
use runfleet_core::{ContainerSpec, ContainerSummary, Mount, MountKind, RegistryAuth, Volume};
use runfleet_model::Labels;
use time::OffsetDateTime;

use crate::DockerError;

pub(crate) fn summary(item: EngineContainer) -> Result<ContainerSummary, DockerError> {
    let id = item
        .id
        .ok_or_else(|| DockerError::Invalid("container without id".into()))?;
    let created = OffsetDateTime::from_unix_timestamp(item.created.unwrap_or_default())
        .map_err(|e| DockerError::Invalid(format!("container {id}: bad creation time: {e}")))?;
    Ok(ContainerSummary {
        names: item.names.unwrap_or_default(),
        image: item.image.unwrap_or_default(),
        state: item.state.map(|s| s.to_string()).unwrap_or_default(),
        labels: item.labels.unwrap_or_default().into_iter().collect(),
        created,
        id,
    })
}

fn mount(m: &Mount) -> EngineMount {
    let typ = match m.kind {
        MountKind::Bind => MountTypeEnum::BIND,
        MountKind::Volume => MountTypeEnum::VOLUME,
    };
    EngineMount {
        typ: Some(typ),
        source: Some(m.source.clone()),
        target: Some(m.target.clone()),
        read_only: Some(m.read_only),
        ..Default::default()
    }
}

fn label_map(labels: &Labels) -> HashMap<String, String> {
    labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub(crate) fn create_body(spec: &ContainerSpec) -> ContainerCreateBody {
    ContainerCreateBody {
        image: Some(spec.image.clone()),
        env: Some(spec.env.to_assignments()),
        labels: Some(label_map(&spec.labels)),
        host_config: Some(HostConfig {
            auto_remove: Some(spec.auto_remove),
            mounts: Some(spec.mounts.iter().map(mount).collect()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(crate) fn volume(v: EngineVolume) -> Volume {
    Volume {
        name: v.name,
        mountpoint: v.mountpoint,
    }
}

/// Anonymous pulls send no credentials at all.
pub(crate) fn credentials(auth: &RegistryAuth) -> Option<DockerCredentials> {
    if auth.password.is_empty() {
        return None;
    }
    Some(DockerCredentials {
        username: auth.username.clone(),
        password: Some(auth.password.clone()),
        ..Default::default()
    })
}

/// Status text of one pull progress message, or the error it reports.
pub(crate) fn pull_status(info: CreateImageInfo) -> Result<Option<String>, DockerError> {
    if let Some(detail) = info.error_detail {
        let message = detail
            .message
            .unwrap_or_else(|| "unknown pull error".to_string());
        return Err(DockerError::Pull(message));
    }
    Ok(info.status)
}
