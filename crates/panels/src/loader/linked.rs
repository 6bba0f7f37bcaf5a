//! Secondary fetch of records linked to a loaded page.

use indexmap::IndexSet;
use tracing::{debug, warn};

use crate::api::ClinicalApi;
use crate::cache::ResourceCache;
use crate::error::{ApiError, ApiResult};
use crate::types::{LinkedFetch, ListFilter, ListOptions, Resource, ResourceKind};

use super::decode_records;
use super::state::LinkedFetchPolicy;

/// Linked records gathered for one primary page.
#[derive(Debug, Default)]
pub(crate) struct LinkedRecords {
    pub(crate) batches: Vec<(ResourceKind, Vec<Resource>)>,
    pub(crate) error: Option<ApiError>,
}

impl LinkedRecords {
    #[cfg(test)]
    pub(crate) fn count(&self) -> usize {
        self.batches.iter().map(|(_, records)| records.len()).sum()
    }
}

/// Follows every link of `kind` for the records in `primary`.
///
/// A failing link is recorded and the remaining links are still fetched.
pub(crate) async fn fetch_linked(
    api: &dyn ClinicalApi,
    cache: &ResourceCache,
    policy: &LinkedFetchPolicy,
    kind: ResourceKind,
    primary: &[Resource],
) -> LinkedRecords {
    let mut linked = LinkedRecords::default();
    if !policy.enabled || primary.is_empty() {
        return linked;
    }

    for link in kind.linked() {
        let result = match *link {
            LinkedFetch::Referencing { kind: target, field } => {
                let ids: Vec<String> = primary.iter().map(|r| r.id().to_string()).collect();
                fetch_referencing(api, policy, target, field, ids).await
            }
            LinkedFetch::Referenced { kind: target, field } => {
                let ids: IndexSet<String> = primary
                    .iter()
                    .filter_map(|r| r.reference(field))
                    .filter(|id| !cache.contains(target, id))
                    .map(str::to_string)
                    .collect();
                fetch_referenced(api, target, ids.into_iter().collect()).await
            }
        };

        match result {
            Ok(records) if records.is_empty() => {}
            Ok(records) => {
                debug!(from = %kind, to = %link.kind(), count = records.len(), "loader: fetched linked records");
                linked.batches.push((link.kind(), records));
            }
            Err(err) => {
                warn!(from = %kind, to = %link.kind(), error = %err, "loader: linked fetch failed");
                linked.error.get_or_insert(err);
            }
        }
    }

    linked
}

async fn fetch_referencing(
    api: &dyn ClinicalApi,
    policy: &LinkedFetchPolicy,
    target: ResourceKind,
    field: &str,
    ids: Vec<String>,
) -> ApiResult<Vec<Resource>> {
    let filter = ListFilter::reference(field, ids);
    let mut records = Vec::new();
    let mut cursor = None;
    let mut pages = 0u32;

    loop {
        if policy.max_pages.is_some_and(|max| pages >= max) {
            break;
        }
        let options = ListOptions::first(policy.page_size)
            .after(cursor.take())
            .with_filter(filter.clone());
        let page = api.list(target, &options).await?;
        pages += 1;
        records.extend(decode_records(target, page.data));

        if !page.has_more || page.next_cursor.is_none() {
            break;
        }
        cursor = page.next_cursor;
    }

    Ok(records)
}

async fn fetch_referenced(
    api: &dyn ClinicalApi,
    target: ResourceKind,
    ids: Vec<String>,
) -> ApiResult<Vec<Resource>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let raw = api.get_by_ids(target, &ids).await?;
    Ok(decode_records(target, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryApi;
    use crate::types::{Patient, Task};
    use serde_json::json;

    fn seeded() -> InMemoryApi {
        let api = InMemoryApi::new();
        api.insert(ResourceKind::Patient, json!({"id": "p-1", "familyName": "Smith"}))
            .unwrap();
        api.insert(ResourceKind::Patient, json!({"id": "p-2", "familyName": "Jones"}))
            .unwrap();
        for i in 0..5 {
            api.insert(
                ResourceKind::Task,
                json!({"id": format!("t-{i}"), "patientId": if i < 3 { "p-1" } else { "p-2" }}),
            )
            .unwrap();
        }
        api
    }

    fn task(id: &str, patient: &str) -> Resource {
        Resource::Task(Task {
            id: id.to_string(),
            patient_id: Some(patient.to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_patients_pull_in_all_task_pages() {
        let api = seeded();
        let cache = ResourceCache::new();
        let policy = LinkedFetchPolicy {
            page_size: 2,
            ..Default::default()
        };
        let primary = vec![Resource::Patient(Patient {
            id: "p-1".to_string(),
            ..Default::default()
        })];

        let linked = fetch_linked(&api, &cache, &policy, ResourceKind::Patient, &primary).await;
        assert!(linked.error.is_none());
        assert_eq!(linked.count(), 3);
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_max_pages_bounds_referencing_fetch() {
        let api = seeded();
        let cache = ResourceCache::new();
        let policy = LinkedFetchPolicy {
            page_size: 2,
            max_pages: Some(1),
            ..Default::default()
        };
        let primary = vec![Resource::Patient(Patient {
            id: "p-1".to_string(),
            ..Default::default()
        })];

        let linked = fetch_linked(&api, &cache, &policy, ResourceKind::Patient, &primary).await;
        assert_eq!(linked.count(), 2);
    }

    #[tokio::test]
    async fn test_tasks_fetch_only_uncached_patients() {
        let api = seeded();
        let cache = ResourceCache::new();
        cache.put(Resource::Patient(Patient {
            id: "p-1".to_string(),
            ..Default::default()
        }));
        let primary = vec![task("t-0", "p-1"), task("t-3", "p-2"), task("t-4", "p-2")];

        let linked = fetch_linked(
            &api,
            &cache,
            &LinkedFetchPolicy::default(),
            ResourceKind::Task,
            &primary,
        )
        .await;
        assert_eq!(linked.count(), 1);
        assert_eq!(linked.batches[0].0, ResourceKind::Patient);
        assert_eq!(linked.batches[0].1[0].id(), "p-2");
        assert_eq!(api.get_by_ids_calls(), 1);
    }

    #[tokio::test]
    async fn test_disabled_policy_fetches_nothing() {
        let api = seeded();
        let cache = ResourceCache::new();
        let primary = vec![task("t-0", "p-1")];

        let linked = fetch_linked(
            &api,
            &cache,
            &LinkedFetchPolicy::disabled(),
            ResourceKind::Task,
            &primary,
        )
        .await;
        assert_eq!(linked.count(), 0);
        assert_eq!(api.get_by_ids_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_link_is_reported() {
        let api = seeded();
        api.fail_lists(
            ResourceKind::Task,
            Some(ApiError::Network {
                message: "timeout".to_string(),
            }),
        );
        let cache = ResourceCache::new();
        let primary = vec![Resource::Patient(Patient {
            id: "p-1".to_string(),
            ..Default::default()
        })];

        let linked = fetch_linked(
            &api,
            &cache,
            &LinkedFetchPolicy::default(),
            ResourceKind::Patient,
            &primary,
        )
        .await;
        assert_eq!(linked.count(), 0);
        assert!(matches!(linked.error, Some(ApiError::Network { .. })));
    }
}
