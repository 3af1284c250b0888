//! In-process stand-in for the ULD catalog backend.
//!
//! Records live in a [`ResourceActor`]; [`UldCatalogClient`] offers the
//! queries a stock take needs: list everything, look one identifier up, post
//! a newly discovered ULD and drop one again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::actor_framework::{Entity, ResourceActor, ResourceClient};
use crate::domain::{AdditionalUld, CatalogUld, Condition, UNKNOWN_LABEL};
use crate::error::{CatalogError, FrameworkError};

/// A ULD record as the backend stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    #[serde(default)]
    pub id: String,
    pub uld_identifier: String,
    #[serde(default, rename = "uldUldTypeShortCode")]
    pub uld_type_short_code: Option<String>,
    #[serde(default)]
    pub location_current_name: Option<String>,
    #[serde(default)]
    pub condition_id: Condition,
    #[serde(default)]
    pub is_found: bool,
    #[serde(default)]
    pub is_additional: bool,
}

/// Fields posted when creating a record. The backend issues the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCatalogRecord {
    pub uld_identifier: String,
    #[serde(default, rename = "uldUldTypeShortCode")]
    pub uld_type_short_code: Option<String>,
    #[serde(default)]
    pub location_current_name: Option<String>,
    #[serde(default)]
    pub condition_id: Condition,
    #[serde(default)]
    pub is_found: bool,
    #[serde(default)]
    pub is_additional: bool,
}

impl NewCatalogRecord {
    /// A regular catalog entry, as found in a seed file.
    pub fn regular(
        identifier: impl Into<String>,
        uld_type: impl Into<String>,
        location: impl Into<String>,
        condition: Condition,
    ) -> Self {
        Self {
            uld_identifier: identifier.into(),
            uld_type_short_code: Some(uld_type.into()),
            location_current_name: Some(location.into()),
            condition_id: condition,
            is_found: false,
            is_additional: false,
        }
    }
}

impl From<&AdditionalUld> for NewCatalogRecord {
    fn from(uld: &AdditionalUld) -> Self {
        Self {
            uld_identifier: uld.identifier.clone(),
            uld_type_short_code: uld.uld_type.clone(),
            location_current_name: Some(uld.location.clone()),
            condition_id: uld.condition,
            is_found: uld.is_found,
            is_additional: true,
        }
    }
}

impl CatalogRecord {
    /// The location a stock take sees, with blanks shown as unknown.
    pub fn location(&self) -> &str {
        self.location_current_name
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn uld_type(&self) -> &str {
        self.uld_type_short_code
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn to_catalog_uld(&self) -> CatalogUld {
        CatalogUld {
            identifier: self.uld_identifier.to_uppercase(),
            uld_type: self.uld_type().to_string(),
            location: self.location().to_string(),
            condition: self.condition_id,
            is_found: self.is_found,
        }
    }
}

impl Entity for CatalogRecord {
    type Id = String;
    type CreateParams = NewCatalogRecord;

    fn id(&self) -> &String {
        &self.id
    }

    fn from_create_params(id: String, params: NewCatalogRecord) -> Result<Self, String> {
        let identifier = params.uld_identifier.trim().to_uppercase();
        if identifier.is_empty() {
            return Err("uldIdentifier is required".to_string());
        }
        Ok(Self {
            id,
            uld_identifier: identifier,
            uld_type_short_code: params.uld_type_short_code,
            location_current_name: params.location_current_name,
            condition_id: params.condition_id,
            is_found: params.is_found,
            is_additional: params.is_additional,
        })
    }
}

/// Builds the catalog actor and its client. The caller spawns `run`.
pub fn catalog_actor(buffer_size: usize) -> (ResourceActor<CatalogRecord>, UldCatalogClient) {
    let counter = Arc::new(AtomicU64::new(1));
    let next_id = move || format!("uld_{}", counter.fetch_add(1, Ordering::SeqCst));
    let (actor, inner) = ResourceActor::new(buffer_size, next_id);
    (actor, UldCatalogClient::new(inner))
}

#[derive(Clone)]
pub struct UldCatalogClient {
    inner: ResourceClient<CatalogRecord>,
}

impl UldCatalogClient {
    pub fn new(inner: ResourceClient<CatalogRecord>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<CatalogRecord>, CatalogError> {
        debug!("Sending request");
        let records = self.inner.list().await?;
        debug!(record_count = records.len(), "Catalog listed");
        Ok(records)
    }

    /// The first record carrying this identifier, compared case-insensitively.
    #[instrument(skip(self))]
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<CatalogRecord>, CatalogError> {
        debug!("Sending request");
        let records = self.inner.list().await?;
        Ok(records
            .into_iter()
            .find(|r| r.uld_identifier.eq_ignore_ascii_case(identifier)))
    }

    #[instrument(skip(self, record), fields(uld = %record.uld_identifier))]
    pub async fn create(&self, record: NewCatalogRecord) -> Result<CatalogRecord, CatalogError> {
        debug!("Sending request");
        let id = self.inner.create(record).await?;
        match self.inner.get(id.clone()).await? {
            Some(created) => {
                info!(record_id = %id, "Catalog record created");
                Ok(created)
            }
            None => Err(CatalogError::from(FrameworkError::NotFound(id))),
        }
    }

    /// Posts a newly discovered ULD.
    pub async fn add_additional(&self, uld: &AdditionalUld) -> Result<CatalogRecord, CatalogError> {
        self.create(NewCatalogRecord::from(uld)).await
    }

    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), CatalogError> {
        debug!("Sending shutdown request");
        Ok(self.inner.shutdown().await?)
    }

    /// Deletes every record carrying this identifier. `Ok(false)` when there
    /// was nothing to delete.
    #[instrument(skip(self))]
    pub async fn remove(&self, identifier: &str) -> Result<bool, CatalogError> {
        debug!("Sending request");
        let matching: Vec<String> = self
            .inner
            .list()
            .await?
            .into_iter()
            .filter(|r| r.uld_identifier.eq_ignore_ascii_case(identifier))
            .map(|r| r.id)
            .collect();
        if matching.is_empty() {
            warn!("No catalog record to remove");
            return Ok(false);
        }
        for id in matching {
            self.inner.delete(id).await?;
        }
        info!("Catalog record removed");
        Ok(true)
    }
}
