//! Persistence for integrations and their auth records.

use crate::errors::{Error, Result};
use crate::types::*;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use vaultsync_storage::{
    Storage, Transaction, TransactionExt, CF_INTEGRATIONS, CF_INTEGRATIONS_BY_AUTH,
    CF_INTEGRATIONS_BY_PROJECT, CF_INTEGRATION_AUTHS,
};

/// Integration rows plus the by-project and by-auth indexes
///
/// Every write runs in a storage transaction, so index entries and the
/// primary row move together.
pub struct IntegrationStore<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> IntegrationStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Insert a new integration
    ///
    /// Fails with `IntegrationAuthNotFound` if the referenced auth record is
    /// gone by the time the transaction runs.
    pub async fn create(&self, integration: &Integration) -> Result<()> {
        let mut tx = self.storage.begin_transaction().await?;

        if !tx.exists(CF_INTEGRATION_AUTHS, &integration.integration_auth_id)? {
            tx.rollback();
            return Err(Error::IntegrationAuthNotFound(
                integration.integration_auth_id,
            ));
        }

        tx.put(CF_INTEGRATIONS, &integration.id, integration)?;
        tx.put(
            CF_INTEGRATIONS_BY_PROJECT,
            &(integration.project_id, integration.id),
            &integration.id,
        )?;
        tx.put(
            CF_INTEGRATIONS_BY_AUTH,
            &(integration.integration_auth_id, integration.id),
            &integration.id,
        )?;
        tx.commit().await?;

        debug!(
            integration_id = %integration.id,
            integration_auth_id = %integration.integration_auth_id,
            "Integration row inserted"
        );
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Integration>> {
        Ok(self.storage.get(CF_INTEGRATIONS, &id).await?)
    }

    /// All integrations of a project ordered by `created_at`
    pub async fn find_by_project_id(&self, project_id: Uuid) -> Result<Vec<Integration>> {
        let mut integrations = self
            .find(&IntegrationFilter {
                project_id: Some(project_id),
                ..IntegrationFilter::default()
            })
            .await?;
        integrations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(integrations)
    }

    /// Read-modify-write one integration in a transaction
    ///
    /// `updated_at` is stamped after `apply` runs.
    pub async fn update_by_id<F>(&self, id: Uuid, apply: F) -> Result<Integration>
    where
        F: FnOnce(&mut Integration) + Send,
    {
        let mut tx = self.storage.begin_transaction().await?;

        let Some(mut integration) = tx.get::<_, Integration>(CF_INTEGRATIONS, &id)? else {
            tx.rollback();
            return Err(Error::IntegrationNotFound(id));
        };

        apply(&mut integration);
        integration.id = id;
        integration.updated_at = current_timestamp();

        tx.put(CF_INTEGRATIONS, &id, &integration)?;
        tx.commit().await?;

        debug!(integration_id = %id, "Integration row updated");
        Ok(integration)
    }

    /// Record the outcome of a sync pass without touching `updated_at`
    ///
    /// # Returns
    /// * `false` if the integration was deleted meanwhile
    pub async fn record_sync_result(
        &self,
        id: Uuid,
        job_id: Uuid,
        outcome: &std::result::Result<(), String>,
    ) -> Result<bool> {
        let mut tx = self.storage.begin_transaction().await?;

        let Some(mut integration) = tx.get::<_, Integration>(CF_INTEGRATIONS, &id)? else {
            tx.rollback();
            return Ok(false);
        };

        integration.is_synced = Some(outcome.is_ok());
        integration.sync_message = outcome.as_ref().err().cloned();
        integration.last_sync_job_id = Some(job_id);
        if outcome.is_ok() {
            integration.last_used = Some(current_timestamp());
        }

        tx.put(CF_INTEGRATIONS, &id, &integration)?;
        tx.commit().await?;
        Ok(true)
    }

    /// Remove an integration and its index entries inside `tx`
    ///
    /// # Returns
    /// * The removed row
    pub fn delete_by_id(&self, tx: &mut dyn Transaction, id: Uuid) -> Result<Integration> {
        let integration: Integration = tx
            .get(CF_INTEGRATIONS, &id)?
            .ok_or(Error::IntegrationNotFound(id))?;

        tx.delete(CF_INTEGRATIONS, &id)?;
        tx.delete(
            CF_INTEGRATIONS_BY_PROJECT,
            &(integration.project_id, id),
        )?;
        tx.delete(
            CF_INTEGRATIONS_BY_AUTH,
            &(integration.integration_auth_id, id),
        )?;

        Ok(integration)
    }

    /// Integrations matching `filter`, read from committed state
    pub async fn find(&self, filter: &IntegrationFilter) -> Result<Vec<Integration>> {
        let ids: Vec<(Vec<u8>, Uuid)> = match (filter.integration_auth_id, filter.project_id) {
            (Some(auth_id), _) => {
                self.storage
                    .get_by_prefix(CF_INTEGRATIONS_BY_AUTH, &auth_id)
                    .await?
            }
            (None, Some(project_id)) => {
                self.storage
                    .get_by_prefix(CF_INTEGRATIONS_BY_PROJECT, &project_id)
                    .await?
            }
            (None, None) => {
                let rows: Vec<(Vec<u8>, Integration)> =
                    self.storage.get_by_prefix(CF_INTEGRATIONS, &()).await?;
                return Ok(rows
                    .into_iter()
                    .map(|(_, integration)| integration)
                    .filter(|integration| filter.matches(integration))
                    .collect());
            }
        };

        let mut integrations = Vec::with_capacity(ids.len());
        for (_, id) in ids {
            if let Some(integration) = self.find_by_id(id).await? {
                if filter.matches(&integration) {
                    integrations.push(integration);
                }
            }
        }
        Ok(integrations)
    }

    /// Integrations matching `filter` as seen by `tx`, including its own
    /// pending writes
    pub fn find_in(
        &self,
        tx: &dyn Transaction,
        filter: &IntegrationFilter,
    ) -> Result<Vec<Integration>> {
        let ids: Vec<(Vec<u8>, Uuid)> = match (filter.integration_auth_id, filter.project_id) {
            (Some(auth_id), _) => tx.get_by_prefix(CF_INTEGRATIONS_BY_AUTH, &auth_id)?,
            (None, Some(project_id)) => tx.get_by_prefix(CF_INTEGRATIONS_BY_PROJECT, &project_id)?,
            (None, None) => {
                let rows: Vec<(Vec<u8>, Integration)> = tx.get_by_prefix(CF_INTEGRATIONS, &())?;
                return Ok(rows
                    .into_iter()
                    .map(|(_, integration)| integration)
                    .filter(|integration| filter.matches(integration))
                    .collect());
            }
        };

        let mut integrations = Vec::with_capacity(ids.len());
        for (_, id) in ids {
            if let Some(integration) = tx.get::<_, Integration>(CF_INTEGRATIONS, &id)? {
                if filter.matches(&integration) {
                    integrations.push(integration);
                }
            }
        }
        Ok(integrations)
    }
}

/// Integration auth records
pub struct IntegrationAuthStore<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> IntegrationAuthStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Insert or replace an auth record
    pub async fn insert(&self, auth: &IntegrationAuth) -> Result<()> {
        self.storage.put(CF_INTEGRATION_AUTHS, &auth.id, auth).await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<IntegrationAuth>> {
        Ok(self.storage.get(CF_INTEGRATION_AUTHS, &id).await?)
    }

    /// Remove an auth record inside `tx`
    ///
    /// # Returns
    /// * `true` if a record was removed
    pub fn delete_by_id(&self, tx: &mut dyn Transaction, id: Uuid) -> Result<bool> {
        if !tx.exists(CF_INTEGRATION_AUTHS, &id)? {
            return Ok(false);
        }
        tx.delete(CF_INTEGRATION_AUTHS, &id)?;
        Ok(true)
    }
}
