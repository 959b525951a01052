//! Command handlers for the Nexus CLI.
//!
//! Each handler follows the same local-first shape as the dashboard views:
//! show the local snapshot, then fetch from the backend (when configured)
//! and show the reconciled result. A failed fetch leaves the local view as
//! the displayed truth.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Local;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use nexus_core::api::RemoteClient;
use nexus_core::models::{Category, Company, EntityKind, Lead, Record, Task};
use nexus_core::stats::LeadStats;
use nexus_core::{CacheManager, Config, FileStore};

use crate::output;

pub struct App {
    cache: CacheManager<FileStore>,
    remote: Option<RemoteClient>,
}

impl App {
    pub fn new(config: &Config, data_dir: PathBuf) -> Result<Self> {
        debug!(?data_dir, "Data directory configured");
        let cache = CacheManager::new(FileStore::new(data_dir)?);
        let remote = RemoteClient::from_config(config)?;
        if remote.is_none() {
            debug!("No backend configured, running on local data only");
        }
        Ok(Self { cache, remote })
    }

    /// Fetch a collection, logging and swallowing failures.
    async fn fetch<T: Record>(&self) -> Option<Vec<T>> {
        let remote = self.remote.as_ref()?;
        match remote.fetch::<T>().await {
            Ok(records) => Some(records),
            Err(e) => {
                warn!(kind = %T::KIND, error = %e, "Remote fetch failed, showing local data");
                None
            }
        }
    }

    /// Local records, then the synced view if the backend answered.
    async fn read_and_sync<T: Record>(&self) -> (Vec<T>, bool) {
        let local = self.cache.read::<T>();
        match self.fetch::<T>().await {
            Some(remote) => (self.cache.sync(remote), true),
            None => (local, false),
        }
    }

    pub async fn leads(&self) -> Result<()> {
        let (leads, synced) = self.read_and_sync::<Lead>().await;
        output::print_leads(&leads, &self.cache.categories());
        output::print_source(synced, leads.len());
        Ok(())
    }

    pub async fn sync_all(&self) -> Result<()> {
        if self.remote.is_none() {
            bail!("No backend configured; set SUPABASE_URL and SUPABASE_ANON_KEY");
        }

        let (leads, categories, companies, tasks) = futures::join!(
            self.fetch::<Lead>(),
            self.fetch::<Category>(),
            self.fetch::<Company>(),
            self.fetch::<Task>(),
        );

        // Collections are reconciled independently; one failing leaves the
        // others synced.
        let counts = [
            (EntityKind::Leads, leads.map(|r| self.cache.sync(r).len())),
            (EntityKind::Categories, categories.map(|r| self.cache.sync(r).len())),
            (EntityKind::Companies, companies.map(|r| self.cache.sync(r).len())),
            (EntityKind::Tasks, tasks.map(|r| self.cache.sync(r).len())),
        ];
        for (kind, count) in counts {
            match count {
                Some(n) => println!("{:<12} synced ({} records)", kind.to_string(), n),
                None => println!("{:<12} fetch failed, kept local data", kind.to_string()),
            }
        }
        Ok(())
    }

    pub async fn stats(&self) -> Result<()> {
        // Dry run: merge without committing the sync
        let leads = match self.fetch::<Lead>().await {
            Some(remote) => self.cache.merge(remote),
            None => self.cache.leads(),
        };
        output::print_stats(&LeadStats::from_leads(&leads));
        Ok(())
    }

    pub async fn monitor(&self) -> Result<()> {
        let (mut leads, synced) = self.read_and_sync::<Lead>().await;
        Lead::sort_by_expiration(&mut leads);
        output::print_monitor(&leads, Local::now().date_naive());
        output::print_source(synced, leads.len());
        Ok(())
    }

    pub async fn categories(&self) -> Result<()> {
        let (categories, synced) = self.read_and_sync::<Category>().await;
        output::print_categories(&categories);
        output::print_source(synced, categories.len());
        Ok(())
    }

    pub async fn companies(&self) -> Result<()> {
        let (companies, synced) = self.read_and_sync::<Company>().await;
        output::print_companies(&companies);
        output::print_source(synced, companies.len());
        Ok(())
    }

    pub async fn tasks(&self) -> Result<()> {
        let (tasks, synced) = self.read_and_sync::<Task>().await;
        output::print_tasks(&tasks);
        output::print_source(synced, tasks.len());
        Ok(())
    }

    pub async fn save_lead(&self, json: &str) -> Result<()> {
        let lead: Lead = serde_json::from_str(json).context("Invalid lead JSON")?;
        if lead.id.is_empty() {
            bail!("A lead needs a non-empty \"id\"");
        }

        // The backend write must succeed before the local mirror changes
        if let Some(remote) = &self.remote {
            remote.upsert(&lead).await.context("Backend rejected the lead")?;
        }
        let id = lead.id.clone();
        self.cache.save_lead(lead);
        println!("Saved lead {}", id);
        Ok(())
    }

    pub async fn update_lead(&self, id: &str, json: &str) -> Result<()> {
        let fields: Map<String, Value> =
            serde_json::from_str(json).context("Update must be a JSON object")?;

        if let Some(remote) = &self.remote {
            remote
                .update(EntityKind::Leads, id, &fields)
                .await
                .context("Backend rejected the update")?;
        }
        match self.cache.update_lead(id, &fields) {
            Some(lead) => println!("Updated lead {} ({})", lead.id, lead.status),
            None => println!("No local lead {} to update", id),
        }
        Ok(())
    }

    pub async fn delete_lead(&self, id: &str) -> Result<()> {
        if let Some(remote) = &self.remote {
            remote
                .delete(EntityKind::Leads, id)
                .await
                .context("Backend rejected the deletion")?;
        }
        self.cache.delete_lead(id);
        println!("Deleted lead {}", id);
        Ok(())
    }

    pub async fn save_category(&self, json: &str) -> Result<()> {
        let category: Category = serde_json::from_str(json).context("Invalid category JSON")?;
        if category.id.is_empty() {
            bail!("A category needs a non-empty \"id\"");
        }

        if let Some(remote) = &self.remote {
            remote
                .upsert(&category)
                .await
                .context("Backend rejected the category")?;
        }
        let id = category.id.clone();
        self.cache.save_category(category);
        println!("Saved category {}", id);
        Ok(())
    }

    pub async fn delete_category(&self, id: &str) -> Result<()> {
        if let Some(remote) = &self.remote {
            remote
                .delete(EntityKind::Categories, id)
                .await
                .context("Backend rejected the deletion")?;
        }
        self.cache.delete_category(id);
        println!("Deleted category {}", id);
        Ok(())
    }

    pub fn status(&self) {
        let ages = self.cache.cache_ages();
        output::print_status(&ages, self.cache.tombstones::<Lead>().len(), self.remote.is_some());
        if self.cache.any_stale() {
            println!("Some collections are stale; run `nexus sync`.");
        }
    }
}
