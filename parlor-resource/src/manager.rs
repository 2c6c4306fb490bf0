//! The resource manager: orchestrates registry, cache, query pools,
//! and the backing store.

use crate::{
    ConfigurationError, Resource, ResourceCache, ResourceError, ResourceResult, ResourceType,
    SharedResource, TypeRegistry,
};
use parlor_db::{
    Database, DatabaseItem, DbError, Document, Params, QueryPool,
};
use parlor_types::{LocalId, UniversalId};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Reserved document fields on every resource row.
const FIELD_UUID: &str = "uuid";
const FIELD_LOCAL_ID: &str = "localId";
const FIELD_TYPE: &str = "type";

/// Named queries preset by the manager.
const QUERY_FIND_UUID: &str = "find_resource_uuid";
const QUERY_FIND_LOCAL: &str = "find_resource_local";
const QUERY_CREATE_GET_UUID: &str = "create_get_resource_uuid";

type InflightTable = Mutex<HashMap<UniversalId, Arc<OnceCell<SharedResource>>>>;

struct ManagerInner {
    /// Server name; prefixes the backing collection.
    name: String,
    database: Arc<dyn Database>,
    registry: RwLock<TypeRegistry>,
    cache: ResourceCache,
    /// Holds the shared definition catalog. Never executes queries —
    /// execution always goes through a checked-out fork.
    global_pool: Mutex<QueryPool>,
    /// Forks not currently in use by any operation.
    idle_pools: Mutex<Vec<QueryPool>>,
    /// Single-flight table: one in-progress load per universal id.
    inflight: InflightTable,
}

/// Orchestrator for resource lifecycle: load, save, unload — sync and
/// detached — over a pluggable type catalog and a document store.
///
/// A cheaply cloneable handle: clones share all state, so each
/// connection worker holds its own copy.
#[derive(Clone)]
pub struct ResourceManager {
    inner: Arc<ManagerInner>,
}

impl ResourceManager {
    /// Creates a manager for the named server over the given store and
    /// registers the preset queries.
    #[must_use]
    pub fn new(name: impl Into<String>, database: Arc<dyn Database>) -> Self {
        let manager = Self {
            inner: Arc::new(ManagerInner {
                name: name.into(),
                database,
                registry: RwLock::new(TypeRegistry::new()),
                cache: ResourceCache::new(),
                global_pool: Mutex::new(QueryPool::new()),
                idle_pools: Mutex::new(Vec::new()),
                inflight: Mutex::new(HashMap::new()),
            }),
        };
        manager.load_query_presets();
        manager
    }

    /// The server name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The backing database handle.
    #[must_use]
    pub fn database(&self) -> &Arc<dyn Database> {
        &self.inner.database
    }

    /// The collection holding resource rows.
    #[must_use]
    pub fn collection_name(&self) -> String {
        format!("{}_resources", self.inner.name)
    }

    /// The cache of loaded resources.
    #[must_use]
    pub fn cache(&self) -> &ResourceCache {
        &self.inner.cache
    }

    // ── Query pools ──────────────────────────────────────────────

    /// The global query pool. Use it to define queries, not to execute
    /// them — execution goes through [`ResourceManager::local_query_pool`]
    /// or a dedicated [`ResourceManager::fork_query_pool`] fork.
    pub fn global_query_pool(&self) -> MutexGuard<'_, QueryPool> {
        self.inner.global_pool.lock().unwrap()
    }

    /// Forks the global pool: shared definitions, private execution
    /// state. For callers that want to own a fork for their lifetime.
    #[must_use]
    pub fn fork_query_pool(&self) -> QueryPool {
        self.inner.global_pool.lock().unwrap().fork()
    }

    /// Checks a fork out of the idle list, lazily forking when none is
    /// available. The guard returns it on drop, so the fork cost is paid
    /// once per level of concurrency rather than once per operation.
    #[must_use]
    pub fn local_query_pool(&self) -> LocalQueryPool<'_> {
        let pool = self
            .inner
            .idle_pools
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| self.fork_query_pool());
        LocalQueryPool {
            idle_pools: &self.inner.idle_pools,
            pool: Some(pool),
        }
    }

    fn load_query_presets(&self) {
        let pool = self.inner.global_pool.lock().unwrap();
        let kind = self.inner.database.kind();

        let collection = self.collection_name();
        pool.put_query(QUERY_FIND_UUID, kind, move |ctx, params| {
            let uuid = params
                .get_str(FIELD_UUID)
                .ok_or_else(|| DbError::Backend("missing 'uuid' parameter".into()))?;
            let mut filter = Document::new();
            filter.set(FIELD_UUID, uuid);
            Ok(ctx
                .session
                .find_one(&collection, &filter)?
                .map(|doc| DatabaseItem::new(&collection, FIELD_UUID, doc)))
        });

        let collection = self.collection_name();
        pool.put_query(QUERY_FIND_LOCAL, kind, move |ctx, params| {
            let local_id = params
                .get_str(FIELD_LOCAL_ID)
                .ok_or_else(|| DbError::Backend("missing 'localId' parameter".into()))?;
            let type_hash = params
                .get(FIELD_TYPE)
                .and_then(serde_json::Value::as_u64)
                .ok_or_else(|| DbError::Backend("missing 'type' parameter".into()))?;
            let mut filter = Document::new();
            filter.set(FIELD_LOCAL_ID, local_id);
            filter.set(FIELD_TYPE, type_hash);
            Ok(ctx
                .session
                .find_one(&collection, &filter)?
                .map(|doc| DatabaseItem::new(&collection, FIELD_UUID, doc)))
        });

        let collection = self.collection_name();
        pool.put_query(QUERY_CREATE_GET_UUID, kind, move |ctx, params| {
            let uuid = params
                .get_str(FIELD_UUID)
                .ok_or_else(|| DbError::Backend("missing 'uuid' parameter".into()))?;
            // Backend-atomic upsert under the uniqueness constraint on
            // the uuid field; never a separate check followed by insert.
            let doc = ctx
                .session
                .find_or_insert(&collection, FIELD_UUID, uuid, &Document::new())?;
            Ok(Some(DatabaseItem::new(&collection, FIELD_UUID, doc)))
        });
    }

    // ── Types ────────────────────────────────────────────────────

    /// Registers one resource type. Fatal on identifier-hash collision.
    pub fn register_type(&self, ty: Arc<dyn ResourceType>) -> Result<(), ConfigurationError> {
        self.inner.registry.write().unwrap().register(ty)
    }

    /// Registers the startup list of resource types, stopping at the
    /// first collision.
    pub fn register_types<I>(&self, types: I) -> Result<(), ConfigurationError>
    where
        I: IntoIterator<Item = Arc<dyn ResourceType>>,
    {
        for ty in types {
            self.register_type(ty)?;
        }
        Ok(())
    }

    /// Looks up a type by identifier name.
    #[must_use]
    pub fn get_type(&self, name: &str) -> Option<Arc<dyn ResourceType>> {
        self.inner.registry.read().unwrap().get_by_name(name)
    }

    /// Looks up a type by stored identifier hash.
    #[must_use]
    pub fn get_type_by_hash(&self, hash: u32) -> Option<Arc<dyn ResourceType>> {
        self.inner.registry.read().unwrap().get_by_hash(hash)
    }

    // ── Cache fast paths ─────────────────────────────────────────

    /// Returns the loaded resource with this universal id, if cached.
    #[must_use]
    pub fn get_loaded_universal(&self, id: UniversalId) -> Option<SharedResource> {
        self.inner.cache.get_universal(id)
    }

    /// Returns the loaded resource with this (type, local id), if cached.
    #[must_use]
    pub fn get_loaded_local(
        &self,
        ty: &dyn ResourceType,
        local_id: LocalId,
    ) -> Option<SharedResource> {
        self.inner.cache.get_local(ty.identifier().hash(), local_id)
    }

    // ── Lifecycle: load ──────────────────────────────────────────

    /// Loads the resource with this universal id, fetching and
    /// constructing it on a cache miss.
    ///
    /// Concurrent calls for one uncached id collapse into exactly one
    /// backend round-trip; every caller receives the same instance.
    pub async fn load_resource(&self, id: UniversalId) -> ResourceResult<SharedResource> {
        if let Some(found) = self.inner.cache.get_universal(id) {
            return Ok(found);
        }
        let this = self.clone();
        self.single_flight(id, move || this.fetch_by_universal(id))
            .await
    }

    /// Loads the resource with this (type, local id) pair.
    ///
    /// On a miss the row is resolved by local id first; construction
    /// then joins the universal-id single-flight table, so a concurrent
    /// [`ResourceManager::load_resource`] for the same row yields the
    /// same instance.
    pub async fn load_resource_local(
        &self,
        ty: &Arc<dyn ResourceType>,
        local_id: LocalId,
    ) -> ResourceResult<SharedResource> {
        let type_hash = ty.identifier().hash();
        if let Some(found) = self.inner.cache.get_local(type_hash, local_id) {
            return Ok(found);
        }

        let this = self.clone();
        let item = tokio::task::spawn_blocking(move || this.fetch_item_local(type_hash, local_id))
            .await
            .map_err(|err| ResourceError::Task(err.to_string()))??
            .ok_or_else(|| ResourceError::NotFoundLocal {
                type_name: ty.identifier().name().to_string(),
                local_id,
            })?;

        let id = item
            .get_uuid(FIELD_UUID)
            .map(UniversalId::from_uuid)
            .ok_or_else(|| {
                ResourceError::InvalidRecord(format!(
                    "row for local id {local_id} is missing field '{FIELD_UUID}'"
                ))
            })?;

        let this = self.clone();
        self.single_flight(id, move || {
            if let Some(found) = this.inner.cache.get_universal(id) {
                return Ok(found);
            }
            this.build_cached(id, item)
        })
        .await
    }

    /// Spawns [`ResourceManager::load_resource`] onto the runtime.
    ///
    /// Two detached operations against the same key carry no relative
    /// ordering; callers needing ordering await one before spawning the
    /// next.
    pub fn load_resource_detached(
        &self,
        id: UniversalId,
    ) -> JoinHandle<ResourceResult<SharedResource>> {
        let this = self.clone();
        tokio::spawn(async move { this.load_resource(id).await })
    }

    /// Spawns [`ResourceManager::load_resource_local`] onto the runtime.
    pub fn load_resource_local_detached(
        &self,
        ty: Arc<dyn ResourceType>,
        local_id: LocalId,
    ) -> JoinHandle<ResourceResult<SharedResource>> {
        let this = self.clone();
        tokio::spawn(async move { this.load_resource_local(&ty, local_id).await })
    }

    // ── Lifecycle: save ──────────────────────────────────────────

    /// Saves the resource: finds or creates its row, stamps the
    /// reserved fields, runs the type's save hook, and pushes the
    /// document. Completes before returning.
    pub async fn save_resource(&self, resource: &SharedResource) -> ResourceResult<()> {
        let this = self.clone();
        let resource = Arc::clone(resource);
        tokio::task::spawn_blocking(move || this.save_blocking(&resource))
            .await
            .map_err(|err| ResourceError::Task(err.to_string()))?
    }

    /// Spawns [`ResourceManager::save_resource`] onto the runtime.
    pub fn save_resource_detached(
        &self,
        resource: SharedResource,
    ) -> JoinHandle<ResourceResult<()>> {
        let this = self.clone();
        tokio::spawn(async move { this.save_resource(&resource).await })
    }

    /// Fire-and-forget save: submits the write and immediately returns
    /// the resource's universal id.
    ///
    /// Best-effort by contract: a failure is reported through
    /// `on_failure` (and a warning log), never through the return path.
    /// Callers that need failure visibility in their control flow use
    /// [`ResourceManager::save_resource`] instead.
    pub fn save_resource_reference<F>(&self, resource: &SharedResource, on_failure: F) -> UniversalId
    where
        F: FnOnce(ResourceError) + Send + 'static,
    {
        let id = resource.universal_id();
        let this = self.clone();
        let resource = Arc::clone(resource);
        tokio::spawn(async move {
            if let Err(err) = this.save_resource(&resource).await {
                warn!(%id, error = %err, "fire-and-forget resource save failed");
                on_failure(err);
            }
        });
        id
    }

    // ── Lifecycle: unload ────────────────────────────────────────

    /// Removes the resource from the cache. **Does not save.**
    ///
    /// Any in-memory mutation not explicitly saved beforehand is lost
    /// from the cache's perspective and was never written to storage.
    /// This manual-flush contract is intentional; an implementation
    /// that auto-saves here would change observable behavior.
    pub fn unload_resource(&self, resource: &dyn Resource) {
        self.inner.cache.remove(resource);
        debug!(id = %resource.universal_id(), "unloaded resource");
    }

    // ── Raw item access ──────────────────────────────────────────

    /// Finds the resource row by universal id without constructing a
    /// cached object. `Ok(None)` means no row exists.
    pub async fn find_database_resource(
        &self,
        id: UniversalId,
    ) -> ResourceResult<Option<DatabaseItem>> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.find_item_blocking(id))
            .await
            .map_err(|err| ResourceError::Task(err.to_string()))?
    }

    /// Finds the resource row by universal id, creating an empty row
    /// when absent. One backend-atomic upsert: two concurrent callers
    /// for the same new id observe a single created row.
    pub async fn find_or_create_database_resource(
        &self,
        id: UniversalId,
    ) -> ResourceResult<DatabaseItem> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.find_or_create_item_blocking(id))
            .await
            .map_err(|err| ResourceError::Task(err.to_string()))?
    }

    // ── Internal: single flight ──────────────────────────────────

    /// Runs `fetch` on the blocking pool at most once per in-flight id;
    /// concurrent callers for the same id await the winner's outcome.
    async fn single_flight<F>(&self, id: UniversalId, fetch: F) -> ResourceResult<SharedResource>
    where
        F: FnOnce() -> ResourceResult<SharedResource> + Send + 'static,
    {
        let cell = {
            let mut inflight = self.inner.inflight.lock().unwrap();
            Arc::clone(inflight.entry(id).or_default())
        };
        cell.get_or_try_init(|| async {
            let outcome = match tokio::task::spawn_blocking(fetch).await {
                Ok(outcome) => outcome,
                Err(err) => Err(ResourceError::Task(err.to_string())),
            };
            // Retire the entry before the cell's value becomes
            // observable: a load that starts after a subsequent unload
            // must open a fresh cell and re-fetch, never see this one.
            // Failed fetches stay retryable the same way.
            self.inner.inflight.lock().unwrap().remove(&id);
            outcome
        })
        .await
        .cloned()
    }

    // ── Internal: blocking store access ──────────────────────────

    fn fetch_by_universal(&self, id: UniversalId) -> ResourceResult<SharedResource> {
        // Re-check under single-flight: a winner that completed between
        // our cache miss and this cell firing already inserted it.
        if let Some(found) = self.inner.cache.get_universal(id) {
            return Ok(found);
        }
        let item = self
            .find_item_blocking(id)?
            .ok_or(ResourceError::NotFound(id))?;
        self.build_cached(id, item)
    }

    fn find_item_blocking(&self, id: UniversalId) -> ResourceResult<Option<DatabaseItem>> {
        let mut pool = self.local_query_pool();
        let params = Params::new().with(FIELD_UUID, id.to_string());
        let item = pool
            .current(self.inner.database.as_ref())
            .query_sync(QUERY_FIND_UUID, &params)?;
        Ok(item)
    }

    fn find_or_create_item_blocking(&self, id: UniversalId) -> ResourceResult<DatabaseItem> {
        let mut pool = self.local_query_pool();
        let params = Params::new().with(FIELD_UUID, id.to_string());
        pool.current(self.inner.database.as_ref())
            .query_sync(QUERY_CREATE_GET_UUID, &params)?
            .ok_or_else(|| {
                ResourceError::Db(DbError::Backend(
                    "create_get_resource_uuid produced no item".into(),
                ))
            })
    }

    fn fetch_item_local(
        &self,
        type_hash: u32,
        local_id: LocalId,
    ) -> ResourceResult<Option<DatabaseItem>> {
        let mut pool = self.local_query_pool();
        let params = Params::new()
            .with(FIELD_LOCAL_ID, local_id.to_string())
            .with(FIELD_TYPE, type_hash);
        let item = pool
            .current(self.inner.database.as_ref())
            .query_sync(QUERY_FIND_LOCAL, &params)?;
        Ok(item)
    }

    /// Resolves the stored type, constructs and populates the instance,
    /// and inserts it into the cache.
    fn build_cached(&self, id: UniversalId, item: DatabaseItem) -> ResourceResult<SharedResource> {
        let local_id = item
            .get_uuid(FIELD_LOCAL_ID)
            .map(LocalId::from_uuid)
            .ok_or_else(|| {
                ResourceError::InvalidRecord(format!(
                    "row for {id} is missing field '{FIELD_LOCAL_ID}'"
                ))
            })?;
        let type_hash = item.get_u32(FIELD_TYPE).ok_or_else(|| {
            ResourceError::InvalidRecord(format!("row for {id} is missing field '{FIELD_TYPE}'"))
        })?;
        let ty = self
            .get_type_by_hash(type_hash)
            .ok_or(ResourceError::UnknownType(type_hash))?;

        let resource = ty.new_instance(id, local_id);
        ty.load_resource(self, &item, resource.as_ref())
            .map_err(|source| ResourceError::Load {
                type_name: ty.identifier().name().to_string(),
                source,
            })?;

        self.inner.cache.insert(Arc::clone(&resource));
        debug!(%id, resource_type = %ty.identifier(), "loaded resource");
        Ok(resource)
    }

    fn save_blocking(&self, resource: &SharedResource) -> ResourceResult<()> {
        let type_hash = resource.type_hash();
        let ty = self
            .get_type_by_hash(type_hash)
            .ok_or(ResourceError::UnknownType(type_hash))?;
        let id = resource.universal_id();

        let mut item = self.find_or_create_item_blocking(id)?;
        item.set(FIELD_LOCAL_ID, resource.local_id().to_string());
        item.set(FIELD_TYPE, type_hash);
        ty.save_resource(self, &mut item, resource.as_ref())
            .map_err(|source| ResourceError::Save {
                type_name: ty.identifier().name().to_string(),
                source,
            })?;

        let mut pool = self.local_query_pool();
        pool.current(self.inner.database.as_ref()).push(&item)?;
        debug!(%id, resource_type = %ty.identifier(), "saved resource");
        Ok(())
    }
}

/// A query-pool fork checked out of the manager's idle list; returned
/// on drop.
pub struct LocalQueryPool<'a> {
    idle_pools: &'a Mutex<Vec<QueryPool>>,
    pool: Option<QueryPool>,
}

impl Deref for LocalQueryPool<'_> {
    type Target = QueryPool;

    fn deref(&self) -> &QueryPool {
        self.pool.as_ref().expect("pool present until drop")
    }
}

impl DerefMut for LocalQueryPool<'_> {
    fn deref_mut(&mut self) -> &mut QueryPool {
        self.pool.as_mut().expect("pool present until drop")
    }
}

impl Drop for LocalQueryPool<'_> {
    fn drop(&mut self) {
        if let (Some(pool), Ok(mut idle)) = (self.pool.take(), self.idle_pools.lock()) {
            idle.push(pool);
        }
    }
}
