//! IndexedDB store for WebAssembly.
//!
//! Boards live in the `HEXGAMESTORE` object store of the `hexeldatabase`
//! database as plain objects, with the board name as key path.

use super::{BoardStore, BoxFuture, StorageError, StorageResult};
use crate::board::GameBoard;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, error};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    IdbDatabase, IdbObjectStore, IdbObjectStoreParameters, IdbRequest, IdbTransactionMode,
};

const DB_NAME: &str = "hexeldatabase";
const DB_VERSION: u32 = 1;
const STORE_NAME: &str = "HEXGAMESTORE";
const KEY_PATH: &str = "name";

/// IndexedDB-backed store.
///
/// Not Send/Sync: IndexedDB handles only live on the browser's main thread.
pub struct IndexedDbStore {
    /// Connection opened on first use
    db: Rc<RefCell<Option<IdbDatabase>>>,
}

impl IndexedDbStore {
    pub fn new() -> Self {
        Self {
            db: Rc::new(RefCell::new(None)),
        }
    }

    async fn get_db(&self) -> StorageResult<IdbDatabase> {
        if let Some(db) = self.db.borrow().as_ref() {
            return Ok(db.clone());
        }

        let window = web_sys::window()
            .ok_or_else(|| StorageError::Other("No window object".to_string()))?;

        let idb_factory = window
            .indexed_db()
            .map_err(|e| StorageError::Other(format!("IndexedDB error: {:?}", e)))?
            .ok_or_else(|| StorageError::Other("IndexedDB not available".to_string()))?;

        let open_request = idb_factory
            .open_with_u32(DB_NAME, DB_VERSION)
            .map_err(|e| StorageError::Other(format!("Failed to open DB: {:?}", e)))?;

        let onupgrade = Closure::once(Box::new(move |event: web_sys::IdbVersionChangeEvent| {
            debug!("Upgrading {DB_NAME} from version {}", event.old_version());
            let db = event
                .target()
                .and_then(|target| target.dyn_into::<IdbRequest>().ok())
                .and_then(|request| request.result().ok())
                .and_then(|result| result.dyn_into::<IdbDatabase>().ok());
            let Some(db) = db else {
                error!("Upgrade event carried no database");
                return;
            };

            if !db.object_store_names().contains(STORE_NAME) {
                let params = IdbObjectStoreParameters::new();
                params.set_key_path(&JsValue::from_str(KEY_PATH));
                if let Err(e) = db.create_object_store_with_optional_parameters(STORE_NAME, &params) {
                    error!("Failed to create object store {STORE_NAME}: {:?}", e);
                }
            }
        }) as Box<dyn FnOnce(_)>);

        open_request.set_onupgradeneeded(Some(onupgrade.as_ref().unchecked_ref()));
        onupgrade.forget();

        let db = await_idb_request::<IdbDatabase>(&open_request).await?;
        *self.db.borrow_mut() = Some(db.clone());
        Ok(db)
    }

    fn get_store(&self, db: &IdbDatabase, mode: IdbTransactionMode) -> StorageResult<IdbObjectStore> {
        let transaction = db
            .transaction_with_str_and_mode(STORE_NAME, mode)
            .map_err(|e| StorageError::Other(format!("Transaction error: {:?}", e)))?;

        transaction
            .object_store(STORE_NAME)
            .map_err(|e| StorageError::Other(format!("Store error: {:?}", e)))
    }
}

impl Default for IndexedDbStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardStore for IndexedDbStore {
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let db = self.get_db().await?;
            let store = self.get_store(&db, IdbTransactionMode::Readonly)?;

            let request = store
                .get_all_keys()
                .map_err(|e| StorageError::Other(format!("GetAllKeys error: {:?}", e)))?;

            let keys = await_idb_request::<js_sys::Array>(&request).await?;
            let mut names: Vec<String> = keys.iter().filter_map(|key| key.as_string()).collect();
            names.sort();
            Ok(names)
        })
    }

    fn load(&self, name: &str) -> BoxFuture<'_, StorageResult<GameBoard>> {
        let name = name.to_string();

        Box::pin(async move {
            let db = self.get_db().await?;
            let store = self.get_store(&db, IdbTransactionMode::Readonly)?;

            let request = store
                .get(&JsValue::from_str(&name))
                .map_err(|e| StorageError::Other(format!("Get error: {:?}", e)))?;

            let record = await_idb_request::<JsValue>(&request).await?;
            if record.is_undefined() || record.is_null() {
                return Err(StorageError::NotFound(name));
            }

            let json: String = js_sys::JSON::stringify(&record)
                .map_err(|e| StorageError::Serialization(format!("{:?}", e)))?
                .into();

            GameBoard::from_json(&json).map_err(|e| StorageError::Serialization(e.to_string()))
        })
    }

    fn save(&self, board: &GameBoard) -> BoxFuture<'_, StorageResult<()>> {
        let json = match board.to_json() {
            Ok(json) => json,
            Err(e) => return Box::pin(async move { Err(StorageError::Serialization(e.to_string())) }),
        };

        Box::pin(async move {
            let record = js_sys::JSON::parse(&json)
                .map_err(|e| StorageError::Serialization(format!("{:?}", e)))?;

            let db = self.get_db().await?;
            let store = self.get_store(&db, IdbTransactionMode::Readwrite)?;

            let request = store
                .put(&record)
                .map_err(|e| StorageError::Other(format!("Put error: {:?}", e)))?;

            await_idb_request::<JsValue>(&request).await?;
            Ok(())
        })
    }

    fn delete(&self, name: &str) -> BoxFuture<'_, StorageResult<()>> {
        let name = name.to_string();

        Box::pin(async move {
            let db = self.get_db().await?;
            let store = self.get_store(&db, IdbTransactionMode::Readwrite)?;

            let request = store
                .delete(&JsValue::from_str(&name))
                .map_err(|e| StorageError::Other(format!("Delete error: {:?}", e)))?;

            await_idb_request::<JsValue>(&request).await?;
            Ok(())
        })
    }

    fn exists(&self, name: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let name = name.to_string();

        Box::pin(async move {
            let db = self.get_db().await?;
            let store = self.get_store(&db, IdbTransactionMode::Readonly)?;

            let request = store
                .count_with_key(&JsValue::from_str(&name))
                .map_err(|e| StorageError::Other(format!("Count error: {:?}", e)))?;

            let count = await_idb_request::<JsValue>(&request).await?;
            Ok(count.as_f64().unwrap_or(0.0) > 0.0)
        })
    }
}

/// Await an IndexedDB request through a Promise.
async fn await_idb_request<T: JsCast>(request: &IdbRequest) -> StorageResult<T> {
    use wasm_bindgen_futures::JsFuture;

    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        let reject_on_success = reject.clone();
        let onsuccess = Closure::once(Box::new(move |event: web_sys::Event| {
            let result = event
                .target()
                .and_then(|target| target.dyn_into::<IdbRequest>().ok())
                .and_then(|request| request.result().ok());
            let outcome = match result {
                Some(result) => resolve.call1(&JsValue::NULL, &result),
                None => reject_on_success.call1(&JsValue::NULL, &JsValue::from_str("Request has no result")),
            };
            if let Err(e) = outcome {
                error!("Failed to settle IndexedDB promise: {:?}", e);
            }
        }) as Box<dyn FnOnce(_)>);

        let onerror = Closure::once(Box::new(move |_event: web_sys::Event| {
            if let Err(e) = reject.call1(&JsValue::NULL, &JsValue::from_str("IndexedDB request failed")) {
                error!("Failed to settle IndexedDB promise: {:?}", e);
            }
        }) as Box<dyn FnOnce(_)>);

        request.set_onsuccess(Some(onsuccess.as_ref().unchecked_ref()));
        request.set_onerror(Some(onerror.as_ref().unchecked_ref()));

        onsuccess.forget();
        onerror.forget();
    });

    JsFuture::from(promise)
        .await
        .map_err(|e| StorageError::Other(format!("IndexedDB request failed: {:?}", e)))?
        .dyn_into::<T>()
        .map_err(|_| StorageError::Other("Type conversion failed".to_string()))
}
