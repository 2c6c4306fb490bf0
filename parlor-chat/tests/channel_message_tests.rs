use parlor_chat::{CHANNEL_MESSAGE_TYPE, ChannelMessage, ChannelMessageType};
use parlor_db::{Database, MemoryDatabase, SqliteDatabase};
use parlor_resource::{Resource, ResourceError, ResourceManager};
use parlor_types::{LocalId, UniversalId, stable_type_hash};
use pretty_assertions::assert_eq;
use std::any::Any;
use std::sync::Arc;

const SERVER: &str = "parlor";

fn chat_manager(database: Arc<dyn Database>) -> ResourceManager {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let manager = ResourceManager::new(SERVER, database);
    manager.register_type(ChannelMessageType::new()).unwrap();
    manager
}

fn as_message(resource: &parlor_resource::SharedResource) -> &ChannelMessage {
    resource.as_any().downcast_ref::<ChannelMessage>().unwrap()
}

// ── Type descriptor ───────────────────────────────────────────────

#[test]
fn identifier_and_hash_are_fixed() {
    let ty = ChannelMessageType::new();
    assert_eq!(ty.identifier().name(), CHANNEL_MESSAGE_TYPE);
    assert_eq!(ty.identifier().hash(), stable_type_hash("channel_message"));

    let message = ChannelMessage::new(UniversalId::new(), LocalId::new());
    assert_eq!(message.type_hash(), ty.identifier().hash());
}

#[tokio::test]
async fn hooks_round_trip_content() {
    let manager = chat_manager(Arc::new(MemoryDatabase::new()));
    let ty = manager.get_type(CHANNEL_MESSAGE_TYPE).unwrap();

    let original = ty.new_instance(UniversalId::new(), LocalId::new());
    as_message(&original).set_content("salutations");

    let mut item = manager
        .find_or_create_database_resource(original.universal_id())
        .await
        .unwrap();
    ty.save_resource(&manager, &mut item, original.as_ref())
        .unwrap();
    assert_eq!(item.get_str("content_raw"), Some("salutations"));

    let restored = ty.new_instance(original.universal_id(), original.local_id());
    ty.load_resource(&manager, &item, restored.as_ref()).unwrap();
    assert_eq!(as_message(&restored).content(), "salutations");
}

#[tokio::test]
async fn hooks_reject_foreign_resources() {
    struct Impostor {
        universal_id: UniversalId,
        local_id: LocalId,
    }

    impl Resource for Impostor {
        fn universal_id(&self) -> UniversalId {
            self.universal_id
        }

        fn local_id(&self) -> LocalId {
            self.local_id
        }

        fn type_hash(&self) -> u32 {
            stable_type_hash("impostor")
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    let manager = chat_manager(Arc::new(MemoryDatabase::new()));
    let ty = manager.get_type(CHANNEL_MESSAGE_TYPE).unwrap();
    let impostor = Impostor {
        universal_id: UniversalId::new(),
        local_id: LocalId::new(),
    };

    let mut item = manager
        .find_or_create_database_resource(impostor.universal_id())
        .await
        .unwrap();
    assert!(ty.save_resource(&manager, &mut item, &impostor).is_err());
    assert!(ty.load_resource(&manager, &item, &impostor).is_err());
}

// ── End-to-end lifecycle ──────────────────────────────────────────

async fn run_message_lifecycle(database: Arc<dyn Database>) {
    let manager = chat_manager(database);
    let id = UniversalId::parse("11111111-1111-1111-1111-111111111111").unwrap();

    // Nothing stored under the id yet.
    let err = manager.load_resource(id).await.err().unwrap();
    assert!(matches!(err, ResourceError::NotFound(found) if found == id));

    // Claim the row, then wrap and cache a message over it.
    let item = manager.find_or_create_database_resource(id).await.unwrap();
    assert_eq!(item.get_uuid("uuid"), Some(id.as_uuid()));
    assert!(item.get_str("content_raw").is_none());

    let message: parlor_resource::SharedResource =
        Arc::new(ChannelMessage::new(id, LocalId::new()));
    as_message(&message).set_content("hi");
    manager.cache().insert(Arc::clone(&message));

    manager.save_resource(&message).await.unwrap();
    manager.unload_resource(message.as_ref());

    // The reload constructs a fresh instance from the saved row.
    let reloaded = manager.load_resource(id).await.unwrap();
    assert!(!Arc::ptr_eq(&message, &reloaded));
    assert_eq!(reloaded.universal_id(), id);
    assert_eq!(reloaded.local_id(), message.local_id());
    assert_eq!(as_message(&reloaded).content(), "hi");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn message_lifecycle_over_memory_store() {
    run_message_lifecycle(Arc::new(MemoryDatabase::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn message_lifecycle_over_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let database = SqliteDatabase::new(dir.path().join("parlor.db"));
    run_message_lifecycle(Arc::new(database)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn edits_persist_only_when_saved_again() {
    let manager = chat_manager(Arc::new(MemoryDatabase::new()));
    let id = UniversalId::new();

    manager.find_or_create_database_resource(id).await.unwrap();
    let message: parlor_resource::SharedResource =
        Arc::new(ChannelMessage::new(id, LocalId::new()));
    as_message(&message).set_content("first");
    manager.cache().insert(Arc::clone(&message));
    manager.save_resource(&message).await.unwrap();

    // An in-memory edit without a save is lost across unload.
    as_message(&message).set_content("second");
    manager.unload_resource(message.as_ref());
    let reloaded = manager.load_resource(id).await.unwrap();
    assert_eq!(as_message(&reloaded).content(), "first");

    // Saving the edit makes it stick.
    as_message(&reloaded).set_content("second");
    manager.save_resource(&reloaded).await.unwrap();
    manager.unload_resource(reloaded.as_ref());
    let reloaded = manager.load_resource(id).await.unwrap();
    assert_eq!(as_message(&reloaded).content(), "second");
}
