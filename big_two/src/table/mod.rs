//! Table orchestration: configuration, persistence and the async game
//! state manager.
//!
//! ## Example
//!
//! ```
//! use big_two::table::{EngineSettings, GameConfig, GameStateManager, MemoryStore};
//! use std::sync::Arc;
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_all()
//!     .build()
//!     .unwrap();
//! runtime.block_on(async {
//!     let manager =
//!         GameStateManager::new(Arc::new(MemoryStore::new()), EngineSettings::default());
//!     let state = manager.initialize_game(GameConfig::default()).await.unwrap();
//!     assert_eq!(state.players.len(), 4);
//!
//!     // The holder of the 3♦ opens.
//!     assert!(manager.play_cards(&["3D"]).await.success);
//! });
//! ```

pub mod config;
pub mod manager;
pub mod storage;

pub use config::{BotDifficulty, EngineSettings, GameConfig, SettingsError};
pub use manager::{GameStateManager, Listener, Subscription};
pub use storage::{FileStore, MemoryStore, StateStore, StorageError, StorageResult};
